//! Reversal of the provider's `objURL` obfuscation.
//!
//! Original-quality URLs arrive in two layers of encoding: the punctuation
//! `:`, `.` and `/` is replaced by fixed tokens, and the remaining lowercase
//! alphanumerics are shuffled through a substitution table. Decoding undoes
//! the token layer first, then the substitution; the other order would
//! corrupt the token characters.
//!
//! Malformed input is not an error: it decodes to a deterministic string of
//! garbage.

/// Token layer. Applied in this order.
const TOKENS: [(&str, &str); 3] = [("_z2C$q", ":"), ("_z&e3B", "."), ("AzdH3F", "/")];

const CIPHER_FROM: &str = "0123456789abcdefghijklmnopqrstuvw";
const CIPHER_TO: &str = "7dgjmoru140852vsnkheb963wtqplifca";

/// Decode an obfuscated URL into clear text.
pub fn decode(raw: &str) -> String {
    let mut url = raw.to_string();
    for (token, literal) in TOKENS {
        url = url.replace(token, literal);
    }
    url.chars().map(substitute).collect()
}

fn substitute(c: char) -> char {
    match CIPHER_FROM.find(c) {
        Some(pos) => CIPHER_TO.as_bytes()[pos] as char,
        None => c,
    }
}
