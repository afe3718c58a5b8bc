//! Content-type whitelist.
//!
//! Maps a response's declared media type to a file extension and checks it
//! against the caller's allowed set.
//!
//! | MIME Type | Extension |
//! |-----------|-----------|
//! | `image/jpeg`, `image/jpg`, `image/pjpeg` | `jpg` |
//! | `image/png` | `png` |
//! | `image/gif` | `gif` |
//! | `image/webp` | `webp` |
//! | `image/bmp`, `image/x-ms-bmp` | `bmp` |
//! | `image/tiff` | `tiff` |
//! | `image/svg+xml` | `svg` |
//! | `image/x-icon`, `image/vnd.microsoft.icon` | `ico` |
//! | `image/avif` | `avif` |
//! | `image/heic` | `heic` |
//! | Other | rejected |

use std::collections::BTreeSet;

use mime::Mime;

/// Set of accepted file extensions, stored without the leading dot and with
/// JPEG aliases folded into `jpg`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedExtensions(BTreeSet<String>);

impl AllowedExtensions {
    /// Parse a comma-separated list such as `"png,.jpg,jpeg"`.
    pub fn parse(list: &str) -> Self {
        list.split(',').collect()
    }

    pub fn contains(&self, extension: &str) -> bool {
        self.0.contains(&normalize_extension(extension))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: AsRef<str>> FromIterator<S> for AllowedExtensions {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|e| normalize_extension(e.as_ref()))
                .filter(|e| !e.is_empty())
                .collect(),
        )
    }
}

/// Outcome of classifying one `Content-Type` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub accepted: bool,
    pub extension: Option<&'static str>,
}

/// Classify a `Content-Type` header value against `allowed`.
///
/// Everything after the first `;` is dropped before parsing, so malformed
/// parameters never affect the result. Unknown or unparseable media types
/// have no extension and are always rejected.
pub fn classify(media_type: &str, allowed: &AllowedExtensions) -> Classification {
    let extension = media_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .parse::<Mime>()
        .ok()
        .and_then(|m| extension_for(m.essence_str()));

    Classification {
        accepted: extension.is_some_and(|e| allowed.contains(e)),
        extension,
    }
}

fn extension_for(essence: &str) -> Option<&'static str> {
    match essence.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/bmp" | "image/x-ms-bmp" => Some("bmp"),
        "image/tiff" => Some("tiff"),
        "image/svg+xml" => Some("svg"),
        "image/x-icon" | "image/vnd.microsoft.icon" => Some("ico"),
        "image/avif" => Some("avif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

fn normalize_extension(extension: &str) -> String {
    let ext = extension.trim().trim_start_matches('.').to_ascii_lowercase();
    match ext.as_str() {
        "jpeg" | "jpe" => "jpg".to_string(),
        _ => ext,
    }
}
