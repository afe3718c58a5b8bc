//! Staging assembler: moves staged downloads into the destination directory
//! under their final, zero-padded sequential names.
//!
//! Runs only after every fetch batch has completed, so nothing in the
//! destination is ever partially written or inconsistently numbered.
//!
//! Staged files are taken in ascending order of their numeric stem (the
//! chain position), at most `limit` of them, renumbered `1..=n` and padded to
//! the digit width of `limit`. Staged files past the limit are surplus and
//! stay behind in the staging directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::models::DownloadSummary;

/// Copy up to `limit` staged files from `staging` into `dest`.
///
/// Every slot below `limit` left unfilled counts as a failure.
pub fn assemble(staging: &Path, dest: &Path, limit: usize) -> Result<DownloadSummary> {
    ensure_dir(dest)?;

    let mut staged = list_staged(staging)?;
    if staged.len() > limit {
        debug!(staged = staged.len(), limit, "dropping surplus downloads");
        staged.truncate(limit);
    }
    let width = padding_width(limit);

    for (i, src) in staged.iter().enumerate() {
        let name = final_name(i + 1, width, src);
        let target = dest.join(&name);
        std::fs::copy(src, &target).with_context(|| {
            format!(
                "Failed to copy {} to {}",
                src.display(),
                target.display()
            )
        })?;
        debug!(from = %src.display(), to = %target.display(), "assembled");
    }

    let success = staged.len();
    Ok(DownloadSummary {
        success,
        failed: limit - success,
    })
}

/// Create `dest` (and parents). An existing directory is only worth a warning.
fn ensure_dir(dest: &Path) -> Result<()> {
    if dest.is_dir() {
        warn!(path = %dest.display(), "destination directory already exists");
        return Ok(());
    }
    std::fs::create_dir_all(dest)
        .with_context(|| format!("Failed to create directory: {}", dest.display()))
}

/// Staged files sorted by numeric stem, then by name.
fn list_staged(staging: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(staging)
        .with_context(|| format!("Failed to read staging directory: {}", staging.display()))?
    {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }

    files.sort_by_key(|p| {
        let stem = p
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(usize::MAX);
        (stem, p.file_name().map(|n| n.to_os_string()))
    });

    Ok(files)
}

/// Number of digits in `count` (at least one).
pub fn padding_width(count: usize) -> usize {
    count.to_string().len()
}

fn final_name(number: usize, width: usize, src: &Path) -> String {
    match src.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{:0width$}.{}", number, ext, width = width),
        None => format!("{:0width$}", number, width = width),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_padding_width() {
        assert_eq!(padding_width(0), 1);
        assert_eq!(padding_width(9), 1);
        assert_eq!(padding_width(10), 2);
        assert_eq!(padding_width(250), 3);
    }

    #[test]
    fn test_renumbers_in_index_order() {
        let staging = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let dest = out.path().join("images");

        // Gaps where chains were exhausted; 10 must sort after 2.
        for (name, body) in [("10.png", "ten"), ("2.jpg", "two"), ("5.jpg", "five")] {
            fs::write(staging.path().join(name), body).unwrap();
        }

        let summary = assemble(staging.path(), &dest, 12).unwrap();
        assert_eq!(summary, DownloadSummary { success: 3, failed: 9 });
        assert_eq!(names(&dest), vec!["01.jpg", "02.jpg", "03.png"]);
        assert_eq!(fs::read_to_string(dest.join("01.jpg")).unwrap(), "two");
        assert_eq!(fs::read_to_string(dest.join("03.png")).unwrap(), "ten");
    }

    #[test]
    fn test_copies_at_most_limit() {
        let staging = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        for (name, body) in [
            ("2.png", "a"),
            ("3.jpg", "b"),
            ("7.png", "c"),
            ("11.png", "d"),
            ("12.jpg", "e"),
        ] {
            fs::write(staging.path().join(name), body).unwrap();
        }

        let summary = assemble(staging.path(), out.path(), 3).unwrap();
        assert_eq!(summary, DownloadSummary { success: 3, failed: 0 });
        assert_eq!(names(out.path()), vec!["1.png", "2.jpg", "3.png"]);
        assert_eq!(fs::read_to_string(out.path().join("3.png")).unwrap(), "c");
    }

    #[test]
    fn test_zero_padding_follows_limit() {
        let staging = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        for i in 1..=12 {
            fs::write(staging.path().join(format!("{}.jpg", i)), "x").unwrap();
        }

        let summary = assemble(staging.path(), out.path(), 150).unwrap();
        assert_eq!(summary.success, 12);
        assert_eq!(summary.failed, 138);
        let names = names(out.path());
        assert_eq!(names.len(), 12);
        assert_eq!(names.first().unwrap(), "001.jpg");
        assert_eq!(names.last().unwrap(), "012.jpg");
    }

    #[test]
    fn test_existing_destination_is_tolerated() {
        let staging = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        fs::write(staging.path().join("1.png"), "x").unwrap();

        let summary = assemble(staging.path(), out.path(), 1).unwrap();
        assert_eq!(summary, DownloadSummary { success: 1, failed: 0 });
    }

    #[test]
    fn test_nothing_staged() {
        let staging = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let dest = out.path().join("empty");

        let summary = assemble(staging.path(), &dest, 4).unwrap();
        assert_eq!(summary, DownloadSummary { success: 0, failed: 4 });
        assert!(dest.is_dir());
        assert!(names(&dest).is_empty());
    }
}
