//! Turn a directory of pictures into an album.

use std::ffi::OsStr;
use std::path::Path;

use anyhow::{Result, ensure};
use serde_yaml::Value;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::album::AlbumSource;

/// Extensions a scan picks up unless told otherwise.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Descend into subdirectories.
    pub recursive: bool,
    /// Depth limit below the album root. `None` or `Some(0)` is unlimited.
    pub max_depth: Option<usize>,
    /// Accepted extensions, without the dot. Matched case-insensitively.
    pub extensions: Vec<String>,
    /// Walk dot-directories too.
    pub include_hidden: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            max_depth: None,
            extensions: IMAGE_EXTENSIONS.iter().map(|e| (*e).to_owned()).collect(),
            include_hidden: false,
        }
    }
}

impl ScanOptions {
    /// Whether `path` carries one of the accepted extensions.
    #[must_use]
    pub fn accepts(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(OsStr::to_str) else {
            return false;
        };
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }

    fn depth_limit(&self) -> Option<usize> {
        if self.recursive {
            self.max_depth.filter(|d| *d > 0)
        } else {
            Some(1)
        }
    }
}

/// Scan `root` into an album named after the directory.
///
/// Images are listed relative to `root` in file-name order with `/`
/// separators, and `root` becomes the album location.
pub fn scan_album(root: &Path, opts: &ScanOptions) -> Result<AlbumSource> {
    ensure!(root.is_dir(), "not a directory: {}", root.display());

    let mut walker = WalkDir::new(root).sort_by_file_name();
    if let Some(depth) = opts.depth_limit() {
        walker = walker.max_depth(depth);
    }

    let images: Vec<Value> = walker
        .into_iter()
        .filter_entry(|e| opts.include_hidden || !is_hidden_dir(e))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("scan: skipping unreadable entry: {err}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && opts.accepts(entry.path()))
        .filter_map(|entry| {
            let rel = entry.path().strip_prefix(root).ok()?;
            let rel = rel
                .iter()
                .map(|part| part.to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            debug!(image = %rel, "scan: found");
            Some(Value::String(rel))
        })
        .collect();
    ensure!(!images.is_empty(), "no images found in {}", root.display());

    let name = root
        .file_name()
        .map_or_else(|| root.display().to_string(), |n| n.to_string_lossy().into_owned());
    info!(album = %name, discovered = images.len(), "directory scan complete");

    Ok(AlbumSource::new(name, Vec::<String>::new())
        .with_location(root.to_string_lossy())
        .with_images(Value::Sequence(images)))
}

/// Dot-directories below the root. The root itself is always walked.
fn is_hidden_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry.file_name().to_str().is_some_and(|n| n.starts_with('.'))
}
