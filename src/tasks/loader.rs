use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use tracing::debug;

/// Loads the image behind a URL, resolving once it is ready to display.
pub trait ImageFetcher: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> BoxFuture<'static, Result<()>>;
}

/// Fetches local files by decoding them on the blocking pool. Accepts plain
/// paths and `file://` URLs; `data:` URLs are treated as already loaded.
#[derive(Debug, Clone, Default)]
pub struct DecodeFetcher;

impl ImageFetcher for DecodeFetcher {
    fn fetch(&self, url: &str) -> BoxFuture<'static, Result<()>> {
        if url.starts_with("data:") {
            return Box::pin(async { Ok(()) });
        }
        let path = PathBuf::from(url.strip_prefix("file://").unwrap_or(url));
        Box::pin(async move {
            let (width, height) = tokio::task::spawn_blocking({
                let path = path.clone();
                move || decode_dimensions(&path)
            })
            .await
            .context("decode task panicked")??;
            debug!(path = %path.display(), width, height, "decoded");
            Ok(())
        })
    }
}

fn decode_dimensions(path: &Path) -> Result<(u32, u32)> {
    let img = image::ImageReader::open(path)
        .with_context(|| format!("opening {}", path.display()))?
        .with_guessed_format()? // sniff based on content/extension
        .decode()
        .with_context(|| format!("decoding {}", path.display()))?;
    Ok((img.width(), img.height()))
}
