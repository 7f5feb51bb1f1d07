use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, ensure};
use serde::Deserialize;

use crate::layout::{DEFAULT_ID_PREFIX, LayoutRequest};
use crate::slot::OPACITY_MAX;

/// 1x1 transparent GIF shown in freshly built slots.
pub const BLANK_GIF: &str =
    "data:image/gif;base64,R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7";

/// Behavior of a single viewer instance.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ViewerSettings {
    /// Opacity moved between slots on every fade tick (1..=100).
    pub fade_step: u8,
    /// Interval between fade ticks.
    #[serde(with = "humantime_serde")]
    pub fade_time: Duration,
    /// How long an image stays up before the slideshow advances.
    #[serde(with = "humantime_serde")]
    pub slideshow_delay: Duration,
    /// Pick random images instead of walking the album in order.
    pub slideshow_random: bool,
    /// Wrap around at either end of the album instead of stopping.
    pub endless_album: bool,
    /// Fade the outgoing slot as well as the incoming one.
    pub fade_both: bool,
    /// Maintain link targets next to each image.
    pub enable_links: bool,
    /// Placeholder image for freshly built slots.
    pub blank_image: String,
    /// A load still pending after this long reports `loading_started`.
    #[serde(with = "humantime_serde")]
    pub loading_grace: Duration,
    /// Give up on an image load after this long.
    #[serde(with = "humantime_serde")]
    pub load_timeout: Option<Duration>,
    /// Deterministic seed for random selection.
    pub random_seed: Option<u64>,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            fade_step: 2,
            fade_time: Duration::from_millis(12),
            slideshow_delay: Duration::from_millis(5000),
            slideshow_random: false,
            endless_album: true,
            fade_both: true,
            enable_links: true,
            blank_image: BLANK_GIF.to_owned(),
            loading_grace: Duration::from_millis(10),
            load_timeout: None,
            random_seed: None,
        }
    }
}

impl ViewerSettings {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            (1..=OPACITY_MAX).contains(&self.fade_step),
            "fade-step must be between 1 and {OPACITY_MAX}"
        );
        ensure!(!self.fade_time.is_zero(), "fade-time must be greater than zero");
        ensure!(
            !self.slideshow_delay.is_zero(),
            "slideshow-delay must be greater than zero"
        );
        if let Some(timeout) = self.load_timeout {
            ensure!(!timeout.is_zero(), "load-timeout must be greater than zero");
        }
        Ok(())
    }
}

/// Configuration file of the `album-viewer` binary.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// YAML album description to play.
    pub album_path: Option<PathBuf>,
    /// Directory scanned into an album when no album file is given.
    pub photo_library_path: Option<PathBuf>,
    /// Element the viewer is built into.
    pub container: String,
    /// Prefix of generated element ids.
    pub id_prefix: String,
    #[serde(flatten)]
    pub viewer: ViewerSettings,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            album_path: None,
            photo_library_path: None,
            container: "album-viewer".to_owned(),
            id_prefix: DEFAULT_ID_PREFIX.to_owned(),
            viewer: ViewerSettings::default(),
        }
    }
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(!self.container.is_empty(), "container must not be empty");
        ensure!(!self.id_prefix.is_empty(), "id-prefix must not be empty");
        self.viewer.validate()?;
        Ok(self)
    }

    pub fn layout_request(&self) -> LayoutRequest {
        LayoutRequest::Container(self.container.clone())
    }
}
