//! Caller-supplied resolution and notification hooks.

use crate::album::Album;

/// Strategy a viewer consults for URLs and reports progress to. Every method
/// has a default, so implementors override only what they need.
pub trait ViewerHooks: Send {
    /// URL fetched for the image at `index`.
    fn image_src(&self, album: &Album, index: usize) -> String {
        album.source_url(index).unwrap_or_default()
    }

    fn image_alt(&self, album: &Album, index: usize) -> String {
        album.alt_text(index).unwrap_or_default()
    }

    /// Link target placed around the image. Points at the source file even
    /// when [`ViewerHooks::image_src`] is overridden.
    fn image_link(&self, album: &Album, index: usize) -> String {
        album.source_url(index).unwrap_or_default()
    }

    /// The selected image changed to `index`.
    fn on_switch(&mut self, _index: usize) {}

    /// A load is taking longer than the grace period.
    fn loading_started(&mut self) {}

    /// The pending load finished, right before its fade begins.
    fn loading_complete(&mut self) {}

    /// The image at `index` could not be loaded.
    fn load_failed(&mut self, _index: usize) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl ViewerHooks for DefaultHooks {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::album::AlbumSource;

    struct Resized;

    impl ViewerHooks for Resized {
        fn image_src(&self, album: &Album, index: usize) -> String {
            format!("/resize?w=800&src={}", album.source_url(index).unwrap_or_default())
        }
    }

    #[test]
    fn defaults_join_location() {
        let album =
            Album::from_source(&AlbumSource::new("a", ["x/one.jpg"]).with_location("pics")).unwrap();
        let hooks = DefaultHooks;
        assert_eq!(hooks.image_src(&album, 0), "pics/x/one.jpg");
        assert_eq!(hooks.image_alt(&album, 0), "one.jpg");
        assert_eq!(hooks.image_link(&album, 0), "pics/x/one.jpg");
    }

    #[test]
    fn link_keeps_pointing_at_source_when_src_is_resized() {
        let album =
            Album::from_source(&AlbumSource::new("a", ["one.jpg"]).with_location("pics")).unwrap();
        assert_eq!(Resized.image_src(&album, 0), "/resize?w=800&src=pics/one.jpg");
        assert_eq!(Resized.image_link(&album, 0), "pics/one.jpg");
    }
}
