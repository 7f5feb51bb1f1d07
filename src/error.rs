use thiserror::Error;

/// Library error type for album viewer operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The album passed to a load was missing required fields or malformed.
    /// Nothing about the viewer changes when this is returned.
    #[error("invalid album: {0}")]
    InvalidAlbum(String),

    /// The rendering surface could not be resolved at construction.
    #[error("missing element: {0}")]
    MissingElement(String),
}
