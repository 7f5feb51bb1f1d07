pub mod album;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod hooks;
pub mod layout;
pub mod scan;
pub mod slot;
pub mod surface;
pub mod tasks {
    pub mod loader;
    pub mod viewer;
}

pub use error::Error;
