//! Client side of the gallery: fetches named media collections, memoizes
//! them in session storage, and drives the slideshow, grid and lightbox
//! views a host page renders.

pub mod cache;
pub mod config;
pub mod error;
pub mod focus;
pub mod gallery;
pub mod loader;
pub mod pagination;
pub mod rotation;

pub use cache::{Clock, MemorySessionStore, SessionStore, SystemClock};
pub use error::{LoadError, ViewError};
pub use focus::{FocusController, Key, KeyboardHub, PointerTarget};
pub use gallery::{Discipline, GalleryEvent, GallerySession, GallerySnapshot, ViewSnapshot};
pub use loader::{
    Collection, CollectionBackend, CollectionLoader, HttpCollectionBackend, LoadOutcome,
    LoadSource, DEFAULT_CACHE_TTL,
};
pub use pagination::{PageInfo, Paginator};
pub use rotation::{Rotation, RotationTimer, DEFAULT_ROTATION_INTERVAL};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
