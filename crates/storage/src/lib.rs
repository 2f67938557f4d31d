//! Content storage for the cdnget mirror.
//!
//! Retrieved bytes are written through a [`StorageBackend`] at a path derived
//! from [`PathSegment`]s by [`content_path`], so every upstream service gets
//! its own subtree under the content root and no path can escape it.

pub mod backend;
pub mod error;
mod layout;
mod path;
mod segment;

pub use crate::backend::StorageBackend;
pub use crate::layout::content_path;
pub use crate::path::validate as validate_path;
pub use crate::segment::{PATH_DELIMITER, PathSegment};
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
