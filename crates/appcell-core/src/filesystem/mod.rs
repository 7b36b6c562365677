//! Filesystem support for instance preparation.
//!
//! Provides ownership-aware directory creation, device node inspection,
//! JSON document loading and `OverlayFS` instance roots.

pub mod device;
pub mod dirs;
pub mod document;
pub mod overlayfs;
