//! # appcell-core
//!
//! Low-level Linux primitives the specification generator is built on.
//!
//! This crate provides safe wrappers over:
//! - **Filesystem**: recursive directory creation with ownership, device
//!   node queries, JSON document loading and `OverlayFS` instance roots.
//! - **Identity**: serialized group/user lookups through [`identity::IdentityResolver`].
//! - **Memory sizes**: parsing of `512M`-style limit strings.

pub mod filesystem;
pub mod identity;
pub mod memory;
