//! # appcell-spec
//!
//! Turns a package manifest, the device's graphics capabilities and an
//! application's identity into an OCI runtime specification.
//!
//! The pipeline is strictly sequential: load the base template, apply the
//! graphics block, apply each package in manifest order, add lifecycle
//! hooks, apply the per-instance overrides, then persist. A
//! [`builder::SpecBuilder`] owns the document for the whole run and only a
//! finished [`document::RuntimeSpec`] ever leaves it.

pub mod builder;
pub mod document;
pub mod error;
pub mod generator;
pub mod graphics;
pub mod hooks;
pub mod instance;
pub mod limits;
pub mod package;
