//! Errors raised by specification generation.
//!
//! Each variant names the fatal stage that failed; degraded conditions are
//! logged and never surface here.

use appcell_common::error::AppcellError;
use thiserror::Error;

/// A fatal failure of instance preparation or spec generation.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The base specification template is missing or unparsable.
    #[error("base template unavailable: {0}")]
    BaseTemplate(#[source] AppcellError),

    /// The graphics capability descriptor is missing or unparsable.
    #[error("graphics descriptor unavailable: {0}")]
    GraphicsDescriptor(#[source] AppcellError),

    /// The package manifest is missing or malformed.
    #[error("package manifest rejected: {0}")]
    Manifest(#[source] AppcellError),

    /// A package's contributions could not be merged into the document.
    #[error("package contributions could not be merged: {0}")]
    Package(#[source] AppcellError),

    /// Lifecycle hooks could not be written into the document.
    #[error("lifecycle hooks could not be generated: {0}")]
    Hooks(#[source] AppcellError),

    /// The identity, mount and environment overrides could not be applied.
    #[error("runtime overrides could not be applied: {0}")]
    Overrides(#[source] AppcellError),

    /// The finished document could not be written.
    #[error("failed to persist specification: {0}")]
    Persist(#[source] AppcellError),

    /// The instance root filesystem could not be mounted or unmounted.
    #[error("overlay root unavailable: {0}")]
    Overlay(#[source] AppcellError),
}
