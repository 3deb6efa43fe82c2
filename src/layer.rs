//! # Layer Trait
//!
//! Tower-style decoration of a callback surface.
//!
//! ```text
//! MountSession ──▶ Layer::layer() ──▶ Wrapped FuseOperations
//! ```
//!
//! Each decorator provides:
//! 1. A wrapper struct that implements [`FuseOperations`]
//! 2. A `Layer` implementation that creates the wrapper
//!
//! Wrappers hold the inner surface by value and forward whatever they do
//! not intercept, so layers stack without any inheritance chain.
//!
//! ## Example
//!
//! ```rust
//! use anyfs_mount::Layer;
//!
//! struct Audited<S> {
//!     inner: S,
//!     tag: &'static str,
//! }
//!
//! struct AuditLayer {
//!     tag: &'static str,
//! }
//!
//! impl<S> Layer<S> for AuditLayer {
//!     type Service = Audited<S>;
//!
//!     fn layer(self, inner: S) -> Self::Service {
//!         Audited { inner, tag: self.tag }
//!     }
//! }
//! ```

use crate::FuseOperations;

/// Wraps a callback surface to change some of its behavior.
///
/// `layer(self, inner)` consumes both the layer configuration and the inner
/// surface. Layers are compile-time composition and are not object-safe.
pub trait Layer<S> {
    /// The wrapped surface.
    type Service;

    /// Wrap `inner`.
    fn layer(self, inner: S) -> Self::Service;
}

/// Fluent `.layer()` on every [`FuseOperations`] implementation.
///
/// ```rust
/// use anyfs_mount::{FuseOperations, Layer, LayerExt};
///
/// fn decorate<S: FuseOperations, L: Layer<S>>(ops: S, layer: L) -> L::Service {
///     ops.layer(layer)
/// }
/// ```
pub trait LayerExt: FuseOperations + Sized {
    /// Apply a layer to this surface.
    fn layer<L: Layer<Self>>(self, layer: L) -> L::Service {
        layer.layer(self)
    }
}

impl<S: FuseOperations> LayerExt for S {}
