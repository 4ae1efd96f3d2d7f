//! Rhai init scripts.
//!
//! Options are exposed under the `lark` namespace as `lark::options::*`.

pub mod api;
mod engine;

pub use engine::ConfigEngine;
