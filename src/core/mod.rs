// KioskLog - core/mod.rs
//
// Core business logic layer.
// Must NOT depend on: platform or app. Only discovery touches the
// filesystem, and only for directory metadata.

pub mod classifier;
pub mod discovery;
pub mod dump;
pub mod export;
pub mod filter;
pub mod model;
pub mod parser;
pub mod patterns;
