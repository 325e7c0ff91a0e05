// KioskLog - platform/mod.rs
//
// Platform abstraction layer: config location, file helpers, zip access.
// Dependencies: standard library, directories, toml, zip.
// Must NOT depend on: app.

pub mod archive;
pub mod config;
pub mod fs;
