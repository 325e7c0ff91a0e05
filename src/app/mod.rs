// KioskLog - app/mod.rs
//
// Application layer: scan and dump orchestration, pattern table persistence.
// Dependencies: core, platform.

pub mod dump;
pub mod pattern_mgr;
pub mod scan;
