//! Server core functionality
//!
//! This module contains the transport server and the wiring that runs it
//! alongside the broadcaster.

pub mod core;

pub use self::core::{Server, pose_source, serve};
