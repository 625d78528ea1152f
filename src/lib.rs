//! `sparkle-rs` is a batch 2-D raster compositor driven by a small
//! stack-oriented script language.
//!
//! The heavy lifting lives in the [`sparkle_vm`] crate; this crate adds
//! the command-line driver around it and re-exports the VM surface.

pub use sparkle_vm::*;
