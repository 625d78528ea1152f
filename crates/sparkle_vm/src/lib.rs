//! Core virtual machine for the `sparkle-rs` batch compositor.
//!
//! The VM exposes two register files, pixel buffers and 2-D affine
//! matrices, behind a set of operators driven by a small stack-oriented
//! script language. Operators load and store PNG, JPEG and MJPEG images,
//! build affine transforms, and project a (sub)area of one buffer into
//! another through a resampling and masking pipeline with
//! premultiplied-alpha OVER compositing.
//!
//! # Layout
//!
//! - [`pixel`]: channel conversion, ARGB packing, premultiplied colour
//! - [`buffer`]: the buffer register arena
//! - [`matrix`]: the matrix register arena and affine algebra
//! - [`codec`]: PNG/JPEG bridge and the MJPEG frame index
//! - [`sample`]: the per-pixel sample engine and its kernels
//! - [`script`]: tokenizer, stack, operator registry, interpreter
//! - [`vm`]: the [`Vm`](vm::Vm) value tying the arenas together
//!
//! # Example
//!
//! ```
//! use sparkle_vm::script::Interpreter;
//!
//! let script = "%sparkle;\n%bufcount 1;\n0 2 2 3 reset\n0 255 0 128 255 fill";
//! let vm = Interpreter::new().run("example", script)?;
//! assert!(vm.buffers().get(0)?.is_loaded());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod buffer;
pub mod codec;
pub mod error;
pub mod matrix;
pub mod pixel;
pub mod sample;
pub mod script;
pub mod vm;

pub use error::{ScriptError, VmError};
pub use sample::{Kernel, MaskMode, SampleSpec, SourceArea, XSide, YSide};
pub use script::Interpreter;
pub use vm::Vm;
