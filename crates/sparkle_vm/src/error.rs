//! Error types for the sparkle virtual machine.

use thiserror::Error;

/// VM component that raised an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
	/// Buffer register arena
	Buffer,
	/// Matrix register arena
	Matrix,
	/// Image codec bridge
	Codec,
	/// Sample engine
	Sample,
}

impl std::fmt::Display for Component {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Buffer => write!(f, "buffer"),
			Self::Matrix => write!(f, "matrix"),
			Self::Codec => write!(f, "codec"),
			Self::Sample => write!(f, "sample"),
		}
	}
}

/// Errors reported by fallible VM entry points.
///
/// Every variant renders as a one-line reason; the script driver copies it
/// verbatim into the `module:line:` diagnostic for the failing operator.
#[derive(Debug, Error)]
pub enum VmError {
	/// Register index outside the arena
	#[error("Invalid {component} register index {index} (arena holds {total})")]
	RegisterOutOfRange {
		/// Arena the index was checked against
		component: Component,
		/// Index supplied by the script
		index: i64,
		/// Number of registers in the arena
		total: usize,
	},

	/// Arena size outside [0, 4096]
	#[error("Invalid {component} arena size {count} (maximum {max})")]
	ArenaTooLarge {
		/// Arena being constructed
		component: Component,
		/// Requested register count
		count: i64,
		/// Maximum register count
		max: usize,
	},

	/// Buffer dimensions outside [1, 16384]
	#[error("Invalid buffer dimensions {width}x{height}")]
	InvalidDimensions {
		/// Requested width
		width: i64,
		/// Requested height
		height: i64,
	},

	/// Channel count other than 1, 3 or 4
	#[error("Invalid channel count {0} (must be 1, 3 or 4)")]
	InvalidChannelCount(i64),

	/// Operation requires pixel storage that has not been loaded
	#[error("Buffer register {0} has no pixel data loaded")]
	BufferUnloaded(usize),

	/// Decoded image dimensions do not match the register descriptor
	#[error("Dimension mismatch: register is {expected_width}x{expected_height}, image is {actual_width}x{actual_height}")]
	DimensionMismatch {
		/// Register width
		expected_width: u32,
		/// Register height
		expected_height: u32,
		/// Decoded image width
		actual_width: u32,
		/// Decoded image height
		actual_height: u32,
	},

	/// Result register of a matrix multiply aliases an operand
	#[error("Matrix multiply result register {0} must differ from both operands")]
	MultiplyAliased(usize),

	/// Scale factor that is zero or not finite
	#[error("Invalid scale factor ({x}, {y})")]
	InvalidScale {
		/// Horizontal factor
		x: f64,
		/// Vertical factor
		y: f64,
	},

	/// Frame index outside the MJPEG index table
	#[error("Invalid frame index {index} (index holds {count} frames)")]
	InvalidFrameIndex {
		/// Frame requested by the script
		index: i64,
		/// Frames listed in the index file
		count: usize,
	},

	/// Malformed MJPEG index file or companion path
	#[error("Invalid MJPEG index: {0}")]
	InvalidIndex(String),

	/// Sample call configuration that the engine cannot accept
	#[error("Invalid sample configuration: {0}")]
	SampleConfig(String),

	/// Source sub-area outside the source buffer
	#[error("Source area {x},{y} {width}x{height} does not fit in {source_width}x{source_height}")]
	AreaOutOfBounds {
		/// Area left edge
		x: i64,
		/// Area top edge
		y: i64,
		/// Area width
		width: i64,
		/// Area height
		height: i64,
		/// Source buffer width
		source_width: u32,
		/// Source buffer height
		source_height: u32,
	},

	/// Mask boundary outside [0, 1]
	#[error("Mask boundary {0} out of range [0, 1]")]
	BoundaryOutOfRange(f64),

	/// Image codec failure
	#[error("Codec error: {0}")]
	Image(#[from] image::ImageError),

	/// IO error
	#[error(transparent)]
	Io(#[from] std::io::Error),
}

impl VmError {
	/// Helper for out-of-range register indices.
	pub fn register_out_of_range(component: Component, index: i64, total: usize) -> Self {
		Self::RegisterOutOfRange {
			component,
			index,
			total,
		}
	}
}

/// Errors raised by the script surface: the tokenizer, the interpreter
/// stack and operator dispatch.
#[derive(Debug, Error)]
pub enum ScriptError {
	/// Script does not begin with `%sparkle;`
	#[error("Script must begin with %sparkle;")]
	MissingSignature,

	/// Metacommand repeated or unknown
	#[error("Invalid metacommand %{0};")]
	InvalidMetacommand(String),

	/// Header count outside [0, 4096]
	#[error("Metacommand %{name} {value}; out of range [0, {max}]")]
	HeaderCountOutOfRange {
		/// Metacommand name
		name: &'static str,
		/// Value supplied by the script
		value: i64,
		/// Maximum accepted value
		max: usize,
	},

	/// Malformed token
	#[error("Invalid token: {0}")]
	InvalidToken(String),

	/// String literal longer than 255 bytes, non-ASCII, or unterminated
	#[error("Invalid string literal: {0}")]
	InvalidString(String),

	/// Operator name not present in the registry
	#[error("Unknown operator '{0}'")]
	UnknownOperator(String),

	/// Pop from an empty stack
	#[error("Stack underflow")]
	StackUnderflow,

	/// Push onto a full stack
	#[error("Stack overflow (depth {0})")]
	StackOverflow(usize),

	/// Cell on top of the stack has the wrong type
	#[error("Type mismatch: expected {expected}, found {found}")]
	TypeMismatch {
		/// Type the operator asked for
		expected: &'static str,
		/// Type actually on the stack
		found: &'static str,
	},

	/// Stack not empty when the script ended
	#[error("{0} value(s) left on the stack at end of script")]
	StackNotEmpty(usize),

	/// Failure inside a VM operation
	#[error(transparent)]
	Vm(#[from] VmError),
}
