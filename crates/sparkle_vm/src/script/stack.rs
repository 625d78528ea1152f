//! The interpreter stack.
//!
//! Operators communicate through a bounded stack of dynamically typed
//! cells. Literals push; operators pop their arguments right-to-left
//! through the typed accessors and may push results. Pushing onto a full
//! stack fails; the depth defaults to 32 cells.

use crate::error::ScriptError;

/// Default stack depth in cells.
pub const DEFAULT_DEPTH: usize = 32;

/// One dynamically typed stack cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
	/// Signed 32-bit integer
	Integer(i32),
	/// Finite double-precision float
	Float(f64),
	/// Owned ASCII string (printable bytes only, at most 255)
	String(String),
}

impl Cell {
	/// Type name used in diagnostics.
	pub fn type_name(&self) -> &'static str {
		match self {
			Self::Integer(_) => "integer",
			Self::Float(_) => "float",
			Self::String(_) => "string",
		}
	}
}

impl std::fmt::Display for Cell {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Integer(v) => write!(f, "{v}"),
			Self::Float(v) => write!(f, "{v}"),
			Self::String(v) => write!(f, "\"{v}\""),
		}
	}
}

/// Bounded stack of [`Cell`] values.
#[derive(Debug)]
pub struct Stack {
	cells: Vec<Cell>,
	depth: usize,
}

impl Stack {
	/// Creates a stack with the default depth.
	pub fn new() -> Self {
		Self::with_depth(DEFAULT_DEPTH)
	}

	/// Creates a stack with an explicit depth.
	pub fn with_depth(depth: usize) -> Self {
		Self {
			cells: Vec::with_capacity(depth),
			depth,
		}
	}

	/// Number of cells currently on the stack.
	pub fn len(&self) -> usize {
		self.cells.len()
	}

	/// True when the stack holds no cells.
	pub fn is_empty(&self) -> bool {
		self.cells.is_empty()
	}

	/// Pushes a cell, failing when the stack is full.
	pub fn push(&mut self, cell: Cell) -> Result<(), ScriptError> {
		if self.cells.len() >= self.depth {
			return Err(ScriptError::StackOverflow(self.depth));
		}
		self.cells.push(cell);
		Ok(())
	}

	/// Pops the top cell regardless of type.
	pub fn pop(&mut self) -> Result<Cell, ScriptError> {
		self.cells.pop().ok_or(ScriptError::StackUnderflow)
	}

	/// Pops an integer.
	pub fn pop_integer(&mut self) -> Result<i32, ScriptError> {
		match self.pop()? {
			Cell::Integer(v) => Ok(v),
			other => Err(self.restore("integer", other)),
		}
	}

	/// Pops a float-compatible cell: a float, or an integer coerced to
	/// float. The reverse coercion is never performed.
	pub fn pop_float(&mut self) -> Result<f64, ScriptError> {
		match self.pop()? {
			Cell::Float(v) => Ok(v),
			Cell::Integer(v) => Ok(f64::from(v)),
			other => Err(self.restore("float", other)),
		}
	}

	/// Pops a string.
	pub fn pop_string(&mut self) -> Result<String, ScriptError> {
		match self.pop()? {
			Cell::String(s) => Ok(s),
			other => Err(self.restore("string", other)),
		}
	}

	/// Puts a mismatched cell back and builds the type diagnostic.
	fn restore(&mut self, expected: &'static str, cell: Cell) -> ScriptError {
		let found = cell.type_name();
		self.cells.push(cell);
		ScriptError::TypeMismatch {
			expected,
			found,
		}
	}
}

impl Default for Stack {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_push_pop_lifo() {
		let mut stack = Stack::new();
		stack.push(Cell::Integer(1)).unwrap();
		stack.push(Cell::Integer(2)).unwrap();
		assert_eq!(stack.pop_integer().unwrap(), 2);
		assert_eq!(stack.pop_integer().unwrap(), 1);
		assert!(matches!(stack.pop_integer(), Err(ScriptError::StackUnderflow)));
	}

	#[test]
	fn test_overflow_fails() {
		let mut stack = Stack::with_depth(2);
		stack.push(Cell::Integer(1)).unwrap();
		stack.push(Cell::Integer(2)).unwrap();
		assert!(matches!(
			stack.push(Cell::Integer(3)),
			Err(ScriptError::StackOverflow(2))
		));
		assert_eq!(stack.len(), 2);
	}

	#[test]
	fn test_integer_promotes_to_float() {
		let mut stack = Stack::new();
		stack.push(Cell::Integer(7)).unwrap();
		assert_eq!(stack.pop_float().unwrap(), 7.0);
	}

	#[test]
	fn test_float_does_not_demote_to_integer() {
		let mut stack = Stack::new();
		stack.push(Cell::Float(7.0)).unwrap();
		let err = stack.pop_integer();
		assert!(matches!(
			err,
			Err(ScriptError::TypeMismatch {
				expected: "integer",
				found: "float"
			})
		));
		// The mismatched cell stays on the stack
		assert_eq!(stack.len(), 1);
	}

	#[test]
	fn test_pop_string() {
		let mut stack = Stack::new();
		stack.push(Cell::String("hello".to_string())).unwrap();
		assert_eq!(stack.pop_string().unwrap(), "hello");
		stack.push(Cell::Integer(1)).unwrap();
		assert!(stack.pop_string().is_err());
	}
}
