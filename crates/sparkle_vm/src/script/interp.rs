//! The script interpreter.
//!
//! Drives a token stream through the operator registry: the header sizes
//! the VM arenas, literals push stack cells, operation tokens dispatch to
//! their functions. The first failure logs a one-line diagnostic with the
//! module name and source line, unwinds, and leaves a non-success result
//! for the driver to turn into the process exit code.

use log::error;

use crate::error::ScriptError;
use crate::script::lexer::{Token, Tokenizer};
use crate::script::ops::{self, Exec, OpFn, SampleConfig};
use crate::script::stack::{Cell, Stack};
use crate::vm::Vm;

/// Script interpreter: the operator registry plus the run loop.
pub struct Interpreter {
	registry: std::collections::HashMap<&'static str, OpFn>,
}

impl Interpreter {
	/// Creates an interpreter with the full operator registry.
	pub fn new() -> Self {
		Self {
			registry: ops::registry(),
		}
	}

	/// Runs a complete script.
	///
	/// `module` names the script in diagnostics. On success the final VM
	/// is returned so callers can inspect the register state; the stack
	/// must be empty at end of input.
	pub fn run(&self, module: &str, text: &str) -> Result<Vm, ScriptError> {
		let mut tokenizer = Tokenizer::new(text);

		let header = match tokenizer.parse_header() {
			Ok(header) => header,
			Err(err) => {
				error!("{module}:{}: {err}", tokenizer.token_line());
				return Err(err);
			}
		};

		let mut vm = match Vm::new(header.bufcount, header.matcount) {
			Ok(vm) => vm,
			Err(err) => {
				let err = ScriptError::from(err);
				error!("{module}:{}: {err}", tokenizer.token_line());
				return Err(err);
			}
		};
		let mut stack = Stack::new();
		let mut config = SampleConfig::default();

		loop {
			let token = match tokenizer.next_token() {
				Ok(Some(token)) => token,
				Ok(None) => break,
				Err(err) => {
					error!("{module}:{}: {err}", tokenizer.token_line());
					return Err(err);
				}
			};
			let line = tokenizer.token_line();

			let result = match token {
				Token::Integer(v) => stack.push(Cell::Integer(v)),
				Token::Float(v) => stack.push(Cell::Float(v)),
				Token::Str(v) => stack.push(Cell::String(v)),
				Token::Op(name) => match self.registry.get(name.as_str()) {
					Some(op) => {
						let mut exec = Exec {
							vm: &mut vm,
							stack: &mut stack,
							config: &mut config,
						};
						op(&mut exec)
					}
					None => Err(ScriptError::UnknownOperator(name)),
				},
			};

			if let Err(err) = result {
				error!("{module}:{line}: {err}");
				return Err(err);
			}
		}

		if !stack.is_empty() {
			let err = ScriptError::StackNotEmpty(stack.len());
			error!("{module}:{}: {err}", tokenizer.token_line());
			return Err(err);
		}

		Ok(vm)
	}
}

impl Default for Interpreter {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn run(script: &str) -> Result<Vm, ScriptError> {
		Interpreter::new().run("test", script)
	}

	#[test]
	fn test_empty_script() {
		let vm = run("%sparkle;").unwrap();
		assert_eq!(vm.buffers().len(), 0);
		assert_eq!(vm.matrices().len(), 0);
	}

	#[test]
	fn test_header_sizes_arenas() {
		let vm = run("%sparkle;\n%bufcount 3;\n%matcount 2;").unwrap();
		assert_eq!(vm.buffers().len(), 3);
		assert_eq!(vm.matrices().len(), 2);
	}

	#[test]
	fn test_reset_and_fill() {
		let vm = run("%sparkle;\n%bufcount 1;\n0 2 1 3 reset\n0 255 7 8 9 fill").unwrap();
		assert_eq!(vm.buffers().get(0).unwrap().pixels(0).unwrap(), &[7, 8, 9, 7, 8, 9]);
	}

	#[test]
	fn test_unknown_operator_fails() {
		assert!(matches!(
			run("%sparkle;\nnonsense"),
			Err(ScriptError::UnknownOperator(_))
		));
	}

	#[test]
	fn test_leftover_stack_fails() {
		assert!(matches!(run("%sparkle;\n1 2 3"), Err(ScriptError::StackNotEmpty(3))));
	}

	#[test]
	fn test_stack_underflow_fails() {
		assert!(matches!(run("%sparkle;\nfill"), Err(ScriptError::StackUnderflow)));
	}

	#[test]
	fn test_out_of_range_register_fails() {
		assert!(run("%sparkle;\n%bufcount 1;\n5 2 2 3 reset").is_err());
	}

	#[test]
	fn test_integer_promotes_in_float_slot() {
		// translate expects floats; integers coerce
		let vm = run("%sparkle;\n%matcount 1;\n0 3 4 translate").unwrap();
		let (x, y) = vm.matrices().get(0).unwrap().forward().map(0.0, 0.0);
		assert_eq!((x, y), (3.0, 4.0));
	}

	#[test]
	fn test_whole_pipeline_copy() {
		let vm = run(concat!(
			"%sparkle;\n",
			"%bufcount 2;\n",
			"%matcount 1;\n",
			"0 4 1 3 reset\n",
			"0 255 10 20 30 fill\n",
			"1 4 1 3 reset\n",
			"0 identity\n",
			"0 sample_source\n",
			"1 sample_target\n",
			"0 sample_matrix\n",
			"sample_mask_none\n",
			"sample_nearest\n",
			"sample\n",
		))
		.unwrap();
		assert_eq!(
			vm.buffers().get(1).unwrap().pixels(1).unwrap(),
			&[10, 20, 30, 10, 20, 30, 10, 20, 30, 10, 20, 30]
		);
	}
}
