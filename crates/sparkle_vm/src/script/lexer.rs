//! Script tokenizer.
//!
//! A script opens with a metacommand header and continues with a stream
//! of literals and operation tokens:
//!
//! ```text
//! %sparkle;
//! %bufcount 2;
//! %matcount 1;
//!
//! 0 4 1 3 reset
//! 0 255 10 20 30 fill
//! ```
//!
//! `%sparkle;` is required, exactly once, first. `%bufcount N;` and
//! `%matcount N;` are each optional, once, with `N` in `[0, 4096]`.
//!
//! Three literal forms exist: decimal integers with an optional sign,
//! floats containing a decimal point and/or an exponent (parsed to a
//! finite double), and double-quoted ASCII strings of at most 255 bytes
//! with `\\` and `\"` escapes. Everything else is an operation token: an
//! alphabetic first character followed by alphanumerics or underscores,
//! at most 255 bytes, case-sensitive.

use crate::buffer::MAX_REGISTERS;
use crate::error::ScriptError;

/// Arena sizes declared by the script header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Header {
	/// Buffer register count from `%bufcount N;`
	pub bufcount: i64,
	/// Matrix register count from `%matcount N;`
	pub matcount: i64,
}

/// One body token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
	/// Integer literal
	Integer(i32),
	/// Float literal (always finite)
	Float(f64),
	/// String literal
	Str(String),
	/// Operation name
	Op(String),
}

/// Streaming tokenizer with line tracking for diagnostics.
#[derive(Debug)]
pub struct Tokenizer<'a> {
	bytes: &'a [u8],
	pos: usize,
	line: u32,
	token_line: u32,
}

impl<'a> Tokenizer<'a> {
	/// Creates a tokenizer over the whole script text.
	pub fn new(text: &'a str) -> Self {
		Self {
			bytes: text.as_bytes(),
			pos: 0,
			line: 1,
			token_line: 1,
		}
	}

	/// Line number of the most recently produced token.
	pub fn token_line(&self) -> u32 {
		self.token_line
	}

	/// Parses the metacommand header.
	///
	/// Must be called once, before the first [`Self::next_token`] call.
	pub fn parse_header(&mut self) -> Result<Header, ScriptError> {
		let mut header = Header::default();

		self.skip_whitespace();
		self.token_line = self.line;
		if !self.eat(b'%') {
			return Err(ScriptError::MissingSignature);
		}
		let name = self.read_word();
		if name != "sparkle" || !self.eat(b';') {
			return Err(ScriptError::MissingSignature);
		}

		let mut seen_bufcount = false;
		let mut seen_matcount = false;
		loop {
			self.skip_whitespace();
			self.token_line = self.line;
			if !self.eat(b'%') {
				break;
			}
			let name = self.read_word();
			let seen = match name.as_str() {
				"bufcount" => &mut seen_bufcount,
				"matcount" => &mut seen_matcount,
				_ => return Err(ScriptError::InvalidMetacommand(name)),
			};
			if *seen {
				return Err(ScriptError::InvalidMetacommand(name));
			}
			*seen = true;

			self.skip_whitespace();
			let value = self.read_word();
			let count: i64 = value
				.parse()
				.map_err(|_| ScriptError::InvalidToken(value.clone()))?;
			if !self.eat(b';') {
				return Err(ScriptError::InvalidMetacommand(name));
			}
			if count < 0 || count > MAX_REGISTERS as i64 {
				return Err(ScriptError::HeaderCountOutOfRange {
					name: if name == "bufcount" { "bufcount" } else { "matcount" },
					value: count,
					max: MAX_REGISTERS,
				});
			}
			if name == "bufcount" {
				header.bufcount = count;
			} else {
				header.matcount = count;
			}
		}

		Ok(header)
	}

	/// Produces the next body token, or `None` at end of input.
	pub fn next_token(&mut self) -> Result<Option<Token>, ScriptError> {
		self.skip_whitespace();
		self.token_line = self.line;

		let Some(&first) = self.bytes.get(self.pos) else {
			return Ok(None);
		};

		if first == b'"' {
			return Ok(Some(Token::Str(self.read_string()?)));
		}

		let word = self.read_word();
		if word.is_empty() {
			return Err(ScriptError::InvalidToken(format!("{}", first as char)));
		}

		let first = word.as_bytes()[0];
		if first.is_ascii_digit() || first == b'+' || first == b'-' || first == b'.' {
			return Ok(Some(parse_number(&word)?));
		}

		if word.len() > 255
			|| !first.is_ascii_alphabetic()
			|| !word.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
		{
			return Err(ScriptError::InvalidToken(word));
		}
		Ok(Some(Token::Op(word)))
	}

	fn skip_whitespace(&mut self) {
		while let Some(&b) = self.bytes.get(self.pos) {
			if !b.is_ascii_whitespace() {
				break;
			}
			if b == b'\n' {
				self.line += 1;
			}
			self.pos += 1;
		}
	}

	/// Consumes one expected byte.
	fn eat(&mut self, expected: u8) -> bool {
		if self.bytes.get(self.pos) == Some(&expected) {
			self.pos += 1;
			true
		} else {
			false
		}
	}

	/// Reads a run of bytes up to whitespace, `;` or `"`.
	fn read_word(&mut self) -> String {
		let start = self.pos;
		while let Some(&b) = self.bytes.get(self.pos) {
			if b.is_ascii_whitespace() || b == b';' || b == b'"' {
				break;
			}
			self.pos += 1;
		}
		String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned()
	}

	/// Reads a double-quoted string literal.
	fn read_string(&mut self) -> Result<String, ScriptError> {
		self.pos += 1; // opening quote
		let mut out = String::new();
		loop {
			let Some(&b) = self.bytes.get(self.pos) else {
				return Err(ScriptError::InvalidString("unterminated literal".to_string()));
			};
			self.pos += 1;
			match b {
				b'"' => break,
				b'\\' => {
					let escaped = self.bytes.get(self.pos).copied();
					self.pos += 1;
					match escaped {
						Some(b'\\') => out.push('\\'),
						Some(b'"') => out.push('"'),
						_ => {
							return Err(ScriptError::InvalidString(
								"only \\\\ and \\\" escapes are allowed".to_string(),
							));
						}
					}
				}
				0x20..=0x7E => out.push(b as char),
				_ => {
					return Err(ScriptError::InvalidString(format!(
						"non-printable byte 0x{b:02X}"
					)));
				}
			}
			if out.len() > 255 {
				return Err(ScriptError::InvalidString("longer than 255 bytes".to_string()));
			}
		}
		Ok(out)
	}
}

/// Classifies and parses a numeric word.
///
/// A word containing a decimal point or an exponent marker is a float;
/// everything else is a decimal integer.
fn parse_number(word: &str) -> Result<Token, ScriptError> {
	let is_float = word.bytes().any(|b| matches!(b, b'.' | b'e' | b'E'));
	if is_float {
		let value: f64 = word
			.parse()
			.map_err(|_| ScriptError::InvalidToken(word.to_string()))?;
		if !value.is_finite() {
			return Err(ScriptError::InvalidToken(word.to_string()));
		}
		Ok(Token::Float(value))
	} else {
		let value: i32 = word
			.parse()
			.map_err(|_| ScriptError::InvalidToken(word.to_string()))?;
		Ok(Token::Integer(value))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn tokens(body: &str) -> Vec<Token> {
		let text = format!("%sparkle;\n{body}");
		let mut tok = Tokenizer::new(&text);
		tok.parse_header().unwrap();
		let mut out = Vec::new();
		while let Some(token) = tok.next_token().unwrap() {
			out.push(token);
		}
		out
	}

	#[test]
	fn test_header_defaults() {
		let mut tok = Tokenizer::new("%sparkle;");
		let header = tok.parse_header().unwrap();
		assert_eq!(header.bufcount, 0);
		assert_eq!(header.matcount, 0);
		assert_eq!(tok.next_token().unwrap(), None);
	}

	#[test]
	fn test_header_counts() {
		let mut tok = Tokenizer::new("%sparkle;\n%bufcount 2;\n%matcount 1;\n");
		let header = tok.parse_header().unwrap();
		assert_eq!(header.bufcount, 2);
		assert_eq!(header.matcount, 1);
	}

	#[test]
	fn test_header_requires_signature_first() {
		assert!(matches!(
			Tokenizer::new("%bufcount 2;").parse_header(),
			Err(ScriptError::MissingSignature)
		));
		assert!(matches!(
			Tokenizer::new("print").parse_header(),
			Err(ScriptError::MissingSignature)
		));
	}

	#[test]
	fn test_header_rejects_duplicates_and_range() {
		assert!(
			Tokenizer::new("%sparkle;\n%bufcount 1;\n%bufcount 2;")
				.parse_header()
				.is_err()
		);
		assert!(
			matches!(
				Tokenizer::new("%sparkle;\n%bufcount 4097;").parse_header(),
				Err(ScriptError::HeaderCountOutOfRange { value: 4097, .. })
			)
		);
		assert!(Tokenizer::new("%sparkle;\n%bufcount -1;").parse_header().is_err());
		assert!(Tokenizer::new("%sparkle;\n%frames 1;").parse_header().is_err());
	}

	#[test]
	fn test_integer_literals() {
		assert_eq!(
			tokens("0 -12 +34"),
			vec![Token::Integer(0), Token::Integer(-12), Token::Integer(34)]
		);
	}

	#[test]
	fn test_float_literals() {
		assert_eq!(
			tokens("0.5 -1.25 2e3"),
			vec![Token::Float(0.5), Token::Float(-1.25), Token::Float(2000.0)]
		);
	}

	#[test]
	fn test_integer_overflow_rejected() {
		let text = "%sparkle;\n99999999999";
		let mut tok = Tokenizer::new(text);
		tok.parse_header().unwrap();
		assert!(tok.next_token().is_err());
	}

	#[test]
	fn test_string_literals() {
		assert_eq!(
			tokens("\"hello\" \"a\\\"b\" \"c\\\\d\""),
			vec![
				Token::Str("hello".to_string()),
				Token::Str("a\"b".to_string()),
				Token::Str("c\\d".to_string()),
			]
		);
	}

	#[test]
	fn test_string_rejects_unterminated_and_long() {
		let mut tok = Tokenizer::new("%sparkle;\n\"open");
		tok.parse_header().unwrap();
		assert!(tok.next_token().is_err());

		let long = format!("\"{}\"", "x".repeat(256));
		let text = format!("%sparkle;\n{long}");
		let mut tok = Tokenizer::new(&text);
		tok.parse_header().unwrap();
		assert!(tok.next_token().is_err());
	}

	#[test]
	fn test_operator_tokens() {
		assert_eq!(
			tokens("sample_source_2x fill"),
			vec![
				Token::Op("sample_source_2x".to_string()),
				Token::Op("fill".to_string())
			]
		);
	}

	#[test]
	fn test_invalid_operator_rejected() {
		let mut tok = Tokenizer::new("%sparkle;\nbad-name");
		tok.parse_header().unwrap();
		assert!(tok.next_token().is_err());
	}

	#[test]
	fn test_line_tracking() {
		let mut tok = Tokenizer::new("%sparkle;\n\n1\n\n\nprint");
		tok.parse_header().unwrap();
		tok.next_token().unwrap();
		assert_eq!(tok.token_line(), 3);
		tok.next_token().unwrap();
		assert_eq!(tok.token_line(), 6);
	}
}
