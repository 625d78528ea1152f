//! Matrix register arena and 2-D affine algebra.
//!
//! A matrix register holds a 2x3 affine transform
//!
//! ```text
//! | a b c |
//! | d e f |
//! | 0 0 1 |   (implied)
//! ```
//!
//! together with a lazily cached inverse. Every mutation clears the cache;
//! a fresh or reset register is the identity with a cached identity
//! inverse. The Y axis points down, so a positive rotation angle turns
//! clockwise on screen.

use crate::error::{Component, VmError};

/// Six coefficients of a 2x3 affine transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
	/// Row 1, column 1
	pub a: f64,
	/// Row 1, column 2
	pub b: f64,
	/// Row 1, column 3 (X translation)
	pub c: f64,
	/// Row 2, column 1
	pub d: f64,
	/// Row 2, column 2
	pub e: f64,
	/// Row 2, column 3 (Y translation)
	pub f: f64,
}

impl Affine {
	/// The identity transform.
	pub const IDENTITY: Self = Self {
		a: 1.0,
		b: 0.0,
		c: 0.0,
		d: 0.0,
		e: 1.0,
		f: 0.0,
	};

	/// Full 3x3 product `self * rhs` with the implied bottom row.
	pub fn multiply(self, rhs: Self) -> Self {
		Self {
			a: self.a * rhs.a + self.b * rhs.d,
			b: self.a * rhs.b + self.b * rhs.e,
			c: self.a * rhs.c + self.b * rhs.f + self.c,
			d: self.d * rhs.a + self.e * rhs.d,
			e: self.d * rhs.b + self.e * rhs.e,
			f: self.d * rhs.c + self.e * rhs.f + self.f,
		}
	}

	/// Maps a point through the transform.
	pub fn map(&self, x: f64, y: f64) -> (f64, f64) {
		(self.a * x + self.b * y + self.c, self.d * x + self.e * y + self.f)
	}

	/// Computes the inverse transform.
	///
	/// # Panics
	///
	/// Panics on a zero determinant. The register operators cannot
	/// construct a singular transform, so a zero determinant here means a
	/// broken caller.
	pub fn inverse(&self) -> Self {
		let det = self.a * self.e - self.b * self.d;
		assert!(det != 0.0, "singular transform has no inverse");
		Self {
			a: self.e / det,
			b: -self.b / det,
			c: (self.b * self.f - self.c * self.e) / det,
			d: -self.d / det,
			e: self.a / det,
			f: (self.c * self.d - self.a * self.f) / det,
		}
	}
}

impl Default for Affine {
	fn default() -> Self {
		Self::IDENTITY
	}
}

impl std::fmt::Display for Affine {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(
			f,
			"[{} {} {}; {} {} {}]",
			self.a, self.b, self.c, self.d, self.e, self.f
		)
	}
}

/// Cached inverse state of a matrix register.
#[derive(Debug, Clone, Copy, PartialEq)]
enum InverseCache {
	Uncached,
	Cached(Affine),
}

/// A matrix register: forward transform plus cached inverse.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixRegister {
	forward: Affine,
	inverse: InverseCache,
}

impl MatrixRegister {
	/// Creates an identity register with a cached identity inverse.
	pub fn new() -> Self {
		Self {
			forward: Affine::IDENTITY,
			inverse: InverseCache::Cached(Affine::IDENTITY),
		}
	}

	/// Returns the forward transform.
	pub fn forward(&self) -> Affine {
		self.forward
	}

	/// Resets the register to the identity.
	pub fn reset(&mut self) {
		*self = Self::new();
	}

	/// Replaces the forward transform, clearing the cache.
	pub fn set(&mut self, forward: Affine) {
		self.forward = forward;
		self.inverse = InverseCache::Uncached;
	}

	/// Pre-multiplies a translation onto the register.
	///
	/// A translation by `(0, 0)` is skipped entirely and does not disturb
	/// the inverse cache.
	pub fn translate(&mut self, tx: f64, ty: f64) {
		if tx == 0.0 && ty == 0.0 {
			return;
		}
		let t = Affine {
			a: 1.0,
			b: 0.0,
			c: tx,
			d: 0.0,
			e: 1.0,
			f: ty,
		};
		self.set(t.multiply(self.forward));
	}

	/// Pre-multiplies a scale onto the register.
	///
	/// Both factors must be finite and non-zero; a scale by `(1, 1)` is
	/// skipped entirely.
	pub fn scale(&mut self, sx: f64, sy: f64) -> Result<(), VmError> {
		if !sx.is_finite() || !sy.is_finite() || sx == 0.0 || sy == 0.0 {
			return Err(VmError::InvalidScale {
				x: sx,
				y: sy,
			});
		}
		if sx == 1.0 && sy == 1.0 {
			return Ok(());
		}
		let s = Affine {
			a: sx,
			b: 0.0,
			c: 0.0,
			d: 0.0,
			e: sy,
			f: 0.0,
		};
		self.set(s.multiply(self.forward));
		Ok(())
	}

	/// Pre-multiplies a rotation in degrees onto the register.
	///
	/// The angle is reduced by remainder toward zero modulo 360 before
	/// conversion to radians; a reduced angle of zero is skipped. Rotation
	/// is clockwise on screen because the Y axis points down.
	pub fn rotate(&mut self, deg: f64) {
		let deg = deg % 360.0;
		if deg == 0.0 {
			return;
		}
		let rad = deg.to_radians();
		let (sin, cos) = rad.sin_cos();
		let r = Affine {
			a: cos,
			b: -sin,
			c: 0.0,
			d: sin,
			e: cos,
			f: 0.0,
		};
		self.set(r.multiply(self.forward));
	}

	/// Returns the inverse transform, computing and caching it on demand.
	pub fn inverse(&mut self) -> Affine {
		match self.inverse {
			InverseCache::Cached(inv) => inv,
			InverseCache::Uncached => {
				let inv = self.forward.inverse();
				self.inverse = InverseCache::Cached(inv);
				inv
			}
		}
	}
}

impl Default for MatrixRegister {
	fn default() -> Self {
		Self::new()
	}
}

/// Fixed-size table of matrix registers, sized once at VM construction.
#[derive(Debug)]
pub struct MatrixArena {
	registers: Vec<MatrixRegister>,
}

impl MatrixArena {
	/// Creates an arena of `count` identity registers.
	pub fn new(count: i64) -> Result<Self, VmError> {
		if count < 0 || count as usize > crate::buffer::MAX_REGISTERS {
			return Err(VmError::ArenaTooLarge {
				component: Component::Matrix,
				count,
				max: crate::buffer::MAX_REGISTERS,
			});
		}
		Ok(Self {
			registers: vec![MatrixRegister::new(); count as usize],
		})
	}

	/// Returns the number of registers in the arena.
	pub fn len(&self) -> usize {
		self.registers.len()
	}

	/// True when the arena holds no registers.
	pub fn is_empty(&self) -> bool {
		self.registers.is_empty()
	}

	/// Checks a script-supplied index and returns it as `usize`.
	pub fn check(&self, index: i64) -> Result<usize, VmError> {
		if index < 0 || index as usize >= self.registers.len() {
			return Err(VmError::register_out_of_range(Component::Matrix, index, self.registers.len()));
		}
		Ok(index as usize)
	}

	/// Returns a register by checked index.
	pub fn get(&self, index: i64) -> Result<&MatrixRegister, VmError> {
		let i = self.check(index)?;
		Ok(&self.registers[i])
	}

	/// Returns a mutable register by checked index.
	pub fn get_mut(&mut self, index: i64) -> Result<&mut MatrixRegister, VmError> {
		let i = self.check(index)?;
		Ok(&mut self.registers[i])
	}

	/// Computes `m = a * b`.
	///
	/// The result register must differ from both operands; writing the
	/// product in place would read half-updated coefficients.
	pub fn multiply(&mut self, m: i64, a: i64, b: i64) -> Result<(), VmError> {
		let mi = self.check(m)?;
		let ai = self.check(a)?;
		let bi = self.check(b)?;
		if mi == ai || mi == bi {
			return Err(VmError::MultiplyAliased(mi));
		}
		let product = self.registers[ai].forward().multiply(self.registers[bi].forward());
		self.registers[mi].set(product);
		Ok(())
	}
}
