//! The virtual machine: arenas plus the operator-facing entry points.
//!
//! A [`Vm`] owns one buffer arena and one matrix arena, sized exactly once
//! from the script header. Every operator of the script surface maps onto
//! one method here; methods validate their inputs and return script-visible
//! errors, so that by the time the sample engine runs, its invariants are
//! guaranteed.

use std::path::Path;

use crate::buffer::{BufferArena, BufferRegister};
use crate::codec;
use crate::error::VmError;
use crate::matrix::MatrixArena;
use crate::sample::{MaskMode, MaskView, SampleRun, SampleSpec, SourceView};

/// A sparkle virtual machine instance.
///
/// All state is owned here; the script driver constructs one instance per
/// run and threads it through every operator.
#[derive(Debug)]
pub struct Vm {
	buffers: BufferArena,
	matrices: MatrixArena,
}

impl Vm {
	/// Creates a VM with `bufcount` buffer and `matcount` matrix registers.
	pub fn new(bufcount: i64, matcount: i64) -> Result<Self, VmError> {
		Ok(Self {
			buffers: BufferArena::new(bufcount)?,
			matrices: MatrixArena::new(matcount)?,
		})
	}

	/// Returns the buffer arena.
	pub fn buffers(&self) -> &BufferArena {
		&self.buffers
	}

	/// Returns the matrix arena.
	pub fn matrices(&self) -> &MatrixArena {
		&self.matrices
	}

	/// Resizes a buffer register, discarding its pixel storage.
	pub fn reset_buffer(&mut self, i: i64, width: i64, height: i64, channels: i64) -> Result<(), VmError> {
		self.buffers.get_mut(i)?.reset(width, height, channels)
	}

	/// Fills a buffer register with one ARGB colour.
	pub fn fill(&mut self, i: i64, a: i64, r: i64, g: i64, b: i64) -> Result<(), VmError> {
		self.buffers.get_mut(i)?.fill(a, r, g, b);
		Ok(())
	}

	/// Inverts the colour channels of a loaded buffer register.
	pub fn color_invert(&mut self, i: i64) -> Result<(), VmError> {
		let index = self.buffers.check(i)?;
		self.buffers.get_mut(i)?.invert(index)
	}

	/// Loads a PNG file into a buffer register.
	pub fn load_png(&mut self, i: i64, path: &str) -> Result<(), VmError> {
		codec::load_png(self.buffers.get_mut(i)?, Path::new(path))
	}

	/// Loads a JPEG file into a buffer register.
	pub fn load_jpeg(&mut self, i: i64, path: &str) -> Result<(), VmError> {
		codec::load_jpeg(self.buffers.get_mut(i)?, Path::new(path))
	}

	/// Loads one MJPEG frame into a buffer register through an index file.
	pub fn load_frame(&mut self, i: i64, frame: i64, index_path: &str) -> Result<(), VmError> {
		codec::load_frame(self.buffers.get_mut(i)?, frame, Path::new(index_path))
	}

	/// Stores a buffer register as a PNG file.
	pub fn store_png(&mut self, i: i64, path: &str) -> Result<(), VmError> {
		let index = self.buffers.check(i)?;
		codec::store_png(self.buffers.get(i)?, index, Path::new(path))
	}

	/// Stores a buffer register as a JPEG stream.
	///
	/// Append mode concatenates a complete stream onto the file, which is
	/// how raw MJPEG sequences are produced.
	pub fn store_jpeg(&mut self, i: i64, path: &str, append: bool, quality: i64) -> Result<(), VmError> {
		let index = self.buffers.check(i)?;
		codec::store_jpeg(self.buffers.get(i)?, index, Path::new(path), append, quality)
	}

	/// Resets a matrix register to the identity.
	pub fn identity(&mut self, m: i64) -> Result<(), VmError> {
		self.matrices.get_mut(m)?.reset();
		Ok(())
	}

	/// Computes `m = a * b`; the result register must differ from both
	/// operands.
	pub fn multiply(&mut self, m: i64, a: i64, b: i64) -> Result<(), VmError> {
		self.matrices.multiply(m, a, b)
	}

	/// Pre-multiplies a translation onto a matrix register.
	pub fn translate(&mut self, m: i64, tx: f64, ty: f64) -> Result<(), VmError> {
		self.matrices.get_mut(m)?.translate(tx, ty);
		Ok(())
	}

	/// Pre-multiplies a scale onto a matrix register.
	pub fn scale(&mut self, m: i64, sx: f64, sy: f64) -> Result<(), VmError> {
		self.matrices.get_mut(m)?.scale(sx, sy)
	}

	/// Pre-multiplies a rotation in degrees onto a matrix register.
	pub fn rotate(&mut self, m: i64, deg: f64) -> Result<(), VmError> {
		self.matrices.get_mut(m)?.rotate(deg);
		Ok(())
	}

	/// Runs one sample call.
	///
	/// Validates the whole spec first; an unloaded target with a valid
	/// descriptor is allocated as zeroed storage before compositing.
	pub fn sample(&mut self, spec: &SampleSpec) -> Result<(), VmError> {
		let source_index = self.buffers.check(spec.source)?;
		let target_index = self.buffers.check(spec.target)?;
		if source_index == target_index {
			return Err(VmError::SampleConfig(
				"source and target must be distinct registers".to_string(),
			));
		}
		self.matrices.check(spec.matrix)?;

		let source = self.buffers.get(spec.source)?;
		if !source.is_loaded() {
			return Err(VmError::BufferUnloaded(source_index));
		}

		let area = match spec.area {
			None => (0, 0, source.width(), source.height()),
			Some(area) => {
				if area.source_width != source.width() || area.source_height != source.height() {
					return Err(VmError::SampleConfig(format!(
						"source was {}x{} when the area was captured, now {}x{}",
						area.source_width,
						area.source_height,
						source.width(),
						source.height()
					)));
				}
				validate_area(
					i64::from(area.x),
					i64::from(area.y),
					i64::from(area.width),
					i64::from(area.height),
					source,
				)?;
				(area.x, area.y, area.width, area.height)
			}
		};

		let target = self.buffers.get(spec.target)?;
		let (target_width, target_height, target_channels) =
			(target.width(), target.height(), target.channels());

		let mask_index = match spec.mask {
			MaskMode::Raster(mask) => {
				let mask_index = self.buffers.check(mask)?;
				if mask_index == source_index || mask_index == target_index {
					return Err(VmError::SampleConfig(
						"mask must be distinct from source and target".to_string(),
					));
				}
				let mask_reg = self.buffers.get(mask)?;
				if !mask_reg.is_loaded() {
					return Err(VmError::BufferUnloaded(mask_index));
				}
				if mask_reg.channels() != 1 {
					return Err(VmError::SampleConfig(format!(
						"mask register {mask_index} must be grayscale, has {} channels",
						mask_reg.channels()
					)));
				}
				if mask_reg.width() != target_width || mask_reg.height() != target_height {
					return Err(VmError::SampleConfig(format!(
						"mask is {}x{} but target is {target_width}x{target_height}",
						mask_reg.width(),
						mask_reg.height()
					)));
				}
				Some(mask_index)
			}
			MaskMode::None | MaskMode::Procedural { .. } => None,
		};

		let (x_mask, y_mask) = match spec.mask {
			MaskMode::Procedural { x, y } => (x, y),
			MaskMode::None | MaskMode::Raster(_) => (None, None),
		};

		// Everything is validated; the remaining steps cannot fail.
		let forward = self.matrices.get(spec.matrix)?.forward();
		let inverse = self.matrices.get_mut(spec.matrix)?.inverse();

		let mut target_pixels = self.buffers.get_mut(spec.target)?.take_or_allocate();

		let source = self.buffers.get(spec.source)?;
		let run = SampleRun {
			source: SourceView::new(
				source.width(),
				source.height(),
				source.channels(),
				source.pixels(source_index)?,
			),
			area,
			forward,
			inverse,
			mask: match mask_index {
				Some(index) => {
					let mask_reg = self.buffers.get(index as i64)?;
					Some(MaskView {
						pixels: mask_reg.pixels(index)?,
						width: mask_reg.width() as usize,
					})
				}
				None => None,
			},
			x_mask,
			y_mask,
			kernel: spec.kernel,
		};
		run.run(target_width, target_height, target_channels, &mut target_pixels);

		self.buffers.get_mut(spec.target)?.install(target_pixels);
		Ok(())
	}
}

/// Validates a source sub-area against the current source dimensions.
pub fn validate_area(
	x: i64,
	y: i64,
	width: i64,
	height: i64,
	source: &BufferRegister,
) -> Result<(), VmError> {
	let sw = i64::from(source.width());
	let sh = i64::from(source.height());
	let valid = x >= 0
		&& x < sw
		&& y >= 0
		&& y < sh
		&& width >= 1
		&& height >= 1
		&& x + width <= sw
		&& y + height <= sh;
	if !valid {
		return Err(VmError::AreaOutOfBounds {
			x,
			y,
			width,
			height,
			source_width: source.width(),
			source_height: source.height(),
		});
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::sample::{Kernel, SourceArea};

	fn spec(source: i64, target: i64) -> SampleSpec {
		SampleSpec {
			source,
			target,
			matrix: 0,
			area: None,
			mask: MaskMode::None,
			kernel: Kernel::Nearest,
		}
	}

	#[test]
	fn test_sample_rejects_same_register() {
		let mut vm = Vm::new(2, 1).unwrap();
		vm.reset_buffer(0, 2, 2, 3).unwrap();
		vm.fill(0, 255, 1, 2, 3).unwrap();
		assert!(matches!(vm.sample(&spec(0, 0)), Err(VmError::SampleConfig(_))));
	}

	#[test]
	fn test_sample_requires_loaded_source() {
		let mut vm = Vm::new(2, 1).unwrap();
		vm.reset_buffer(0, 2, 2, 3).unwrap();
		vm.reset_buffer(1, 2, 2, 3).unwrap();
		assert!(matches!(vm.sample(&spec(0, 1)), Err(VmError::BufferUnloaded(0))));
	}

	#[test]
	fn test_sample_allocates_unloaded_target() {
		let mut vm = Vm::new(2, 1).unwrap();
		vm.reset_buffer(0, 4, 1, 3).unwrap();
		vm.fill(0, 255, 10, 20, 30).unwrap();
		vm.reset_buffer(1, 4, 1, 3).unwrap();

		vm.sample(&spec(0, 1)).unwrap();
		assert_eq!(
			vm.buffers().get(1).unwrap().pixels(1).unwrap(),
			&[10, 20, 30, 10, 20, 30, 10, 20, 30, 10, 20, 30]
		);
	}

	#[test]
	fn test_sample_converts_channels() {
		// Grey source into an ARGB target
		let mut vm = Vm::new(2, 1).unwrap();
		vm.reset_buffer(0, 1, 1, 1).unwrap();
		vm.fill(0, 255, 200, 200, 200).unwrap();
		vm.reset_buffer(1, 1, 1, 4).unwrap();

		vm.sample(&spec(0, 1)).unwrap();
		let px = vm.buffers().get(1).unwrap().pixels(1).unwrap();
		assert_eq!(px[0], 255);
		assert_eq!(px[1], px[2]);
		assert_eq!(px[2], px[3]);
	}

	#[test]
	fn test_sample_rejects_stale_area() {
		let mut vm = Vm::new(2, 1).unwrap();
		vm.reset_buffer(0, 4, 4, 3).unwrap();
		vm.fill(0, 255, 9, 9, 9).unwrap();
		vm.reset_buffer(1, 4, 4, 3).unwrap();

		let mut s = spec(0, 1);
		s.area = Some(SourceArea {
			x: 0,
			y: 0,
			width: 2,
			height: 2,
			source_width: 8,
			source_height: 8,
		});
		assert!(matches!(vm.sample(&s), Err(VmError::SampleConfig(_))));
	}

	#[test]
	fn test_sample_rejects_bad_mask() {
		let mut vm = Vm::new(3, 1).unwrap();
		vm.reset_buffer(0, 2, 2, 3).unwrap();
		vm.fill(0, 255, 9, 9, 9).unwrap();
		vm.reset_buffer(1, 2, 2, 3).unwrap();
		vm.fill(1, 255, 0, 0, 0).unwrap();

		// RGB mask is rejected
		vm.reset_buffer(2, 2, 2, 3).unwrap();
		vm.fill(2, 255, 128, 128, 128).unwrap();
		let mut s = spec(0, 1);
		s.mask = MaskMode::Raster(2);
		assert!(matches!(vm.sample(&s), Err(VmError::SampleConfig(_))));

		// Wrong-sized grayscale mask is rejected
		vm.reset_buffer(2, 4, 4, 1).unwrap();
		vm.fill(2, 255, 128, 128, 128).unwrap();
		assert!(matches!(vm.sample(&s), Err(VmError::SampleConfig(_))));

		// Mask aliasing the target is rejected
		s.mask = MaskMode::Raster(1);
		assert!(matches!(vm.sample(&s), Err(VmError::SampleConfig(_))));
	}

	#[test]
	fn test_validate_area_bounds() {
		let mut reg = BufferRegister::new();
		reg.reset(8, 4, 3).unwrap();
		assert!(validate_area(0, 0, 8, 4, &reg).is_ok());
		assert!(validate_area(7, 3, 1, 1, &reg).is_ok());
		assert!(validate_area(0, 0, 9, 4, &reg).is_err());
		assert!(validate_area(8, 0, 1, 1, &reg).is_err());
		assert!(validate_area(-1, 0, 2, 2, &reg).is_err());
		assert!(validate_area(0, 0, 0, 1, &reg).is_err());
	}
}
