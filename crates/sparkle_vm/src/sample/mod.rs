//! The sample engine.
//!
//! One sample call projects a (sub)area of a source buffer into a target
//! buffer through an affine transform. The engine inverse-maps every
//! integer target pixel inside a projected bounding box back into source
//! space, evaluates a resampling kernel there, applies the configured
//! masking, and composes the result OVER the existing target pixel in
//! premultiplied ARGB, converting channel layouts on both sides.
//!
//! The engine is stateless between calls: the script layer keeps the
//! sticky configuration and marshals it into a fresh [`SampleSpec`] per
//! invocation. Validation of that spec happens at the VM boundary; by the
//! time [`SampleRun`] executes, its invariants hold and violations are
//! programming errors. Numeric degeneracy mid-loop (a non-finite
//! projection or composite) indicates a broken transform and aborts.

mod kernel;

pub use kernel::Kernel;
pub(crate) use kernel::SourceView;

use crate::matrix::Affine;
use crate::pixel::Premul;

/// Horizontal half-plane selector for procedural masking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XSide {
	/// Keep pixels at or right of the pivot column
	Left,
	/// Keep pixels at or left of the pivot column
	Right,
}

/// Vertical half-plane selector for procedural masking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YSide {
	/// Keep pixels at or below the pivot row
	Above,
	/// Keep pixels at or above the pivot row
	Below,
}

/// Source sub-area captured by the script layer.
///
/// The source dimensions at capture time are recorded so a later sample
/// call can reject the area if the source register was reset in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceArea {
	/// Left edge in source pixels
	pub x: u32,
	/// Top edge in source pixels
	pub y: u32,
	/// Area width in pixels (at least 1)
	pub width: u32,
	/// Area height in pixels (at least 1)
	pub height: u32,
	/// Source width when the area was captured
	pub source_width: u32,
	/// Source height when the area was captured
	pub source_height: u32,
}

/// Masking selection for one sample call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaskMode {
	/// No masking
	None,
	/// Raster mask: a grayscale buffer register, target-sized, whose
	/// bytes scale the sampled colour
	Raster(i64),
	/// Procedural half-plane masks, one per axis, each with a
	/// normalised boundary in `[0, 1]`
	Procedural {
		/// Horizontal constraint
		x: Option<(f64, XSide)>,
		/// Vertical constraint
		y: Option<(f64, YSide)>,
	},
}

/// One sample invocation as marshalled by the script layer.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSpec {
	/// Source buffer register
	pub source: i64,
	/// Target buffer register, distinct from the source
	pub target: i64,
	/// Matrix register holding the forward source-to-target transform
	pub matrix: i64,
	/// Optional source sub-area; whole source when absent
	pub area: Option<SourceArea>,
	/// Masking selection
	pub mask: MaskMode,
	/// Resampling kernel
	pub kernel: Kernel,
}

/// Raster mask view: target-sized grayscale bytes.
pub(crate) struct MaskView<'a> {
	pub(crate) pixels: &'a [u8],
	pub(crate) width: usize,
}

/// A fully validated sample call, ready to execute.
pub(crate) struct SampleRun<'a> {
	pub(crate) source: SourceView<'a>,
	/// Validated source rectangle `(x, y, width, height)`
	pub(crate) area: (u32, u32, u32, u32),
	pub(crate) forward: Affine,
	pub(crate) inverse: Affine,
	pub(crate) mask: Option<MaskView<'a>>,
	pub(crate) x_mask: Option<(f64, XSide)>,
	pub(crate) y_mask: Option<(f64, YSide)>,
	pub(crate) kernel: Kernel,
}

impl SampleRun<'_> {
	/// Runs the per-pixel loop over the target.
	///
	/// Returns without touching the target when the projected bounding
	/// box or the procedural mask intersection is empty.
	pub(crate) fn run(&self, width: u32, height: u32, channels: u8, target: &mut [u8]) {
		let (ax, ay, aw, ah) = self.area;
		let (ax, ay) = (f64::from(ax), f64::from(ay));
		let (aw, ah) = (f64::from(aw), f64::from(ah));

		let Some((mut x0, mut y0, mut x1, mut y1)) =
			self.bounding_box(ax, ay, aw, ah, width, height)
		else {
			return;
		};

		if let Some((boundary, side)) = self.x_mask {
			let pivot = pivot(boundary, width);
			match side {
				XSide::Left => x0 = x0.max(pivot),
				XSide::Right => x1 = x1.min(pivot),
			}
		}
		if let Some((boundary, side)) = self.y_mask {
			let pivot = pivot(boundary, height);
			match side {
				YSide::Above => y0 = y0.max(pivot),
				YSide::Below => y1 = y1.min(pivot),
			}
		}
		if x0 > x1 || y0 > y1 {
			return;
		}

		let channels = channels as usize;
		let stride = width as usize * channels;

		for y in y0..=y1 {
			let row = y as usize * stride;
			for x in x0..=x1 {
				let mask = match &self.mask {
					Some(view) => {
						let m = view.pixels[y as usize * view.width + x as usize];
						if m == 0 {
							continue;
						}
						m
					}
					None => 255,
				};

				let (sx, sy) = self.inverse.map(f64::from(x), f64::from(y));
				assert!(
					sx.is_finite() && sy.is_finite(),
					"non-finite inverse projection at ({x}, {y})"
				);
				if sx < ax || sx > ax + aw || sy < ay || sy > ay + ah {
					continue;
				}

				let mut sampled = self.source.sample(self.kernel, sx, sy);
				if mask != 255 {
					sampled = sampled.scale(f64::from(mask) / 255.0);
				}

				let offset = row + x as usize * channels;
				let px = &mut target[offset..offset + channels];
				let below = Premul::from_native(px, channels as u8);
				let composed = sampled.over(below);
				assert!(composed.is_finite(), "non-finite composite at ({x}, {y})");
				composed.write_native(px, channels as u8);
			}
		}
	}

	/// Projects the source rectangle's corners and derives the clamped
	/// integer bounding box, or `None` when it misses the target.
	fn bounding_box(
		&self,
		ax: f64,
		ay: f64,
		aw: f64,
		ah: f64,
		width: u32,
		height: u32,
	) -> Option<(u32, u32, u32, u32)> {
		let corners = [
			self.forward.map(ax, ay),
			self.forward.map(ax + aw, ay),
			self.forward.map(ax, ay + ah),
			self.forward.map(ax + aw, ay + ah),
		];

		let mut min_x = f64::INFINITY;
		let mut min_y = f64::INFINITY;
		let mut max_x = f64::NEG_INFINITY;
		let mut max_y = f64::NEG_INFINITY;
		for (cx, cy) in corners {
			assert!(cx.is_finite() && cy.is_finite(), "non-finite corner projection");
			min_x = min_x.min(cx);
			min_y = min_y.min(cy);
			max_x = max_x.max(cx);
			max_y = max_y.max(cy);
		}

		let min_x = min_x.floor();
		let min_y = min_y.floor();
		let max_x = max_x.ceil();
		let max_y = max_y.ceil();

		if max_x < 0.0 || max_y < 0.0 || min_x >= f64::from(width) || min_y >= f64::from(height) {
			return None;
		}

		let x0 = min_x.max(0.0) as u32;
		let y0 = min_y.max(0.0) as u32;
		let x1 = (max_x.min(f64::from(width - 1))) as u32;
		let y1 = (max_y.min(f64::from(height - 1))) as u32;
		Some((x0, y0, x1, y1))
	}
}

/// Integer pivot of a normalised boundary on an axis of `extent` pixels.
///
/// Exactly 0 maps to the first pixel and exactly 1 to the last; anything
/// between truncates `boundary * (extent - 1)`.
fn pivot(boundary: f64, extent: u32) -> u32 {
	if boundary <= 0.0 {
		0
	} else if boundary >= 1.0 {
		extent - 1
	} else {
		(boundary * f64::from(extent - 1)).floor() as u32
	}
}
