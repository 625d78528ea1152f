//! Operator registry and implementations.
//!
//! Every operator is a function from the execution context to a
//! success/failure flag. Arguments are popped from the interpreter stack
//! right-to-left; failures carry the diagnostic reason and unwind the
//! interpreter. The registry maps case-sensitive operator names to their
//! functions and is built once per interpreter.

use std::collections::HashMap;

use crate::error::{ScriptError, VmError};
use crate::sample::{Kernel, MaskMode, SampleSpec, SourceArea, XSide, YSide};
use crate::script::stack::Stack;
use crate::vm::{Vm, validate_area};

/// Sticky sample configuration owned by the script layer.
///
/// The `sample` operator marshals this into a fresh [`SampleSpec`]; the
/// engine itself is stateless between calls.
#[derive(Debug, Default)]
pub struct SampleConfig {
	source: Option<i64>,
	target: Option<i64>,
	matrix: Option<i64>,
	area: Option<SourceArea>,
	raster: Option<i64>,
	x_side: Option<XSide>,
	y_side: Option<YSide>,
	x_boundary: f64,
	y_boundary: f64,
	kernel: Kernel,
}

impl SampleConfig {
	fn spec(&self) -> Result<SampleSpec, ScriptError> {
		let require = |value: Option<i64>, what: &str| {
			value.ok_or_else(|| {
				ScriptError::Vm(VmError::SampleConfig(format!("sample {what} not configured")))
			})
		};
		let mask = if let Some(mask) = self.raster {
			MaskMode::Raster(mask)
		} else if self.x_side.is_some() || self.y_side.is_some() {
			MaskMode::Procedural {
				x: self.x_side.map(|side| (self.x_boundary, side)),
				y: self.y_side.map(|side| (self.y_boundary, side)),
			}
		} else {
			MaskMode::None
		};
		Ok(SampleSpec {
			source: require(self.source, "source")?,
			target: require(self.target, "target")?,
			matrix: require(self.matrix, "matrix")?,
			area: self.area,
			mask,
			kernel: self.kernel,
		})
	}
}

/// Execution context handed to every operator.
pub(crate) struct Exec<'a> {
	pub(crate) vm: &'a mut Vm,
	pub(crate) stack: &'a mut Stack,
	pub(crate) config: &'a mut SampleConfig,
}

/// An operator function.
pub(crate) type OpFn = fn(&mut Exec<'_>) -> Result<(), ScriptError>;

/// Builds the operator registry.
pub(crate) fn registry() -> HashMap<&'static str, OpFn> {
	let mut ops: HashMap<&'static str, OpFn> = HashMap::new();
	ops.insert("print", op_print);
	ops.insert("reset", op_reset);
	ops.insert("load_png", op_load_png);
	ops.insert("load_jpeg", op_load_jpeg);
	ops.insert("load_frame", op_load_frame);
	ops.insert("store_png", op_store_png);
	ops.insert("store_jpeg", op_store_jpeg);
	ops.insert("store_mjpg", op_store_mjpg);
	ops.insert("fill", op_fill);
	ops.insert("color_invert", op_color_invert);
	ops.insert("identity", op_identity);
	ops.insert("multiply", op_multiply);
	ops.insert("translate", op_translate);
	ops.insert("scale", op_scale);
	ops.insert("rotate", op_rotate);
	ops.insert("sample_source", op_sample_source);
	ops.insert("sample_source_area", op_sample_source_area);
	ops.insert("sample_target", op_sample_target);
	ops.insert("sample_matrix", op_sample_matrix);
	ops.insert("sample_mask_raster", op_sample_mask_raster);
	ops.insert("sample_mask_x", op_sample_mask_x);
	ops.insert("sample_mask_y", op_sample_mask_y);
	ops.insert("sample_mask_none", op_sample_mask_none);
	ops.insert("sample_mask_left", op_sample_mask_left);
	ops.insert("sample_mask_right", op_sample_mask_right);
	ops.insert("sample_mask_above", op_sample_mask_above);
	ops.insert("sample_mask_below", op_sample_mask_below);
	ops.insert("sample_nearest", op_sample_nearest);
	ops.insert("sample_bilinear", op_sample_bilinear);
	ops.insert("sample_bicubic", op_sample_bicubic);
	ops.insert("sample", op_sample);
	ops
}

fn op_print(exec: &mut Exec<'_>) -> Result<(), ScriptError> {
	let text = exec.stack.pop_string()?;
	// Standard output is reserved; user text joins the diagnostics stream
	eprintln!("{text}");
	Ok(())
}

fn op_reset(exec: &mut Exec<'_>) -> Result<(), ScriptError> {
	let c = exec.stack.pop_integer()?;
	let h = exec.stack.pop_integer()?;
	let w = exec.stack.pop_integer()?;
	let i = exec.stack.pop_integer()?;
	exec.vm.reset_buffer(i.into(), w.into(), h.into(), c.into())?;
	Ok(())
}

fn op_load_png(exec: &mut Exec<'_>) -> Result<(), ScriptError> {
	let path = exec.stack.pop_string()?;
	let i = exec.stack.pop_integer()?;
	exec.vm.load_png(i.into(), &path)?;
	Ok(())
}

fn op_load_jpeg(exec: &mut Exec<'_>) -> Result<(), ScriptError> {
	let path = exec.stack.pop_string()?;
	let i = exec.stack.pop_integer()?;
	exec.vm.load_jpeg(i.into(), &path)?;
	Ok(())
}

fn op_load_frame(exec: &mut Exec<'_>) -> Result<(), ScriptError> {
	let path = exec.stack.pop_string()?;
	let f = exec.stack.pop_integer()?;
	let i = exec.stack.pop_integer()?;
	exec.vm.load_frame(i.into(), f.into(), &path)?;
	Ok(())
}

fn op_store_png(exec: &mut Exec<'_>) -> Result<(), ScriptError> {
	let path = exec.stack.pop_string()?;
	let i = exec.stack.pop_integer()?;
	exec.vm.store_png(i.into(), &path)?;
	Ok(())
}

fn op_store_jpeg(exec: &mut Exec<'_>) -> Result<(), ScriptError> {
	let q = exec.stack.pop_integer()?;
	let path = exec.stack.pop_string()?;
	let i = exec.stack.pop_integer()?;
	exec.vm.store_jpeg(i.into(), &path, false, q.into())?;
	Ok(())
}

fn op_store_mjpg(exec: &mut Exec<'_>) -> Result<(), ScriptError> {
	let q = exec.stack.pop_integer()?;
	let path = exec.stack.pop_string()?;
	let i = exec.stack.pop_integer()?;
	exec.vm.store_jpeg(i.into(), &path, true, q.into())?;
	Ok(())
}

fn op_fill(exec: &mut Exec<'_>) -> Result<(), ScriptError> {
	let b = exec.stack.pop_integer()?;
	let g = exec.stack.pop_integer()?;
	let r = exec.stack.pop_integer()?;
	let a = exec.stack.pop_integer()?;
	let i = exec.stack.pop_integer()?;
	exec.vm.fill(i.into(), a.into(), r.into(), g.into(), b.into())?;
	Ok(())
}

fn op_color_invert(exec: &mut Exec<'_>) -> Result<(), ScriptError> {
	let i = exec.stack.pop_integer()?;
	exec.vm.color_invert(i.into())?;
	Ok(())
}

fn op_identity(exec: &mut Exec<'_>) -> Result<(), ScriptError> {
	let m = exec.stack.pop_integer()?;
	exec.vm.identity(m.into())?;
	Ok(())
}

fn op_multiply(exec: &mut Exec<'_>) -> Result<(), ScriptError> {
	let b = exec.stack.pop_integer()?;
	let a = exec.stack.pop_integer()?;
	let m = exec.stack.pop_integer()?;
	exec.vm.multiply(m.into(), a.into(), b.into())?;
	Ok(())
}

fn op_translate(exec: &mut Exec<'_>) -> Result<(), ScriptError> {
	let fy = exec.stack.pop_float()?;
	let fx = exec.stack.pop_float()?;
	let m = exec.stack.pop_integer()?;
	exec.vm.translate(m.into(), fx, fy)?;
	Ok(())
}

fn op_scale(exec: &mut Exec<'_>) -> Result<(), ScriptError> {
	let fy = exec.stack.pop_float()?;
	let fx = exec.stack.pop_float()?;
	let m = exec.stack.pop_integer()?;
	exec.vm.scale(m.into(), fx, fy)?;
	Ok(())
}

fn op_rotate(exec: &mut Exec<'_>) -> Result<(), ScriptError> {
	let deg = exec.stack.pop_float()?;
	let m = exec.stack.pop_integer()?;
	exec.vm.rotate(m.into(), deg)?;
	Ok(())
}

fn op_sample_source(exec: &mut Exec<'_>) -> Result<(), ScriptError> {
	let i = exec.stack.pop_integer()?;
	exec.vm.buffers().check(i.into())?;
	exec.config.source = Some(i.into());
	exec.config.area = None;
	Ok(())
}

fn op_sample_source_area(exec: &mut Exec<'_>) -> Result<(), ScriptError> {
	let h = exec.stack.pop_integer()?;
	let w = exec.stack.pop_integer()?;
	let y = exec.stack.pop_integer()?;
	let x = exec.stack.pop_integer()?;
	let i = exec.stack.pop_integer()?;

	let source = exec.vm.buffers().get(i.into())?;
	validate_area(x.into(), y.into(), w.into(), h.into(), source)?;

	exec.config.source = Some(i.into());
	exec.config.area = Some(SourceArea {
		x: x as u32,
		y: y as u32,
		width: w as u32,
		height: h as u32,
		source_width: source.width(),
		source_height: source.height(),
	});
	Ok(())
}

fn op_sample_target(exec: &mut Exec<'_>) -> Result<(), ScriptError> {
	let i = exec.stack.pop_integer()?;
	exec.vm.buffers().check(i.into())?;
	exec.config.target = Some(i.into());
	Ok(())
}

fn op_sample_matrix(exec: &mut Exec<'_>) -> Result<(), ScriptError> {
	let m = exec.stack.pop_integer()?;
	exec.vm.matrices().check(m.into())?;
	exec.config.matrix = Some(m.into());
	Ok(())
}

fn op_sample_mask_raster(exec: &mut Exec<'_>) -> Result<(), ScriptError> {
	let i = exec.stack.pop_integer()?;
	exec.vm.buffers().check(i.into())?;
	exec.config.raster = Some(i.into());
	exec.config.x_side = None;
	exec.config.y_side = None;
	Ok(())
}

fn pop_boundary(exec: &mut Exec<'_>) -> Result<f64, ScriptError> {
	let v = exec.stack.pop_float()?;
	if !(0.0..=1.0).contains(&v) {
		return Err(ScriptError::Vm(VmError::BoundaryOutOfRange(v)));
	}
	Ok(v)
}

fn op_sample_mask_x(exec: &mut Exec<'_>) -> Result<(), ScriptError> {
	exec.config.x_boundary = pop_boundary(exec)?;
	Ok(())
}

fn op_sample_mask_y(exec: &mut Exec<'_>) -> Result<(), ScriptError> {
	exec.config.y_boundary = pop_boundary(exec)?;
	Ok(())
}

fn op_sample_mask_none(exec: &mut Exec<'_>) -> Result<(), ScriptError> {
	exec.config.raster = None;
	exec.config.x_side = None;
	exec.config.y_side = None;
	Ok(())
}

fn set_x_side(exec: &mut Exec<'_>, side: XSide) {
	exec.config.x_side = Some(side);
	exec.config.raster = None;
}

fn set_y_side(exec: &mut Exec<'_>, side: YSide) {
	exec.config.y_side = Some(side);
	exec.config.raster = None;
}

fn op_sample_mask_left(exec: &mut Exec<'_>) -> Result<(), ScriptError> {
	set_x_side(exec, XSide::Left);
	Ok(())
}

fn op_sample_mask_right(exec: &mut Exec<'_>) -> Result<(), ScriptError> {
	set_x_side(exec, XSide::Right);
	Ok(())
}

fn op_sample_mask_above(exec: &mut Exec<'_>) -> Result<(), ScriptError> {
	set_y_side(exec, YSide::Above);
	Ok(())
}

fn op_sample_mask_below(exec: &mut Exec<'_>) -> Result<(), ScriptError> {
	set_y_side(exec, YSide::Below);
	Ok(())
}

fn op_sample_nearest(exec: &mut Exec<'_>) -> Result<(), ScriptError> {
	exec.config.kernel = Kernel::Nearest;
	Ok(())
}

fn op_sample_bilinear(exec: &mut Exec<'_>) -> Result<(), ScriptError> {
	exec.config.kernel = Kernel::Bilinear;
	Ok(())
}

fn op_sample_bicubic(exec: &mut Exec<'_>) -> Result<(), ScriptError> {
	exec.config.kernel = Kernel::Bicubic;
	Ok(())
}

fn op_sample(exec: &mut Exec<'_>) -> Result<(), ScriptError> {
	let spec = exec.config.spec()?;
	exec.vm.sample(&spec)?;
	Ok(())
}
