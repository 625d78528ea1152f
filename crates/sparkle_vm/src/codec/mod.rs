//! Image codec bridge.
//!
//! PNG and JPEG decoding and encoding are delegated to the `image` crate;
//! this module owns only the policy around it: decoded dimensions must
//! match the register descriptor exactly, channel layouts are normalized
//! to the VM's 1/3/4-channel model and converted against the descriptor,
//! and a failed load always leaves the register unloaded.
//!
//! JPEG has no alpha channel: 4-channel buffers are flattened against
//! opaque white before encoding. Append-mode JPEG stores concatenate a
//! complete JPEG stream onto the file, which is how raw MJPEG sequences
//! are produced; the matching index format lives in [`mjpeg`].

pub mod mjpeg;

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Seek, SeekFrom};
use std::path::Path;

use image::codecs::jpeg::{JpegDecoder, JpegEncoder};
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder};

use crate::buffer::BufferRegister;
use crate::error::VmError;
use crate::pixel;

/// Decoded image normalized to the VM pixel model.
struct Decoded {
	width: u32,
	height: u32,
	channels: u8,
	/// Native VM layout: grey, R,G,B or A,R,G,B
	pixels: Vec<u8>,
}

/// Loads a PNG file into a register.
///
/// The decoded dimensions must match the descriptor; the channel layout
/// is converted if it differs. On failure the register is left unloaded.
pub fn load_png(reg: &mut BufferRegister, path: &Path) -> Result<(), VmError> {
	load_file(reg, path)
}

/// Loads a JPEG file into a register.
///
/// Same contract as [`load_png`].
pub fn load_jpeg(reg: &mut BufferRegister, path: &Path) -> Result<(), VmError> {
	load_file(reg, path)
}

/// Loads one MJPEG frame into a register.
///
/// `index_path` names the frame-offset index; the companion stream path
/// is derived from it (see [`mjpeg::companion_path`]). The frame's JPEG
/// stream is decoded starting at its listed offset.
pub fn load_frame(reg: &mut BufferRegister, frame: i64, index_path: &Path) -> Result<(), VmError> {
	let result = decode_frame(frame, index_path).and_then(|img| install(reg, img));
	if result.is_err() {
		reg.unload();
	}
	result
}

/// Stores a register as a PNG file, replacing any existing file.
///
/// The colour type matches the register's channel count.
pub fn store_png(reg: &BufferRegister, index: usize, path: &Path) -> Result<(), VmError> {
	let pixels = reg.pixels(index)?;
	let writer = BufWriter::new(File::create(path)?);
	let encoder = PngEncoder::new(writer);
	match reg.channels() {
		1 => encoder.write_image(pixels, reg.width(), reg.height(), ExtendedColorType::L8)?,
		3 => encoder.write_image(pixels, reg.width(), reg.height(), ExtendedColorType::Rgb8)?,
		4 => {
			let rgba = argb_to_rgba(pixels);
			encoder.write_image(&rgba, reg.width(), reg.height(), ExtendedColorType::Rgba8)?;
		}
		_ => unreachable!("channel counts are validated to 1, 3 or 4"),
	}
	Ok(())
}

/// Stores a register as a JPEG stream.
///
/// `quality` is clamped to `[0, 100]`. In append mode a complete JPEG
/// stream is concatenated onto the file at `path`; otherwise the file is
/// replaced. 4-channel registers are flattened to RGB first.
pub fn store_jpeg(
	reg: &BufferRegister,
	index: usize,
	path: &Path,
	append: bool,
	quality: i64,
) -> Result<(), VmError> {
	let pixels = reg.pixels(index)?;
	let quality = quality.clamp(0, 100) as u8;

	let file = if append {
		OpenOptions::new().create(true).append(true).open(path)?
	} else {
		File::create(path)?
	};
	let mut writer = BufWriter::new(file);
	let encoder = JpegEncoder::new_with_quality(&mut writer, quality);

	match reg.channels() {
		1 => encoder.write_image(pixels, reg.width(), reg.height(), ExtendedColorType::L8)?,
		3 => encoder.write_image(pixels, reg.width(), reg.height(), ExtendedColorType::Rgb8)?,
		4 => {
			let rgb = pixel::convert_pixels(pixels, 4, 3);
			encoder.write_image(&rgb, reg.width(), reg.height(), ExtendedColorType::Rgb8)?;
		}
		_ => unreachable!("channel counts are validated to 1, 3 or 4"),
	}
	Ok(())
}

fn load_file(reg: &mut BufferRegister, path: &Path) -> Result<(), VmError> {
	let result = image::open(path).map_err(VmError::from).and_then(|img| install(reg, img));
	if result.is_err() {
		reg.unload();
	}
	result
}

fn decode_frame(frame: i64, index_path: &Path) -> Result<DynamicImage, VmError> {
	let index = mjpeg::FrameIndex::open(index_path)?;
	let offset = index.offset(frame)?;
	let stream_path = mjpeg::companion_path(index_path)?;

	let mut file = File::open(stream_path)?;
	file.seek(SeekFrom::Start(offset))?;
	let decoder = JpegDecoder::new(BufReader::new(file))?;
	Ok(DynamicImage::from_decoder(decoder)?)
}

fn install(reg: &mut BufferRegister, img: DynamicImage) -> Result<(), VmError> {
	let decoded = normalize(img);
	if decoded.width != reg.width() || decoded.height != reg.height() {
		return Err(VmError::DimensionMismatch {
			expected_width: reg.width(),
			expected_height: reg.height(),
			actual_width: decoded.width,
			actual_height: decoded.height,
		});
	}
	let pixels = pixel::convert_pixels(&decoded.pixels, decoded.channels, reg.channels());
	reg.install(pixels);
	Ok(())
}

/// Normalizes a decoded image to the VM's 1/3/4-channel model.
///
/// Grey-alpha promotes to 4 channels with the grey value replicated;
/// anything outside the 8-bit layouts goes through RGBA8 first.
fn normalize(img: DynamicImage) -> Decoded {
	let width = img.width();
	let height = img.height();
	match img {
		DynamicImage::ImageLuma8(g) => Decoded {
			width,
			height,
			channels: 1,
			pixels: g.into_raw(),
		},
		DynamicImage::ImageRgb8(rgb) => Decoded {
			width,
			height,
			channels: 3,
			pixels: rgb.into_raw(),
		},
		DynamicImage::ImageRgba8(rgba) => Decoded {
			width,
			height,
			channels: 4,
			pixels: rgba_to_argb(&rgba.into_raw()),
		},
		DynamicImage::ImageLumaA8(la) => {
			let raw = la.into_raw();
			let mut pixels = Vec::with_capacity(raw.len() * 2);
			for px in raw.chunks_exact(2) {
				pixels.extend_from_slice(&[px[1], px[0], px[0], px[0]]);
			}
			Decoded {
				width,
				height,
				channels: 4,
				pixels,
			}
		}
		other => Decoded {
			width,
			height,
			channels: 4,
			pixels: rgba_to_argb(&other.to_rgba8().into_raw()),
		},
	}
}

fn rgba_to_argb(rgba: &[u8]) -> Vec<u8> {
	let mut out = Vec::with_capacity(rgba.len());
	for px in rgba.chunks_exact(4) {
		out.extend_from_slice(&[px[3], px[0], px[1], px[2]]);
	}
	out
}

fn argb_to_rgba(argb: &[u8]) -> Vec<u8> {
	let mut out = Vec::with_capacity(argb.len());
	for px in argb.chunks_exact(4) {
		out.extend_from_slice(&[px[1], px[2], px[3], px[0]]);
	}
	out
}
