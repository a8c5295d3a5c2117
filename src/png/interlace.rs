//! Splitting the image into passes and putting it back together.
//!
//! A non-interlaced image is a single pass covering everything with a stride
//! of 1, so both cases run through the same unfilter loop.

use super::*;

/// One sub-sampling pattern: the pixels at `(x + col*dx, y + row*dy)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pass {
  pub x: u32,
  pub y: u32,
  pub dx: u32,
  pub dy: u32,
}
impl Pass {
  /// Width and height of the reduced image this pass makes from an image of
  /// the given size. Either can be 0, in which case the pass is empty.
  #[inline]
  #[must_use]
  pub const fn dimensions(self, width: u32, height: u32) -> (u32, u32) {
    (reduce(width, self.x, self.dx), reduce(height, self.y, self.dy))
  }

  #[inline]
  #[must_use]
  pub const fn is_full(self) -> bool {
    self.dx == 1 && self.dy == 1
  }
}

#[inline]
const fn reduce(dim: u32, offset: u32, stride: u32) -> u32 {
  dim.saturating_sub(offset).div_ceil(stride)
}

/// The seven Adam7 passes, in stream order.
pub const ADAM7: [Pass; 7] = [
  Pass { x: 0, y: 0, dx: 8, dy: 8 },
  Pass { x: 4, y: 0, dx: 8, dy: 8 },
  Pass { x: 0, y: 4, dx: 4, dy: 8 },
  Pass { x: 2, y: 0, dx: 4, dy: 4 },
  Pass { x: 0, y: 2, dx: 2, dy: 4 },
  Pass { x: 1, y: 0, dx: 2, dy: 2 },
  Pass { x: 0, y: 1, dx: 1, dy: 2 },
];

/// The single pass of a non-interlaced image.
pub const FULL_PASS: Pass = Pass { x: 0, y: 0, dx: 1, dy: 1 };

#[inline]
fn passes(interlaced: bool) -> &'static [Pass] {
  if interlaced {
    &ADAM7
  } else {
    core::slice::from_ref(&FULL_PASS)
  }
}

/// Length of the filtered (decompressed) data for a raster, filter tag bytes
/// included.
#[must_use]
pub fn filtered_len(geometry: RasterGeometry, interlaced: bool) -> usize {
  passes(interlaced)
    .iter()
    .map(|pass| {
      let (w, h) = pass.dimensions(geometry.width, geometry.height);
      if w == 0 || h == 0 {
        0
      } else {
        (geometry.row_bytes(w) + 1).saturating_mul(h as usize)
      }
    })
    .fold(0, usize::saturating_add)
}

/// Unfilters decompressed data and reassembles the passes.
///
/// The output is the raster in wire layout: packed rows for sub-byte depths,
/// big-endian samples for 16-bit.
///
/// ## Failure
/// * Too little data for the geometry.
/// * A scanline with an unknown filter tag.
pub fn decode_raster(
  data: &[u8], geometry: RasterGeometry, interlaced: bool,
) -> PngResult<Vec<u8>> {
  let expected = filtered_len(geometry, interlaced);
  if data.len() < expected {
    return Err(PngError::ImageDataLength { found: data.len(), expected });
  }
  if data.len() > expected {
    warn!("ignoring {} bytes of image data past the end of the raster", data.len() - expected);
  }
  let out_row_bytes = geometry.row_bytes(geometry.width);
  let mut out = vec![0_u8; geometry.raster_len()];
  let bpp = geometry.filter_bpp();
  let mut pos = 0;
  let mut prev: Vec<u8> = Vec::new();
  let mut cur: Vec<u8> = Vec::new();
  for &pass in passes(interlaced) {
    let (pass_w, pass_h) = pass.dimensions(geometry.width, geometry.height);
    if pass_w == 0 || pass_h == 0 {
      continue;
    }
    let row_bytes = geometry.row_bytes(pass_w);
    // each pass starts over with an all zero line above
    prev.clear();
    for row in 0..pass_h {
      let filter = FilterType::try_from(data[pos])?;
      cur.clear();
      cur.extend_from_slice(&data[pos + 1..pos + 1 + row_bytes]);
      pos += 1 + row_bytes;
      unfilter_scanline(filter, &mut cur, &prev, bpp);
      scatter_row(&cur, &mut out, out_row_bytes, geometry, pass, row, pass_w);
      core::mem::swap(&mut prev, &mut cur);
    }
  }
  Ok(out)
}

fn scatter_row(
  line: &[u8], out: &mut [u8], out_row_bytes: usize, geometry: RasterGeometry, pass: Pass,
  row: u32, pass_w: u32,
) {
  let y = (pass.y + row * pass.dy) as usize;
  let out_row = &mut out[y * out_row_bytes..(y + 1) * out_row_bytes];
  if pass.is_full() {
    out_row.copy_from_slice(line);
  } else if geometry.depth >= 8 {
    let pixel = geometry.filter_bpp();
    for (col, src) in line.chunks_exact(pixel).enumerate() {
      let x = (pass.x + col as u32 * pass.dx) as usize;
      out_row[x * pixel..(x + 1) * pixel].copy_from_slice(src);
    }
  } else {
    // sub-byte depths only exist with one channel
    for col in 0..pass_w as usize {
      let x = pass.x as usize + col * pass.dx as usize;
      set_packed_sample(out_row, x, geometry.depth, packed_sample(line, col, geometry.depth));
    }
  }
}

/// Splits a wire-layout raster into passes, filters every scanline, and
/// concatenates the result, ready for compression.
#[must_use]
pub fn encode_raster(
  raster: &[u8], geometry: RasterGeometry, interlaced: bool, strategy: FilterStrategy,
) -> Vec<u8> {
  let in_row_bytes = geometry.row_bytes(geometry.width);
  let bpp = geometry.filter_bpp();
  let mut out = Vec::with_capacity(filtered_len(geometry, interlaced));
  let mut prev: Vec<u8> = Vec::new();
  let mut line: Vec<u8> = Vec::new();
  for &pass in passes(interlaced) {
    let (pass_w, pass_h) = pass.dimensions(geometry.width, geometry.height);
    if pass_w == 0 || pass_h == 0 {
      continue;
    }
    let row_bytes = geometry.row_bytes(pass_w);
    prev.clear();
    for row in 0..pass_h {
      let y = (pass.y + row * pass.dy) as usize;
      let in_row = &raster[y * in_row_bytes..(y + 1) * in_row_bytes];
      line.clear();
      if pass.is_full() {
        line.extend_from_slice(in_row);
      } else if geometry.depth >= 8 {
        for col in 0..pass_w as usize {
          let x = pass.x as usize + col * pass.dx as usize;
          line.extend_from_slice(&in_row[x * bpp..(x + 1) * bpp]);
        }
      } else {
        line.resize(row_bytes, 0);
        for col in 0..pass_w as usize {
          let x = pass.x as usize + col * pass.dx as usize;
          let sample = packed_sample(in_row, x, geometry.depth);
          set_packed_sample(&mut line, col, geometry.depth, sample);
        }
      }
      filter_line_into(strategy, &line, &prev, bpp, &mut out);
      core::mem::swap(&mut prev, &mut line);
    }
  }
  out
}
