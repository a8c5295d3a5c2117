//! Animated PNG: the animation chunks and frame compositing.
//!
//! Every output frame is a full canvas. A frame's own region is drawn over
//! the previous output after the previous frame's dispose op has been
//! applied.

use super::*;

/// What happens to a frame's region once the frame's delay is over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DisposeOp {
  /// Leave the canvas as is.
  #[default]
  None,
  /// Clear the region to zero.
  Background,
  /// Restore the region to what it was before the frame was drawn.
  Previous,
}
impl TryFrom<u8> for DisposeOp {
  type Error = PngError;
  #[inline]
  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Ok(match value {
      0 => Self::None,
      1 => Self::Background,
      2 => Self::Previous,
      other => return Err(PngError::UnknownDisposeOp(other)),
    })
  }
}

/// How a frame's region is drawn onto the canvas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BlendOp {
  /// Overwrite the region.
  #[default]
  Source,
  /// Alpha composite the region over the canvas.
  Over,
}
impl TryFrom<u8> for BlendOp {
  type Error = PngError;
  #[inline]
  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Ok(match value {
      0 => Self::Source,
      1 => Self::Over,
      other => return Err(PngError::UnknownBlendOp(other)),
    })
  }
}

/// The content of an `acTL` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnimationControl {
  pub num_frames: u32,
  /// 0 means loop forever.
  pub num_plays: u32,
}
impl AnimationControl {
  pub(crate) fn read<C: ByteCursor>(cursor: &mut C) -> PngResult<Self> {
    Ok(Self { num_frames: cursor.read_u32()?, num_plays: cursor.read_u32()? })
  }
}

/// The content of an `fcTL` chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FrameControl {
  pub sequence_number: u32,
  pub width: u32,
  pub height: u32,
  pub x_offset: u32,
  pub y_offset: u32,
  pub delay_num: u16,
  pub delay_den: u16,
  pub dispose_op: DisposeOp,
  pub blend_op: BlendOp,
}
impl FrameControl {
  pub(crate) fn read<C: ByteCursor>(cursor: &mut C) -> PngResult<Self> {
    Ok(Self {
      sequence_number: cursor.read_u32()?,
      width: cursor.read_u32()?,
      height: cursor.read_u32()?,
      x_offset: cursor.read_u32()?,
      y_offset: cursor.read_u32()?,
      delay_num: cursor.read_u16()?,
      delay_den: cursor.read_u16()?,
      dispose_op: DisposeOp::try_from(cursor.read_u8()?)?,
      blend_op: BlendOp::try_from(cursor.read_u8()?)?,
    })
  }

  /// A control covering the whole canvas, for a plain PNG read as an
  /// animation.
  pub(crate) const fn full_canvas(width: u32, height: u32) -> Self {
    Self {
      sequence_number: 0,
      width,
      height,
      x_offset: 0,
      y_offset: 0,
      delay_num: 0,
      delay_den: 0,
      dispose_op: DisposeOp::None,
      blend_op: BlendOp::Source,
    }
  }

  /// Checks the region is non-empty and inside the canvas.
  pub fn check_fits(&self, canvas_width: u32, canvas_height: u32) -> PngResult<()> {
    let right = self.x_offset.checked_add(self.width);
    let bottom = self.y_offset.checked_add(self.height);
    let fits = self.width > 0
      && self.height > 0
      && right.is_some_and(|r| r <= canvas_width)
      && bottom.is_some_and(|b| b <= canvas_height);
    if fits {
      Ok(())
    } else {
      Err(PngError::FrameGeometry {
        sequence_number: self.sequence_number,
        width: self.width,
        height: self.height,
        x_offset: self.x_offset,
        y_offset: self.y_offset,
      })
    }
  }
}

/// One composited animation frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
  pub sequence_number: u32,
  pub width: u32,
  pub height: u32,
  pub x_offset: u32,
  pub y_offset: u32,
  pub delay_num: u16,
  pub delay_den: u16,
  pub dispose_op: DisposeOp,
  pub blend_op: BlendOp,
  /// The whole canvas after this frame was drawn. Unlike [`RawImage`], depths
  /// below 8 use one byte per sample here.
  pub data: PixelData,
}

/// A decoded animation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimatedImage {
  pub width: u32,
  pub height: u32,
  pub depth: u8,
  pub color_type: ColorType,
  pub num_frames: u32,
  /// 0 means loop forever.
  pub num_plays: u32,
  pub frames: Vec<Frame>,
  pub palette: Option<Palette>,
  pub transparency: Option<Transparency>,
  pub text: BTreeMap<String, String>,
  pub resolution: Option<Resolution>,
  pub icc_profile: Option<IccProfile>,
}
impl AnimatedImage {
  #[inline]
  #[must_use]
  pub const fn channels(&self) -> u8 {
    self.color_type.channel_count()
  }
}

/// A sample type the compositor can blend.
trait Sample: Copy + Default {
  fn to_f64(self) -> f64;
  fn from_f64(value: f64) -> Self;
}
impl Sample for u8 {
  #[inline]
  fn to_f64(self) -> f64 {
    f64::from(self)
  }
  #[inline]
  fn from_f64(value: f64) -> Self {
    value as u8
  }
}
impl Sample for u16 {
  #[inline]
  fn to_f64(self) -> f64 {
    f64::from(self)
  }
  #[inline]
  fn from_f64(value: f64) -> Self {
    value as u16
  }
}

/// Canvas layout shared by every frame.
#[derive(Debug, Clone, Copy)]
struct Canvas {
  width: usize,
  channels: usize,
  depth: u8,
  has_alpha: bool,
}
impl Canvas {
  /// Index ranges of each canvas row covered by the frame's region.
  fn region_rows(self, fc: &FrameControl) -> impl Iterator<Item = core::ops::Range<usize>> {
    let x = fc.x_offset as usize;
    let y = fc.y_offset as usize;
    let w = fc.width as usize;
    (0..fc.height as usize).map(move |row| {
      let start = ((y + row) * self.width + x) * self.channels;
      start..start + w * self.channels
    })
  }

  fn clear<T: Sample>(self, canvas: &mut [T], fc: &FrameControl) {
    for r in self.region_rows(fc) {
      canvas[r].fill(T::default());
    }
  }

  fn restore<T: Sample>(self, canvas: &mut [T], snapshot: &[T], fc: &FrameControl) {
    for r in self.region_rows(fc) {
      canvas[r.clone()].copy_from_slice(&snapshot[r]);
    }
  }

  fn draw<T: Sample>(self, canvas: &mut [T], region: &[T], fc: &FrameControl, blend: BlendOp) {
    let region_row_len = fc.width as usize * self.channels;
    let rows = self.region_rows(fc).zip(region.chunks_exact(region_row_len));
    if blend == BlendOp::Source || !self.has_alpha {
      for (r, src) in rows {
        canvas[r].copy_from_slice(src);
      }
      return;
    }
    let max_value = f64::from(1_u32 << self.depth);
    let alpha_channel = self.channels - 1;
    for (r, src_row) in rows {
      let dst_row = &mut canvas[r];
      let pixels = dst_row.chunks_exact_mut(self.channels).zip(src_row.chunks_exact(self.channels));
      for (dst, src) in pixels {
        let alpha = src[alpha_channel].to_f64() / max_value;
        for (c, d) in dst.iter_mut().enumerate() {
          let fg = if c == alpha_channel { 1.0 } else { src[c].to_f64() };
          *d = T::from_f64(alpha * fg + (1.0 - alpha) * d.to_f64());
        }
      }
    }
  }
}

/// A buffer of `len` blank samples, or `None` if it can't be allocated.
fn try_blank<T: Sample>(len: usize) -> Option<Vec<T>> {
  if len.checked_mul(core::mem::size_of::<T>())? > isize::MAX as usize {
    return None;
  }
  let mut v = Vec::new();
  v.try_reserve_exact(len).ok()?;
  v.resize(len, T::default());
  Some(v)
}

fn try_copy<T: Sample>(src: &[T]) -> Option<Vec<T>> {
  let mut v = Vec::new();
  v.try_reserve_exact(src.len()).ok()?;
  v.extend_from_slice(src);
  Some(v)
}

/// Applies dispose and blend ops over a sequence of decoded frame regions,
/// returning the canvas after each frame.
///
/// Gives `None` when a canvas can't be allocated.
fn composite<T: Sample>(
  canvas_info: Canvas, canvas_len: usize, frames: &[(FrameControl, Vec<T>)],
) -> Option<Vec<Vec<T>>> {
  let mut canvas = try_blank(canvas_len)?;
  let mut outputs = Vec::new();
  outputs.try_reserve_exact(frames.len()).ok()?;
  let mut previous: Option<(&FrameControl, Vec<T>)> = None;
  for (i, (fc, region)) in frames.iter().enumerate() {
    if let Some((prev_fc, snapshot)) = previous.take() {
      match prev_fc.dispose_op {
        DisposeOp::None => (),
        DisposeOp::Background => canvas_info.clear(&mut canvas, prev_fc),
        DisposeOp::Previous => canvas_info.restore(&mut canvas, &snapshot, prev_fc),
      }
    }
    // a first frame that disposes to "previous" restores the blank canvas,
    // which is the same as disposing to background
    let snapshot =
      if fc.dispose_op == DisposeOp::Previous { try_copy(&canvas)? } else { Vec::new() };
    let blend = if i == 0 { BlendOp::Source } else { fc.blend_op };
    canvas_info.draw(&mut canvas, region, fc, blend);
    outputs.push(try_copy(&canvas)?);
    previous = Some((fc, snapshot));
  }
  Some(outputs)
}

/// Turns each frame's decompressed data into a composited canvas.
pub(crate) fn compose_frames(
  header: &ImageHeader, frames: Vec<(FrameControl, Vec<u8>)>,
) -> PngResult<Vec<Frame>> {
  let geometry = header.geometry();
  let canvas = Canvas {
    width: header.width as usize,
    channels: usize::from(header.channels()),
    depth: header.depth,
    has_alpha: header.color_type.has_alpha(),
  };
  let mut regions_u8 = Vec::new();
  let mut regions_u16 = Vec::new();
  for (fc, data) in frames {
    fc.check_fits(header.width, header.height)?;
    let frame_geometry = geometry.with_size(fc.width, fc.height);
    let raster = decode_raster(&data, frame_geometry, header.interlaced)?;
    trace!(
      "frame {} is {}x{}+{}+{}",
      fc.sequence_number,
      fc.width,
      fc.height,
      fc.x_offset,
      fc.y_offset
    );
    match header.depth {
      16 => regions_u16.push((fc, samples_from_be_bytes(&raster))),
      8 => regions_u8.push((fc, raster)),
      d => {
        let row_samples = frame_geometry.row_samples(fc.width);
        let samples = unpack_rows(&raster, d, row_samples, fc.height as usize);
        regions_u8.push((fc, samples));
      }
    }
  }
  let too_large = PngError::CanvasSize {
    width: header.width,
    height: header.height,
    channels: header.channels(),
  };
  let canvas_len = (header.width as usize)
    .checked_mul(header.height as usize)
    .and_then(|n| n.checked_mul(canvas.channels))
    .ok_or_else(|| too_large.clone())?;
  let frame_of = |fc: &FrameControl, data: PixelData| Frame {
    sequence_number: fc.sequence_number,
    width: fc.width,
    height: fc.height,
    x_offset: fc.x_offset,
    y_offset: fc.y_offset,
    delay_num: fc.delay_num,
    delay_den: fc.delay_den,
    dispose_op: fc.dispose_op,
    blend_op: fc.blend_op,
    data,
  };
  let out: Vec<Frame> = if header.depth == 16 {
    let canvases = composite(canvas, canvas_len, &regions_u16).ok_or(too_large)?;
    regions_u16.iter().zip(canvases).map(|((fc, _), c)| frame_of(fc, PixelData::U16(c))).collect()
  } else {
    let canvases = composite(canvas, canvas_len, &regions_u8).ok_or(too_large)?;
    regions_u8.iter().zip(canvases).map(|((fc, _), c)| frame_of(fc, PixelData::U8(c))).collect()
  };
  Ok(out)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn fc(w: u32, h: u32, x: u32, y: u32, dispose: DisposeOp, blend: BlendOp) -> FrameControl {
    FrameControl {
      width: w,
      height: h,
      x_offset: x,
      y_offset: y,
      dispose_op: dispose,
      blend_op: blend,
      ..FrameControl::default()
    }
  }

  const GREY: Canvas = Canvas { width: 3, channels: 1, depth: 8, has_alpha: false };

  #[test]
  fn test_dispose_ops() {
    let frames = [
      (fc(3, 2, 0, 0, DisposeOp::None, BlendOp::Source), vec![1_u8; 6]),
      (fc(1, 1, 1, 0, DisposeOp::Previous, BlendOp::Source), vec![7]),
      (fc(1, 1, 2, 1, DisposeOp::Background, BlendOp::Source), vec![8]),
      (fc(1, 1, 0, 0, DisposeOp::None, BlendOp::Source), vec![9]),
    ];
    let out = composite(GREY, 6, &frames).unwrap();
    assert_eq!(out[0], [1, 1, 1, 1, 1, 1]);
    assert_eq!(out[1], [1, 7, 1, 1, 1, 1]);
    // frame 1 restored its region before frame 2 drew
    assert_eq!(out[2], [1, 1, 1, 1, 1, 8]);
    // frame 2 cleared its region before frame 3 drew
    assert_eq!(out[3], [9, 1, 1, 1, 1, 0]);
  }

  #[test]
  fn test_first_frame_previous_clears() {
    let frames = [
      (fc(3, 1, 0, 0, DisposeOp::Previous, BlendOp::Source), vec![5_u8; 3]),
      (fc(1, 1, 0, 0, DisposeOp::None, BlendOp::Source), vec![6]),
    ];
    let out = composite(GREY, 3, &frames).unwrap();
    assert_eq!(out[1], [6, 0, 0]);
  }

  #[test]
  fn test_over_blend() {
    let canvas = Canvas { width: 1, channels: 2, depth: 8, has_alpha: true };
    let frames = [
      (fc(1, 1, 0, 0, DisposeOp::None, BlendOp::Over), vec![100_u8, 200]),
      (fc(1, 1, 0, 0, DisposeOp::None, BlendOp::Over), vec![200_u8, 128]),
    ];
    let out = composite(canvas, 2, &frames).unwrap();
    // the first frame is always a plain draw
    assert_eq!(out[0], [100, 200]);
    // alpha is 128/256: grey 0.5*200 + 0.5*100, alpha 0.5*1 + 0.5*200
    assert_eq!(out[1], [150, 100]);
  }

  #[test]
  fn test_over_without_alpha_is_source() {
    let frames = [
      (fc(3, 1, 0, 0, DisposeOp::None, BlendOp::Source), vec![1_u8, 2, 3]),
      (fc(2, 1, 1, 0, DisposeOp::None, BlendOp::Over), vec![8, 9]),
    ];
    let out = composite(GREY, 3, &frames).unwrap();
    assert_eq!(out[1], [1, 8, 9]);
  }

  #[test]
  fn test_canvas_allocation_can_fail() {
    assert_eq!(try_blank::<u8>(4), Some(vec![0; 4]));
    assert_eq!(try_blank::<u8>(usize::MAX), None);
    assert_eq!(try_blank::<u16>(isize::MAX as usize), None);
    let frames = [(fc(1, 1, 0, 0, DisposeOp::None, BlendOp::Source), vec![1_u8])];
    assert_eq!(composite(GREY, usize::MAX, &frames), None);
  }

  #[test]
  fn test_frame_geometry() {
    assert!(fc(2, 2, 1, 1, DisposeOp::None, BlendOp::Source).check_fits(3, 3).is_ok());
    assert!(fc(2, 2, 2, 1, DisposeOp::None, BlendOp::Source).check_fits(3, 3).is_err());
    assert!(fc(0, 2, 0, 0, DisposeOp::None, BlendOp::Source).check_fits(3, 3).is_err());
    assert!(fc(2, 2, u32::MAX, 0, DisposeOp::None, BlendOp::Source).check_fits(3, 3).is_err());
  }

  #[test]
  fn test_op_tags() {
    assert_eq!(DisposeOp::try_from(3), Err(PngError::UnknownDisposeOp(3)));
    assert_eq!(BlendOp::try_from(2), Err(PngError::UnknownBlendOp(2)));
    assert_eq!(BlendOp::try_from(1), Ok(BlendOp::Over));
  }
}
