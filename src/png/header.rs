use super::*;

/// The color model of the image's pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ColorType {
  /// One grey sample per pixel.
  Greyscale = 0,
  /// Red, green, blue.
  Truecolor = 2,
  /// One palette index per pixel.
  Indexed = 3,
  /// Grey and alpha.
  GreyscaleAlpha = 4,
  /// Red, green, blue, alpha.
  TruecolorAlpha = 6,
}
impl ColorType {
  /// Samples per pixel in the data stream.
  #[inline]
  #[must_use]
  pub const fn channel_count(self) -> u8 {
    match self {
      Self::Greyscale | Self::Indexed => 1,
      Self::GreyscaleAlpha => 2,
      Self::Truecolor => 3,
      Self::TruecolorAlpha => 4,
    }
  }

  /// If the last sample of each pixel is alpha.
  #[inline]
  #[must_use]
  pub const fn has_alpha(self) -> bool {
    matches!(self, Self::GreyscaleAlpha | Self::TruecolorAlpha)
  }

  /// If the bit depth is allowed with this color type.
  #[inline]
  #[must_use]
  pub const fn allows_depth(self, depth: u8) -> bool {
    match self {
      Self::Greyscale => matches!(depth, 1 | 2 | 4 | 8 | 16),
      Self::Indexed => matches!(depth, 1 | 2 | 4 | 8),
      Self::Truecolor | Self::GreyscaleAlpha | Self::TruecolorAlpha => matches!(depth, 8 | 16),
    }
  }

  /// The color type for a channel count, with indexed images not
  /// reachable this way.
  pub const fn from_channels(channels: u8) -> PngResult<Self> {
    Ok(match channels {
      1 => Self::Greyscale,
      2 => Self::GreyscaleAlpha,
      3 => Self::Truecolor,
      4 => Self::TruecolorAlpha,
      other => return Err(PngError::InvalidChannels(other)),
    })
  }
}
impl TryFrom<u8> for ColorType {
  type Error = PngError;
  #[inline]
  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Ok(match value {
      0 => Self::Greyscale,
      2 => Self::Truecolor,
      3 => Self::Indexed,
      4 => Self::GreyscaleAlpha,
      6 => Self::TruecolorAlpha,
      _ => return Err(PngError::InvalidHeader { field: "color type", value: u32::from(value) }),
    })
  }
}

/// The size and sample layout of a block of scanlines.
///
/// This is the whole image for plain decoding, or one frame's region for
/// animations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RasterGeometry {
  pub width: u32,
  pub height: u32,
  pub depth: u8,
  pub channels: u8,
}
impl RasterGeometry {
  /// Same sample layout, different size.
  #[inline]
  #[must_use]
  pub const fn with_size(self, width: u32, height: u32) -> Self {
    Self { width, height, ..self }
  }

  /// Distance in bytes between a byte and its "left" neighbor when filtering.
  ///
  /// Sub-byte depths use 1.
  #[inline]
  #[must_use]
  pub const fn filter_bpp(self) -> usize {
    (self.depth as usize).div_ceil(8) * self.channels as usize
  }

  /// Samples in one row of the given width.
  #[inline]
  #[must_use]
  pub const fn row_samples(self, width: u32) -> usize {
    width as usize * self.channels as usize
  }

  /// Bytes in one unfiltered row of the given width.
  #[inline]
  #[must_use]
  pub const fn row_bytes(self, width: u32) -> usize {
    packed_row_len(self.row_samples(width), self.depth)
  }

  /// Bytes of the fully reassembled raster, with rows packed for sub-byte
  /// depths.
  #[inline]
  #[must_use]
  pub const fn raster_len(self) -> usize {
    self.row_bytes(self.width).saturating_mul(self.height as usize)
  }
}

/// The content of an `IHDR` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageHeader {
  pub width: u32,
  pub height: u32,
  pub depth: u8,
  pub color_type: ColorType,
  pub interlaced: bool,
}
impl ImageHeader {
  /// Length of the header chunk body.
  pub const LEN: u32 = 13;

  /// Checks the field combination is one the format allows.
  pub fn validate(&self) -> PngResult<()> {
    if self.width == 0 || self.width > i32::MAX as u32 {
      return Err(PngError::InvalidHeader { field: "width", value: self.width });
    }
    if self.height == 0 || self.height > i32::MAX as u32 {
      return Err(PngError::InvalidHeader { field: "height", value: self.height });
    }
    if !matches!(self.depth, 1 | 2 | 4 | 8 | 16) {
      return Err(PngError::InvalidHeader { field: "bit depth", value: u32::from(self.depth) });
    }
    if !self.color_type.allows_depth(self.depth) {
      return Err(PngError::IllegalBitDepth { color_type: self.color_type, depth: self.depth });
    }
    Ok(())
  }

  /// Reads and validates a header chunk body.
  pub fn read<C: ByteCursor>(cursor: &mut C) -> PngResult<Self> {
    let width = cursor.read_u32()?;
    let height = cursor.read_u32()?;
    let depth = cursor.read_u8()?;
    let color_type = ColorType::try_from(cursor.read_u8()?)?;
    let compression = cursor.read_u8()?;
    if compression != 0 {
      return Err(PngError::InvalidHeader {
        field: "compression method",
        value: u32::from(compression),
      });
    }
    let filter_method = cursor.read_u8()?;
    if filter_method != 0 {
      return Err(PngError::InvalidHeader {
        field: "filter method",
        value: u32::from(filter_method),
      });
    }
    let interlaced = match cursor.read_u8()? {
      0 => false,
      1 => true,
      other => {
        return Err(PngError::InvalidHeader { field: "interlace method", value: u32::from(other) })
      }
    };
    let header = Self { width, height, depth, color_type, interlaced };
    header.validate()?;
    Ok(header)
  }

  /// Writes the header chunk body.
  pub fn write<C: ByteCursor>(&self, cursor: &mut C) {
    cursor.write_u32(self.width);
    cursor.write_u32(self.height);
    cursor.write_u8(self.depth);
    cursor.write_u8(self.color_type as u8);
    cursor.write_u8(0);
    cursor.write_u8(0);
    cursor.write_u8(u8::from(self.interlaced));
  }

  #[inline]
  #[must_use]
  pub const fn channels(&self) -> u8 {
    self.color_type.channel_count()
  }

  /// The full image geometry.
  #[inline]
  #[must_use]
  pub const fn geometry(&self) -> RasterGeometry {
    RasterGeometry {
      width: self.width,
      height: self.height,
      depth: self.depth,
      channels: self.channels(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn header_bytes(depth: u8, color: u8, compression: u8, interlace: u8) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&3_u32.to_be_bytes());
    v.extend_from_slice(&2_u32.to_be_bytes());
    v.extend_from_slice(&[depth, color, compression, 0, interlace]);
    v
  }

  #[test]
  fn test_read_header() {
    let bytes = header_bytes(16, 6, 0, 1);
    let h = ImageHeader::read(&mut IoBuffer::from_slice(&bytes)).unwrap();
    assert_eq!(
      h,
      ImageHeader {
        width: 3,
        height: 2,
        depth: 16,
        color_type: ColorType::TruecolorAlpha,
        interlaced: true
      }
    );
    assert_eq!(h.geometry().filter_bpp(), 8);
    assert_eq!(h.geometry().raster_len(), 3 * 2 * 8);

    let mut out = IoBuffer::new();
    h.write(&mut out);
    assert_eq!(out.into_vec(), bytes);
  }

  #[test]
  fn test_header_rejects() {
    let read = |b: Vec<u8>| ImageHeader::read(&mut IoBuffer::from_slice(&b));
    assert_eq!(
      read(header_bytes(8, 5, 0, 0)),
      Err(PngError::InvalidHeader { field: "color type", value: 5 })
    );
    assert_eq!(
      read(header_bytes(8, 2, 1, 0)),
      Err(PngError::InvalidHeader { field: "compression method", value: 1 })
    );
    assert_eq!(
      read(header_bytes(8, 2, 0, 2)),
      Err(PngError::InvalidHeader { field: "interlace method", value: 2 })
    );
    assert_eq!(
      read(header_bytes(4, 2, 0, 0)),
      Err(PngError::IllegalBitDepth { color_type: ColorType::Truecolor, depth: 4 })
    );
    assert_eq!(
      read(header_bytes(16, 3, 0, 0)),
      Err(PngError::IllegalBitDepth { color_type: ColorType::Indexed, depth: 16 })
    );
    assert_eq!(
      read(header_bytes(3, 0, 0, 0)),
      Err(PngError::InvalidHeader { field: "bit depth", value: 3 })
    );
  }

  #[test]
  fn test_sub_byte_rows() {
    let g = RasterGeometry { width: 10, height: 3, depth: 1, channels: 1 };
    assert_eq!(g.filter_bpp(), 1);
    assert_eq!(g.row_bytes(10), 2);
    assert_eq!(g.raster_len(), 6);
    let g = RasterGeometry { width: 3, height: 1, depth: 4, channels: 1 };
    assert_eq!(g.row_bytes(3), 2);
  }
}
