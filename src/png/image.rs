use super::*;

/// Decoded samples.
///
/// Depths up to 8 use bytes. For depths below 8 the rows stay bit-packed
/// (each row starting on a fresh byte), the same as in the data stream. Depth
/// 16 uses native `u16` values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PixelData {
  U8(Vec<u8>),
  U16(Vec<u16>),
}
impl PixelData {
  /// Number of elements, bytes or `u16` values.
  #[inline]
  #[must_use]
  pub fn len(&self) -> usize {
    match self {
      Self::U8(v) => v.len(),
      Self::U16(v) => v.len(),
    }
  }

  #[inline]
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  #[inline]
  #[must_use]
  pub fn as_u8(&self) -> Option<&[u8]> {
    match self {
      Self::U8(v) => Some(v),
      Self::U16(_) => None,
    }
  }

  #[inline]
  #[must_use]
  pub fn as_u16(&self) -> Option<&[u16]> {
    match self {
      Self::U16(v) => Some(v),
      Self::U8(_) => None,
    }
  }

  /// Wire-order bytes to the data for the given depth.
  ///
  /// 16-bit samples are big-endian on the wire, so they get swapped on
  /// little-endian hosts. The swap happens once over the whole raster.
  pub(crate) fn from_wire(bytes: Vec<u8>, depth: u8) -> Self {
    if depth == 16 {
      Self::U16(samples_from_be_bytes(&bytes))
    } else {
      Self::U8(bytes)
    }
  }

  /// The data as wire-order bytes.
  pub(crate) fn to_wire(&self) -> Cow<'_, [u8]> {
    match self {
      Self::U8(v) => Cow::Borrowed(v),
      Self::U16(v) => Cow::Owned(v.iter().flat_map(|s| s.to_be_bytes()).collect()),
    }
  }
}

/// Big-endian byte pairs to native `u16` samples.
pub(crate) fn samples_from_be_bytes(bytes: &[u8]) -> Vec<u16> {
  let mut samples: Vec<u16> = bytemuck::allocation::pod_collect_to_vec(bytes);
  if cfg!(target_endian = "little") {
    for s in samples.iter_mut() {
      *s = s.swap_bytes();
    }
  }
  samples
}

/// Palette entries, either opaque or with the alpha from a `tRNS` chunk.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Palette {
  Rgb(Vec<[u8; 3]>),
  Rgba(Vec<[u8; 4]>),
}
impl Palette {
  /// Bytes per entry: 3 or 4.
  #[inline]
  #[must_use]
  pub const fn components(&self) -> usize {
    match self {
      Self::Rgb(_) => 3,
      Self::Rgba(_) => 4,
    }
  }

  #[inline]
  #[must_use]
  pub fn len(&self) -> usize {
    match self {
      Self::Rgb(v) => v.len(),
      Self::Rgba(v) => v.len(),
    }
  }

  #[inline]
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// The components of an entry.
  #[inline]
  #[must_use]
  pub fn get(&self, index: usize) -> Option<&[u8]> {
    match self {
      Self::Rgb(v) => v.get(index).map(|e| e.as_slice()),
      Self::Rgba(v) => v.get(index).map(|e| e.as_slice()),
    }
  }

  /// Parses a `PLTE` body.
  pub(crate) fn from_plte(body: &[u8]) -> PngResult<Self> {
    let entries: &[[u8; 3]] = bytemuck::try_cast_slice(body)
      .map_err(|_| PngError::PaletteLength { length: body.len() })?;
    if entries.is_empty() || entries.len() > 256 {
      return Err(PngError::PaletteLength { length: body.len() });
    }
    Ok(Self::Rgb(entries.to_vec()))
  }

  /// Gives every entry an alpha, taken from `alpha` in order and opaque past
  /// its end.
  pub(crate) fn with_alpha(&self, alpha: &[u8]) -> Self {
    let a = |i: usize| alpha.get(i).copied().unwrap_or(u8::MAX);
    Self::Rgba(match self {
      Self::Rgb(v) => v.iter().enumerate().map(|(i, &[r, g, b])| [r, g, b, a(i)]).collect(),
      Self::Rgba(v) => v.iter().enumerate().map(|(i, &[r, g, b, _])| [r, g, b, a(i)]).collect(),
    })
  }
}

/// Simple transparency from a `tRNS` chunk.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Transparency {
  /// Grey or RGB sample values (full depth values, not bytes) to treat as
  /// fully transparent.
  Samples(Vec<u16>),
  /// Alpha per palette entry. Entries past the end are opaque.
  PaletteAlpha(Vec<u8>),
}

/// Physical pixel dimensions from a `pHYs` chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
  /// Pixels per unit, X axis.
  pub x: u32,
  /// Pixels per unit, Y axis.
  pub y: u32,
  pub unit: ResolutionUnit,
}

/// The unit of a [`Resolution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionUnit {
  /// Only the aspect ratio is known.
  Unknown,
  Meter,
  /// A unit tag this crate doesn't know. Kept as is.
  Other(u8),
}
impl From<u8> for ResolutionUnit {
  #[inline]
  fn from(value: u8) -> Self {
    match value {
      0 => Self::Unknown,
      1 => Self::Meter,
      other => Self::Other(other),
    }
  }
}
impl From<ResolutionUnit> for u8 {
  #[inline]
  fn from(value: ResolutionUnit) -> Self {
    match value {
      ResolutionUnit::Unknown => 0,
      ResolutionUnit::Meter => 1,
      ResolutionUnit::Other(other) => other,
    }
  }
}

/// An embedded ICC profile, already decompressed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IccProfile {
  pub name: String,
  pub profile: Vec<u8>,
}

/// A single image: the decode result and the encode input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
  pub width: u32,
  pub height: u32,
  /// Bits per sample: 1, 2, 4, 8, or 16.
  pub depth: u8,
  pub color_type: ColorType,
  pub data: PixelData,
  pub palette: Option<Palette>,
  pub transparency: Option<Transparency>,
  /// `tEXt` entries by keyword.
  pub text: BTreeMap<String, String>,
  pub resolution: Option<Resolution>,
  pub icc_profile: Option<IccProfile>,
}
impl RawImage {
  /// Builds an image from a channel count, picking the matching non-indexed
  /// color type and checking the data size.
  pub fn from_channels(
    width: u32, height: u32, channels: u8, depth: u8, data: PixelData,
  ) -> PngResult<Self> {
    let color_type = ColorType::from_channels(channels)?;
    let image = Self {
      width,
      height,
      depth,
      color_type,
      data,
      palette: None,
      transparency: None,
      text: BTreeMap::new(),
      resolution: None,
      icc_profile: None,
    };
    image.validate_geometry()?;
    Ok(image)
  }

  /// An indexed image. `indices` holds packed rows when `depth` is below 8.
  pub fn indexed(
    width: u32, height: u32, depth: u8, indices: Vec<u8>, palette: Palette,
  ) -> PngResult<Self> {
    let image = Self {
      width,
      height,
      depth,
      color_type: ColorType::Indexed,
      data: PixelData::U8(indices),
      palette: Some(palette),
      transparency: None,
      text: BTreeMap::new(),
      resolution: None,
      icc_profile: None,
    };
    image.validate_geometry()?;
    Ok(image)
  }

  #[inline]
  #[must_use]
  pub const fn channels(&self) -> u8 {
    self.color_type.channel_count()
  }

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

  /// The length `data` must have: samples for 16-bit, bytes otherwise.
  #[inline]
  #[must_use]
  pub const fn expected_data_len(&self) -> usize {
    let g = self.geometry();
    if self.depth == 16 {
      g.row_samples(self.width).saturating_mul(self.height as usize)
    } else {
      g.raster_len()
    }
  }

  /// Checks dimensions, depth and color type, and the data size.
  pub fn validate_geometry(&self) -> PngResult<()> {
    if self.width == 0 {
      return Err(PngError::InvalidDimension { name: "width" });
    }
    if self.height == 0 {
      return Err(PngError::InvalidDimension { name: "height" });
    }
    if !self.color_type.allows_depth(self.depth) {
      return Err(PngError::IllegalBitDepth { color_type: self.color_type, depth: self.depth });
    }
    match (&self.data, self.depth) {
      (PixelData::U16(_), 16) => (),
      (PixelData::U8(_), d) if d != 16 => (),
      _ => return Err(PngError::SampleType { depth: self.depth }),
    }
    let expected = self.expected_data_len();
    if self.data.len() != expected {
      return Err(PngError::DataSize { found: self.data.len(), expected });
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_from_channels() {
    let img = RawImage::from_channels(2, 2, 3, 8, PixelData::U8(vec![0; 12])).unwrap();
    assert_eq!(img.color_type, ColorType::Truecolor);
    assert_eq!(
      RawImage::from_channels(2, 2, 5, 8, PixelData::U8(vec![0; 20])),
      Err(PngError::InvalidChannels(5))
    );
    assert_eq!(
      RawImage::from_channels(2, 2, 1, 8, PixelData::U8(vec![0; 3])),
      Err(PngError::DataSize { found: 3, expected: 4 })
    );
    assert_eq!(
      RawImage::from_channels(2, 2, 1, 16, PixelData::U8(vec![0; 8])),
      Err(PngError::SampleType { depth: 16 })
    );
    assert_eq!(
      RawImage::from_channels(0, 2, 1, 8, PixelData::U8(vec![])),
      Err(PngError::InvalidDimension { name: "width" })
    );
    // 10 wide at 1 bit is 2 bytes per row
    assert!(RawImage::from_channels(10, 2, 1, 1, PixelData::U8(vec![0; 4])).is_ok());
  }

  #[test]
  fn test_wire_order_16() {
    let data = PixelData::from_wire(vec![0x12, 0x34, 0xAB, 0xCD], 16);
    assert_eq!(data, PixelData::U16(vec![0x1234, 0xABCD]));
    assert_eq!(&*data.to_wire(), &[0x12, 0x34, 0xAB, 0xCD]);
  }

  #[test]
  fn test_palette() {
    assert_eq!(Palette::from_plte(&[1, 2]), Err(PngError::PaletteLength { length: 2 }));
    assert_eq!(Palette::from_plte(&[]), Err(PngError::PaletteLength { length: 0 }));
    let p = Palette::from_plte(&[1, 2, 3, 4, 5, 6]).unwrap();
    assert_eq!(p.get(1), Some(&[4_u8, 5, 6][..]));
    let p = p.with_alpha(&[9]);
    assert_eq!(p, Palette::Rgba(vec![[1, 2, 3, 9], [4, 5, 6, 255]]));
    assert_eq!(p.components(), 4);
  }
}
