use super::*;

/// Run-time encoder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncoderOptions {
  /// Compression level handed to the compressor. Default 3.
  pub level: u8,
  /// Write the image with Adam7 interlacing.
  pub interlace: bool,
  /// Scanline filter selection. Indexed images and depths below 8 always use
  /// [`FilterStrategy::None`].
  pub filter: FilterStrategy,
}
impl Default for EncoderOptions {
  #[inline]
  fn default() -> Self {
    Self { level: 3, interlace: false, filter: FilterStrategy::None }
  }
}

/// Largest `IDAT` body the encoder writes before starting another chunk.
pub const MAX_IDAT_LEN: usize = 1 << 16;

/// Encodes one [`RawImage`].
///
/// All checks happen when the encoder is built, so an encoder that exists
/// always produces output.
#[derive(Debug)]
pub struct PngEncoder<'i, C: Compressor> {
  image: &'i RawImage,
  options: EncoderOptions,
  compressor: C,
  header: ImageHeader,
  transparency: Option<Vec<u8>>,
  text_chunks: Vec<Vec<u8>>,
  cursor: IoBuffer<'static>,
}
impl<'i, C: Compressor + Default> PngEncoder<'i, C> {
  /// Validates the image and makes an encoder with a default `C`.
  #[inline]
  pub fn new(image: &'i RawImage, options: EncoderOptions) -> PngResult<Self> {
    Self::with_compressor(image, options, C::default())
  }
}
impl<'i, C: Compressor> PngEncoder<'i, C> {
  /// Validates the image and makes an encoder around `compressor`.
  ///
  /// ## Failure
  /// * Width or height of 0, a bad depth for the color type, or a pixel
  ///   buffer of the wrong type or size.
  /// * Indexed images without a palette, or a palette outside of 1 to 256
  ///   entries. Palettes on greyscale images.
  /// * Transparency that doesn't fit the color type.
  /// * Text or ICC profile names that aren't valid latin-1 keywords.
  pub fn with_compressor(
    image: &'i RawImage, options: EncoderOptions, compressor: C,
  ) -> PngResult<Self> {
    image.validate_geometry()?;
    match (&image.palette, image.color_type) {
      (None, ColorType::Indexed) => return Err(PngError::MissingPalette),
      (Some(_), ColorType::Greyscale | ColorType::GreyscaleAlpha) => {
        return Err(PngError::ChunkOrder {
          chunk: ChunkType::PLTE,
          reason: "palette with a greyscale color type",
        })
      }
      (Some(p), _) if p.is_empty() || p.len() > 256 => {
        return Err(PngError::PaletteLength { length: p.len() * 3 })
      }
      _ => (),
    }
    let transparency = trns_body(image)?;
    let text_chunks =
      image.text.iter().map(|(k, v)| text_chunk_body(k, v)).collect::<PngResult<Vec<_>>>()?;
    if let Some(icc) = &image.icc_profile {
      validate_keyword(&icc.name)?;
    }
    let header = ImageHeader {
      width: image.width,
      height: image.height,
      depth: image.depth,
      color_type: image.color_type,
      interlaced: options.interlace,
    };
    Ok(Self {
      image,
      options,
      compressor,
      header,
      transparency,
      text_chunks,
      cursor: IoBuffer::new(),
    })
  }

  /// Writes the whole data stream.
  #[must_use]
  pub fn encode(mut self) -> Vec<u8> {
    write_signature(&mut self.cursor);

    let mut ihdr = IoBuffer::new();
    self.header.write(&mut ihdr);
    self.write_chunk(ChunkType::IHDR, &ihdr.into_vec());

    if let Some(icc) = &self.image.icc_profile {
      let mut body: Vec<u8> = icc.name.chars().filter_map(|c| u8::try_from(c).ok()).collect();
      body.extend_from_slice(&[0, 0]);
      body.extend(self.compressor.compress(&icc.profile, self.options.level));
      self.write_chunk(ChunkType::iCCP, &body);
    }

    if let Some(palette) = &self.image.palette {
      let body: Vec<u8> = (0..palette.len())
        .filter_map(|i| palette.get(i))
        .flat_map(|entry| entry[..3].iter().copied())
        .collect();
      self.write_chunk(ChunkType::PLTE, &body);
    }

    if let Some(body) = self.transparency.take() {
      self.write_chunk(ChunkType::tRNS, &body);
    }

    if let Some(res) = self.image.resolution {
      let mut body = IoBuffer::new();
      body.write_u32(res.x);
      body.write_u32(res.y);
      body.write_u8(res.unit.into());
      self.write_chunk(ChunkType::pHYs, &body.into_vec());
    }

    let strategy = if self.image.color_type == ColorType::Indexed || self.image.depth < 8 {
      FilterStrategy::None
    } else {
      self.options.filter
    };
    let wire = self.image.data.to_wire();
    let filtered = encode_raster(&wire, self.image.geometry(), self.options.interlace, strategy);
    let compressed = self.compressor.compress(&filtered, self.options.level);
    debug!("{} filtered bytes compressed to {}", filtered.len(), compressed.len());
    for part in compressed.chunks(MAX_IDAT_LEN) {
      self.write_chunk(ChunkType::IDAT, part);
    }

    for body in core::mem::take(&mut self.text_chunks) {
      self.write_chunk(ChunkType::tEXt, &body);
    }

    self.write_chunk(ChunkType::IEND, &[]);
    self.cursor.into_vec()
  }

  fn write_chunk(&mut self, chunk: ChunkType, body: &[u8]) {
    trace!("writing {chunk}, {} bytes", body.len());
    self.cursor.write_u32(body.len() as u32);
    self.cursor.write_bytes(&chunk.to_bytes());
    self.cursor.write_bytes(body);
    write_crc(&mut self.cursor, body.len() + 4);
  }
}

/// The `tRNS` body the image needs, if any.
fn trns_body(image: &RawImage) -> PngResult<Option<Vec<u8>>> {
  let color_type = image.color_type;
  match (&image.transparency, color_type) {
    (None, ColorType::Indexed) => {
      // an RGBA palette carries its own alpha, trailing opaque entries can go
      let Some(Palette::Rgba(entries)) = &image.palette else { return Ok(None) };
      let mut alpha: Vec<u8> = entries.iter().map(|e| e[3]).collect();
      while alpha.last() == Some(&u8::MAX) {
        alpha.pop();
      }
      Ok(if alpha.is_empty() { None } else { Some(alpha) })
    }
    (None, _) => Ok(None),
    (Some(Transparency::PaletteAlpha(alpha)), ColorType::Indexed) => {
      let colors = image.palette.as_ref().map_or(0, Palette::len);
      if alpha.len() > colors {
        return Err(PngError::TransparencyCount {
          found: alpha.len(),
          limit: colors,
          limit_name: "palette colors",
        });
      }
      Ok(Some(alpha.clone()))
    }
    (Some(Transparency::Samples(samples)), ColorType::Greyscale | ColorType::Truecolor) => {
      let pixels = (image.width as usize).saturating_mul(image.height as usize);
      if samples.len() > pixels {
        return Err(PngError::TransparencyCount {
          found: samples.len(),
          limit: pixels,
          limit_name: "pixels",
        });
      }
      Ok(Some(samples.iter().flat_map(|s| s.to_be_bytes()).collect()))
    }
    (Some(_), color_type) => Err(PngError::TransparencyColorType { color_type }),
  }
}
