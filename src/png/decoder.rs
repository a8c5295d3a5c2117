use super::*;

/// Run-time decoder settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DecoderOptions {
  /// Verify the CRC of every chunk. Off by default, in which case the CRC
  /// bytes are skipped unread.
  pub check_crc: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
  Start,
  ChunkLoop,
  End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeMode {
  /// One image from the `IDAT` chunks. Animation chunks are skipped.
  Single,
  #[cfg(feature = "apng")]
  Animation,
}

/// Where the current run of data chunks goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataTarget {
  Image,
  #[cfg(feature = "apng")]
  Frame,
  /// A plain PNG read as an animation becomes a single full canvas frame.
  #[cfg(feature = "apng")]
  WholeCanvasFrame,
  /// The default image of an animation that isn't part of the animation.
  #[cfg(feature = "apng")]
  Discard,
}

/// Everything gathered while walking the chunks.
#[derive(Debug)]
struct DecodeContext<D> {
  state: DecodeState,
  header: Option<ImageHeader>,
  palette: Option<Palette>,
  transparency: Option<Transparency>,
  text: BTreeMap<String, String>,
  resolution: Option<Resolution>,
  icc_profile: Option<IccProfile>,
  inflator: D,
  seen_image_data: bool,
  writing_data_chunks: bool,
  data_target: DataTarget,
  #[cfg(feature = "apng")]
  animation: Option<AnimationControl>,
  /// Frame controls in stream order, with the decompressed data once their
  /// data chunks are done.
  #[cfg(feature = "apng")]
  frames: Vec<(FrameControl, Option<Vec<u8>>)>,
  #[cfg(feature = "apng")]
  next_sequence_number: u32,
}

/// Decodes one PNG data stream.
///
/// A decoder is built for one input and consumed by decoding it.
#[derive(Debug)]
pub struct PngDecoder<'b, D: Decompressor> {
  cursor: IoBuffer<'b>,
  options: DecoderOptions,
  mode: DecodeMode,
  ctx: DecodeContext<D>,
}
impl<'b, D: Decompressor + Default> PngDecoder<'b, D> {
  /// A decoder over the bytes, using a default `D`.
  #[inline]
  #[must_use]
  pub fn new(bytes: &'b [u8], options: DecoderOptions) -> Self {
    Self::with_decompressor(bytes, options, D::default())
  }

  /// A decoder over the bytes, feeding image data to `inflator`.
  #[must_use]
  pub fn with_decompressor(bytes: &'b [u8], options: DecoderOptions, inflator: D) -> Self {
    Self {
      cursor: IoBuffer::from_slice(bytes),
      options,
      mode: DecodeMode::Single,
      ctx: DecodeContext {
        state: DecodeState::Start,
        header: None,
        palette: None,
        transparency: None,
        text: BTreeMap::new(),
        resolution: None,
        icc_profile: None,
        inflator,
        seen_image_data: false,
        writing_data_chunks: false,
        data_target: DataTarget::Image,
        #[cfg(feature = "apng")]
        animation: None,
        #[cfg(feature = "apng")]
        frames: Vec::new(),
        #[cfg(feature = "apng")]
        next_sequence_number: 0,
      },
    }
  }

  /// Decodes a single image.
  ///
  /// For an animated PNG this is the default image, the one a viewer without
  /// animation support shows.
  pub fn decode(mut self) -> PngResult<RawImage> {
    self.mode = DecodeMode::Single;
    self.run()?;
    let header = self.header()?;
    let ctx = &mut self.ctx;
    ctx.inflator.push(&[], true);
    ctx.inflator.check()?;
    let data = ctx.inflator.take_result();
    let raster = decode_raster(&data, header.geometry(), header.interlaced)?;
    debug!("decoded {}x{} image, {} raster bytes", header.width, header.height, raster.len());
    Ok(RawImage {
      width: header.width,
      height: header.height,
      depth: header.depth,
      color_type: header.color_type,
      data: PixelData::from_wire(raster, header.depth),
      palette: ctx.palette.take(),
      transparency: ctx.transparency.take(),
      text: core::mem::take(&mut ctx.text),
      resolution: ctx.resolution,
      icc_profile: ctx.icc_profile.take(),
    })
  }

  /// Decodes every frame of an animation.
  ///
  /// A PNG without an `acTL` chunk decodes as an animation of one frame.
  #[cfg(feature = "apng")]
  #[cfg_attr(docs_rs, doc(cfg(feature = "apng")))]
  pub fn decode_apng(mut self) -> PngResult<AnimatedImage> {
    self.mode = DecodeMode::Animation;
    self.run()?;
    let header = self.header()?;
    let ctx = &mut self.ctx;
    let mut frames = Vec::with_capacity(ctx.frames.len());
    for (fc, data) in core::mem::take(&mut ctx.frames) {
      let data = data.ok_or(PngError::ChunkOrder {
        chunk: ChunkType::fcTL,
        reason: "frame control without frame data",
      })?;
      frames.push((fc, data));
    }
    let control = ctx.animation.unwrap_or(AnimationControl { num_frames: 1, num_plays: 0 });
    if control.num_frames as usize != frames.len() {
      return Err(PngError::FrameCount { declared: control.num_frames, found: frames.len() });
    }
    let frames = compose_frames(&header, frames)?;
    debug!("decoded {} frames of {}x{}", frames.len(), header.width, header.height);
    Ok(AnimatedImage {
      width: header.width,
      height: header.height,
      depth: header.depth,
      color_type: header.color_type,
      num_frames: control.num_frames,
      num_plays: control.num_plays,
      frames,
      palette: ctx.palette.take(),
      transparency: ctx.transparency.take(),
      text: core::mem::take(&mut ctx.text),
      resolution: ctx.resolution,
      icc_profile: ctx.icc_profile.take(),
    })
  }

  fn header(&self) -> PngResult<ImageHeader> {
    self.ctx.header.ok_or(PngError::ChunkOrder { chunk: ChunkType::IHDR, reason: "missing" })
  }

  /// Walks the state machine to the end.
  fn run(&mut self) -> PngResult<()> {
    loop {
      match self.ctx.state {
        DecodeState::Start => {
          check_signature(&mut self.cursor)?;
          self.ctx.state = DecodeState::ChunkLoop;
        }
        DecodeState::ChunkLoop => self.next_chunk()?,
        DecodeState::End => return Ok(()),
      }
    }
  }

  fn next_chunk(&mut self) -> PngResult<()> {
    let length = self.cursor.read_u32()?;
    let chunk = ChunkType::from(self.cursor.read_array::<4>()?);
    let start = self.cursor.offset();
    trace!("chunk {chunk}, {length} bytes at offset {start}");

    if self.ctx.header.is_none() && chunk != ChunkType::IHDR {
      return Err(PngError::ChunkOrder { chunk, reason: "the header must be the first chunk" });
    }
    let is_data = matches!(chunk, ChunkType::IDAT | ChunkType::fdAT);
    if self.ctx.writing_data_chunks && !is_data {
      self.finish_data_run()?;
    }

    self.decode_chunk(chunk, length)?;

    let consumed = self.cursor.offset() - start;
    if consumed != length as usize {
      return Err(PngError::ChunkLength { chunk, declared: length, consumed });
    }
    if self.options.check_crc {
      check_crc(&mut self.cursor, length as usize + 4, chunk)
    } else {
      self.cursor.skip(4)
    }
  }

  fn decode_chunk(&mut self, chunk: ChunkType, length: u32) -> PngResult<()> {
    match chunk {
      ChunkType::IHDR => {
        if self.ctx.header.is_some() {
          return Err(PngError::ChunkOrder { chunk, reason: "duplicate header" });
        }
        let header = ImageHeader::read(&mut self.cursor)?;
        debug!("header: {header:?}");
        self.ctx.header = Some(header);
      }
      ChunkType::PLTE => self.decode_plte(length)?,
      ChunkType::IDAT => self.decode_idat(length)?,
      ChunkType::IEND => {
        if !self.ctx.seen_image_data {
          return Err(PngError::ChunkOrder { chunk, reason: "no image data before the end" });
        }
        self.ctx.state = DecodeState::End;
      }
      ChunkType::tRNS => self.decode_trns(length)?,
      ChunkType::iCCP => self.decode_iccp(length)?,
      ChunkType::tEXt => read_text_chunk(&mut self.cursor, length, &mut self.ctx.text)?,
      ChunkType::pHYs => {
        let x = self.cursor.read_u32()?;
        let y = self.cursor.read_u32()?;
        let unit = ResolutionUnit::from(self.cursor.read_u8()?);
        self.ctx.resolution = Some(Resolution { x, y, unit });
      }
      #[cfg(feature = "apng")]
      ChunkType::acTL if self.mode == DecodeMode::Animation => {
        if self.ctx.seen_image_data {
          return Err(PngError::ChunkOrder { chunk, reason: "animation control after image data" });
        }
        let control = AnimationControl::read(&mut self.cursor)?;
        debug!("animation: {control:?}");
        self.ctx.animation = Some(control);
      }
      #[cfg(feature = "apng")]
      ChunkType::fcTL if self.mode == DecodeMode::Animation => {
        let fc = FrameControl::read(&mut self.cursor)?;
        self.check_sequence(chunk, fc.sequence_number);
        let header = self.header()?;
        fc.check_fits(header.width, header.height)?;
        if matches!(self.ctx.frames.last(), Some((_, None))) {
          return Err(PngError::ChunkOrder { chunk, reason: "frame control without frame data" });
        }
        self.ctx.frames.push((fc, None));
      }
      #[cfg(feature = "apng")]
      ChunkType::fdAT if self.mode == DecodeMode::Animation => {
        let sequence_number = self.cursor.read_u32()?;
        self.check_sequence(chunk, sequence_number);
        if !matches!(self.ctx.frames.last(), Some((_, None))) {
          return Err(PngError::ChunkOrder { chunk, reason: "frame data without a frame control" });
        }
        let data_len = (length as usize).checked_sub(4).ok_or(PngError::ChunkLength {
          chunk,
          declared: length,
          consumed: 4,
        })?;
        self.ctx.data_target = DataTarget::Frame;
        self.ctx.writing_data_chunks = true;
        let data = self.cursor.read_bytes(data_len)?;
        self.ctx.inflator.push(data, false);
        self.ctx.inflator.check()?;
      }
      _ => {
        if chunk.is_critical() {
          warn!("skipping unknown critical chunk {chunk}");
        }
        self.cursor.skip(length as usize)?;
      }
    }
    Ok(())
  }

  fn decode_plte(&mut self, length: u32) -> PngResult<()> {
    let chunk = ChunkType::PLTE;
    let header = self.header()?;
    if matches!(header.color_type, ColorType::Greyscale | ColorType::GreyscaleAlpha) {
      return Err(PngError::ChunkOrder { chunk, reason: "palette with a greyscale color type" });
    }
    if self.ctx.seen_image_data {
      return Err(PngError::ChunkOrder { chunk, reason: "palette after image data" });
    }
    if self.ctx.palette.is_some() {
      return Err(PngError::ChunkOrder { chunk, reason: "duplicate palette" });
    }
    let body = self.cursor.read_bytes(length as usize)?;
    let palette = Palette::from_plte(body)?;
    trace!("palette of {} colors", palette.len());
    self.ctx.palette = Some(palette);
    Ok(())
  }

  fn decode_idat(&mut self, length: u32) -> PngResult<()> {
    let header = self.header()?;
    if header.color_type == ColorType::Indexed && self.ctx.palette.is_none() {
      return Err(PngError::MissingPalette);
    }
    if !self.ctx.writing_data_chunks {
      self.ctx.data_target = self.idat_target()?;
    }
    self.ctx.seen_image_data = true;
    self.ctx.writing_data_chunks = true;
    let data = self.cursor.read_bytes(length as usize)?;
    #[cfg(feature = "apng")]
    if self.ctx.data_target == DataTarget::Discard {
      return Ok(());
    }
    self.ctx.inflator.push(data, false);
    self.ctx.inflator.check()
  }

  /// Picks where a new run of `IDAT` chunks goes.
  fn idat_target(&self) -> PngResult<DataTarget> {
    match self.mode {
      DecodeMode::Single => Ok(DataTarget::Image),
      #[cfg(feature = "apng")]
      DecodeMode::Animation => match (self.ctx.frames.last(), self.ctx.animation) {
        (Some((_, None)), _) => Ok(DataTarget::Frame),
        (None, None) => Ok(DataTarget::WholeCanvasFrame),
        (None, Some(_)) => {
          debug!("the default image is not part of the animation");
          Ok(DataTarget::Discard)
        }
        (Some((_, Some(_))), _) => {
          Err(PngError::ChunkOrder {
            chunk: ChunkType::IDAT,
            reason: "image data after frame data",
          })
        }
      },
    }
  }

  /// Ends a run of data chunks. In animation mode the stream so far is one
  /// frame's data, so it's finished and handed to that frame.
  fn finish_data_run(&mut self) -> PngResult<()> {
    self.ctx.writing_data_chunks = false;
    match self.ctx.data_target {
      DataTarget::Image => Ok(()),
      #[cfg(feature = "apng")]
      DataTarget::Discard => Ok(()),
      #[cfg(feature = "apng")]
      DataTarget::Frame | DataTarget::WholeCanvasFrame => {
        let ctx = &mut self.ctx;
        ctx.inflator.push(&[], true);
        ctx.inflator.check()?;
        let data = ctx.inflator.take_result();
        ctx.inflator.reset();
        if ctx.data_target == DataTarget::WholeCanvasFrame {
          let header = ctx
            .header
            .ok_or(PngError::ChunkOrder { chunk: ChunkType::IHDR, reason: "missing" })?;
          ctx.frames.push((FrameControl::full_canvas(header.width, header.height), Some(data)));
        } else if let Some((fc, slot @ None)) = ctx.frames.last_mut() {
          debug!("frame {} has {} bytes of image data", fc.sequence_number, data.len());
          *slot = Some(data);
        }
        Ok(())
      }
    }
  }

  #[cfg(feature = "apng")]
  fn check_sequence(&mut self, chunk: ChunkType, sequence_number: u32) {
    if sequence_number != self.ctx.next_sequence_number {
      warn!(
        "{chunk} has sequence number {sequence_number}, expected {}",
        self.ctx.next_sequence_number
      );
    }
    self.ctx.next_sequence_number = sequence_number.wrapping_add(1);
  }

  fn decode_trns(&mut self, length: u32) -> PngResult<()> {
    let header = self.header()?;
    let length = length as usize;
    match header.color_type {
      ColorType::Greyscale | ColorType::Truecolor => {
        if length % 2 != 0 {
          return Err(PngError::TransparencyLength { length });
        }
        let count = length / 2;
        let pixels = (header.width as usize).saturating_mul(header.height as usize);
        if count > pixels {
          return Err(PngError::TransparencyCount {
            found: count,
            limit: pixels,
            limit_name: "pixels",
          });
        }
        let mut samples = Vec::with_capacity(count);
        for _ in 0..count {
          samples.push(self.cursor.read_u16()?);
        }
        self.ctx.transparency = Some(Transparency::Samples(samples));
      }
      ColorType::Indexed => {
        let colors = self.ctx.palette.as_ref().map_or(0, Palette::len);
        if length > colors {
          return Err(PngError::TransparencyCount {
            found: length,
            limit: colors,
            limit_name: "palette colors",
          });
        }
        let alpha = self.cursor.read_bytes(length)?.to_vec();
        if let Some(palette) = self.ctx.palette.as_mut() {
          *palette = palette.with_alpha(&alpha);
        }
        self.ctx.transparency = Some(Transparency::PaletteAlpha(alpha));
      }
      color_type => return Err(PngError::TransparencyColorType { color_type }),
    }
    Ok(())
  }

  fn decode_iccp(&mut self, length: u32) -> PngResult<()> {
    let start = self.cursor.offset();
    let chunk_end = start + length as usize;
    let name = read_keyword(&mut self.cursor, chunk_end)?;
    let method = self.cursor.read_u8()?;
    if method != 0 {
      return Err(PngError::InvalidHeader {
        field: "iCCP compression method",
        value: u32::from(method),
      });
    }
    let compressed_len = chunk_end.checked_sub(self.cursor.offset()).ok_or(PngError::ChunkLength {
      chunk: ChunkType::iCCP,
      declared: length,
      consumed: self.cursor.offset() - start,
    })?;
    let compressed = self.cursor.read_bytes(compressed_len)?;
    let profile = D::default().decompress(compressed)?;
    trace!("ICC profile {name:?}, {} bytes", profile.len());
    self.ctx.icc_profile = Some(IccProfile { name, profile });
    Ok(())
  }
}
