use super::*;

/// Longest keyword a `tEXt` or `iCCP` chunk allows.
pub const MAX_KEYWORD_LEN: usize = 79;

#[inline]
const fn is_keyword_byte(b: u8) -> bool {
  matches!(b, 32..=126 | 161..=255)
}

/// Checks a keyword: 1 to 79 printable latin-1 characters.
pub fn validate_keyword(keyword: &str) -> PngResult<()> {
  let count = keyword.chars().count();
  if count == 0 || count > MAX_KEYWORD_LEN {
    return Err(PngError::InvalidText("keyword length must be between 1 and 79"));
  }
  let printable = keyword.chars().all(|c| u8::try_from(c).is_ok_and(is_keyword_byte));
  if !printable {
    return Err(PngError::InvalidText("keyword must be printable latin1 text"));
  }
  Ok(())
}

/// Each byte is one latin-1 character.
#[must_use]
pub fn latin1_to_string(bytes: &[u8]) -> String {
  bytes.iter().map(|&b| char::from(b)).collect()
}

/// Encodes text as latin-1, failing on characters past U+00FF.
pub fn string_to_latin1(text: &str) -> PngResult<Vec<u8>> {
  text
    .chars()
    .map(|c| u8::try_from(c).map_err(|_| PngError::InvalidText("invalid latin1 text")))
    .collect()
}

/// Reads a null-terminated keyword that must end before `chunk_end`.
pub(crate) fn read_keyword<C: ByteCursor>(cursor: &mut C, chunk_end: usize) -> PngResult<String> {
  cursor.mark();
  let mut len = 0;
  loop {
    if cursor.offset() >= chunk_end {
      return Err(PngError::InvalidText("keyword is not null-terminated"));
    }
    if cursor.read_u8()? == 0 {
      break;
    }
    len += 1;
  }
  cursor.reset();
  let keyword = latin1_to_string(cursor.read_bytes(len)?);
  cursor.skip(1)?;
  validate_keyword(&keyword)?;
  Ok(keyword)
}

/// Reads a `tEXt` body into the map. A repeated keyword overwrites.
pub(crate) fn read_text_chunk<C: ByteCursor>(
  cursor: &mut C, length: u32, text: &mut BTreeMap<String, String>,
) -> PngResult<()> {
  let chunk_end = cursor.offset() + length as usize;
  let keyword = read_keyword(cursor, chunk_end)?;
  let value = latin1_to_string(cursor.read_bytes(chunk_end - cursor.offset())?);
  trace!("tEXt {keyword:?}: {} chars", value.len());
  text.insert(keyword, value);
  Ok(())
}

/// A `tEXt` body: keyword, NUL, value.
pub(crate) fn text_chunk_body(keyword: &str, value: &str) -> PngResult<Vec<u8>> {
  validate_keyword(keyword)?;
  let mut body = string_to_latin1(keyword)?;
  body.push(0);
  body.extend(string_to_latin1(value)?);
  Ok(body)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_keyword_rules() {
    assert!(validate_keyword("Title").is_ok());
    assert!(validate_keyword("Café").is_ok());
    assert!(validate_keyword("").is_err());
    assert!(validate_keyword(&"k".repeat(80)).is_err());
    assert!(validate_keyword(&"k".repeat(79)).is_ok());
    assert!(validate_keyword("tab\there").is_err());
    assert!(validate_keyword("snow\u{2603}").is_err());
  }

  #[test]
  fn test_read_text_chunk() {
    let body = b"Author\0Zo\xEB";
    let mut c = IoBuffer::from_slice(body);
    let mut map = BTreeMap::new();
    read_text_chunk(&mut c, body.len() as u32, &mut map).unwrap();
    assert_eq!(c.offset(), body.len());
    assert_eq!(map.get("Author").map(String::as_str), Some("Zoë"));

    let mut c = IoBuffer::from_slice(b"Author\0Alt");
    read_text_chunk(&mut c, 10, &mut map).unwrap();
    assert_eq!(map.len(), 1);
    assert_eq!(map["Author"], "Alt");
  }

  #[test]
  fn test_unterminated_keyword() {
    let mut c = IoBuffer::from_slice(b"NoNullHere\0");
    let mut map = BTreeMap::new();
    // the NUL is past the chunk's end
    assert_eq!(
      read_text_chunk(&mut c, 10, &mut map),
      Err(PngError::InvalidText("keyword is not null-terminated"))
    );
  }

  #[test]
  fn test_text_chunk_body() {
    assert_eq!(text_chunk_body("a", "Zoë").unwrap(), b"a\0Zo\xEB");
    assert_eq!(
      text_chunk_body("a", "\u{2603}"),
      Err(PngError::InvalidText("invalid latin1 text"))
    );
  }
}
