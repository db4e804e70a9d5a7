use thiserror::Error;

use crate::{BDict, BValue};

/// Errors decoding a bencoded byte slice.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("invalid length prefix at offset {offset}")]
    InvalidLength { offset: usize },
    #[error("invalid integer at offset {offset}")]
    InvalidInteger { offset: usize },
    #[error("unrecognised value tag {tag:#04x} at offset {offset}")]
    UnknownTag { tag: u8, offset: usize },
    #[error("dictionary key at offset {offset} is not a byte string")]
    NonStringKey { offset: usize },
    #[error("trailing data after a complete value at offset {offset}")]
    TrailingData { offset: usize },
}

/// Decodes a single bencoded value from `input`.
///
/// The entire input must be consumed by exactly one value; trailing bytes
/// are an error, since wire messages in this tracker are always a single
/// bencoded dictionary with no framing around it.
pub fn decode(input: &[u8]) -> Result<BValue, DecodeError> {
    let mut cursor = 0;
    let value = parse_value(input, &mut cursor)?;
    if cursor != input.len() {
        return Err(DecodeError::TrailingData { offset: cursor });
    }
    Ok(value)
}

fn parse_value(input: &[u8], cursor: &mut usize) -> Result<BValue, DecodeError> {
    match peek(input, *cursor)? {
        b'i' => parse_integer(input, cursor),
        b'l' => parse_list(input, cursor),
        b'd' => parse_dict(input, cursor),
        b'0'..=b'9' => parse_bytes(input, cursor).map(BValue::Bytes),
        tag => Err(DecodeError::UnknownTag { tag, offset: *cursor }),
    }
}

fn peek(input: &[u8], cursor: usize) -> Result<u8, DecodeError> {
    input.get(cursor).copied().ok_or(DecodeError::UnexpectedEof)
}

fn parse_integer(input: &[u8], cursor: &mut usize) -> Result<BValue, DecodeError> {
    let start = *cursor;
    *cursor += 1; // consume 'i'
    let end = find(input, b'e', *cursor).ok_or(DecodeError::UnexpectedEof)?;
    let digits = &input[*cursor..end];
    let text = std::str::from_utf8(digits).map_err(|_| DecodeError::InvalidInteger { offset: start })?;
    let value: i64 = text.parse().map_err(|_| DecodeError::InvalidInteger { offset: start })?;
    *cursor = end + 1;
    Ok(BValue::Integer(value))
}

fn parse_bytes(input: &[u8], cursor: &mut usize) -> Result<Vec<u8>, DecodeError> {
    let start = *cursor;
    let colon = find(input, b':', start).ok_or(DecodeError::InvalidLength { offset: start })?;
    let digits = &input[start..colon];
    let text = std::str::from_utf8(digits).map_err(|_| DecodeError::InvalidLength { offset: start })?;
    let len: usize = text.parse().map_err(|_| DecodeError::InvalidLength { offset: start })?;

    let data_start = colon + 1;
    let data_end = data_start.checked_add(len).ok_or(DecodeError::InvalidLength { offset: start })?;
    if data_end > input.len() {
        return Err(DecodeError::UnexpectedEof);
    }

    *cursor = data_end;
    Ok(input[data_start..data_end].to_vec())
}

fn parse_list(input: &[u8], cursor: &mut usize) -> Result<BValue, DecodeError> {
    *cursor += 1; // consume 'l'
    let mut items = Vec::new();
    loop {
        if peek(input, *cursor)? == b'e' {
            *cursor += 1;
            return Ok(BValue::List(items));
        }
        items.push(parse_value(input, cursor)?);
    }
}

fn parse_dict(input: &[u8], cursor: &mut usize) -> Result<BValue, DecodeError> {
    *cursor += 1; // consume 'd'
    let mut dict = BDict::new();
    loop {
        if peek(input, *cursor)? == b'e' {
            *cursor += 1;
            return Ok(BValue::Dict(dict));
        }
        let key_offset = *cursor;
        if !matches!(peek(input, *cursor)?, b'0'..=b'9') {
            return Err(DecodeError::NonStringKey { offset: key_offset });
        }
        let key = parse_bytes(input, cursor)?;
        let value = parse_value(input, cursor)?;
        dict.insert(key, value);
    }
}

fn find(input: &[u8], needle: u8, from: usize) -> Option<usize> {
    input[from..].iter().position(|&b| b == needle).map(|pos| pos + from)
}

#[cfg(test)]
mod tests {
    use super::{decode, DecodeError};
    use crate::BValue;

    #[test]
    fn it_decodes_a_byte_string() {
        assert_eq!(decode(b"4:spam").unwrap(), BValue::from("spam"));
    }

    #[test]
    fn it_decodes_an_integer() {
        assert_eq!(decode(b"i42e").unwrap(), BValue::Integer(42));
    }

    #[test]
    fn it_decodes_a_negative_integer() {
        assert_eq!(decode(b"i-42e").unwrap(), BValue::Integer(-42));
    }

    #[test]
    fn it_decodes_a_list() {
        let decoded = decode(b"l4:spam4:eggse").unwrap();
        assert_eq!(decoded, BValue::List(vec![BValue::from("spam"), BValue::from("eggs")]));
    }

    #[test]
    fn it_decodes_a_dictionary() {
        let decoded = decode(b"d3:cow3:moo4:spam4:eggse").unwrap();
        let dict = decoded.as_dict().unwrap();
        assert_eq!(dict.get(b"cow"), Some(&BValue::from("moo")));
        assert_eq!(dict.get(b"spam"), Some(&BValue::from("eggs")));
    }

    #[test]
    fn it_rejects_truncated_input() {
        assert_eq!(decode(b"5:spam").unwrap_err(), DecodeError::UnexpectedEof);
    }

    #[test]
    fn it_rejects_an_unterminated_integer() {
        assert!(decode(b"i42").is_err());
    }

    #[test]
    fn it_rejects_trailing_data() {
        assert!(matches!(decode(b"i1ei2e"), Err(DecodeError::TrailingData { .. })));
    }

    #[test]
    fn it_rejects_a_non_string_dictionary_key() {
        assert!(matches!(decode(b"di1ei2ee"), Err(DecodeError::NonStringKey { .. })));
    }
}
