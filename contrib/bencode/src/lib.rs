//! Bencode (BEP 3) encoding and decoding.
//!
//! Bencode has exactly four value types: byte strings, signed 64-bit
//! integers, lists, and dictionaries. Byte strings are raw bytes, not UTF-8.
//! Dictionary keys are always byte strings and are **always emitted in
//! ascending lexicographic byte order** on encode, regardless of the order
//! they were inserted in — this is required for canonical output and is not
//! optional.
//!
//! ```rust
//! use privateer_tracker_contrib_bencode::BValue;
//!
//! let value = BValue::Integer(42);
//! assert_eq!(value.encode(), b"i42e");
//!
//! let spam = BValue::from(b"spam".to_vec());
//! assert_eq!(spam.encode(), b"4:spam");
//! ```
mod decode;
mod dict;
mod encode;

pub use decode::{decode, DecodeError};
pub use dict::BDict;

/// A decoded (or to-be-encoded) bencode value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BValue {
    Bytes(Vec<u8>),
    Integer(i64),
    List(Vec<BValue>),
    Dict(BDict),
}

impl BValue {
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            BValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            BValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[BValue]> {
        match self {
            BValue::List(l) => Some(l),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_dict(&self) -> Option<&BDict> {
        match self {
            BValue::Dict(d) => Some(d),
            _ => None,
        }
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        encode::write(self, &mut out);
        out
    }
}

impl From<Vec<u8>> for BValue {
    fn from(bytes: Vec<u8>) -> Self {
        BValue::Bytes(bytes)
    }
}

impl From<&str> for BValue {
    fn from(s: &str) -> Self {
        BValue::Bytes(s.as_bytes().to_vec())
    }
}

impl From<String> for BValue {
    fn from(s: String) -> Self {
        BValue::Bytes(s.into_bytes())
    }
}

impl From<i64> for BValue {
    fn from(i: i64) -> Self {
        BValue::Integer(i)
    }
}

/// Builds a [`BValue::Dict`] from `key => value` pairs. Keys are sorted on
/// encode, not on construction, so insertion order here is irrelevant.
#[macro_export]
macro_rules! ben_dict {
    ( $($key:expr => $val:expr),* $(,)? ) => {{
        let mut dict = $crate::BDict::new();
        $( dict.insert($key.as_bytes().to_vec(), $val); )*
        $crate::BValue::Dict(dict)
    }};
}

/// Builds a [`BValue::List`] from a list of values.
#[macro_export]
macro_rules! ben_list {
    ( $($val:expr),* $(,)? ) => {{
        $crate::BValue::List(vec![$($val),*])
    }};
}

#[cfg(test)]
mod tests {
    use super::{decode, BValue};

    #[test]
    fn it_encodes_a_byte_string() {
        assert_eq!(BValue::from("spam").encode(), b"4:spam");
    }

    #[test]
    fn it_encodes_an_integer() {
        assert_eq!(BValue::Integer(42).encode(), b"i42e");
    }

    #[test]
    fn it_encodes_a_negative_integer() {
        assert_eq!(BValue::Integer(-42).encode(), b"i-42e");
    }

    #[test]
    fn it_encodes_a_dictionary_with_keys_in_ascending_order_regardless_of_insertion_order() {
        let value = ben_dict! {
            "spam" => BValue::from("eggs"),
            "cow" => BValue::from("moo"),
        };
        assert_eq!(value.encode(), b"d3:cow3:moo4:spam4:eggse");
    }

    #[test]
    fn it_encodes_a_list() {
        let value = ben_list![BValue::from("spam"), BValue::from("eggs")];
        assert_eq!(value.encode(), b"l4:spam4:eggse");
    }

    #[test]
    fn it_roundtrips_every_well_formed_value() {
        let value = ben_dict! {
            "complete" => BValue::Integer(5),
            "peers" => BValue::from(vec![0u8, 1, 2, 3, 4, 5]),
            "list" => BValue::List(vec![BValue::Integer(1), BValue::Integer(2)]),
        };

        let encoded = value.encode();
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(decoded.encode(), encoded);
    }

    #[test]
    fn it_preserves_non_utf8_bytes_in_byte_strings() {
        let raw = vec![0xff, 0x00, 0x9e, b'a'];
        let value = BValue::from(raw.clone());
        let encoded = value.encode();
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded.as_bytes().unwrap(), raw.as_slice());
    }
}
