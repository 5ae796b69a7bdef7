//! Data record wire format and sink-side rendering.
//!
//! ## Record Wire Format
//!
//! ```text
//! "<node_id>,<light>,<temperature>\0"   (three fields)
//! "<node_id>,<light>\0"                 (two fields, temperature omitted)
//! ```
//!
//! ASCII, comma-separated, NUL-terminated. No escaping, no length prefix;
//! the NUL is the only framing. `node_id` is the small non-negative integer
//! derived from the originator's link address.
//!
//! Payloads with any other shape are rejected with a [`DecodeError`] -
//! counted and traced by the receiving node, never fatal.

use core::fmt;

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

/// Decoding error types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodeError {
    /// Payload is empty.
    Empty,
    /// Payload does not end with the NUL terminator.
    MissingTerminator,
    /// Payload is not valid ASCII/UTF-8 text.
    NotText,
    /// Wrong number of comma-separated fields (must be 2 or 3).
    FieldCount(usize),
    /// A field failed to parse as an integer.
    InvalidNumber,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Empty => write!(f, "empty payload"),
            DecodeError::MissingTerminator => write!(f, "missing NUL terminator"),
            DecodeError::NotText => write!(f, "payload is not text"),
            DecodeError::FieldCount(n) => write!(f, "unexpected field count: {}", n),
            DecodeError::InvalidNumber => write!(f, "field is not a number"),
        }
    }
}

/// A decoded sensor record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataRecord {
    /// Originating node's integer id.
    pub node_id: u16,
    /// Light reading.
    pub light: i32,
    /// Temperature reading; some variants omit it.
    pub temperature: Option<i32>,
}

impl DataRecord {
    /// Encode to the ASCII wire form, including the NUL terminator.
    pub fn encode_to_vec(&self) -> Vec<u8> {
        let text = match self.temperature {
            Some(t) => format!("{},{},{}", self.node_id, self.light, t),
            None => format!("{},{}", self.node_id, self.light),
        };
        let mut buf = text.into_bytes();
        buf.push(0);
        buf
    }

    /// Decode from a received payload.
    pub fn decode_from_slice(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.is_empty() {
            return Err(DecodeError::Empty);
        }
        let Some(text) = buf.strip_suffix(&[0]) else {
            return Err(DecodeError::MissingTerminator);
        };
        if text.is_empty() {
            return Err(DecodeError::Empty);
        }
        let text = core::str::from_utf8(text).map_err(|_| DecodeError::NotText)?;

        let mut fields = text.split(',');
        let node_id = parse_field::<u16>(fields.next())?;
        let light = parse_field::<i32>(fields.next())?;
        let temperature = match fields.next() {
            Some(field) => Some(
                field
                    .parse::<i32>()
                    .map_err(|_| DecodeError::InvalidNumber)?,
            ),
            None => None,
        };

        let extra = fields.count();
        if extra > 0 {
            let present = if temperature.is_some() { 3 } else { 2 };
            return Err(DecodeError::FieldCount(present + extra));
        }

        Ok(Self {
            node_id,
            light,
            temperature,
        })
    }
}

fn parse_field<T: core::str::FromStr>(field: Option<&str>) -> Result<T, DecodeError> {
    match field {
        Some(s) if !s.is_empty() => s.parse().map_err(|_| DecodeError::InvalidNumber),
        Some(_) => Err(DecodeError::InvalidNumber),
        None => Err(DecodeError::FieldCount(1)),
    }
}

/// Render a record as a labeled console table:
///
/// ```text
/// nodeID     light      temperature
/// 42         180        25
/// ```
///
/// Columns are 10 characters wide, left-justified; the temperature column is
/// omitted for two-field records.
pub fn render_rows(record: &DataRecord) -> String {
    match record.temperature {
        Some(t) => format!(
            "{:<10} {:<10} {:<10}\n{:<10} {:<10} {:<10}\n",
            "nodeID", "light", "temperature", record.node_id, record.light, t
        ),
        None => format!(
            "{:<10} {:<10}\n{:<10} {:<10}\n",
            "nodeID", "light", record.node_id, record.light
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_three_fields() {
        let record = DataRecord {
            node_id: 42,
            light: 180,
            temperature: Some(25),
        };
        assert_eq!(record.encode_to_vec(), b"42,180,25\0");
    }

    #[test]
    fn test_encode_two_fields() {
        let record = DataRecord {
            node_id: 7,
            light: 99,
            temperature: None,
        };
        assert_eq!(record.encode_to_vec(), b"7,99\0");
    }

    #[test]
    fn test_decode_three_fields() {
        let record = DataRecord::decode_from_slice(b"42,180,25\0").unwrap();
        assert_eq!(record.node_id, 42);
        assert_eq!(record.light, 180);
        assert_eq!(record.temperature, Some(25));
    }

    #[test]
    fn test_decode_two_fields() {
        let record = DataRecord::decode_from_slice(b"42,180\0").unwrap();
        assert_eq!(record.temperature, None);
    }

    #[test]
    fn test_decode_negative_temperature() {
        let record = DataRecord::decode_from_slice(b"3,10,-7\0").unwrap();
        assert_eq!(record.temperature, Some(-7));
    }

    #[test]
    fn test_reject_empty() {
        assert_eq!(DataRecord::decode_from_slice(b""), Err(DecodeError::Empty));
        assert_eq!(
            DataRecord::decode_from_slice(b"\0"),
            Err(DecodeError::Empty)
        );
    }

    #[test]
    fn test_reject_missing_terminator() {
        assert_eq!(
            DataRecord::decode_from_slice(b"42,180,25"),
            Err(DecodeError::MissingTerminator)
        );
    }

    #[test]
    fn test_reject_one_field() {
        assert_eq!(
            DataRecord::decode_from_slice(b"42\0"),
            Err(DecodeError::FieldCount(1))
        );
    }

    #[test]
    fn test_reject_four_fields() {
        assert_eq!(
            DataRecord::decode_from_slice(b"42,180,25,9\0"),
            Err(DecodeError::FieldCount(4))
        );
    }

    #[test]
    fn test_reject_non_numeric() {
        assert_eq!(
            DataRecord::decode_from_slice(b"42,bright\0"),
            Err(DecodeError::InvalidNumber)
        );
        assert_eq!(
            DataRecord::decode_from_slice(b",180\0"),
            Err(DecodeError::InvalidNumber)
        );
    }

    #[test]
    fn test_roundtrip() {
        let record = DataRecord {
            node_id: 513,
            light: -1,
            temperature: Some(0),
        };
        let decoded = DataRecord::decode_from_slice(&record.encode_to_vec()).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_render_three_columns() {
        let record = DataRecord {
            node_id: 42,
            light: 180,
            temperature: Some(25),
        };
        assert_eq!(
            render_rows(&record),
            "nodeID     light      temperature\n42         180        25        \n"
        );
    }

    #[test]
    fn test_render_two_columns() {
        let record = DataRecord {
            node_id: 127,
            light: 180,
            temperature: None,
        };
        assert_eq!(render_rows(&record), "nodeID     light     \n127        180       \n");
    }
}
