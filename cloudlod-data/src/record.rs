//! Fixed-width binary point records.
//!
//! A record is seven consecutive IEEE-754 doubles in the order
//! `x, y, z, r, g, b, a`, always little-endian:
//!
//! ```text
//! ┌──────┬──────┬──────┬──────┬──────┬──────┬──────┐
//! │ x:f64│ y:f64│ z:f64│ r:f64│ g:f64│ b:f64│ a:f64│
//! │ 8B   │ 8B   │ 8B   │ 8B   │ 8B   │ 8B   │ 8B   │
//! └──────┴──────┴──────┴──────┴──────┴──────┴──────┘
//! ```
//!
//! There is no header, footer or count field in a point file; the record
//! count is the file length divided by [`RECORD_SIZE`].

use crate::error::FormatError;
use crate::types::Point;
use glam::DVec3;

/// Number of doubles per record.
pub const RECORD_FIELDS: usize = 7;

/// Size in bytes of one encoded point.
pub const RECORD_SIZE: usize = RECORD_FIELDS * std::mem::size_of::<f64>();

fn fields(point: &Point) -> [f64; RECORD_FIELDS] {
    [
        point.position.x,
        point.position.y,
        point.position.z,
        point.color.x,
        point.color.y,
        point.color.z,
        point.alpha,
    ]
}

/// Encode a point into a fixed-size block.
pub fn encode(point: &Point) -> [u8; RECORD_SIZE] {
    let mut block = [0u8; RECORD_SIZE];
    for (chunk, value) in block.chunks_exact_mut(8).zip(fields(point)) {
        chunk.copy_from_slice(&value.to_le_bytes());
    }
    block
}

/// Append the encoding of a point to a buffer.
pub fn encode_into(point: &Point, out: &mut Vec<u8>) {
    out.extend_from_slice(&encode(point));
}

/// Decode the first record of `bytes`.
///
/// Trailing bytes beyond one record are ignored.
pub fn decode(bytes: &[u8]) -> Result<Point, FormatError> {
    if bytes.len() < RECORD_SIZE {
        return Err(FormatError::Truncated {
            needed: RECORD_SIZE,
            available: bytes.len(),
        });
    }

    Ok(decode_record(&bytes[..RECORD_SIZE]))
}

/// Decode a slice already known to hold at least one full record.
pub(crate) fn decode_record(bytes: &[u8]) -> Point {
    let mut values = [0.0f64; RECORD_FIELDS];
    for (value, chunk) in values.iter_mut().zip(bytes.chunks_exact(8)) {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(chunk);
        *value = f64::from_le_bytes(raw);
    }

    let [x, y, z, r, g, b, a] = values;
    Point::new(DVec3::new(x, y, z), DVec3::new(r, g, b), a)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(p: &Point) -> [u64; RECORD_FIELDS] {
        fields(p).map(f64::to_bits)
    }

    #[test]
    fn test_record_size() {
        assert_eq!(RECORD_SIZE, 56);
    }

    #[test]
    fn test_decode_encode_is_bit_exact() {
        let points = [
            Point::new(DVec3::new(1.5, -2.25, 1e300), DVec3::new(0.1, 0.2, 0.3), 0.75),
            Point::new(DVec3::new(-0.0, f64::MIN_POSITIVE, f64::MAX), DVec3::ZERO, 1.0),
            Point::new(
                DVec3::new(f64::INFINITY, f64::NEG_INFINITY, 0.0),
                DVec3::splat(1.0 / 3.0),
                0.0,
            ),
        ];
        for p in &points {
            let decoded = decode(&encode(p)).unwrap();
            assert_eq!(bits(&decoded), bits(p));
        }
    }

    #[test]
    fn test_field_order_and_byte_order() {
        let p = Point::new(DVec3::new(1.0, 2.0, 3.0), DVec3::new(4.0, 5.0, 6.0), 7.0);
        let block = encode(&p);
        for (i, chunk) in block.chunks_exact(8).enumerate() {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(chunk);
            assert_eq!(f64::from_le_bytes(raw), (i + 1) as f64);
        }
    }

    #[test]
    fn test_decode_truncated() {
        let block = encode(&Point::default());
        let err = decode(&block[..55]).unwrap_err();
        assert_eq!(
            err,
            FormatError::Truncated {
                needed: 56,
                available: 55
            }
        );
        assert!(decode(&[]).is_err());
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let p = Point::white(DVec3::new(9.0, 8.0, 7.0));
        let mut buf = Vec::new();
        encode_into(&p, &mut buf);
        buf.extend_from_slice(&[0xAB; 10]);
        assert_eq!(decode(&buf).unwrap(), p);
    }
}
