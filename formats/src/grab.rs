//! Bounds-checked reads over byte slices.
//!
//! Readers advance a `&mut &[u8]` cursor; random access goes through [`at`], which
//! hands out a fresh cursor at an absolute position.

use {
    crate::{Error, Result},
    bytemuck::{self as bm, AnyBitPattern},
};

pub fn take<'a>(bytes: &mut &'a [u8], n: usize, what: &'static str) -> Result<&'a [u8]> {
    let Some((raw, rest)) = bytes.split_at_checked(n) else {
        return Err(Error::TruncatedInput{what, needed: n, available: bytes.len()});
    };
    *bytes = rest;
    Ok(raw)
}

pub fn grab<T: AnyBitPattern>(bytes: &mut &[u8], what: &'static str) -> Result<T> {
    let raw = take(bytes, std::mem::size_of::<T>(), what)?;
    Ok(bm::pod_read_unaligned(raw))
}

pub fn le_u32(bytes: &mut &[u8], what: &'static str) -> Result<u32> {
    grab(bytes, what).map(u32::from_le_bytes)
}

pub fn le_u16(bytes: &mut &[u8], what: &'static str) -> Result<u16> {
    grab(bytes, what).map(u16::from_le_bytes)
}

/// Reads `n` little-endian u32s, checking the length before allocating.
pub fn le_u32s(bytes: &mut &[u8], n: usize, what: &'static str) -> Result<Vec<u32>> {
    let len = n.checked_mul(4)
        .ok_or_else(|| Error::sizes(format!("{what}: {n} entries")))?;
    let raw = take(bytes, len, what)?;
    Ok(raw.chunks_exact(4)
        .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
        .collect())
}

/// A cursor starting at absolute position `pos`.
pub fn at<'a>(bytes: &'a [u8], pos: usize, what: &'static str) -> Result<&'a [u8]> {
    bytes.get(pos..)
        .ok_or(Error::TruncatedInput{what, needed: pos, available: bytes.len()})
}

/// Resolves an on-disk offset against the position it is relative to.
pub fn resolve(base: usize, rel: u32, what: &'static str) -> Result<usize> {
    base.checked_add(rel as usize)
        .ok_or_else(|| Error::sizes(format!("{what} {rel:#x} overflows from base {base:#x}")))
}

/// Narrows a length or offset to the u32 the file format stores.
pub fn field(value: usize, what: &'static str) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::FieldOverflow{what, value: value as u64})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_advances_only_on_success() {
        let bytes = [1, 0, 0, 0, 2, 0];
        let cursor = &mut &bytes[..];
        assert_eq!(le_u32(cursor, "a").unwrap(), 1);
        assert!(matches!(
            le_u32(cursor, "b"),
            Err(Error::TruncatedInput{what: "b", needed: 4, available: 2})
        ));
        assert_eq!(le_u16(cursor, "c").unwrap(), 2);
        assert!(cursor.is_empty());
    }

    #[test]
    fn u32_tables_are_bounds_checked() {
        let bytes = [0u8; 8];
        assert_eq!(le_u32s(&mut &bytes[..], 2, "t").unwrap(), vec![0, 0]);
        assert!(matches!(le_u32s(&mut &bytes[..], 3, "t"), Err(Error::TruncatedInput{..})));
        assert!(matches!(le_u32s(&mut &bytes[..], usize::MAX, "t"), Err(Error::InconsistentSizeFields(_))));
    }

    #[test]
    fn positions_resolve_against_their_base() {
        let bytes = [0, 1, 2, 3];
        assert_eq!(at(&bytes, resolve(1, 2, "x").unwrap(), "x").unwrap(), &[3]);
        assert_eq!(at(&bytes, 4, "x").unwrap(), &[] as &[u8]);
        assert!(at(&bytes, 5, "x").is_err());
        assert!(resolve(usize::MAX, 1, "x").is_err());
    }

    #[test]
    fn fields_reject_oversized_values() {
        assert_eq!(field(7, "f").unwrap(), 7);
        if usize::BITS > 32 {
            assert!(matches!(field(usize::MAX, "f"), Err(Error::FieldOverflow{what: "f", ..})));
        }
    }
}
