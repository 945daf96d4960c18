//! Fragment and chaff envelopes
//!
//! Both envelopes use an 8-byte header of two big-endian `u32` fields:
//!
//! ```text
//! fragment: | index (4) | len (4) | bytes ...               |
//! chaff:    | real_len (4) | chaff_len (4) | real | chaff   |
//! ```
//!
//! The relay only ever writes envelopes. The parsers exist so a peer (and
//! the tests) can take them apart again.

use crate::error::{Error, Result};
use bytes::{Buf, BufMut, BytesMut};

/// Length of both envelope headers
pub const HEADER_LEN: usize = 8;

/// Minimum number of chaff bytes per envelope
pub const MIN_CHAFF_LEN: usize = 64;

/// Split `data` into pieces of at most `size` bytes
///
/// A `size` of zero is treated as one.
pub fn fragment(data: &[u8], size: usize) -> Vec<&[u8]> {
    data.chunks(size.max(1)).collect()
}

/// Frame every fragment of `data` with its index and length
pub fn frame_fragments(data: &[u8], size: usize) -> Vec<u8> {
    let pieces = fragment(data, size);
    let mut out = BytesMut::with_capacity(data.len() + pieces.len() * HEADER_LEN);

    for (index, piece) in pieces.into_iter().enumerate() {
        out.put_u32(index as u32);
        out.put_u32(piece.len() as u32);
        out.put_slice(piece);
    }

    out.to_vec()
}

/// One parsed fragment frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentFrame<'a> {
    /// Position of the fragment in the original payload
    pub index: u32,
    /// Fragment bytes
    pub payload: &'a [u8],
}

/// Parse a buffer of back-to-back fragment frames
///
/// Indices must start at zero and increase by one.
pub fn parse_fragments(mut buf: &[u8]) -> Result<Vec<FragmentFrame<'_>>> {
    let total = buf.len();
    let mut frames = Vec::new();

    while !buf.is_empty() {
        let offset = total - buf.len();
        if buf.len() < HEADER_LEN {
            return Err(Error::frame_at("truncated fragment header", offset));
        }

        let index = buf.get_u32();
        let len = buf.get_u32() as usize;

        if index as usize != frames.len() {
            return Err(Error::frame_at(
                format!("expected fragment {}, found {}", frames.len(), index),
                offset,
            ));
        }
        if buf.len() < len {
            return Err(Error::frame_at(
                format!("fragment {index} declares {len} bytes, {} left", buf.len()),
                offset,
            ));
        }

        let (payload, rest) = buf.split_at(len);
        frames.push(FragmentFrame { index, payload });
        buf = rest;
    }

    Ok(frames)
}

/// Reassemble the payload carried by a buffer of fragment frames
pub fn defragment(buf: &[u8]) -> Result<Vec<u8>> {
    let frames = parse_fragments(buf)?;
    let mut out = Vec::with_capacity(buf.len());
    for frame in frames {
        out.extend_from_slice(frame.payload);
    }
    Ok(out)
}

/// Chaff length for a real payload of `real_len` bytes
pub fn chaff_len(real_len: usize, ratio: f64) -> usize {
    ((real_len as f64 * ratio) as usize).max(MIN_CHAFF_LEN)
}

/// Build a chaff envelope around `real`
pub fn wrap_chaff(real: &[u8], chaff: &[u8]) -> Vec<u8> {
    let mut out = BytesMut::with_capacity(HEADER_LEN + real.len() + chaff.len());
    out.put_u32(real.len() as u32);
    out.put_u32(chaff.len() as u32);
    out.put_slice(real);
    out.put_slice(chaff);
    out.to_vec()
}

/// A parsed chaff envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChaffEnvelope<'a> {
    /// Encrypted payload
    pub real: &'a [u8],
    /// Decoy bytes
    pub chaff: &'a [u8],
}

impl<'a> ChaffEnvelope<'a> {
    /// Parse one envelope, which must span the whole buffer
    pub fn parse(buf: &'a [u8]) -> Result<Self> {
        if buf.len() < HEADER_LEN {
            return Err(Error::frame_at("truncated chaff header", 0));
        }

        let mut header = &buf[..HEADER_LEN];
        let real_len = header.get_u32() as usize;
        let chaff_len = header.get_u32() as usize;

        let body = &buf[HEADER_LEN..];
        if body.len() != real_len + chaff_len {
            return Err(Error::frame_at(
                format!(
                    "chaff header declares {} bytes, body has {}",
                    real_len + chaff_len,
                    body.len()
                ),
                HEADER_LEN,
            ));
        }

        let (real, chaff) = body.split_at(real_len);
        Ok(Self { real, chaff })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // =========== Fragment Tests ===========

    #[test]
    fn test_fragment_alphabet() {
        let pieces = fragment(b"abcdefghijklmnopqrstuvwxyz", 5);
        assert_eq!(pieces.len(), 6);
        assert_eq!(pieces[0], b"abcde");
        assert_eq!(pieces[5], b"z");
    }

    #[test]
    fn test_fragment_edge_sizes() {
        assert!(fragment(b"", 4).is_empty());
        assert_eq!(fragment(b"abc", 0).len(), 3);
        assert_eq!(fragment(b"abc", 100), vec![&b"abc"[..]]);
    }

    #[test]
    fn test_frame_fragments_layout() {
        let framed = frame_fragments(b"abcde", 2);
        assert_eq!(framed.len(), 5 + 3 * HEADER_LEN);
        assert_eq!(&framed[..HEADER_LEN], &[0, 0, 0, 0, 0, 0, 0, 2]);
        assert_eq!(&framed[HEADER_LEN..HEADER_LEN + 2], b"ab");

        let last = 2 * (HEADER_LEN + 2);
        assert_eq!(&framed[last..last + HEADER_LEN], &[0, 0, 0, 2, 0, 0, 0, 1]);
    }

    #[test]
    fn test_parse_fragments() {
        let framed = frame_fragments(b"hello world", 4);
        let frames = parse_fragments(&framed).unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2].index, 2);
        assert_eq!(frames[2].payload, b"rld");
        assert_eq!(defragment(&framed).unwrap(), b"hello world");
    }

    #[test]
    fn test_parse_fragments_rejects_garbage() {
        let framed = frame_fragments(b"hello world", 4);

        assert!(parse_fragments(&framed[..framed.len() - 1]).is_err());
        assert!(parse_fragments(&framed[..3]).is_err());

        let mut reordered = framed.clone();
        reordered[3] = 7;
        match parse_fragments(&reordered).unwrap_err() {
            Error::Frame { offset, .. } => assert_eq!(offset, Some(0)),
            other => panic!("Wrong error type: {other}"),
        }
    }

    // =========== Chaff Tests ===========

    #[test]
    fn test_chaff_len_floor() {
        assert_eq!(chaff_len(0, 0.3), MIN_CHAFF_LEN);
        assert_eq!(chaff_len(100, 0.3), MIN_CHAFF_LEN);
        assert_eq!(chaff_len(1000, 0.3), 300);
        assert_eq!(chaff_len(1000, 0.0), MIN_CHAFF_LEN);
    }

    #[test]
    fn test_chaff_envelope() {
        let wrapped = wrap_chaff(b"secret", &[9u8; 64]);
        assert_eq!(&wrapped[..HEADER_LEN], &[0, 0, 0, 6, 0, 0, 0, 64]);

        let envelope = ChaffEnvelope::parse(&wrapped).unwrap();
        assert_eq!(envelope.real, b"secret");
        assert_eq!(envelope.chaff.len(), 64);
    }

    #[test]
    fn test_chaff_envelope_length_mismatch() {
        let mut wrapped = wrap_chaff(b"secret", &[0u8; 64]);
        wrapped.push(0);
        assert!(ChaffEnvelope::parse(&wrapped).is_err());
        assert!(ChaffEnvelope::parse(&wrapped[..5]).is_err());
    }

    proptest! {
        #[test]
        fn prop_fragments_concatenate(data in proptest::collection::vec(any::<u8>(), 0..2048), size in 1usize..300) {
            let pieces = fragment(&data, size);
            prop_assert_eq!(pieces.len(), data.len().div_ceil(size));
            prop_assert!(pieces.iter().all(|p| !p.is_empty() && p.len() <= size));
            prop_assert_eq!(pieces.concat(), data);
        }

        #[test]
        fn prop_chaff_grows_envelope(len in 0usize..8192, ratio in 0.0f64..2.0) {
            let chaff = chaff_len(len, ratio);
            prop_assert!(chaff >= MIN_CHAFF_LEN);
            prop_assert!(HEADER_LEN + len + chaff > len);
        }
    }
}
