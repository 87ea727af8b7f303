//! Splits a raw v86 save state into its header/info/buffer sections and
//! rejoins them.
//!
//! A raw save state is `header(16) || info(L) || zero-pad-to-4 || buffer`,
//! where `L` is a little-endian u32 read from header bytes `12..16`. The
//! other 12 header bytes are opaque and preserved verbatim.

use crate::config::{HEADER_LENGTH_OFFSET, HEADER_SIZE, INFO_PADDING_ALIGN};
use crate::error::{CodecError, Result};

/// Splits a raw save state into `(header, info, buffer)`.
///
/// # Errors
/// Returns [`CodecError::MalformedHeader`] if `raw` is shorter than the
/// fixed header, or if the header's embedded info length runs past the end
/// of `raw`.
pub fn split(raw: &[u8]) -> Result<(Vec<u8>, Vec<u8>, Vec<u8>)> {
    if raw.len() < HEADER_SIZE {
        return Err(CodecError::MalformedHeader(format!(
            "expected at least {HEADER_SIZE} bytes, got {}",
            raw.len()
        )));
    }

    let header = raw[..HEADER_SIZE].to_vec();
    let info_len = read_info_len(&header);

    let info_end = HEADER_SIZE
        .checked_add(info_len)
        .filter(|&end| end <= raw.len())
        .ok_or_else(|| {
            CodecError::MalformedHeader(format!(
                "info length {info_len} runs past end of save state ({} bytes)",
                raw.len()
            ))
        })?;

    let info = raw[HEADER_SIZE..info_end].to_vec();

    let buffer_start = pad_to(info_end, INFO_PADDING_ALIGN);
    if buffer_start > raw.len() {
        return Err(CodecError::MalformedHeader(format!(
            "info padding runs past end of save state ({} bytes)",
            raw.len()
        )));
    }
    let buffer = raw[buffer_start..].to_vec();

    Ok((header, info, buffer))
}

/// Rejoins a `(header, info, buffer)` triple into a raw save state.
///
/// `header`'s embedded length field is not rewritten; the caller guarantees
/// it already matches `info.len()`.
///
/// # Errors
/// Returns [`CodecError::MalformedHeader`] if `header` is not exactly
/// [`HEADER_SIZE`] bytes.
pub fn join(header: &[u8], info: &[u8], buffer: &[u8]) -> Result<Vec<u8>> {
    if header.len() != HEADER_SIZE {
        return Err(CodecError::MalformedHeader(format!(
            "header must be exactly {HEADER_SIZE} bytes, got {}",
            header.len()
        )));
    }

    let unpadded_len = HEADER_SIZE + info.len();
    let padded_len = pad_to(unpadded_len, INFO_PADDING_ALIGN);

    let mut raw = Vec::with_capacity(padded_len + buffer.len());
    raw.extend_from_slice(header);
    raw.extend_from_slice(info);
    raw.resize(padded_len, 0);
    raw.extend_from_slice(buffer);
    Ok(raw)
}

fn read_info_len(header: &[u8]) -> usize {
    let bytes: [u8; 4] = header[HEADER_LENGTH_OFFSET..HEADER_SIZE]
        .try_into()
        .expect("header slice is exactly 4 bytes");
    u32::from_le_bytes(bytes) as usize
}

fn pad_to(len: usize, align: usize) -> usize {
    len.div_ceil(align) * align
}

/// Writes the info length into header bytes `12..16`, little-endian.
pub fn set_info_len(header: &mut [u8; HEADER_SIZE], info_len: u32) {
    header[HEADER_LENGTH_OFFSET..HEADER_SIZE].copy_from_slice(&info_len.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_header(info_len: u32) -> [u8; HEADER_SIZE] {
        let mut header = [0u8; HEADER_SIZE];
        set_info_len(&mut header, info_len);
        header
    }

    #[test]
    fn split_then_join_round_trips() {
        let header = make_header(2);
        let info = b"{}".to_vec();
        let buffer = b"hello world".to_vec();
        let raw = join(&header, &info, &buffer).unwrap();

        let (h, i, b) = split(&raw).unwrap();
        assert_eq!(h, header);
        assert_eq!(i, info);
        assert_eq!(b, buffer);
    }

    #[test]
    fn join_pads_info_to_four_byte_boundary() {
        let header = make_header(3);
        let info = b"abc".to_vec();
        let raw = join(&header, &info, &[1, 2, 3]).unwrap();
        // header(16) + info(3) + pad(1) = 20, then buffer.
        assert_eq!(&raw[16..19], b"abc");
        assert_eq!(raw[19], 0);
        assert_eq!(&raw[20..], &[1, 2, 3]);
    }

    #[test]
    fn split_rejects_short_input() {
        let err = split(&[0u8; 10]).unwrap_err();
        assert!(matches!(err, CodecError::MalformedHeader(_)));
    }

    #[test]
    fn split_rejects_info_length_past_eof() {
        let header = make_header(1000);
        let err = split(&header).unwrap_err();
        assert!(matches!(err, CodecError::MalformedHeader(_)));
    }

    #[test]
    fn split_on_all_zero_minimal_state() {
        let header = make_header(2);
        let raw = join(&header, b"{}", &[]).unwrap();
        let (h, i, b) = split(&raw).unwrap();
        assert_eq!(h, header);
        assert_eq!(i, b"{}");
        assert!(b.is_empty());
    }
}
