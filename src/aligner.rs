//! Expands the packed buffer block into a block/superblock-aligned buffer
//! (and back), using the region descriptors in the info block's
//! `buffer_infos` array.

use serde_json::Value;

use crate::config::{BLOCK_SIZE, SUPER_BLOCK_SIZE};
use crate::error::{CodecError, Result};

/// One `{offset, length}` region descriptor from `buffer_infos`.
struct Region {
    offset: usize,
    length: usize,
}

/// Expands `buffer` into a block/superblock-aligned buffer.
///
/// Each region is copied out, right-padded with zeros to a multiple of
/// [`BLOCK_SIZE`], then the whole output is right-padded to a multiple of
/// [`SUPER_BLOCK_SIZE`].
///
/// # Errors
/// Returns [`CodecError::MalformedInfo`] if `info` is not valid JSON, a
/// present `buffer_infos` is not an array, or a region runs past the end of
/// `buffer`. A missing `buffer_infos` key is treated as an empty region list.
pub fn align(info: &[u8], buffer: &[u8]) -> Result<Vec<u8>> {
    let regions = parse_regions(info)?;

    let mut out = Vec::new();
    for region in &regions {
        let end = region.offset.checked_add(region.length).ok_or_else(|| {
            CodecError::MalformedInfo(format!(
                "region offset {} + length {} overflows",
                region.offset, region.length
            ))
        })?;
        if end > buffer.len() {
            return Err(CodecError::MalformedInfo(format!(
                "region [{}, {end}) out of bounds for buffer of {} bytes",
                region.offset,
                buffer.len()
            )));
        }
        out.extend_from_slice(&buffer[region.offset..end]);
        out.resize(pad_to(out.len(), BLOCK_SIZE), 0);
    }
    out.resize(pad_to(out.len(), SUPER_BLOCK_SIZE), 0);
    Ok(out)
}

/// The inverse of [`align`]: reconstructs the packed buffer from an aligned
/// buffer using the same region descriptors.
///
/// # Errors
/// Same conditions as [`align`], plus [`CodecError::MalformedInfo`] if a
/// region's padded extent runs past the end of `aligned`.
pub fn unalign(info: &[u8], aligned: &[u8]) -> Result<Vec<u8>> {
    let regions = parse_regions(info)?;

    let packed_len = regions
        .iter()
        .map(|r| r.offset + r.length)
        .max()
        .unwrap_or(0);
    let mut out = vec![0u8; packed_len];

    let mut cursor = 0usize;
    for region in &regions {
        let padded_len = pad_to(region.length, BLOCK_SIZE);
        let end = cursor.checked_add(region.length).ok_or_else(|| {
            CodecError::MalformedInfo(format!(
                "region offset {cursor} + length {} overflows",
                region.length
            ))
        })?;
        if end > aligned.len() {
            return Err(CodecError::MalformedInfo(format!(
                "aligned buffer too short: need {end} bytes, have {}",
                aligned.len()
            )));
        }
        out[region.offset..region.offset + region.length].copy_from_slice(&aligned[cursor..end]);
        cursor += padded_len;
    }
    Ok(out)
}

fn parse_regions(info: &[u8]) -> Result<Vec<Region>> {
    let value: Value = serde_json::from_slice(info)
        .map_err(|e| CodecError::MalformedInfo(format!("invalid JSON: {e}")))?;

    let Some(infos) = value.get("buffer_infos") else {
        return Ok(Vec::new());
    };

    let array = infos
        .as_array()
        .ok_or_else(|| CodecError::MalformedInfo("buffer_infos is not an array".to_string()))?;

    array.iter().map(parse_region).collect()
}

fn parse_region(value: &Value) -> Result<Region> {
    let offset = value
        .get("offset")
        .and_then(Value::as_u64)
        .ok_or_else(|| CodecError::MalformedInfo("region missing integer offset".to_string()))?;
    let length = value
        .get("length")
        .and_then(Value::as_u64)
        .ok_or_else(|| CodecError::MalformedInfo("region missing integer length".to_string()))?;

    Ok(Region {
        offset: offset as usize,
        length: length as usize,
    })
}

fn pad_to(len: usize, align: usize) -> usize {
    len.div_ceil(align) * align
}
