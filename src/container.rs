//! The five public codec operations: `encode`, `decode`, `decode_one`,
//! `length`, `trim`.
//!
//! Everything here composes the framer, aligner, dedup engine, and metadata
//! differ; none of those layers know about frames or savestreams, only this
//! module does.

use serde_json::{Value, json};

use crate::config::MAX_FRAME_SERIALIZED_BYTES;
use crate::dedup::DedupTables;
use crate::error::{CodecError, Result};
use crate::types::Frame;
use crate::{aligner, diff, framer};

/// Encodes an ordered sequence of raw save states into savestream bytes.
///
/// # Errors
/// Any [`CodecError`] raised while splitting, aligning, or diffing an
/// individual state aborts the whole call; no partial container is
/// returned.
#[tracing::instrument(skip_all, fields(states = states.len()))]
pub fn encode(states: &[Vec<u8>]) -> Result<Vec<u8>> {
    let mut tables = DedupTables::new();
    let mut prev_info = json!({});
    let mut frames = Vec::with_capacity(states.len());

    for raw in states {
        let (header, info_bytes, buffer) = framer::split(raw)?;
        let info: Value = serde_json::from_slice(&info_bytes)
            .map_err(|e| CodecError::MalformedInfo(format!("invalid JSON: {e}")))?;

        let aligned = aligner::align(&info_bytes, &buffer)?;
        let delta = tables.ingest(&aligned)?;
        let info_patch = diff::diff(&prev_info, &info)?;

        let frame = Frame {
            header_block: header,
            info_patch,
            super_sequence: delta.super_sequence,
            new_blocks: delta.new_blocks,
            new_super_blocks: delta.new_super_blocks,
        };
        check_frame_size(&frame)?;
        frames.push(frame);

        prev_info = info;
    }

    tracing::debug!(frames = frames.len(), "encoded savestream");
    rmp_serde::to_vec_named(&frames).map_err(|e| CodecError::MalformedContainer(e.to_string()))
}

/// A one-shot, forward-only decoder over a savestream's frames.
///
/// Each call to [`Iterator::next`] decodes one more state. The sequence is
/// finite (one item per frame) and not restartable; callers needing random
/// access should use [`decode_one`] instead.
pub struct Decoder {
    frames: std::vec::IntoIter<Frame>,
    tables: DedupTables,
    prev_info: Value,
}

impl Decoder {
    fn new(savestream: &[u8]) -> Result<Self> {
        let frames = deserialize_frames(savestream)?;
        Ok(Self {
            frames: frames.into_iter(),
            tables: DedupTables::new(),
            prev_info: json!({}),
        })
    }

    fn decode_frame(&mut self, frame: Frame) -> Result<Vec<u8>> {
        let aligned = self.tables.rehydrate(&frame)?;
        let info = diff::patch(&self.prev_info, &frame.info_patch)?;
        let info_bytes = serde_json::to_vec(&info)
            .map_err(|e| CodecError::MalformedInfo(format!("failed to serialize info: {e}")))?;
        let buffer = aligner::unalign(&info_bytes, &aligned)?;
        let raw = framer::join(&frame.header_block, &info_bytes, &buffer)?;

        self.prev_info = info;
        Ok(raw)
    }
}

impl Iterator for Decoder {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        let frame = self.frames.next()?;
        Some(self.decode_frame(frame))
    }
}

/// Begins decoding a savestream, returning a lazy, forward-only iterator of
/// raw save states.
///
/// # Errors
/// Returns [`CodecError::MalformedContainer`] if `savestream` fails
/// structural deserialization. Errors from decoding an individual frame are
/// yielded by the iterator, not by this function.
#[tracing::instrument(skip_all)]
pub fn decode(savestream: &[u8]) -> Result<Decoder> {
    Decoder::new(savestream)
}

/// Decodes a single frame by index, equivalent to advancing [`decode`]'s
/// sequence `index + 1` times.
///
/// # Errors
/// Returns [`CodecError::OutOfRange`] if `index >= length(savestream)`.
#[tracing::instrument(skip(savestream))]
pub fn decode_one(savestream: &[u8], index: usize) -> Result<Vec<u8>> {
    let total = length(savestream)?;
    if index >= total {
        return Err(CodecError::OutOfRange { index, length: total });
    }

    let decoder = Decoder::new(savestream)?;
    let mut last = None;
    for (i, raw) in decoder.enumerate() {
        last = Some(raw?);
        if i == index {
            break;
        }
    }
    Ok(last.expect("index already validated against length"))
}

/// Returns the number of frames in a savestream without decoding any of
/// them (structural deserialization only).
///
/// # Errors
/// Returns [`CodecError::MalformedContainer`] if `savestream` fails
/// structural deserialization.
pub fn length(savestream: &[u8]) -> Result<usize> {
    Ok(deserialize_frames(savestream)?.len())
}

/// Re-encodes the half-open frame range `[start, end)` of a savestream.
///
/// `end` defaults to the savestream's length and both bounds saturate to
/// `[0, length]`. Because block/superblock deltas are cumulative, a trimmed
/// savestream is produced by decoding the kept range and re-encoding it, not
/// by slicing the frame list.
///
/// # Errors
/// Propagates any [`CodecError`] raised while decoding the kept frames.
#[tracing::instrument(skip(savestream))]
pub fn trim(savestream: &[u8], start: usize, end: Option<usize>) -> Result<Vec<u8>> {
    let total = length(savestream)?;
    let end = end.unwrap_or(total).min(total);
    let start = start.min(total);

    if start >= end {
        return encode(&[]);
    }

    let decoder = Decoder::new(savestream)?;
    let mut kept = Vec::with_capacity(end - start);
    for (i, raw) in decoder.enumerate() {
        if i >= end {
            break;
        }
        if i >= start {
            kept.push(raw?);
        }
    }
    encode(&kept)
}

fn deserialize_frames(savestream: &[u8]) -> Result<Vec<Frame>> {
    rmp_serde::from_slice(savestream).map_err(|e| CodecError::MalformedContainer(e.to_string()))
}

/// Rejects a frame whose serialized size exceeds [`MAX_FRAME_SERIALIZED_BYTES`]
/// (§5's advisory per-frame ceiling) before it is added to the container.
fn check_frame_size(frame: &Frame) -> Result<()> {
    let size = rmp_serde::to_vec_named(frame)
        .map_err(|e| CodecError::MalformedContainer(e.to_string()))?
        .len() as u64;
    if size > MAX_FRAME_SERIALIZED_BYTES {
        return Err(CodecError::ResourceExhausted(format!(
            "frame serialized to {size} bytes, exceeding the {MAX_FRAME_SERIALIZED_BYTES}-byte ceiling"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_state(info: &str, buffer: &[u8]) -> Vec<u8> {
        let info = info.as_bytes();
        let mut header = [0u8; 16];
        framer::set_info_len(&mut header, info.len() as u32);
        framer::join(&header, info, buffer).unwrap()
    }

    #[test]
    fn all_zero_minimal_state_round_trips() {
        let state = make_state("{}", &[]);
        let stream = encode(std::slice::from_ref(&state)).unwrap();
        assert_eq!(length(&stream).unwrap(), 1);
        let decoded = decode_one(&stream, 0).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn empty_sequence_round_trips_to_empty() {
        let stream = encode(&[]).unwrap();
        assert_eq!(length(&stream).unwrap(), 0);
        let decoded: Vec<_> = decode(&stream).unwrap().collect::<Result<_>>().unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn two_identical_states_round_trip_and_dedup_fully() {
        let info = r#"{"buffer_infos":[{"offset":0,"length":300}]}"#;
        let buffer = vec![0xAB; 300];
        let state = make_state(info, &buffer);

        let stream = encode(&[state.clone(), state.clone()]).unwrap();
        let frames = deserialize_frames(&stream).unwrap();
        assert_eq!(frames.len(), 2);
        assert!(frames[1].new_blocks.is_empty());
        assert!(frames[1].new_super_blocks.is_empty());
        assert_eq!(frames[0].super_sequence, frames[1].super_sequence);

        let decoded: Vec<_> = decode(&stream).unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(decoded, vec![state.clone(), state]);
    }

    #[test]
    fn single_region_buffer_interns_two_blocks() {
        let info = r#"{"buffer_infos":[{"offset":0,"length":300}]}"#;
        let buffer = vec![0xAB; 300];
        let state = make_state(info, &buffer);

        let stream = encode(std::slice::from_ref(&state)).unwrap();
        let frames = deserialize_frames(&stream).unwrap();
        assert_eq!(frames[0].new_blocks.len(), 2);
        assert_eq!(frames[0].super_sequence, vec![1]);
        assert_eq!(frames[0].new_super_blocks[&1][..2], [1, 2]);
        assert!(frames[0].new_super_blocks[&1][2..].iter().all(|&b| b == 0));
    }

    #[test]
    fn decode_one_matches_full_decode_at_every_index() {
        let states: Vec<_> = (0..4)
            .map(|i| {
                let info = format!(r#"{{"buffer_infos":[{{"offset":0,"length":16}}],"n":{i}}}"#);
                make_state(&info, &vec![i as u8; 16])
            })
            .collect();
        let stream = encode(&states).unwrap();

        let full: Vec<_> = decode(&stream).unwrap().collect::<Result<_>>().unwrap();
        for i in 0..states.len() {
            assert_eq!(decode_one(&stream, i).unwrap(), full[i]);
        }
    }

    #[test]
    fn decode_one_out_of_range_fails() {
        let stream = encode(&[]).unwrap();
        let err = decode_one(&stream, 0).unwrap_err();
        assert!(matches!(err, CodecError::OutOfRange { index: 0, length: 0 }));
    }

    #[test]
    fn trim_matches_decoding_the_subrange_directly() {
        let states: Vec<_> = (0..5)
            .map(|i| {
                let info = format!(r#"{{"buffer_infos":[{{"offset":0,"length":16}}],"n":{i}}}"#);
                make_state(&info, &vec![i as u8; 16])
            })
            .collect();
        let stream = encode(&states).unwrap();

        let trimmed = trim(&stream, 1, Some(4)).unwrap();
        let decoded: Vec<_> = decode(&trimmed).unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(decoded, states[1..4]);
    }

    #[test]
    fn trim_full_range_is_extensionally_equal_to_original() {
        let states: Vec<_> = (0..3)
            .map(|i| make_state("{}", &[i as u8]))
            .collect();
        let stream = encode(&states).unwrap();
        let trimmed = trim(&stream, 0, None).unwrap();

        let original: Vec<_> = decode(&stream).unwrap().collect::<Result<_>>().unwrap();
        let round_tripped: Vec<_> = decode(&trimmed).unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(original, round_tripped);
    }

    #[test]
    fn trim_with_start_at_or_past_end_yields_empty_container() {
        let state = make_state("{}", &[]);
        let stream = encode(std::slice::from_ref(&state)).unwrap();
        let trimmed = trim(&stream, 5, Some(5)).unwrap();
        assert_eq!(length(&trimmed).unwrap(), 0);
    }

    #[test]
    fn info_key_order_survives_round_trip() {
        // v86's info blocks come from JS `JSON.stringify`, which emits keys
        // in insertion order, not sorted order. A non-alphabetical key order
        // must decode back to the exact same bytes.
        let info = r#"{"zeta":1,"buffer_infos":[{"offset":0,"length":300}],"alpha":2}"#;
        let buffer = vec![0xAB; 300];
        let state = make_state(info, &buffer);

        let stream = encode(std::slice::from_ref(&state)).unwrap();
        let decoded = decode_one(&stream, 0).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn malformed_container_bytes_are_rejected() {
        let err = length(b"not a savestream").unwrap_err();
        assert!(matches!(err, CodecError::MalformedContainer(_)));
    }
}
