//! Content-addressed block/superblock tables.
//!
//! One [`DedupTables`] lives for the duration of a single encode or decode
//! session. On encode, [`DedupTables::ingest`] interns an aligned buffer into
//! a `super_sequence` plus the deltas (`new_blocks`, `new_super_blocks`) a
//! frame should carry. On decode, [`DedupTables::rehydrate`] replays those
//! deltas to reconstruct the same aligned buffer.

use hashbrown::HashMap;

use crate::config::{
    BLOCK_SIZE, BLOCKS_PER_SUPER_BLOCK, MAX_BLOCK_TABLE_ENTRIES, MAX_SUPER_BLOCK_TABLE_ENTRIES,
    SUPER_BLOCK_SIZE, ZERO_BLOCK_ID, ZERO_SUPER_BLOCK_ID,
};
use crate::error::{CodecError, Result};
use crate::types::{BlockId, Frame, SuperBlockId};

/// The block/superblock delta a single frame contributes.
pub struct Delta {
    pub super_sequence: Vec<SuperBlockId>,
    pub new_blocks: std::collections::BTreeMap<BlockId, Vec<u8>>,
    pub new_super_blocks: std::collections::BTreeMap<SuperBlockId, Vec<BlockId>>,
}

/// Content-addressed block and superblock tables for one encode/decode
/// session.
pub struct DedupTables {
    blocks: HashMap<BlockId, Vec<u8>>,
    block_by_content: HashMap<Vec<u8>, BlockId>,
    super_blocks: HashMap<SuperBlockId, Vec<BlockId>>,
    super_by_sequence: HashMap<Vec<BlockId>, SuperBlockId>,
    next_block_id: u64,
    next_super_block_id: u64,
}

impl DedupTables {
    /// Creates a new session, pre-seeded with the reserved zero block and
    /// zero superblock.
    pub fn new() -> Self {
        let mut tables = Self {
            blocks: HashMap::new(),
            block_by_content: HashMap::new(),
            super_blocks: HashMap::new(),
            super_by_sequence: HashMap::new(),
            next_block_id: 1,
            next_super_block_id: 1,
        };

        let zero_block = vec![0u8; BLOCK_SIZE];
        tables.blocks.insert(ZERO_BLOCK_ID, zero_block.clone());
        tables.block_by_content.insert(zero_block, ZERO_BLOCK_ID);

        let zero_sequence = vec![ZERO_BLOCK_ID; BLOCKS_PER_SUPER_BLOCK];
        tables
            .super_blocks
            .insert(ZERO_SUPER_BLOCK_ID, zero_sequence.clone());
        tables
            .super_by_sequence
            .insert(zero_sequence, ZERO_SUPER_BLOCK_ID);

        tables
    }

    /// Interns an aligned buffer, returning the superblock sequence that
    /// reproduces it and the deltas newly introduced by this call.
    ///
    /// `aligned.len()` must be a multiple of [`SUPER_BLOCK_SIZE`].
    pub fn ingest(&mut self, aligned: &[u8]) -> Result<Delta> {
        let mut super_sequence = Vec::with_capacity(aligned.len() / SUPER_BLOCK_SIZE);
        let mut new_blocks = std::collections::BTreeMap::new();
        let mut new_super_blocks = std::collections::BTreeMap::new();

        for super_chunk in aligned.chunks(SUPER_BLOCK_SIZE) {
            let mut block_ids = Vec::with_capacity(BLOCKS_PER_SUPER_BLOCK);

            for block in super_chunk.chunks(BLOCK_SIZE) {
                let bid = if let Some(&id) = self.block_by_content.get(block) {
                    id
                } else {
                    let id = self.allocate_block_id()?;
                    self.blocks.insert(id, block.to_vec());
                    self.block_by_content.insert(block.to_vec(), id);
                    new_blocks.insert(id, block.to_vec());
                    id
                };
                block_ids.push(bid);
            }

            let sid = if let Some(&id) = self.super_by_sequence.get(&block_ids) {
                id
            } else {
                let id = self.allocate_super_block_id()?;
                self.super_blocks.insert(id, block_ids.clone());
                self.super_by_sequence.insert(block_ids.clone(), id);
                new_super_blocks.insert(id, block_ids);
                id
            };
            super_sequence.push(sid);
        }

        Ok(Delta {
            super_sequence,
            new_blocks,
            new_super_blocks,
        })
    }

    /// Merges a frame's deltas into the live tables and expands its
    /// `super_sequence` back into an aligned buffer.
    ///
    /// # Errors
    /// [`CodecError::DuplicateId`] if a delta redefines an existing ID with
    /// different content; [`CodecError::UnknownId`] if `super_sequence` or a
    /// `new_super_blocks` entry references an ID not yet introduced.
    pub fn rehydrate(&mut self, frame: &Frame) -> Result<Vec<u8>> {
        for (&bid, content) in &frame.new_blocks {
            match self.blocks.get(&bid) {
                Some(existing) if existing != content => {
                    return Err(CodecError::DuplicateId { kind: "block", id: bid });
                }
                Some(_) => {}
                None => {
                    self.blocks.insert(bid, content.clone());
                    self.block_by_content.insert(content.clone(), bid);
                }
            }
        }

        for (&sid, sequence) in &frame.new_super_blocks {
            for &bid in sequence {
                if !self.blocks.contains_key(&bid) {
                    return Err(CodecError::UnknownId { kind: "block", id: bid });
                }
            }
            match self.super_blocks.get(&sid) {
                Some(existing) if existing != sequence => {
                    return Err(CodecError::DuplicateId { kind: "superblock", id: sid });
                }
                Some(_) => {}
                None => {
                    self.super_blocks.insert(sid, sequence.clone());
                }
            }
        }

        let mut out = Vec::with_capacity(frame.super_sequence.len() * SUPER_BLOCK_SIZE);
        for &sid in &frame.super_sequence {
            let block_ids = self
                .super_blocks
                .get(&sid)
                .ok_or(CodecError::UnknownId { kind: "superblock", id: sid })?;
            for &bid in block_ids {
                let content = self
                    .blocks
                    .get(&bid)
                    .ok_or(CodecError::UnknownId { kind: "block", id: bid })?;
                out.extend_from_slice(content);
            }
        }
        Ok(out)
    }

    fn allocate_block_id(&mut self) -> Result<BlockId> {
        if self.next_block_id > MAX_BLOCK_TABLE_ENTRIES {
            return Err(CodecError::ResourceExhausted(
                "block table exceeded its entry ceiling".to_string(),
            ));
        }
        let id = self.next_block_id as BlockId;
        self.next_block_id += 1;
        Ok(id)
    }

    fn allocate_super_block_id(&mut self) -> Result<SuperBlockId> {
        if self.next_super_block_id > MAX_SUPER_BLOCK_TABLE_ENTRIES {
            return Err(CodecError::ResourceExhausted(
                "superblock table exceeded its entry ceiling".to_string(),
            ));
        }
        let id = self.next_super_block_id as SuperBlockId;
        self.next_super_block_id += 1;
        Ok(id)
    }
}

impl Default for DedupTables {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_zero_buffer_yields_zero_superblock_and_no_deltas() {
        let mut tables = DedupTables::new();
        let aligned = vec![0u8; SUPER_BLOCK_SIZE];
        let delta = tables.ingest(&aligned).unwrap();

        assert_eq!(delta.super_sequence, vec![ZERO_SUPER_BLOCK_ID]);
        assert!(delta.new_blocks.is_empty());
        assert!(delta.new_super_blocks.is_empty());
    }

    #[test]
    fn repeated_content_reuses_ids() {
        let mut tables = DedupTables::new();
        let mut aligned = vec![0xCDu8; SUPER_BLOCK_SIZE];
        aligned[..BLOCK_SIZE].fill(0xAB);

        let first = tables.ingest(&aligned).unwrap();
        let second = tables.ingest(&aligned).unwrap();

        assert_eq!(first.super_sequence, second.super_sequence);
        assert!(second.new_blocks.is_empty());
        assert!(second.new_super_blocks.is_empty());
    }

    #[test]
    fn ingest_then_rehydrate_round_trips() {
        let mut encode_tables = DedupTables::new();
        let mut aligned = vec![0u8; SUPER_BLOCK_SIZE * 2];
        aligned[..300].fill(0xAB);
        aligned[SUPER_BLOCK_SIZE..SUPER_BLOCK_SIZE + 10].fill(0x11);

        let delta = encode_tables.ingest(&aligned).unwrap();
        let frame = Frame {
            header_block: vec![0; 16],
            info_patch: b"[]".to_vec(),
            super_sequence: delta.super_sequence,
            new_blocks: delta.new_blocks,
            new_super_blocks: delta.new_super_blocks,
        };

        let mut decode_tables = DedupTables::new();
        let back = decode_tables.rehydrate(&frame).unwrap();
        assert_eq!(back, aligned);
    }

    #[test]
    fn rehydrate_rejects_unknown_block_reference() {
        let mut tables = DedupTables::new();
        let frame = Frame {
            header_block: vec![0; 16],
            info_patch: b"[]".to_vec(),
            super_sequence: vec![99],
            new_blocks: std::collections::BTreeMap::new(),
            new_super_blocks: std::collections::BTreeMap::new(),
        };
        let err = tables.rehydrate(&frame).unwrap_err();
        assert!(matches!(err, CodecError::UnknownId { kind: "superblock", id: 99 }));
    }

    #[test]
    fn rehydrate_rejects_duplicate_block_with_different_content() {
        let mut tables = DedupTables::new();
        let mut blocks = std::collections::BTreeMap::new();
        blocks.insert(1, vec![0xAAu8; BLOCK_SIZE]);
        let frame = Frame {
            header_block: vec![0; 16],
            info_patch: b"[]".to_vec(),
            super_sequence: vec![],
            new_blocks: blocks,
            new_super_blocks: std::collections::BTreeMap::new(),
        };
        tables.rehydrate(&frame).unwrap();

        let mut conflicting_blocks = std::collections::BTreeMap::new();
        conflicting_blocks.insert(1, vec![0xBBu8; BLOCK_SIZE]);
        let conflicting_frame = Frame {
            header_block: vec![0; 16],
            info_patch: b"[]".to_vec(),
            super_sequence: vec![],
            new_blocks: conflicting_blocks,
            new_super_blocks: std::collections::BTreeMap::new(),
        };
        let err = tables.rehydrate(&conflicting_frame).unwrap_err();
        assert!(matches!(err, CodecError::DuplicateId { kind: "block", id: 1 }));
    }
}
