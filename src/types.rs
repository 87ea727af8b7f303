//! The savestream's on-wire record types.
//!
//! A savestream is, structurally, `Vec<Frame>`. Everything about the codec's
//! behavior (deduplication, metadata diffing) is expressed as transformations
//! that produce or consume a [`Frame`]; this module only defines its shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The ID of a deduplicated block. `0` is reserved for the all-zero block.
pub type BlockId = u32;

/// The ID of a deduplicated superblock. `0` is reserved for the all-zero
/// superblock.
pub type SuperBlockId = u32;

/// One save state's record within a savestream.
///
/// Field names are part of the wire format (§6.1): the container serializes
/// frames as string-keyed maps, so renaming a field here changes what a
/// savestream means.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    /// The 16 opaque header bytes, stored verbatim.
    pub header_block: Vec<u8>,

    /// UTF-8 JSON bytes of the structural diff from the previous frame's
    /// patched info object (or from `{}` for the first frame).
    pub info_patch: Vec<u8>,

    /// The ordered list of superblock IDs whose expansion reproduces this
    /// frame's aligned buffer.
    pub super_sequence: Vec<SuperBlockId>,

    /// Blocks first introduced by this frame. A `BTreeMap` keeps the
    /// serialized key order deterministic.
    pub new_blocks: BTreeMap<BlockId, Vec<u8>>,

    /// Superblocks first introduced by this frame, as lists of block IDs.
    pub new_super_blocks: BTreeMap<SuperBlockId, Vec<BlockId>>,
}
