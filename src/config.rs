//! Format constants for the savestream container.
//!
//! These sizes are part of the on-disk/on-wire format, not tunables: changing
//! them changes what a container means. They live here, rather than at call
//! sites, so the format has one source of truth.

/// Size of a deduplicated block, in bytes.
pub const BLOCK_SIZE: usize = 256;

/// Size of a deduplicated superblock, in bytes.
pub const SUPER_BLOCK_SIZE: usize = 65_536;

/// Number of blocks in one superblock.
pub const BLOCKS_PER_SUPER_BLOCK: usize = SUPER_BLOCK_SIZE / BLOCK_SIZE;

/// Length of the raw save-state header, in bytes.
pub const HEADER_SIZE: usize = 16;

/// Byte offset of the little-endian u32 info length within the header.
pub const HEADER_LENGTH_OFFSET: usize = 12;

/// Alignment, in bytes, of the padding between the info block and the buffer
/// block in a raw save state.
pub const INFO_PADDING_ALIGN: usize = 4;

/// Reserved block ID bound to an all-zero block.
pub const ZERO_BLOCK_ID: u32 = 0;

/// Reserved superblock ID bound to an all-zero superblock.
pub const ZERO_SUPER_BLOCK_ID: u32 = 0;

/// Advisory ceiling on the number of distinct block IDs a single encode
/// session may allocate before raising `ResourceExhausted`.
pub const MAX_BLOCK_TABLE_ENTRIES: u64 = 1 << 31;

/// Advisory ceiling on the number of distinct superblock IDs a single encode
/// session may allocate before raising `ResourceExhausted`.
pub const MAX_SUPER_BLOCK_TABLE_ENTRIES: u64 = 1 << 31;

/// Advisory ceiling on the serialized size of a single frame, in bytes.
pub const MAX_FRAME_SERIALIZED_BYTES: u64 = 1 << 32;
