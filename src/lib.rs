//! savestream - a deduplicating codec for sequences of v86 virtual-machine
//! save states.
//!
//! A raw save state is split into a header, a JSON info block, and a memory
//! buffer. The buffer is aligned against the info block's region
//! descriptors and deduplicated at two granularities (256-byte blocks,
//! 65,536-byte superblocks); the info block is diffed structurally against
//! the previous frame. See [`container`] for the five public operations
//! (`encode`, `decode`, `decode_one`, `length`, `trim`).

pub mod aligner;
pub mod cli;
pub mod config;
pub mod container;
pub mod dedup;
pub mod diff;
pub mod error;
pub mod framer;
pub mod types;
