// savestream - a deduplicating codec for sequences of v86 virtual-machine
// save states.
//
// Layout: header + JSON info block + memory buffer, per save state.
// Buffers are deduplicated at block/superblock granularity; info blocks are
// diffed structurally frame-to-frame. Wire format: MessagePack (rmp-serde).

use std::process;

use savestream::cli;

/// Entry point for the savestream CLI.
///
/// # Exit Codes
/// * 0 - Success
/// * 1 - Error (message printed to stderr)
fn main() {
    if let Err(e) = cli::run(cli::init()) {
        eprintln!("Error: {e:?}");
        process::exit(1);
    }
}
