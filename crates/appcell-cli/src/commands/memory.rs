//! `appcell parse-memory` — show how a limit string is interpreted.

use appcell_core::memory::parse_memory_size;
use clap::Args;

use crate::output::{emit, format_bytes};

/// Arguments for the `parse-memory` command.
#[derive(Args, Debug)]
pub struct ParseMemoryArgs {
    /// Limit such as `512M` or `2GB`.
    pub text: String,
}

/// Prints the parsed byte count, or `0 (no limit)` when unparsable.
pub fn execute(args: &ParseMemoryArgs) {
    match parse_memory_size(&args.text) {
        0 => emit("0 (no limit)"),
        bytes => emit(&format!("{bytes} ({})", format_bytes(bytes))),
    }
}
