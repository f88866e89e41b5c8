//! Error sentinels for the MinLZ writer.
//!
//! `jafreck-lz4r` represents its domain errors as hand-rolled enums with
//! manual `Display`/`Error` impls (see `Lz4FError` in the LZ4 frame module).
//! This crate reaches for `thiserror` instead — it is exercised elsewhere in
//! the pack (`foxglove-mcap`) and removes the boilerplate while keeping the
//! same "one variant per sentinel" shape spec.md §6/§7 asks for.

use std::fmt;
use std::io;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MinLzError>;

/// A frozen snapshot of an [`io::Error`], kept because `io::Error` is not
/// `Clone` and the sticky error cell (spec.md §3 invariant 7) needs to be
/// observed by every subsequent caller, not just the first.
#[derive(Debug, Clone)]
pub struct IoErrorSnapshot {
    kind: io::ErrorKind,
    message: String,
}

impl From<&io::Error> for IoErrorSnapshot {
    fn from(e: &io::Error) -> Self {
        IoErrorSnapshot { kind: e.kind(), message: e.to_string() }
    }
}

impl From<io::Error> for IoErrorSnapshot {
    fn from(e: io::Error) -> Self {
        IoErrorSnapshot::from(&e)
    }
}

impl fmt::Display for IoErrorSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl IoErrorSnapshot {
    /// The [`io::ErrorKind`] of the original error.
    pub fn kind(&self) -> io::ErrorKind {
        self.kind
    }
}

/// All sentinel errors this crate can surface.
///
/// Configuration errors (`InvalidLevel`, `InvalidBlockSize`, `InvalidPadding`,
/// `IndexRequired`) are raised at option-application time and latched onto
/// the builder (spec.md §4.7: "Any option error is latched and surfaced on
/// first call"). Contract errors (`UserChunkTooLarge`, `InvalidSkippableId`)
/// are returned directly from `add_user_chunk` and are never latched. I/O
/// and `ShortWrite` errors are latched sticky errors (spec.md §7). `Closed`
/// is the terminal sentinel latched by `close`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MinLzError {
    /// The sink returned an I/O error.
    #[error("minlz: write error: {0}")]
    Io(IoErrorSnapshot),

    /// The sink accepted fewer bytes than requested.
    #[error("minlz: short write")]
    ShortWrite,

    /// The writer has already been closed.
    #[error("minlz: writer is closed")]
    Closed,

    /// `reset` or construction was given a null/unusable sink.
    #[error("minlz: nil writer")]
    NilWriter,

    /// `level(n)` was out of range.
    #[error("minlz: invalid compression level")]
    InvalidLevel,

    /// `block_size(n)` was outside `[4 KiB, 4 MiB]`.
    #[error("minlz: invalid block size {0} (must be in [4096, 4194304])")]
    InvalidBlockSize(usize),

    /// `padding(n)` was outside `{0} ∪ [2, 4 MiB]`.
    #[error("minlz: invalid padding {0} (must be 0, 1, or in [2, 4194304])")]
    InvalidPadding(usize),

    /// `add_index(true)` was requested without `create_index(true)`.
    #[error("minlz: add_index requires create_index")]
    IndexRequired,

    /// A user chunk body exceeded `MaxUserChunkSize`.
    #[error("minlz: user chunk too large: {0} bytes (max {1})")]
    UserChunkTooLarge(usize, usize),

    /// A user chunk id fell outside `[0x80, 0xFE]`.
    #[error("minlz: invalid skippable chunk id: 0x{0:02x}")]
    InvalidSkippableId(u8),

    /// The index builder rejected malformed input (spec.md §4.6).
    #[error("minlz: index error: {0}")]
    Index(String),
}

impl From<io::Error> for MinLzError {
    fn from(e: io::Error) -> Self {
        MinLzError::Io(IoErrorSnapshot::from(e))
    }
}

impl MinLzError {
    /// True for the terminal "closed" sentinel, which `close()` swallows
    /// when it was the one to latch it (spec.md §4.7 step 3).
    pub fn is_closed(&self) -> bool {
        matches!(self, MinLzError::Closed)
    }
}
