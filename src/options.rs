//! Writer configuration (spec.md §6 options table, §4.7).
//!
//! `jafreck-lz4r`'s CLI builds up an LZ4 frame `Prefs` struct one flag at a
//! time (`src/io/prefs.rs`); this crate's equivalent is a chained builder
//! over [`WriterParams`], but — per spec.md §4.7 — an invalid call doesn't
//! panic or short-circuit the chain. It latches the first error onto the
//! builder, exactly like the sticky-error cell the writer itself uses
//! (spec.md §3 invariant 7), and every later call is a no-op until
//! [`WriterBuilder::build`] surfaces it.

use std::sync::Arc;

use crate::block::{Encoder, Level};
use crate::chunk::{DEFAULT_BLOCK_SIZE, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE};
use crate::error::{MinLzError, Result};
use crate::random::{DefaultRandomSource, RandomSource};

/// Resolved, validated configuration consumed by [`crate::writer::Writer`].
pub struct WriterParams {
    pub concurrency: usize,
    pub block_size: usize,
    pub level: Level,
    pub create_index: bool,
    pub add_index: bool,
    pub padding: usize,
    pub padding_src: Box<dyn RandomSource>,
    pub flush_on_write: bool,
    pub custom_encoder: Option<Arc<Encoder>>,
}

/// Builder for [`WriterParams`]. Construct with [`WriterBuilder::new`],
/// chain setters, then call [`WriterBuilder::build`].
pub struct WriterBuilder {
    concurrency: usize,
    block_size: usize,
    level: Level,
    create_index: bool,
    add_index: bool,
    padding: usize,
    padding_src: Option<Box<dyn RandomSource>>,
    flush_on_write: bool,
    custom_encoder: Option<Arc<Encoder>>,
    error: Option<MinLzError>,
}

impl Default for WriterBuilder {
    fn default() -> Self {
        WriterBuilder {
            concurrency: num_cpus::get().max(1),
            block_size: DEFAULT_BLOCK_SIZE,
            level: Level::Balanced,
            create_index: true,
            add_index: false,
            padding: 0,
            padding_src: None,
            flush_on_write: false,
            custom_encoder: None,
            error: None,
        }
    }
}

impl WriterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of worker threads in the block pipeline. `1` runs the writer
    /// synchronously on the caller's thread (spec.md §4.4).
    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    /// Block size in bytes; must fall in `[4 KiB, 4 MiB]`.
    pub fn block_size(mut self, n: usize) -> Self {
        if self.error.is_none() {
            if (MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&n) {
                self.block_size = n;
            } else {
                self.error = Some(MinLzError::InvalidBlockSize(n));
            }
        }
        self
    }

    /// Sets the compression effort directly.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the compression effort from the same numeric scale
    /// `jafreck-lz4r`'s CLI exposes (`0` = store, `1` = fastest, `2` =
    /// balanced, `3` = smallest); anything else latches `InvalidLevel`.
    pub fn level_value(mut self, n: u8) -> Self {
        if self.error.is_none() {
            self.level = match n {
                0 => Level::Uncompressed,
                1 => Level::Fastest,
                2 => Level::Balanced,
                3 => Level::Smallest,
                _ => {
                    self.error = Some(MinLzError::InvalidLevel);
                    return self;
                }
            };
        }
        self
    }

    /// Equivalent to `level(Level::Uncompressed)` when `yes`; otherwise
    /// leaves the current level untouched.
    pub fn uncompressed(mut self, yes: bool) -> Self {
        if yes {
            self.level = Level::Uncompressed;
        }
        self
    }

    /// Whether to build a trailing index at all (default `true`).
    pub fn create_index(mut self, yes: bool) -> Self {
        self.create_index = yes;
        self
    }

    /// Whether to append the index chunk to the stream itself on close
    /// (default `false`). Requires `create_index(true)`.
    pub fn add_index(mut self, yes: bool) -> Self {
        self.add_index = yes;
        self
    }

    /// Target multiple, in bytes, the total stream length is padded to.
    /// `0` and `1` both disable padding (every length is trivially a
    /// multiple of `1`); any value in `[2, 4 MiB]` pads the final output to
    /// that multiple (spec.md §6).
    pub fn padding(mut self, n: usize) -> Self {
        if self.error.is_none() {
            if n == 0 || n == 1 || (2..=MAX_BLOCK_SIZE).contains(&n) {
                self.padding = n;
            } else {
                self.error = Some(MinLzError::InvalidPadding(n));
            }
        }
        self
    }

    /// Overrides the source of padding filler bytes (default: the system
    /// CSPRNG via [`crate::random::DefaultRandomSource`]).
    pub fn padding_src(mut self, src: impl RandomSource + 'static) -> Self {
        self.padding_src = Some(Box::new(src));
        self
    }

    /// When `true`, every `write` call also flushes its block immediately
    /// instead of waiting for `block_size` bytes to accumulate (spec.md §9).
    pub fn flush_on_write(mut self, yes: bool) -> Self {
        self.flush_on_write = yes;
        self
    }

    /// Overrides the block encoder (spec.md §4.3 step 3); see
    /// [`crate::block::Encoder`] for the expected signature.
    pub fn custom_encoder<F>(mut self, f: F) -> Self
    where
        F: Fn(&[u8], &mut Vec<u8>) -> i64 + Send + Sync + 'static,
    {
        self.custom_encoder = Some(Arc::new(f));
        self
    }

    /// Validates cross-field constraints and resolves defaults, surfacing
    /// the first latched error if any setter call failed along the way.
    pub fn build(self) -> Result<WriterParams> {
        if let Some(e) = self.error {
            return Err(e);
        }
        if self.add_index && !self.create_index {
            return Err(MinLzError::IndexRequired);
        }
        Ok(WriterParams {
            concurrency: self.concurrency,
            block_size: self.block_size,
            level: self.level,
            create_index: self.create_index,
            add_index: self.add_index,
            padding: self.padding,
            padding_src: self.padding_src.unwrap_or_else(|| Box::new(DefaultRandomSource)),
            flush_on_write: self.flush_on_write,
            custom_encoder: self.custom_encoder,
        })
    }
}
