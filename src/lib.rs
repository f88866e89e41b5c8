//! Concurrent streaming writer for the MinLZ block-compression format.
//!
//! A `minlz::Writer<W>` partitions an unbounded byte stream into fixed-size
//! blocks, compresses each block independently (optionally across a pool of
//! worker threads), and emits a framed, checksummed chunk stream to `W`.
//! The compression kernel itself, the reader/decoder side, and the index's
//! wire layout are intentionally out of scope for this crate — see
//! `SPEC_FULL.md`.
//!
//! ```no_run
//! use minlz::Writer;
//! use std::io::Write;
//!
//! let mut w = Writer::new(std::io::sink())?;
//! w.write_all(b"some data")?;
//! w.close()?;
//! # Ok::<(), minlz::MinLzError>(())
//! ```

pub mod block;
pub mod chunk;
pub mod crc;
pub mod dispatcher;
pub mod error;
pub mod index;
pub mod options;
pub mod pool;
pub mod random;
pub mod varint;
pub mod writer;

pub use block::{Encoder, Level};
pub use chunk::{DEFAULT_BLOCK_SIZE, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE};
pub use error::{MinLzError, Result};
pub use options::{WriterBuilder, WriterParams};
pub use random::{DefaultRandomSource, FixedRandomSource, RandomSource};
pub use writer::Writer;
