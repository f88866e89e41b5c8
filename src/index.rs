//! Index Builder (spec.md §4.6, component C3).
//!
//! Accumulates `(compressed_offset, uncompressed_offset)` pairs, one per
//! emitted block, and serializes them into a trailing index chunk on
//! request. The wire layout is this crate's own — spec.md explicitly leaves
//! the index's internal format unspecified — so entries are delta-encoded
//! against the previous entry with [`crate::varint`], the same encoding
//! already used for chunk-body lengths, rather than reaching for a second
//! scheme.

use crate::chunk::{push_chunk_prefix, CHUNK_TYPE_INDEX};
use crate::error::{MinLzError, Result};
use crate::varint::put_uvarint;

/// Sentinel passed to [`IndexBuilder::append_to`] when the total compressed
/// size is not yet known (e.g. a caller-provided sink that can't be measured).
pub const UNKNOWN_TOTAL_COMPRESSED: i64 = -1;

#[derive(Debug, Default)]
pub struct IndexBuilder {
    block_size: usize,
    entries: Vec<(u64, u64)>,
}

impl IndexBuilder {
    pub fn new(block_size: usize) -> Self {
        IndexBuilder { block_size, entries: Vec::new() }
    }

    /// Clears accumulated entries and adopts a new block size, as happens on
    /// `reset` (spec.md §4.7 "reset" / §9).
    pub fn reset(&mut self, block_size: usize) {
        self.block_size = block_size;
        self.entries.clear();
    }

    /// The block size entries are being recorded against.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Records a block boundary. Offsets must be monotonically
    /// non-decreasing relative to the previous entry — the dispatcher
    /// appends entries strictly in submission order, so a regression here
    /// indicates a dispatcher bug rather than a caller error.
    pub fn add(&mut self, compressed_offset: u64, uncompressed_offset: u64) -> Result<()> {
        if let Some(&(last_c, last_u)) = self.entries.last() {
            if compressed_offset < last_c || uncompressed_offset < last_u {
                return Err(MinLzError::Index(format!(
                    "index entries out of order: ({compressed_offset}, {uncompressed_offset}) \
                     follows ({last_c}, {last_u})"
                )));
            }
        }
        self.entries.push((compressed_offset, uncompressed_offset));
        Ok(())
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serializes the accumulated entries as a trailing index chunk and
    /// appends it to `dst`, returning the number of bytes appended.
    /// `total_compressed` is [`UNKNOWN_TOTAL_COMPRESSED`] when the final
    /// compressed size can't be determined up front.
    pub fn append_to(&self, dst: &mut Vec<u8>, total_uncompressed: u64, total_compressed: i64) -> usize {
        let mut body = Vec::new();
        put_uvarint(&mut body, self.block_size as u64);
        put_uvarint(&mut body, total_uncompressed);
        if total_compressed < 0 {
            body.push(0);
        } else {
            body.push(1);
            put_uvarint(&mut body, total_compressed as u64);
        }
        put_uvarint(&mut body, self.entries.len() as u64);

        let mut prev = (0u64, 0u64);
        for &(c, u) in &self.entries {
            put_uvarint(&mut body, c - prev.0);
            put_uvarint(&mut body, u - prev.1);
            prev = (c, u);
        }

        let start = dst.len();
        push_chunk_prefix(dst, CHUNK_TYPE_INDEX, body.len());
        dst.extend_from_slice(&body);
        dst.len() - start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::varint::read_uvarint;

    #[test]
    fn fresh_builder_is_empty() {
        let idx = IndexBuilder::new(1024);
        assert!(idx.is_empty());
        assert_eq!(idx.len(), 0);
    }

    #[test]
    fn reset_clears_entries_and_adopts_block_size() {
        let mut idx = IndexBuilder::new(1024);
        idx.add(100, 200).unwrap();
        idx.reset(2048);
        assert!(idx.is_empty());
        assert_eq!(idx.block_size(), 2048);
    }

    #[test]
    fn add_rejects_regressing_offsets() {
        let mut idx = IndexBuilder::new(1024);
        idx.add(100, 200).unwrap();
        assert!(idx.add(50, 300).is_err());
        assert!(idx.add(150, 100).is_err());
    }

    #[test]
    fn append_to_embeds_entry_count_and_totals() {
        let mut idx = IndexBuilder::new(1024);
        idx.add(10, 1024).unwrap();
        idx.add(25, 2048).unwrap();

        let mut out = Vec::new();
        let n = idx.append_to(&mut out, 2048, 25);
        assert_eq!(n, out.len());
        assert_eq!(out[0], CHUNK_TYPE_INDEX);

        let body = &out[4..];
        let (block_size, c1) = read_uvarint(body).unwrap();
        assert_eq!(block_size, 1024);
        let (total_u, c2) = read_uvarint(&body[c1..]).unwrap();
        assert_eq!(total_u, 2048);
        let known_flag = body[c1 + c2];
        assert_eq!(known_flag, 1);
        let (total_c, c3) = read_uvarint(&body[c1 + c2 + 1..]).unwrap();
        assert_eq!(total_c, 25);
        let (n_entries, _) = read_uvarint(&body[c1 + c2 + 1 + c3..]).unwrap();
        assert_eq!(n_entries, 2);
    }

    #[test]
    fn append_to_marks_unknown_total_compressed() {
        let idx = IndexBuilder::new(1024);
        let mut out = Vec::new();
        idx.append_to(&mut out, 0, UNKNOWN_TOTAL_COMPRESSED);
        let body = &out[4..];
        let (_, c1) = read_uvarint(body).unwrap();
        let (_, c2) = read_uvarint(&body[c1..]).unwrap();
        assert_eq!(body[c1 + c2], 0);
    }
}
