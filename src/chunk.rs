//! Chunk Serializer (spec.md §4.1, component C1).
//!
//! Bit-exact framing of every chunk on the wire: a 4-byte prefix (`[type,
//! len_lo, len_mid, len_hi]`, `len` a little-endian 24-bit body length)
//! followed by the body. Grounded on two references:
//! `examples/other_examples/.../KarpelesLab-minlz-rs__src-writer.rs` (chunk
//! type bytes, magic-chunk convention) and
//! `examples/other_examples/.../BurntSushi-rust-snappy__src-frame.rs` (the
//! identical 4-byte-prefix + masked-CRC32C framing Snappy/S2/MinLZ share).
//!
//! Every function here is a pure function over caller-provided bytes, per
//! spec.md §4.1's closing sentence.

use crate::crc::masked_crc;
use crate::error::{MinLzError, Result};
use crate::varint::{put_uvarint, uvarint_len};

// ─────────────────────────────────────────────────────────────────────────────
// Block-size bounds (spec.md §3)
// ─────────────────────────────────────────────────────────────────────────────

/// Minimum configurable block size: 4 KiB.
pub const MIN_BLOCK_SIZE: usize = 4 * 1024;
/// Maximum configurable block size: 4 MiB.
pub const MAX_BLOCK_SIZE: usize = 4 * 1024 * 1024;
/// Default block size when the caller does not configure one explicitly.
/// Matches the `minlz-rs` reference's `DEFAULT_BLOCK_SIZE` (1 MiB).
pub const DEFAULT_BLOCK_SIZE: usize = 1024 * 1024;

/// Largest body a chunk's 3-byte little-endian length field can address.
pub const MAX_CHUNK_SIZE: usize = 0x00FF_FFFF;

/// Size in bytes of a chunk's type+length prefix.
pub const CHUNK_HEADER_SIZE: usize = 4;
/// Size in bytes of the masked-CRC32C checksum field in a data chunk's body.
pub const CHECKSUM_SIZE: usize = 4;

/// Minimum well-formed skippable frame size (spec.md §4.7 step 6): the
/// 4-byte prefix plus at least one body byte, so a padding frame is always
/// distinguishable from a bare, empty chunk.
pub const SKIPPABLE_FRAME_HEADER_SIZE: usize = CHUNK_HEADER_SIZE + 1;

/// Largest body a caller-supplied user chunk may carry.
pub const MAX_USER_CHUNK_SIZE: usize = MAX_BLOCK_SIZE;

/// Minimum, maximum (inclusive) user-skippable chunk ids. `0xFE` itself is
/// reserved for the padding chunk type — see DESIGN.md's resolution of the
/// "ceiling of user-chunk IDs" wording in spec.md §4.1/§4.7. `0x99`, though
/// inside this numeric range, is separately reserved for the trailing index
/// chunk (`CHUNK_TYPE_INDEX`) and is excluded by `build_user_chunk` below.
pub const USER_CHUNK_ID_MIN: u8 = 0x80;
pub const USER_CHUNK_ID_MAX: u8 = 0xFD;

// ─────────────────────────────────────────────────────────────────────────────
// Chunk type bytes
// ─────────────────────────────────────────────────────────────────────────────

pub const CHUNK_TYPE_STREAM_HEADER: u8 = 0xFF;
pub const CHUNK_TYPE_COMPRESSED_DATA: u8 = 0x00;
pub const CHUNK_TYPE_UNCOMPRESSED_DATA: u8 = 0x01;
pub const CHUNK_TYPE_EOF: u8 = 0x03;
pub const CHUNK_TYPE_INDEX: u8 = 0x99;
pub const CHUNK_TYPE_PADDING: u8 = 0xFE;

/// Format magic bytes carried in the body of the one-shot `stream_header`
/// chunk, ahead of the block-size exponent byte.
pub const MAGIC_BODY: &[u8] = b"MinLz";

// ─────────────────────────────────────────────────────────────────────────────
// Prefix serialization
// ─────────────────────────────────────────────────────────────────────────────

/// Appends a chunk's 4-byte `[type, len_lo, len_mid, len_hi]` prefix to
/// `dst`. `body_len` must fit in 24 bits.
pub fn push_chunk_prefix(dst: &mut Vec<u8>, chunk_type: u8, body_len: usize) {
    debug_assert!(body_len <= MAX_CHUNK_SIZE);
    dst.push(chunk_type);
    dst.push((body_len & 0xff) as u8);
    dst.push(((body_len >> 8) & 0xff) as u8);
    dst.push(((body_len >> 16) & 0xff) as u8);
}

/// Writes a chunk's 4-byte prefix into `dst[offset..offset + 4]`.
pub fn write_chunk_prefix(dst: &mut [u8], offset: usize, chunk_type: u8, body_len: usize) {
    debug_assert!(body_len <= MAX_CHUNK_SIZE);
    dst[offset] = chunk_type;
    dst[offset + 1] = (body_len & 0xff) as u8;
    dst[offset + 2] = ((body_len >> 8) & 0xff) as u8;
    dst[offset + 3] = ((body_len >> 16) & 0xff) as u8;
}

// ─────────────────────────────────────────────────────────────────────────────
// Stream header (spec.md §4.1, §4.7 step 3, §6)
// ─────────────────────────────────────────────────────────────────────────────

/// `floor(log2(block_size - 1)) - 10`, the exponent byte the reader uses to
/// size its buffers (spec.md §6).
pub fn block_size_exponent(block_size: usize) -> u8 {
    debug_assert!(block_size > 1);
    let bits = usize::BITS - (block_size - 1).leading_zeros();
    (bits as i32 - 1 - 10).max(0) as u8
}

/// Builds the complete one-shot stream-header chunk: magic bytes followed by
/// the block-size exponent byte.
pub fn build_stream_header(block_size: usize) -> Vec<u8> {
    let mut body = Vec::with_capacity(MAGIC_BODY.len() + 1);
    body.extend_from_slice(MAGIC_BODY);
    body.push(block_size_exponent(block_size));

    let mut out = Vec::with_capacity(CHUNK_HEADER_SIZE + body.len());
    push_chunk_prefix(&mut out, CHUNK_TYPE_STREAM_HEADER, body.len());
    out.extend_from_slice(&body);
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Data chunks (spec.md §3 invariant 2, §4.1, §4.3)
// ─────────────────────────────────────────────────────────────────────────────

/// Builds an `uncompressed_data` chunk: `[prefix][masked crc][raw bytes]`.
pub fn build_uncompressed_chunk(src: &[u8]) -> Vec<u8> {
    let body_len = CHECKSUM_SIZE + src.len();
    let mut out = Vec::with_capacity(CHUNK_HEADER_SIZE + body_len);
    push_chunk_prefix(&mut out, CHUNK_TYPE_UNCOMPRESSED_DATA, body_len);
    out.extend_from_slice(&masked_crc(src).to_le_bytes());
    out.extend_from_slice(src);
    out
}

/// Builds a `minlz_compressed_data` chunk: `[prefix][masked crc]
/// [varint(uncompressed_len)][compressed bytes]`.
pub fn build_compressed_chunk(uncompressed_len: usize, compressed: &[u8], crc: u32) -> Vec<u8> {
    let v_len = uvarint_len(uncompressed_len as u64);
    let body_len = CHECKSUM_SIZE + v_len + compressed.len();
    let mut out = Vec::with_capacity(CHUNK_HEADER_SIZE + body_len);
    push_chunk_prefix(&mut out, CHUNK_TYPE_COMPRESSED_DATA, body_len);
    out.extend_from_slice(&crc.to_le_bytes());
    put_uvarint(&mut out, uncompressed_len as u64);
    out.extend_from_slice(compressed);
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// EOF chunk (spec.md §4.1, §4.7 step 4, §6)
// ─────────────────────────────────────────────────────────────────────────────

/// Builds the `eof` chunk: standard 4-byte prefix, body = `[1-byte varint
/// length][varint(uncompressed_written)]`.
pub fn build_eof_chunk(uncompressed_written: u64) -> Vec<u8> {
    let v_len = uvarint_len(uncompressed_written);
    let body_len = 1 + v_len;
    let mut out = Vec::with_capacity(CHUNK_HEADER_SIZE + body_len);
    push_chunk_prefix(&mut out, CHUNK_TYPE_EOF, body_len);
    out.push(v_len as u8);
    put_uvarint(&mut out, uncompressed_written);
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Padding chunk (spec.md §4.7 step 6)
// ─────────────────────────────────────────────────────────────────────────────

/// Builds a `padding` chunk whose body is exactly `filler`.
pub fn build_padding_chunk(filler: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(CHUNK_HEADER_SIZE + filler.len());
    push_chunk_prefix(&mut out, CHUNK_TYPE_PADDING, filler.len());
    out.extend_from_slice(filler);
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// User chunks (spec.md §4.5, §6)
// ─────────────────────────────────────────────────────────────────────────────

/// Validates and builds a `user_skippable` chunk.
pub fn build_user_chunk(id: u8, data: &[u8]) -> Result<Vec<u8>> {
    if id < USER_CHUNK_ID_MIN || id > USER_CHUNK_ID_MAX || id == CHUNK_TYPE_INDEX {
        return Err(MinLzError::InvalidSkippableId(id));
    }
    if data.len() > MAX_USER_CHUNK_SIZE {
        return Err(MinLzError::UserChunkTooLarge(data.len(), MAX_USER_CHUNK_SIZE));
    }
    let mut out = Vec::with_capacity(CHUNK_HEADER_SIZE + data.len());
    push_chunk_prefix(&mut out, id, data.len());
    out.extend_from_slice(data);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_roundtrips_length() {
        let mut buf = Vec::new();
        push_chunk_prefix(&mut buf, CHUNK_TYPE_COMPRESSED_DATA, 0x01_0203);
        assert_eq!(buf, vec![0x00, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn write_chunk_prefix_matches_push() {
        let mut pushed = Vec::new();
        push_chunk_prefix(&mut pushed, 0x42, 99);
        let mut written = [0u8; 4];
        write_chunk_prefix(&mut written, 0, 0x42, 99);
        assert_eq!(&pushed[..], &written[..]);
    }

    #[test]
    fn block_size_exponent_matches_reader_formula() {
        // floor(log2(block_size - 1)) - 10
        assert_eq!(block_size_exponent(4 * 1024), 1); // floor(log2(4095)) = 11, 11-10=1
        assert_eq!(block_size_exponent(1024 * 1024), 9); // floor(log2(2^20-1)) = 19, 19-10=9
        assert_eq!(block_size_exponent(4 * 1024 * 1024), 11); // floor(log2(2^22-1)) = 21, 21-10=11
    }

    #[test]
    fn stream_header_begins_with_magic() {
        let header = build_stream_header(DEFAULT_BLOCK_SIZE);
        assert_eq!(header[0], CHUNK_TYPE_STREAM_HEADER);
        assert_eq!(&header[4..4 + MAGIC_BODY.len()], MAGIC_BODY);
        assert_eq!(header.len(), 4 + MAGIC_BODY.len() + 1);
    }

    #[test]
    fn uncompressed_chunk_checksum_matches_masked_crc() {
        let src = b"the quick brown fox";
        let chunk = build_uncompressed_chunk(src);
        assert_eq!(chunk[0], CHUNK_TYPE_UNCOMPRESSED_DATA);
        let body_len = u32::from_le_bytes([chunk[1], chunk[2], chunk[3], 0]) as usize;
        assert_eq!(body_len, CHECKSUM_SIZE + src.len());
        let crc_bytes = [chunk[4], chunk[5], chunk[6], chunk[7]];
        assert_eq!(u32::from_le_bytes(crc_bytes), masked_crc(src));
        assert_eq!(&chunk[8..], src);
    }

    #[test]
    fn compressed_chunk_embeds_uncompressed_len_varint() {
        let compressed = [1u8, 2, 3, 4, 5];
        let crc = masked_crc(b"original source bytes");
        let chunk = build_compressed_chunk(22, &compressed, crc);
        assert_eq!(chunk[0], CHUNK_TYPE_COMPRESSED_DATA);
        let (decoded_len, consumed) = crate::varint::read_uvarint(&chunk[8..]).unwrap();
        assert_eq!(decoded_len, 22);
        assert_eq!(&chunk[8 + consumed..], &compressed[..]);
    }

    #[test]
    fn eof_chunk_body_is_length_prefixed_varint() {
        let chunk = build_eof_chunk(123_456);
        assert_eq!(chunk[0], CHUNK_TYPE_EOF);
        let varint_len = chunk[4] as usize;
        let (decoded, consumed) = crate::varint::read_uvarint(&chunk[5..]).unwrap();
        assert_eq!(consumed, varint_len);
        assert_eq!(decoded, 123_456);
    }

    #[test]
    fn eof_chunk_zero_length_stream() {
        let chunk = build_eof_chunk(0);
        assert_eq!(chunk[0], CHUNK_TYPE_EOF);
        assert_eq!(chunk[4], 1); // varint(0) is one byte
        assert_eq!(chunk[5], 0);
    }

    #[test]
    fn padding_chunk_has_requested_filler() {
        let filler = vec![0xABu8; 37];
        let chunk = build_padding_chunk(&filler);
        assert_eq!(chunk[0], CHUNK_TYPE_PADDING);
        assert_eq!(&chunk[4..], &filler[..]);
    }

    #[test]
    fn user_chunk_rejects_ids_outside_range() {
        assert!(build_user_chunk(0x7F, b"x").is_err());
        assert!(build_user_chunk(0xFE, b"x").is_err()); // reserved for padding
        assert!(build_user_chunk(0xFF, b"x").is_err()); // reserved for stream header
        assert!(build_user_chunk(0x90, b"x").is_ok());
    }

    #[test]
    fn user_chunk_rejects_the_index_chunk_type_even_in_range() {
        assert!(build_user_chunk(CHUNK_TYPE_INDEX, b"x").is_err());
    }

    #[test]
    fn user_chunk_rejects_oversized_payload() {
        let big = vec![0u8; MAX_USER_CHUNK_SIZE + 1];
        assert!(build_user_chunk(0x90, &big).is_err());
    }

    #[test]
    fn user_chunk_framing_is_exact() {
        let chunk = build_user_chunk(0x90, b"meta").unwrap();
        assert_eq!(chunk, vec![0x90, 4, 0, 0, b'm', b'e', b't', b'a']);
    }
}
