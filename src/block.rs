//! Block Encoder Worker (spec.md §4.3, component C4).
//!
//! Runs once per block, on whichever thread the dispatcher (C5) hands the
//! block to. The real LZ compression kernel is out of scope (spec.md §1);
//! [`default_encode`] stands in for it exactly the way `jafreck-lz4r`'s own
//! `block/` module separates framing from the codec — here there simply is
//! no codec behind the seam, only a toy literal/run-length scheme, enough to
//! exercise both the "compressed" and "stored uncompressed" paths a real
//! kernel would also produce.

use crate::chunk::{build_compressed_chunk, build_uncompressed_chunk};
use crate::crc::masked_crc;
use crate::varint::put_uvarint;

/// Compression effort, forwarded to whichever encoder is in effect. The
/// out-of-scope real kernel would use this to trade ratio for speed;
/// [`default_encode`] only uses it for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Every block is stored uncompressed; no encoder runs at all.
    Uncompressed,
    Fastest,
    Balanced,
    Smallest,
}

impl Default for Level {
    fn default() -> Self {
        Level::Balanced
    }
}

/// Signature a caller-supplied compressor must implement: write the
/// compressed form of `src` into `dst` (which is empty on entry) and return
/// its length, or a negative value to decline (spec.md §6 `custom_encoder`).
pub type Encoder = dyn Fn(&[u8], &mut Vec<u8>) -> i64 + Send + Sync;

/// The result of running one block through the encoder: the fully-framed
/// chunk bytes, plus the bookkeeping the dispatcher needs to feed the index
/// builder and the running uncompressed/compressed counters.
pub struct EncodedBlock {
    pub chunk_bytes: Vec<u8>,
    pub uncompressed_len: usize,
    pub compressed_len: usize,
    pub stored_uncompressed: bool,
}

/// Runs the seven-step encode algorithm of spec.md §4.3 over `src`,
/// appending the resulting chunk into a buffer drawn from `out` (typically
/// pool-provided). `scratch` is reused across calls to hold the encoder's
/// candidate compressed bytes ahead of the final framing decision.
pub fn encode_block(
    level: Level,
    custom_encoder: Option<&Encoder>,
    src: &[u8],
    scratch: &mut Vec<u8>,
    mut out: Vec<u8>,
) -> EncodedBlock {
    log::trace!("encoding block len={} level={:?}", src.len(), level);

    // Step 1: checksum is computed over the uncompressed bytes regardless of
    // how the block ends up stored.
    let crc = masked_crc(src);

    // Step 2: `Uncompressed` skips the encoder entirely.
    if level == Level::Uncompressed {
        out.extend_from_slice(&build_uncompressed_chunk(src));
        return EncodedBlock {
            chunk_bytes: out,
            uncompressed_len: src.len(),
            compressed_len: src.len(),
            stored_uncompressed: true,
        };
    }

    // Steps 3-4: invoke the encoder (custom override takes precedence over
    // the bundled default). A negative return from a custom encoder means
    // "declined" rather than "store uncompressed" — fall through to the
    // level's default encoder before giving up on compression entirely.
    scratch.clear();
    let mut ret = match custom_encoder {
        Some(f) => f(src, scratch),
        None => default_encode(level, src, scratch),
    };
    if custom_encoder.is_some() && ret < 0 {
        scratch.clear();
        ret = default_encode(level, src, scratch);
    }

    if ret >= 0 && (ret as usize) < src.len() {
        let compressed = &scratch[..ret as usize];
        out.extend_from_slice(&build_compressed_chunk(src.len(), compressed, crc));
        EncodedBlock {
            chunk_bytes: out,
            uncompressed_len: src.len(),
            compressed_len: compressed.len(),
            stored_uncompressed: false,
        }
    } else {
        // Step 5: encoder declined, or its output did not beat the input —
        // fall back to storing the block uncompressed.
        out.extend_from_slice(&build_uncompressed_chunk(src));
        EncodedBlock {
            chunk_bytes: out,
            uncompressed_len: src.len(),
            compressed_len: src.len(),
            stored_uncompressed: true,
        }
    }
}

/// Placeholder stand-in for the out-of-scope MinLZ compression kernel.
///
/// Encodes `src` as alternating literal and run-length tokens:
/// `[0x00][varint(n)][n literal bytes]` or `[0x01][varint(n)][1 byte value]`
/// for runs of at least 4 identical bytes. Returns `-1` (and leaves `dst`
/// cleared) when the result would not be smaller than `src`.
pub fn default_encode(_level: Level, src: &[u8], dst: &mut Vec<u8>) -> i64 {
    dst.clear();
    let mut i = 0;
    let mut literal_start = 0;

    while i < src.len() {
        let b = src[i];
        let mut run = 1;
        while i + run < src.len() && src[i + run] == b && run < 0xFFFF {
            run += 1;
        }
        if run >= 4 {
            if literal_start < i {
                push_literal_token(dst, &src[literal_start..i]);
            }
            dst.push(0x01);
            put_uvarint(dst, run as u64);
            dst.push(b);
            i += run;
            literal_start = i;
        } else {
            i += run;
        }
    }
    if literal_start < src.len() {
        push_literal_token(dst, &src[literal_start..]);
    }

    if dst.len() < src.len() {
        dst.len() as i64
    } else {
        dst.clear();
        -1
    }
}

fn push_literal_token(dst: &mut Vec<u8>, literal: &[u8]) {
    dst.push(0x00);
    put_uvarint(dst, literal.len() as u64);
    dst.extend_from_slice(literal);
}
