//! Masked CRC32-Castagnoli, as used by the MinLZ/S2/Snappy chunk formats.
//!
//! Grounded on `examples/other_examples/.../BurntSushi-rust-snappy__src-frame.rs`,
//! whose `crc32c` helper applies the identical `(c >> 15 | c << 17) +
//! 0xA282EAD8` mask on top of `crc32::checksum_castagnoli`. This crate uses
//! the `crc32c` crate (also reached for by `QuiverDB` and
//! `pahome-thin-provisioning-tools` elsewhere in the retrieval pack) rather
//! than `crc32fast`, which only implements the IEEE polynomial and cannot
//! produce a Castagnoli checksum — see DESIGN.md.

/// Computes CRC32-Castagnoli over `data`.
#[inline]
pub fn crc32c(data: &[u8]) -> u32 {
    crc32c::crc32c(data)
}

/// Applies the MinLZ/S2 checksum mask: rotate right 15, then add a fixed
/// constant (mod 2^32). Spec.md §6: `mask(c) = ((c >> 15) | (c << 17)) +
/// 0xA282EAD8`.
#[inline]
pub fn mask(c: u32) -> u32 {
    (c.rotate_right(15)).wrapping_add(0xA282_EAD8)
}

/// Computes the masked CRC32-C of `data` directly — the value stored as the
/// 4-byte checksum field of every data chunk (spec.md §3 invariant 1).
#[inline]
pub fn masked_crc(data: &[u8]) -> u32 {
    mask(crc32c(data))
}
