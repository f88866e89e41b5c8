//! Padding filler source (spec.md §4.7 step 6, `padding_src` option in §6).
//!
//! Padding chunk bodies default to random bytes rather than zeroes so the
//! padding can't be mistaken for a run of compressible zero data by a naive
//! downstream scanner. Callers may substitute a deterministic source (e.g.
//! in tests) via `WriterBuilder::padding_src`.

use rand::RngCore;

/// A source of filler bytes for padding chunks.
pub trait RandomSource: Send {
    fn fill(&mut self, buf: &mut [u8]);
}

/// Default source: the thread-local CSPRNG from the `rand` crate.
pub struct DefaultRandomSource;

impl RandomSource for DefaultRandomSource {
    fn fill(&mut self, buf: &mut [u8]) {
        rand::thread_rng().fill_bytes(buf);
    }
}

/// A deterministic source useful for tests and reproducible output.
pub struct FixedRandomSource {
    byte: u8,
}

impl FixedRandomSource {
    pub fn new(byte: u8) -> Self {
        FixedRandomSource { byte }
    }
}

impl RandomSource for FixedRandomSource {
    fn fill(&mut self, buf: &mut [u8]) {
        buf.fill(self.byte);
    }
}
