//! Buffer Pool (spec.md §4.2, component C2).
//!
//! Two independent capacity-gated free lists, one per buffer class spec.md
//! §3 names: *input-sized* buffers (`scratch_in`, used by `read_from` to
//! pull raw bytes off a `Read` before submission) and *output-sized*
//! buffers (`scratch_out`, the block encoder worker's chunk-building
//! scratch). Recycling both instead of allocating per block avoids the
//! allocation spike a concurrent pipeline would otherwise hit under load —
//! the same motivation `jafreck-lz4r`'s `io/compress_mt.rs` has for batching
//! work through a fixed-size `rayon` pool rather than spawning unboundedly.
//! Undersized buffers are dropped rather than grown in place (spec.md §4.2),
//! since a buffer only shrinks below its class's capacity after a caller
//! resizes the writer's block size mid-stream via `reset`.

use std::sync::Mutex;

struct Class {
    capacity: usize,
    free: Mutex<Vec<Vec<u8>>>,
}

impl Class {
    fn new(capacity: usize) -> Self {
        Class { capacity, free: Mutex::new(Vec::new()) }
    }

    fn acquire(&self) -> Vec<u8> {
        let mut free = self.free.lock().unwrap_or_else(|e| e.into_inner());
        match free.pop() {
            Some(mut buf) => {
                buf.clear();
                buf
            }
            None => Vec::with_capacity(self.capacity),
        }
    }

    fn release(&self, buf: Vec<u8>) {
        if buf.capacity() < self.capacity {
            return;
        }
        let mut free = self.free.lock().unwrap_or_else(|e| e.into_inner());
        free.push(buf);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.free.lock().unwrap().len()
    }
}

/// A pool of reusable buffers in two capacity classes: input-sized (at
/// least `block_size` bytes) and output-sized (at least
/// `output_buffer_capacity` bytes, per spec.md §3).
pub struct BufferPool {
    input: Class,
    output: Class,
}

impl BufferPool {
    /// Creates a pool whose input buffers hold at least `input_capacity`
    /// bytes and whose output buffers hold at least `output_capacity` bytes
    /// without reallocating.
    pub fn new(input_capacity: usize, output_capacity: usize) -> Self {
        BufferPool { input: Class::new(input_capacity), output: Class::new(output_capacity) }
    }

    /// Takes an input-sized buffer from the pool, or allocates a fresh one.
    /// Always returned empty (`len() == 0`).
    pub fn acquire_input(&self) -> Vec<u8> {
        self.input.acquire()
    }

    /// Returns an input-sized buffer to the pool; silently dropped if its
    /// capacity has fallen below the input class's floor.
    pub fn release_input(&self, buf: Vec<u8>) {
        self.input.release(buf)
    }

    /// Takes an output-sized buffer from the pool, or allocates a fresh one.
    /// Always returned empty (`len() == 0`).
    pub fn acquire_output(&self) -> Vec<u8> {
        self.output.acquire()
    }

    /// Returns an output-sized buffer to the pool; silently dropped if its
    /// capacity has fallen below the output class's floor (spec.md §4.2).
    pub fn release_output(&self, buf: Vec<u8>) {
        self.output.release(buf)
    }

    /// The capacity output buffers are allocated with, and the floor below
    /// which a released output buffer is discarded.
    pub fn output_capacity(&self) -> usize {
        self.output.capacity
    }

    /// The capacity input buffers are allocated with.
    pub fn input_capacity(&self) -> usize {
        self.input.capacity
    }

    /// Number of buffers currently sitting in the output free list.
    #[cfg(test)]
    pub(crate) fn output_len(&self) -> usize {
        self.output.len()
    }
}
