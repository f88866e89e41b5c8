//! Ordered Output Dispatcher (spec.md §4.4, component C5).
//!
//! Blocks are encoded out of order across the `rayon` pool but must reach
//! the sink in submission order. Grounded on
//! `examples/other_examples/.../sstadick-gzp__src-par-compress.rs`'s
//! `ParCompress`: a bounded channel of *receivers* is populated in
//! submission order before any worker is spawned, and a single writer
//! thread drains that channel and blocks on each receiver in turn — so the
//! Nth receiver can only unblock the writer after the first N-1 have
//! already been consumed, regardless of which worker finishes first. This
//! is the same ordering trick `jafreck-lz4r`'s `io/compress_mt.rs` gets via
//! a `BTreeMap`-keyed `WriteRegister`; the channel-of-receivers version
//! avoids that structure's re-sorting and lets backpressure fall out of the
//! channel's bound for free.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};

use crate::block::{encode_block, Encoder, Level};
use crate::error::MinLzError;
use crate::index::IndexBuilder;
use crate::pool::BufferPool;

/// One unit of work flowing through the ordering channel: bytes to append
/// to the sink (possibly empty, for a pure flush barrier), the uncompressed
/// offset to record in the index (when this emission represents a data
/// block), and an optional completion signal for `flush`/`close` callers.
pub struct Emission {
    pub buf: Vec<u8>,
    pub uncompressed_offset: Option<u64>,
    pub flush_done: Option<Sender<()>>,
}

/// What the dispatcher thread hands back when the pipeline is torn down.
pub struct DispatcherOutcome {
    pub index: IndexBuilder,
    pub compressed_written: u64,
}

/// A running block pipeline: a fixed-capacity ordering channel plus the
/// dispatcher thread draining it.
pub struct Pipeline {
    order_tx: Option<Sender<Receiver<Emission>>>,
    pool: Arc<BufferPool>,
    handle: Option<JoinHandle<DispatcherOutcome>>,
}

impl Pipeline {
    /// Spawns the dispatcher thread. `concurrency` bounds both the ordering
    /// channel and, indirectly, how many blocks may be mid-encode at once —
    /// once the channel is full, `submit_block` blocks the frontend until
    /// the dispatcher has drained a slot (spec.md §4.4's backpressure rule).
    pub fn spawn<W>(
        concurrency: usize,
        sink: Arc<Mutex<W>>,
        pool: Arc<BufferPool>,
        error_cell: Arc<Mutex<Option<MinLzError>>>,
        index: IndexBuilder,
    ) -> Self
    where
        W: Write + Send + 'static,
    {
        let (order_tx, order_rx) = crossbeam_channel::bounded(concurrency.max(1));
        let dispatcher_pool = Arc::clone(&pool);
        let handle = std::thread::Builder::new()
            .name("minlz-dispatcher".into())
            .spawn(move || run_dispatcher(order_rx, sink, dispatcher_pool, error_cell, index))
            .expect("failed to spawn minlz dispatcher thread");

        Pipeline { order_tx: Some(order_tx), pool, handle: Some(handle) }
    }

    /// Encodes `src` on a `rayon` worker and submits its chunk bytes for
    /// in-order writing. `uncompressed_offset` is the stream-relative
    /// offset this block starts at, recorded against whatever compressed
    /// offset the dispatcher has reached once it's this block's turn.
    pub fn submit_block(
        &self,
        level: Level,
        custom_encoder: Option<Arc<Encoder>>,
        src: Vec<u8>,
        uncompressed_offset: u64,
        track_index: bool,
    ) {
        let (slot_tx, slot_rx) = crossbeam_channel::bounded(1);
        // Pushed before the worker is spawned: this is what fixes the slot's
        // position in output order independent of encode completion order.
        self.order_tx
            .as_ref()
            .expect("submit_block called after close")
            .send(slot_rx)
            .expect("dispatcher thread gone");

        let pool = Arc::clone(&self.pool);
        rayon::spawn(move || {
            let out = pool.acquire_output();
            let mut scratch = Vec::new();
            let encoded = encode_block(level, custom_encoder.as_deref(), &src, &mut scratch, out);
            pool.release_input(src);
            let entry = if track_index { Some(uncompressed_offset) } else { None };
            let _ = slot_tx.send(Emission { buf: encoded.chunk_bytes, uncompressed_offset: entry, flush_done: None });
        });
    }

    /// Encodes a `[range]` slice of a caller-owned, `Arc`-shared buffer on a
    /// `rayon` worker, without copying the uncompressed bytes into a
    /// dedicated input scratch buffer first (spec.md §4.5 `encode_buffer`).
    /// Each block submission only bumps the `Arc`'s refcount; only the final
    /// encoded chunk bytes are a fresh allocation, the same as
    /// [`Pipeline::submit_block`].
    pub fn submit_shared_block(
        &self,
        level: Level,
        custom_encoder: Option<Arc<Encoder>>,
        src: Arc<Vec<u8>>,
        range: std::ops::Range<usize>,
        uncompressed_offset: u64,
        track_index: bool,
    ) {
        let (slot_tx, slot_rx) = crossbeam_channel::bounded(1);
        self.order_tx
            .as_ref()
            .expect("submit_shared_block called after close")
            .send(slot_rx)
            .expect("dispatcher thread gone");

        let pool = Arc::clone(&self.pool);
        rayon::spawn(move || {
            let out = pool.acquire_output();
            let mut scratch = Vec::new();
            let encoded = encode_block(level, custom_encoder.as_deref(), &src[range], &mut scratch, out);
            let entry = if track_index { Some(uncompressed_offset) } else { None };
            let _ = slot_tx.send(Emission { buf: encoded.chunk_bytes, uncompressed_offset: entry, flush_done: None });
        });
    }

    /// Submits a pre-framed chunk (a user chunk, or the stream header) for
    /// in-order writing without going through the encoder at all.
    pub fn submit_raw(&self, buf: Vec<u8>) {
        let (slot_tx, slot_rx) = crossbeam_channel::bounded(1);
        self.order_tx.as_ref().expect("submit_raw called after close").send(slot_rx).expect("dispatcher thread gone");
        let _ = slot_tx.send(Emission { buf, uncompressed_offset: None, flush_done: None });
    }

    /// Inserts a flush barrier and blocks the caller until the dispatcher
    /// has actually reached and processed it — i.e. until every block
    /// submitted before this call has been written to the sink.
    pub fn flush_barrier(&self) {
        let (slot_tx, slot_rx) = crossbeam_channel::bounded(1);
        self.order_tx.as_ref().expect("flush_barrier called after close").send(slot_rx).expect("dispatcher thread gone");
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        let _ = slot_tx.send(Emission { buf: Vec::new(), uncompressed_offset: None, flush_done: Some(done_tx) });
        let _ = done_rx.recv();
    }

    /// Closes the ordering channel and joins the dispatcher thread,
    /// returning the accumulated index and total bytes written.
    pub fn close(mut self) -> DispatcherOutcome {
        self.order_tx.take();
        self.handle.take().expect("close called twice").join().expect("dispatcher thread panicked")
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.order_tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run_dispatcher<W: Write>(
    order_rx: Receiver<Receiver<Emission>>,
    sink: Arc<Mutex<W>>,
    pool: Arc<BufferPool>,
    error_cell: Arc<Mutex<Option<MinLzError>>>,
    mut index: IndexBuilder,
) -> DispatcherOutcome {
    let mut compressed_written: u64 = 0;

    for slot in order_rx.iter() {
        let mut emission = match slot.recv() {
            Ok(e) => e,
            Err(_) => continue,
        };

        let offset_before = compressed_written;

        if !emission.buf.is_empty() {
            let failed = error_cell.lock().unwrap_or_else(|e| e.into_inner()).is_some();
            if !failed {
                let mut guard = sink.lock().unwrap_or_else(|e| e.into_inner());
                match guard.write_all(&emission.buf) {
                    Ok(()) => compressed_written += emission.buf.len() as u64,
                    Err(e) => *error_cell.lock().unwrap_or_else(|e| e.into_inner()) = Some(MinLzError::from(e)),
                }
            }
        }

        // Whether the write above actually ran, failed, or was skipped
        // because an earlier error already latched, this buffer's role is
        // resolved now and it goes back to the output class (spec.md §4.4
        // step 4, §7).
        let mut buf = std::mem::take(&mut emission.buf);
        buf.clear();
        pool.release_output(buf);

        if let Some(u_off) = emission.uncompressed_offset {
            let failed = error_cell.lock().unwrap_or_else(|e| e.into_inner()).is_some();
            if !failed {
                if let Err(e) = index.add(offset_before, u_off) {
                    *error_cell.lock().unwrap_or_else(|e| e.into_inner()) = Some(e);
                }
            }
        }

        if let Some(done) = emission.flush_done {
            let _ = done.send(());
        }
    }

    DispatcherOutcome { index, compressed_written }
}
