//! Input Buffering Frontend and Stream Lifecycle (spec.md §4.4/§4.7/§9,
//! components C6/C7).
//!
//! The public `Writer<W>` is the seam everything else in this crate is
//! built to feed: a `std::io::Write` implementation that buffers incoming
//! bytes to `block_size`, hands full blocks to either the synchronous fast
//! path or the concurrent pipeline (C5), and on `close` emits the `eof`
//! chunk, optional trailing index, and optional padding. Grounded on the
//! real `minlz-rs` reference's `Writer<W: Write>` for the buffering/`Drop`
//! shape, and on `jafreck-lz4r`'s `io/compress_mt.rs` for the
//! single-thread/multi-thread split (`NB_WORKERS_DEFAULT` there plays the
//! same role `concurrency` plays here).

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use crate::block::{Encoder, Level};
use crate::chunk::{self, DEFAULT_BLOCK_SIZE};
use crate::dispatcher::Pipeline;
use crate::error::{MinLzError, Result};
use crate::index::IndexBuilder;
use crate::options::{WriterBuilder, WriterParams};
use crate::pool::BufferPool;
use crate::random::RandomSource;

/// A concurrent, framed, checksummed streaming compressor over any
/// `W: Write + Send`. See the crate root for a usage example.
pub struct Writer<W: Write + Send + 'static> {
    sink: Arc<Mutex<W>>,
    block_size: usize,
    level: Level,
    concurrency: usize,
    create_index: bool,
    add_index: bool,
    padding: usize,
    padding_src: Box<dyn RandomSource>,
    flush_on_write: bool,
    custom_encoder: Option<Arc<Encoder>>,

    input_buffer: Vec<u8>,
    wrote_header: bool,
    uncompressed_written: u64,

    // Used only on the synchronous (`concurrency == 1`) fast path; the
    // concurrent path keeps the equivalent state inside the dispatcher
    // thread and surfaces it via `Pipeline::close`.
    sync_compressed_written: u64,
    sync_index: IndexBuilder,

    pool: Arc<BufferPool>,
    pipeline: Option<Pipeline>,
    error_cell: Arc<Mutex<Option<MinLzError>>>,
    closed: bool,
}

impl<W: Write + Send + 'static> Writer<W> {
    /// Creates a writer over `sink` using default options (spec.md §6).
    pub fn new(sink: W) -> Result<Self> {
        Self::with_builder(sink, WriterBuilder::new())
    }

    /// Creates a writer from a fully-configured [`WriterBuilder`].
    pub fn with_builder(sink: W, builder: WriterBuilder) -> Result<Self> {
        let params = builder.build()?;
        Ok(Self::from_params(sink, params))
    }

    fn from_params(sink: W, params: WriterParams) -> Self {
        let sink = Arc::new(Mutex::new(sink));
        let pool = Arc::new(BufferPool::new(
            params.block_size,
            params.block_size + chunk::CHECKSUM_SIZE + chunk::CHUNK_HEADER_SIZE,
        ));
        let error_cell = Arc::new(Mutex::new(None));

        let pipeline = if params.concurrency > 1 {
            Some(Pipeline::spawn(
                params.concurrency,
                Arc::clone(&sink),
                Arc::clone(&pool),
                Arc::clone(&error_cell),
                IndexBuilder::new(params.block_size),
            ))
        } else {
            None
        };

        Writer {
            sink,
            block_size: params.block_size,
            level: params.level,
            concurrency: params.concurrency,
            create_index: params.create_index,
            add_index: params.add_index,
            padding: params.padding,
            padding_src: params.padding_src,
            flush_on_write: params.flush_on_write,
            custom_encoder: params.custom_encoder,
            input_buffer: Vec::with_capacity(params.block_size),
            wrote_header: false,
            uncompressed_written: 0,
            sync_compressed_written: 0,
            sync_index: IndexBuilder::new(params.block_size),
            pool,
            pipeline,
            error_cell,
            closed: false,
        }
    }

    /// Writes a chunk outside the normal block stream — a caller-defined
    /// skippable chunk with `id` in `[0x80, 0xFD]` (spec.md §4.5).
    pub fn add_user_chunk(&mut self, id: u8, data: &[u8]) -> Result<()> {
        self.reject_if_errored()?;
        self.ensure_header()?;
        let framed = chunk::build_user_chunk(id, data)?;
        self.emit_raw(framed)
    }

    /// Caller-owned buffer submission (spec.md §4.5 `encode_buffer`): the
    /// caller guarantees `p` is not mutated again until the next
    /// flush/close, so this crate never copies its bytes into an input
    /// scratch buffer — `p` is wrapped once in an `Arc` and each block
    /// submission only shares a `[range]` view of it.
    pub fn encode_buffer(&mut self, p: Vec<u8>) -> Result<()> {
        self.reject_if_errored()?;
        self.ensure_header()?;
        if p.is_empty() {
            return Ok(());
        }

        let shared = Arc::new(p);
        let mut start = 0usize;
        while start < shared.len() {
            let end = (start + self.block_size).min(shared.len());
            let uncompressed_offset = self.uncompressed_written;
            self.uncompressed_written += (end - start) as u64;
            let track_index = self.create_index;

            let result = match &self.pipeline {
                Some(pipeline) => {
                    pipeline.submit_shared_block(
                        self.level,
                        self.custom_encoder.clone(),
                        Arc::clone(&shared),
                        start..end,
                        uncompressed_offset,
                        track_index,
                    );
                    Ok(())
                }
                None => self.encode_sync(&shared[start..end], uncompressed_offset, track_index),
            };
            if let Err(e) = result {
                return Err(self.latch_error(e));
            }
            start = end;
        }
        Ok(())
    }

    /// Pull loop over any `Read` (spec.md §4.5 `read_from`): flushes any
    /// buffered tail non-blockingly, then repeatedly pulls up to
    /// `block_size` bytes from `reader` into a pooled input buffer and
    /// submits it, tolerating short reads at EOF, until `reader` is
    /// exhausted. Returns the total number of bytes pulled from `reader`.
    pub fn read_from<R: std::io::Read>(&mut self, reader: &mut R) -> Result<u64> {
        self.reject_if_errored()?;
        self.ensure_header()?;
        self.async_flush()?;

        let mut total_read: u64 = 0;
        loop {
            let mut buf = self.pool.acquire_input();
            buf.resize(self.block_size, 0);
            let n = read_full_or_eof(reader, &mut buf).map_err(|e| self.latch_error(e))?;
            if n == 0 {
                self.pool.release_input(buf);
                break;
            }
            buf.truncate(n);
            total_read += n as u64;
            let short_read = n < self.block_size;
            if let Err(e) = self.dispatch_block(buf) {
                return Err(self.latch_error(e));
            }
            if short_read {
                break;
            }
        }
        Ok(total_read)
    }

    /// Routes any buffered-but-not-yet-dispatched bytes into the pipeline
    /// without blocking on their completion (spec.md §4.7 `AsyncFlush`).
    pub fn async_flush(&mut self) -> Result<()> {
        self.reject_if_errored()?;
        self.ensure_header()?;
        if !self.input_buffer.is_empty() {
            let block = std::mem::take(&mut self.input_buffer);
            self.dispatch_block(block)?;
        }
        Ok(())
    }

    /// `AsyncFlush`, then blocks until every block submitted so far has
    /// reached the sink and the sink itself has been flushed (spec.md §4.7
    /// `Flush`).
    pub fn flush_blocking(&mut self) -> Result<()> {
        self.async_flush()?;
        if let Some(pipeline) = &self.pipeline {
            pipeline.flush_barrier();
        }
        {
            let mut guard = self.sink.lock().unwrap_or_else(|e| e.into_inner());
            guard.flush().map_err(MinLzError::from)?;
        }
        self.reject_if_errored()
    }

    /// Replaces the underlying sink, discarding any buffered-but-unflushed
    /// bytes and resetting all stream state, and returns the previous sink
    /// (mirroring the real `minlz-rs` reference's `reset`).
    pub fn reset(&mut self, sink: W) -> W {
        if let Some(pipeline) = self.pipeline.take() {
            let _ = pipeline.close();
        }

        let new_sink = Arc::new(Mutex::new(sink));
        let old_sink = std::mem::replace(&mut self.sink, new_sink);
        let old = Arc::try_unwrap(old_sink)
            .unwrap_or_else(|_| unreachable!("pipeline teardown leaves exactly one sink owner"))
            .into_inner()
            .unwrap_or_else(|e| e.into_inner());

        self.input_buffer.clear();
        self.wrote_header = false;
        self.uncompressed_written = 0;
        self.sync_compressed_written = 0;
        self.sync_index = IndexBuilder::new(self.block_size);
        *self.error_cell.lock().unwrap_or_else(|e| e.into_inner()) = None;
        self.closed = false;

        if self.concurrency > 1 {
            self.pipeline = Some(Pipeline::spawn(
                self.concurrency,
                Arc::clone(&self.sink),
                Arc::clone(&self.pool),
                Arc::clone(&self.error_cell),
                IndexBuilder::new(self.block_size),
            ));
        }

        old
    }

    /// Finalizes the stream: flushes buffered bytes, emits `eof`, optional
    /// padding, and the optional trailing index. Equivalent to
    /// `close_index(false)` with the returned index bytes discarded.
    /// Idempotent — calling `close` again after a successful close is a
    /// no-op; calling it again after a failed close re-surfaces the same
    /// error.
    pub fn close(&mut self) -> Result<()> {
        self.close_index(false).map(|_| ())
    }

    /// Finalizes the stream exactly like [`Writer::close`], additionally
    /// returning the serialized index bytes when `want_index` is true and
    /// index construction (`create_index`) is enabled — regardless of
    /// whether `append_index` also embeds them on the wire. Per spec.md
    /// §4.7, the index bytes are only returned on the call that actually
    /// performs the close; idempotent re-calls return `Ok(None)`.
    pub fn close_index(&mut self, want_index: bool) -> Result<Option<Vec<u8>>> {
        if self.closed {
            let cell = self.error_cell.lock().unwrap_or_else(|e| e.into_inner());
            return match &*cell {
                Some(e) if e.is_closed() => Ok(None),
                Some(e) => Err(e.clone()),
                None => Ok(None),
            };
        }

        let result = self.close_index_inner(want_index);
        self.closed = true;
        let mut cell = self.error_cell.lock().unwrap_or_else(|e| e.into_inner());
        if cell.is_none() {
            *cell = Some(match &result {
                Ok(_) => MinLzError::Closed,
                Err(e) => e.clone(),
            });
        }
        drop(cell);
        result
    }

    fn close_index_inner(&mut self, want_index: bool) -> Result<Option<Vec<u8>>> {
        self.reject_if_errored()?;
        self.ensure_header()?;
        if !self.input_buffer.is_empty() {
            let block = std::mem::take(&mut self.input_buffer);
            self.dispatch_block(block)?;
        }

        let (index, mut total) = if let Some(pipeline) = self.pipeline.take() {
            let outcome = pipeline.close();
            (outcome.index, outcome.compressed_written)
        } else {
            (
                std::mem::replace(&mut self.sync_index, IndexBuilder::new(self.block_size)),
                self.sync_compressed_written,
            )
        };
        self.reject_if_errored()?;

        let eof = chunk::build_eof_chunk(self.uncompressed_written);
        self.write_raw_direct(&eof)?;
        total += eof.len() as u64;

        let padding_enabled = self.padding > 1;
        let index_requested = self.add_index || want_index;

        // Step 5 (spec.md §4.7): serialize the index now, but — when
        // `append_index` is set — only *count* its bytes toward the
        // padding target here. It is not physically written until step 7,
        // after the padding chunk, so the wire order is eof || padding ||
        // index (spec.md §8 invariant 2), even though the index's own
        // self-reported size already accounts for itself.
        let index_bytes = if self.create_index && index_requested {
            let mut bytes = Vec::new();
            let reported_total = if padding_enabled { -1 } else { total as i64 };
            index.append_to(&mut bytes, self.uncompressed_written, reported_total);
            if self.add_index {
                total += bytes.len() as u64;
            }
            Some(bytes)
        } else {
            None
        };

        if padding_enabled {
            let add = compute_padding_add(total, self.padding as u64, chunk::SKIPPABLE_FRAME_HEADER_SIZE as u64);
            let body_len = (add as usize) - chunk::CHUNK_HEADER_SIZE;
            let mut filler = vec![0u8; body_len];
            self.padding_src.fill(&mut filler);
            let padding_chunk = chunk::build_padding_chunk(&filler);
            self.write_raw_direct(&padding_chunk)?;
        }

        if self.add_index {
            if let Some(bytes) = &index_bytes {
                self.write_raw_direct(bytes)?;
            }
        }

        {
            let mut guard = self.sink.lock().unwrap_or_else(|e| e.into_inner());
            guard.flush().map_err(MinLzError::from)?;
        }

        Ok(if want_index { index_bytes } else { None })
    }

    fn ensure_header(&mut self) -> Result<()> {
        if self.wrote_header {
            return Ok(());
        }
        let header = chunk::build_stream_header(self.block_size);
        self.wrote_header = true;
        self.emit_raw(header)
    }

    /// Submits pre-framed bytes (a header or user chunk) for in-order
    /// writing, through the pipeline when concurrent or directly otherwise.
    fn emit_raw(&mut self, bytes: Vec<u8>) -> Result<()> {
        match &self.pipeline {
            Some(p) => {
                p.submit_raw(bytes);
                Ok(())
            }
            None => {
                self.sync_compressed_written += bytes.len() as u64;
                self.write_raw_direct(&bytes)
            }
        }
    }

    fn write_raw_direct(&mut self, bytes: &[u8]) -> Result<()> {
        let mut guard = self.sink.lock().unwrap_or_else(|e| e.into_inner());
        guard.write_all(bytes).map_err(MinLzError::from)
    }

    fn dispatch_block(&mut self, block_bytes: Vec<u8>) -> Result<()> {
        let track_index = self.create_index;
        let uncompressed_offset = self.uncompressed_written;
        self.uncompressed_written += block_bytes.len() as u64;

        match &self.pipeline {
            Some(pipeline) => {
                pipeline.submit_block(self.level, self.custom_encoder.clone(), block_bytes, uncompressed_offset, track_index);
                Ok(())
            }
            None => {
                let result = self.encode_sync(&block_bytes, uncompressed_offset, track_index);
                self.pool.release_input(block_bytes);
                result
            }
        }
    }

    fn encode_sync(&mut self, block_bytes: &[u8], uncompressed_offset: u64, track_index: bool) -> Result<()> {
        let out = self.pool.acquire_output();
        let mut scratch = Vec::new();
        let encoded = crate::block::encode_block(self.level, self.custom_encoder.as_deref(), block_bytes, &mut scratch, out);

        // The acquired buffer must go back to the pool on every path —
        // including a sink write failure — so a sticky error doesn't also
        // starve the output free list (spec.md §7).
        let write_result = self.write_raw_direct(&encoded.chunk_bytes);
        let chunk_len = encoded.chunk_bytes.len();
        let mut buf = encoded.chunk_bytes;
        buf.clear();
        self.pool.release_output(buf);
        write_result?;

        let offset_before = self.sync_compressed_written;
        self.sync_compressed_written += chunk_len as u64;
        if track_index {
            self.sync_index.add(offset_before, uncompressed_offset)?;
        }
        Ok(())
    }

    fn reject_if_errored(&self) -> Result<()> {
        match &*self.error_cell.lock().unwrap_or_else(|e| e.into_inner()) {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn latch_error(&self, e: MinLzError) -> MinLzError {
        let mut cell = self.error_cell.lock().unwrap_or_else(|e| e.into_inner());
        if cell.is_none() {
            *cell = Some(e.clone());
        }
        e
    }
}

impl<W: Write + Send + 'static> Write for Writer<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_impl(buf).map_err(to_io_error)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_blocking().map_err(to_io_error)
    }
}

impl<W: Write + Send + 'static> Writer<W> {
    fn write_impl(&mut self, buf: &[u8]) -> Result<usize> {
        self.reject_if_errored()?;
        self.ensure_header()?;
        self.input_buffer.extend_from_slice(buf);

        while self.input_buffer.len() >= self.block_size {
            let block: Vec<u8> = self.input_buffer.drain(..self.block_size).collect();
            if let Err(e) = self.dispatch_block(block) {
                return Err(self.latch_error(e));
            }
        }

        if self.flush_on_write {
            self.flush_blocking()?;
        }

        Ok(buf.len())
    }
}

impl<W: Write + Send + 'static> Drop for Writer<W> {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.close();
        }
    }
}

/// Smallest positive `add` such that `(total + add) % padding == 0` and
/// `add >= min_frame` (spec.md §4.7 step 6): use the natural gap to the next
/// multiple of `padding` if it already fits a well-formed skippable frame,
/// else keep adding further multiples of `padding` until it does.
fn compute_padding_add(total: u64, padding: u64, min_frame: u64) -> u64 {
    let rem = total % padding;
    let mut add = if rem == 0 { padding } else { padding - rem };
    while add < min_frame {
        add += padding;
    }
    add
}

/// Fills `buf` from `reader`, retrying on `Interrupted` and stopping at the
/// first zero-byte read (EOF) instead of treating a short fill as an error —
/// `read_from` needs to tell a full block from a final partial one.
fn read_full_or_eof<R: std::io::Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(MinLzError::from(e)),
        }
    }
    Ok(filled)
}

fn to_io_error(e: MinLzError) -> io::Error {
    match e {
        MinLzError::Io(snap) => io::Error::new(snap.kind(), snap.to_string()),
        other => io::Error::new(io::ErrorKind::Other, other.to_string()),
    }
}

/// Convenience constructor matching spec.md §6's documented default block
/// size, for callers that don't need the builder at all.
pub fn writer<W: Write + Send + 'static>(sink: W) -> Result<Writer<W>> {
    Writer::new(sink)
}

const _: usize = DEFAULT_BLOCK_SIZE; // keep the re-export path exercised
