//! End-to-end scenarios against the public `Writer` API (spec.md §8).
//!
//! A minimal in-test chunk walker replaces the out-of-scope decoder: it
//! understands just enough of the framing (4-byte prefix, checksum field)
//! to assert wire-level invariants without reimplementing a reader.

use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};

use minlz::{Level, MinLzError, Writer, WriterBuilder};

struct RawChunk {
    chunk_type: u8,
    body: Vec<u8>,
}

fn walk_chunks(data: &[u8]) -> Vec<RawChunk> {
    let mut out = Vec::new();
    let mut i = 0;
    while i + 4 <= data.len() {
        let chunk_type = data[i];
        let len = data[i + 1] as usize | (data[i + 2] as usize) << 8 | (data[i + 3] as usize) << 16;
        let start = i + 4;
        assert!(start + len <= data.len(), "truncated chunk body");
        out.push(RawChunk { chunk_type, body: data[start..start + len].to_vec() });
        i = start + len;
    }
    assert_eq!(i, data.len(), "trailing bytes do not form a whole chunk");
    out
}

#[test]
fn empty_stream_has_header_and_eof_only() {
    let mut sink = Vec::new();
    {
        let mut w = Writer::new(Cursor::new(&mut sink)).unwrap();
        w.close().unwrap();
    }
    let chunks = walk_chunks(&sink);
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].chunk_type, minlz::chunk::CHUNK_TYPE_STREAM_HEADER);
    assert_eq!(chunks[1].chunk_type, minlz::chunk::CHUNK_TYPE_EOF);
}

#[test]
fn single_small_write_produces_one_data_chunk() {
    let mut sink = Vec::new();
    {
        let mut w = Writer::with_builder(Cursor::new(&mut sink), WriterBuilder::new().concurrency(1)).unwrap();
        w.write_all(b"a tiny amount of data").unwrap();
        w.close().unwrap();
    }
    let chunks = walk_chunks(&sink);
    assert_eq!(chunks.len(), 3); // header, one block, eof
}

#[test]
fn boundary_write_of_exactly_two_block_sizes_emits_two_blocks() {
    let block_size = 4096;
    let mut sink = Vec::new();
    {
        let mut w =
            Writer::with_builder(Cursor::new(&mut sink), WriterBuilder::new().concurrency(1).block_size(block_size))
                .unwrap();
        w.write_all(&vec![0x5Au8; block_size * 2]).unwrap();
        w.close().unwrap();
    }
    let chunks = walk_chunks(&sink);
    assert_eq!(chunks.len(), 4); // header, block, block, eof
}

#[test]
fn user_chunk_interleaves_at_the_call_site() {
    let mut sink = Vec::new();
    {
        let mut w = Writer::with_builder(Cursor::new(&mut sink), WriterBuilder::new().concurrency(1)).unwrap();
        w.write_all(b"first").unwrap();
        w.add_user_chunk(0x90, b"marker").unwrap();
        w.write_all(b"second").unwrap();
        w.close().unwrap();
    }
    let chunks = walk_chunks(&sink);
    let user_chunk = chunks.iter().find(|c| c.chunk_type == 0x90).expect("user chunk present");
    assert_eq!(user_chunk.body, b"marker");
}

#[test]
fn padding_chunk_trails_the_stream() {
    let mut sink = Vec::new();
    {
        let mut w = Writer::with_builder(Cursor::new(&mut sink), WriterBuilder::new().concurrency(1).padding(128))
            .unwrap();
        w.write_all(b"payload needing padding").unwrap();
        w.close().unwrap();
    }
    let chunks = walk_chunks(&sink);
    assert_eq!(chunks.last().unwrap().chunk_type, 0xFE);
}

#[test]
fn concurrency_one_and_eight_agree_on_total_byte_count() {
    let data: Vec<u8> = (0..70_000u32).map(|i| (i % 251) as u8).collect();

    let mut sink1 = Vec::new();
    {
        let mut w =
            Writer::with_builder(Cursor::new(&mut sink1), WriterBuilder::new().concurrency(1).block_size(4096))
                .unwrap();
        w.write_all(&data).unwrap();
        w.close().unwrap();
    }

    let mut sink8 = Vec::new();
    {
        let mut w =
            Writer::with_builder(Cursor::new(&mut sink8), WriterBuilder::new().concurrency(8).block_size(4096))
                .unwrap();
        w.write_all(&data).unwrap();
        w.close().unwrap();
    }

    assert_eq!(sink1.len(), sink8.len());
    assert_eq!(walk_chunks(&sink1).len(), walk_chunks(&sink8).len());
}

#[derive(Clone)]
struct FailingSink(Arc<Mutex<Vec<u8>>>);

impl Write for FailingSink {
    fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
        Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "synthetic failure"))
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn sticky_error_after_sink_failure_rejects_all_later_calls() {
    let sink = FailingSink(Arc::new(Mutex::new(Vec::new())));
    let mut w = Writer::with_builder(sink, WriterBuilder::new().concurrency(1).block_size(8)).unwrap();

    let first = w.write_all(&[1u8; 16]);
    assert!(first.is_err());

    let second = w.write_all(&[2u8; 8]);
    assert!(second.is_err());

    let close_result = w.close();
    assert!(close_result.is_err());
}

#[test]
fn add_index_without_create_index_is_rejected_at_build_time() {
    let err = WriterBuilder::new().create_index(false).add_index(true).build().unwrap_err();
    assert!(matches!(err, MinLzError::IndexRequired));
}

#[test]
fn custom_encoder_is_used_instead_of_the_default() {
    let calls = Arc::new(Mutex::new(0u32));
    let calls_clone = Arc::clone(&calls);

    let mut sink = Vec::new();
    {
        let builder = WriterBuilder::new().concurrency(1).block_size(4096).custom_encoder(move |_src, dst| {
            *calls_clone.lock().unwrap() += 1;
            dst.clear();
            -1
        });
        let mut w = Writer::with_builder(Cursor::new(&mut sink), builder).unwrap();
        w.write_all(&vec![9u8; 4096]).unwrap();
        w.close().unwrap();
    }

    assert_eq!(*calls.lock().unwrap(), 1);
}

#[test]
fn padding_and_appended_index_land_in_eof_padding_index_order() {
    let mut sink = Vec::new();
    {
        let mut w = Writer::with_builder(
            Cursor::new(&mut sink),
            WriterBuilder::new().concurrency(1).padding(64).create_index(true).add_index(true),
        )
        .unwrap();
        w.write_all(b"payload that gets indexed and padded").unwrap();
        w.close().unwrap();
    }

    assert_eq!(sink.len() % 64, 0);
    let chunks = walk_chunks(&sink);
    let eof_pos = chunks.iter().position(|c| c.chunk_type == minlz::chunk::CHUNK_TYPE_EOF).unwrap();
    let padding_pos = chunks.iter().position(|c| c.chunk_type == 0xFE).unwrap();
    let index_pos = chunks.iter().position(|c| c.chunk_type == minlz::chunk::CHUNK_TYPE_INDEX).unwrap();
    assert!(eof_pos < padding_pos, "eof must precede padding");
    assert!(padding_pos < index_pos, "padding must precede the appended index");
}

#[test]
fn close_index_returns_index_bytes_only_once() {
    let mut sink = Vec::new();
    let mut w = Writer::with_builder(Cursor::new(&mut sink), WriterBuilder::new().concurrency(1)).unwrap();
    w.write_all(b"some indexed content").unwrap();
    let first = w.close_index(true).unwrap();
    assert!(first.is_some());
    let second = w.close_index(true).unwrap();
    assert!(second.is_none());
}

#[test]
fn level_uncompressed_never_shrinks_a_block() {
    let mut sink = Vec::new();
    {
        let mut w = Writer::with_builder(
            Cursor::new(&mut sink),
            WriterBuilder::new().concurrency(1).block_size(4096).level(Level::Uncompressed),
        )
        .unwrap();
        w.write_all(&vec![0u8; 4096]).unwrap();
        w.close().unwrap();
    }
    let chunks = walk_chunks(&sink);
    let data_chunk = chunks.iter().find(|c| c.chunk_type == 0x01).expect("uncompressed data chunk");
    assert_eq!(data_chunk.body.len(), 4 + 4096); // checksum + raw bytes
}
