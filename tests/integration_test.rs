use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::mpsc::{self, Receiver};
use std::thread;

use bytes::Bytes;
use response_stream::{
    ChunkSource, Pull, ResponseStream, StreamConfig, Whence,
};
use tempdir::TempDir;

/// Chunks arriving from another thread, like a body coming off the wire.
struct ChannelSource {
    rx: Receiver<Vec<u8>>,
    pulls: usize,
}

impl ChunkSource for ChannelSource {
    type Error = std::convert::Infallible;

    fn pull(&mut self) -> Result<Pull, Self::Error> {
        self.pulls += 1;
        Ok(match self.rx.recv() {
            Ok(chunk) => Pull::Chunk(Bytes::from(chunk)),
            Err(_) => Pull::Exhausted,
        })
    }
}

/// Reads a trailer holding the payload length in its last 4 bytes, the
/// way archive readers locate their index.
fn read_trailer<R: Read + Seek>(reader: &mut R) -> std::io::Result<Vec<u8>> {
    reader.seek(SeekFrom::End(-4))?;
    let mut len = [0u8; 4];
    reader.read_exact(&mut len)?;
    let len = u32::from_le_bytes(len) as usize;

    reader.seek(SeekFrom::Start(0))?;
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;
    Ok(payload)
}

#[test]
fn file_backed_stream_serves_seeking_consumer() {
    let dir = TempDir::new("response_stream_file").unwrap();
    let path = dir.path().join("body.bin");

    let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
    let mut file = File::create(&path).unwrap();
    file.write_all(&payload).unwrap();
    file.write_all(&(payload.len() as u32).to_le_bytes())
        .unwrap();
    drop(file);

    let config = StreamConfig {
        initial_capacity: 1024,
        read_chunk_size: 333,
    };
    let mut stream =
        ResponseStream::from_reader(File::open(&path).unwrap(), &config);

    assert_eq!(read_trailer(&mut stream).unwrap(), payload);
    assert!(stream.is_exhausted());
    assert_eq!(stream.buffered_len(), payload.len() as u64 + 4);
}

#[test]
fn stream_waits_for_chunks_from_producer() {
    let (tx, rx) = mpsc::channel();
    let producer = thread::spawn(move || {
        for word in ["incre", "mental", "ly ", "arriving"] {
            tx.send(word.as_bytes().to_vec()).unwrap();
        }
    });

    let mut stream = ResponseStream::new(ChannelSource { rx, pulls: 0 });

    assert_eq!(stream.read(Some(11)).unwrap(), &b"incremental"[..]);
    assert_eq!(stream.source().pulls, 2);

    stream.seek(5, Whence::Start).unwrap();
    let mut rest = String::new();
    stream.read_to_string(&mut rest).unwrap();
    assert_eq!(rest, "mentally arriving");

    producer.join().unwrap();
    assert!(stream.is_exhausted());
    assert_eq!(stream.seek(0, Whence::End).unwrap(), 22);
}
