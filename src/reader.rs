use std::io::{ErrorKind, Read};

use tracing::debug;

use crate::error::{IngestError, IngestResult};
use crate::util::{find, HEADER_END};

/// Raw result of reading up to the header terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHead {
    /// Bytes before the `\r\n\r\n` delimiter.
    pub header: Vec<u8>,
    /// Bytes read past the delimiter: the start of the body, possibly empty.
    pub body_prefix: Vec<u8>,
}

/// Limits applied while reading from one connection.
#[derive(Debug, Clone, Copy)]
pub struct ReadLimits {
    pub chunk_size: usize,
    pub max_header_size: usize,
}

/*
Accumulates bytes from the connection in `chunk_size` reads until the header
terminator shows up.

- A zero-byte read before the terminator means the peer hung up: EmptyConnection.
- Passing `max_header_size` without a terminator is HeaderTooLarge.
- The read timeout is set on the socket itself, so a stalled peer surfaces here as
  a WouldBlock/TimedOut error which converts to Timeout.
*/
pub fn read_head<R: Read>(reader: &mut R, limits: ReadLimits) -> IngestResult<RawHead> {
    let mut buffer: Vec<u8> = Vec::with_capacity(limits.chunk_size);
    let mut chunk = vec![0u8; limits.chunk_size.max(1)];
    let mut scanned: usize = 0;

    loop {
        let n = read_chunk(reader, &mut chunk)?;
        if n == 0 {
            return Err(IngestError::EmptyConnection);
        }
        buffer.extend_from_slice(&chunk[..n]);

        // The delimiter may straddle two reads, so back up over its length.
        let start = scanned.saturating_sub(HEADER_END.len() - 1);
        if let Some(pos) = find(&buffer[start..], HEADER_END) {
            let header_end = start + pos;
            debug!(header_len = header_end, "found header end");
            let body_prefix = buffer.split_off(header_end + HEADER_END.len());
            buffer.truncate(header_end);
            return Ok(RawHead {
                header: buffer,
                body_prefix,
            });
        }
        scanned = buffer.len();

        if buffer.len() > limits.max_header_size {
            return Err(IngestError::HeaderTooLarge {
                read: buffer.len(),
                limit: limits.max_header_size,
            });
        }
    }
}

/// Reads until `body` holds exactly `length` bytes.
///
/// Bytes already captured past the header count toward the total; anything
/// beyond `length` is dropped.
pub fn read_body<R: Read>(
    reader: &mut R,
    mut body: Vec<u8>,
    length: usize,
    chunk_size: usize,
) -> IngestResult<Vec<u8>> {
    if body.len() >= length {
        body.truncate(length);
        return Ok(body);
    }

    let mut chunk = vec![0u8; chunk_size.max(1)];
    while body.len() < length {
        let want = (length - body.len()).min(chunk.len());
        let n = read_chunk(reader, &mut chunk[..want])?;
        if n == 0 {
            return Err(IngestError::TruncatedBody {
                expected: length,
                received: body.len(),
            });
        }
        body.extend_from_slice(&chunk[..n]);
    }
    Ok(body)
}

// One read call, retried only when a signal interrupted it.
fn read_chunk<R: Read>(reader: &mut R, chunk: &mut [u8]) -> IngestResult<usize> {
    loop {
        match reader.read(chunk) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::io::{self, Cursor};

    use super::*;
    use crate::error::ErrorKind as Kind;

    /// Replays a fixed script of read results, then reports end of stream.
    pub(crate) struct Scripted {
        steps: VecDeque<io::Result<Vec<u8>>>,
    }

    impl Scripted {
        pub(crate) fn new(steps: Vec<io::Result<Vec<u8>>>) -> Self {
            Scripted { steps: steps.into() }
        }
    }

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.steps.pop_front() {
                None => Ok(0),
                Some(Err(e)) => Err(e),
                Some(Ok(mut data)) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    if n < data.len() {
                        self.steps.push_front(Ok(data.split_off(n)));
                    }
                    Ok(n)
                }
            }
        }
    }

    fn limits(chunk_size: usize, max_header_size: usize) -> ReadLimits {
        ReadLimits {
            chunk_size,
            max_header_size,
        }
    }

    #[test]
    fn test_head_and_body_prefix() {
        let mut input = Cursor::new(b"GET / HTTP/1.1\r\nHost: x\r\n\r\nabc".to_vec());
        let head = read_head(&mut input, limits(4096, 1024)).unwrap();
        assert_eq!(head.header, b"GET / HTTP/1.1\r\nHost: x");
        assert_eq!(head.body_prefix, b"abc");
    }

    #[test]
    fn test_delimiter_across_chunks() {
        // Chunk size 3 forces the terminator to be split between reads.
        let mut input = Cursor::new(b"GET / HTTP/1.1\r\n\r\n".to_vec());
        let head = read_head(&mut input, limits(3, 1024)).unwrap();
        assert_eq!(head.header, b"GET / HTTP/1.1");
        assert!(head.body_prefix.is_empty());
    }

    #[test]
    fn test_empty_connection() {
        let mut input = Cursor::new(Vec::new());
        let err = read_head(&mut input, limits(16, 1024)).unwrap_err();
        assert_eq!(err.kind(), Kind::EmptyConnection);
    }

    #[test]
    fn test_closed_mid_header() {
        let mut input = Cursor::new(b"GET / HTTP/1.1\r\nHost".to_vec());
        let err = read_head(&mut input, limits(16, 1024)).unwrap_err();
        assert_eq!(err.kind(), Kind::EmptyConnection);
    }

    #[test]
    fn test_header_too_large() {
        let mut input = Cursor::new(vec![b'A'; 200]);
        let err = read_head(&mut input, limits(16, 64)).unwrap_err();
        assert_eq!(err.kind(), Kind::HeaderTooLarge);
    }

    #[test]
    fn test_idle_timeout() {
        let mut input = Scripted::new(vec![Err(io::Error::from(io::ErrorKind::WouldBlock))]);
        let err = read_head(&mut input, limits(16, 64)).unwrap_err();
        assert_eq!(err.kind(), Kind::Timeout);
    }

    #[test]
    fn test_reset_mid_read() {
        let mut input = Scripted::new(vec![
            Ok(b"GET / HT".to_vec()),
            Err(io::Error::from(io::ErrorKind::ConnectionReset)),
        ]);
        let err = read_head(&mut input, limits(16, 64)).unwrap_err();
        assert_eq!(err.kind(), Kind::ConnectionError);
    }

    #[test]
    fn test_interrupted_read_is_retried() {
        let mut input = Scripted::new(vec![
            Err(io::Error::from(io::ErrorKind::Interrupted)),
            Ok(b"GET / HTTP/1.1\r\n\r\n".to_vec()),
        ]);
        assert!(read_head(&mut input, limits(64, 1024)).is_ok());
    }

    #[test]
    fn test_body_reads_remaining_bytes() {
        let mut input = Scripted::new(vec![Ok(b"lo ".to_vec()), Ok(b"world".to_vec())]);
        let body = read_body(&mut input, b"hel".to_vec(), 11, 4).unwrap();
        assert_eq!(body, b"hello world");
    }

    #[test]
    fn test_body_prefix_already_complete() {
        let mut input = Scripted::new(vec![Err(io::Error::from(io::ErrorKind::WouldBlock))]);
        let body = read_body(&mut input, b"name=Jo!!".to_vec(), 7, 4).unwrap();
        assert_eq!(body, b"name=Jo");
    }

    #[test]
    fn test_body_truncated() {
        let mut input = Cursor::new(b"abc".to_vec());
        let err = read_body(&mut input, Vec::new(), 10, 4).unwrap_err();
        assert!(matches!(
            err,
            IngestError::TruncatedBody {
                expected: 10,
                received: 3
            }
        ));
    }
}
