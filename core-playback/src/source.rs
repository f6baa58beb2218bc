//! # Shared Byte Source
//!
//! The decoder reads through the byte source while the music handle keeps
//! the right to close it. [`SharedSource`] lets both hold the same
//! [`RwOps`] without the decoder owning it.

use bridge_traits::RwOps;
use parking_lot::Mutex;
use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;
use tracing::{debug, warn};

/// Cloneable handle onto one [`RwOps`].
///
/// All clones read and seek the same underlying position.
#[derive(Clone)]
pub struct SharedSource {
    inner: Arc<Mutex<SourceState>>,
    len: Option<u64>,
}

struct SourceState {
    source: Box<dyn RwOps>,
    closed: bool,
}

impl SharedSource {
    pub fn new(source: Box<dyn RwOps>) -> Self {
        let len = source.byte_len();
        Self {
            inner: Arc::new(Mutex::new(SourceState {
                source,
                closed: false,
            })),
            len,
        }
    }

    /// Total length in bytes, if the source knows it.
    pub fn byte_len(&self) -> Option<u64> {
        self.len
    }

    /// Close the underlying source.
    ///
    /// Only the first call reaches [`RwOps::close`]; later calls and reads
    /// after closing fail or do nothing.
    pub fn close(&self) -> io::Result<()> {
        let mut state = self.inner.lock();
        if state.closed {
            return Ok(());
        }
        state.closed = true;
        debug!("Closing byte source");
        state.source.close().map_err(|err| {
            warn!("Byte source close failed: {}", err);
            err
        })
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }
}

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "byte source is closed")
}

impl Read for SharedSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.inner.lock();
        if state.closed {
            return Err(closed_error());
        }
        state.source.read(buf)
    }
}

impl Seek for SharedSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let mut state = self.inner.lock();
        if state.closed {
            return Err(closed_error());
        }
        state.source.seek(pos)
    }
}

#[cfg(feature = "core-decoder")]
impl symphonia::core::io::MediaSource for SharedSource {
    fn is_seekable(&self) -> bool {
        true
    }

    fn byte_len(&self) -> Option<u64> {
        self.len
    }
}

impl fmt::Debug for SharedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSource")
            .field("len", &self.len)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        data: Cursor<Vec<u8>>,
        closes: Arc<AtomicUsize>,
    }

    impl Read for CountingSource {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.data.read(buf)
        }
    }

    impl Seek for CountingSource {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.data.seek(pos)
        }
    }

    impl RwOps for CountingSource {
        fn close(&mut self) -> io::Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_clones_share_position() {
        let mut a = SharedSource::new(Box::new(Cursor::new(vec![1u8, 2, 3, 4])));
        let mut b = a.clone();
        assert_eq!(a.byte_len(), Some(4));

        let mut buf = [0u8; 2];
        a.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [1, 2]);

        b.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [3, 4]);

        b.seek(SeekFrom::Start(1)).unwrap();
        a.read_exact(&mut buf[..1]).unwrap();
        assert_eq!(buf[0], 2);
    }

    #[test]
    fn test_close_happens_once() {
        let closes = Arc::new(AtomicUsize::new(0));
        let source = SharedSource::new(Box::new(CountingSource {
            data: Cursor::new(vec![0u8; 8]),
            closes: Arc::clone(&closes),
        }));
        let mut reader = source.clone();

        source.close().unwrap();
        source.close().unwrap();
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert!(reader.is_closed());

        let mut buf = [0u8; 1];
        let err = reader.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }
}
