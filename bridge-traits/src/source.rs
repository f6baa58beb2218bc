//! Byte sources handed to music backends.

use bytes::Bytes;
use std::fs::File;
use std::io::{self, Cursor, Read, Seek};

/// Seekable byte source, the Rust side of the mixer's read/seek/close
/// stream callbacks.
///
/// A backend that is given ownership of a source calls [`RwOps::close`]
/// exactly once when it is torn down. A backend that does not own the source
/// never closes it.
pub trait RwOps: Read + Seek + Send + Sync {
    /// Total length in bytes, if known without reading.
    fn byte_len(&self) -> Option<u64> {
        None
    }

    /// Release the underlying resource.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Files are released when the handle is dropped; `close` does nothing.
impl RwOps for File {
    fn byte_len(&self) -> Option<u64> {
        self.metadata().ok().map(|m| m.len())
    }
}

impl RwOps for Cursor<Vec<u8>> {
    fn byte_len(&self) -> Option<u64> {
        Some(self.get_ref().len() as u64)
    }
}

impl RwOps for Cursor<Bytes> {
    fn byte_len(&self) -> Option<u64> {
        Some(self.get_ref().len() as u64)
    }
}

impl RwOps for Cursor<&'static [u8]> {
    fn byte_len(&self) -> Option<u64> {
        Some(self.get_ref().len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{SeekFrom, Write};

    #[test]
    fn test_cursor_sources_report_length() {
        let vec_source = Cursor::new(vec![1u8, 2, 3]);
        assert_eq!(vec_source.byte_len(), Some(3));

        let bytes_source = Cursor::new(Bytes::from_static(&[1, 2, 3, 4]));
        assert_eq!(bytes_source.byte_len(), Some(4));

        let static_source: Cursor<&'static [u8]> = Cursor::new(&[9, 9]);
        assert_eq!(static_source.byte_len(), Some(2));
    }

    #[test]
    fn test_boxed_source_reads_and_seeks() {
        let mut source: Box<dyn RwOps> = Box::new(Cursor::new(vec![10u8, 20, 30, 40]));

        let mut buf = [0u8; 2];
        source.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [10, 20]);

        source.seek(SeekFrom::Start(3)).unwrap();
        source.read_exact(&mut buf[..1]).unwrap();
        assert_eq!(buf[0], 40);

        assert!(source.close().is_ok());
    }

    #[test]
    fn test_read_only_file_source() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"ID3 and friends").unwrap();

        let file = File::open(tmp.path()).unwrap();
        let mut source: Box<dyn RwOps> = Box::new(file);
        assert_eq!(source.byte_len(), Some(15));

        source.close().unwrap();

        let mut buf = [0u8; 3];
        source.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"ID3");
    }
}
