//! Incrementally written zip archive.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use zip::write::{SimpleFileOptions, StreamWriter};
use zip::{CompressionMethod, ZipWriter};

use crate::error::Result;

/// Append-only zip archive over a non-seekable sink.
///
/// Entries are written as soon as they are appended. [`finish`](Self::finish)
/// consumes the archive, so nothing can be appended after the central
/// directory is written and it cannot be written twice.
pub struct ArchiveStream<W: Write> {
    zip: ZipWriter<StreamWriter<W>>,
    options: SimpleFileOptions,
    entries: usize,
}

impl<W: Write> ArchiveStream<W> {
    /// Start an archive on `sink`.
    pub fn new(sink: W) -> Self {
        Self {
            zip: ZipWriter::new_stream(sink),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
            entries: 0,
        }
    }

    /// Write one entry.
    pub fn append(&mut self, name: &str, bytes: &[u8]) -> Result<()> {
        self.zip.start_file(name, self.options)?;
        self.zip.write_all(bytes)?;
        self.entries += 1;
        Ok(())
    }

    /// Number of entries written so far.
    pub fn entry_count(&self) -> usize {
        self.entries
    }

    /// Write the central directory and return the number of entries.
    pub fn finish(self) -> Result<usize> {
        let entries = self.entries;
        self.zip.finish()?;
        Ok(entries)
    }
}

/// Growable byte buffer the archive writes into and the pump drains.
#[derive(Debug, Clone, Default)]
pub(crate) struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    /// Take everything written since the last call.
    pub(crate) fn take(&self) -> Vec<u8> {
        let mut buffer = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *buffer)
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut buffer = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
