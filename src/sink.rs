// Copyright (C) 2022-2025 Michael Herstine <sp1ff@pobox.com>
//
// This file is part of gelf-tracing.
//
// gelf-tracing is free software: you can redistribute it and/or modify it under the terms of the
// GNU General Public License as published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// mpdpopm is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even
// the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details.
//
// You should have received a copy of the GNU General Public License along with mpdpopm.  If not,
// see <http://www.gnu.org/licenses/>.

//! Where encoded GELF messages go.
//!
//! This crate stops at the encoded buffer: compressing it, chunking it & getting it to a Graylog
//! input are someone else's job. The [`Sink`] trait is the seam at which that someone plugs in.
//! A couple of simple implementations are provided here.
//!
//! # Examples
//!
//! To write newline-delimited GELF to stdout:
//!
//! ```rust
//! use gelf_tracing::sink::WriterSink;
//! let sink = WriterSink::stdout();
//! ```
//!
//! To write null-delimited GELF (as a GELF TCP input expects) to some other stream:
//!
//! ```rust
//! use gelf_tracing::sink::{Sink, WriterSink};
//! let sink = WriterSink::new(Vec::new()).with_delimiter(b'\0');
//! sink.send(b"{}").unwrap();
//! assert_eq!(sink.into_inner(), b"{}\0");
//! ```

use crate::error::{Error, Result};

use backtrace::Backtrace;

use std::{io::Write, sync::Mutex};

/// Operations all sinks must support.
pub trait Sink {
    /// Accept one encoded GELF message, returning the number of bytes consumed.
    ///
    /// `buf` is only borrowed for the duration of the call; implementations that need to hang on
    /// to it must copy it.
    fn send(&self, buf: &[u8]) -> Result<usize>;
}

impl<T: Sink + ?Sized> Sink for &T {
    fn send(&self, buf: &[u8]) -> Result<usize> {
        (**self).send(buf)
    }
}

impl<T: Sink + ?Sized> Sink for std::sync::Arc<T> {
    fn send(&self, buf: &[u8]) -> Result<usize> {
        (**self).send(buf)
    }
}

/// Writing GELF messages to an arbitrary [`Write`] implementation, one per record, each followed
/// by a delimiter (newline, by default).
pub struct WriterSink<W: Write> {
    writer: Mutex<W>,
    delimiter: u8,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> WriterSink<W> {
        WriterSink {
            writer: Mutex::new(writer),
            delimiter: b'\n',
        }
    }
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
    pub fn into_inner(self) -> W {
        // A poisoned lock just means some other thread panicked mid-write; the writer is still
        // ours to hand back.
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl WriterSink<std::io::Stdout> {
    /// Construct a [`Sink`] writing newline-delimited messages to stdout
    pub fn stdout() -> WriterSink<std::io::Stdout> {
        WriterSink::new(std::io::stdout())
    }
}

impl<W: Write> Sink for WriterSink<W> {
    fn send(&self, buf: &[u8]) -> Result<usize> {
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        writer
            .write_all(buf)
            .and_then(|_| writer.write_all(&[self.delimiter]))
            .and_then(|_| writer.flush())
            .map_err(|err| Error::Sink {
                source: Box::new(err),
                back: Backtrace::new(),
            })?;
        Ok(buf.len() + 1)
    }
}

/// Hanging on to GELF messages in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: Mutex<Vec<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> MemorySink {
        MemorySink::default()
    }
    /// Remove & return every message received so far, oldest first
    pub fn take(&self) -> Vec<Vec<u8>> {
        std::mem::take(
            &mut *self
                .messages
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }
}

impl Sink for MemorySink {
    fn send(&self, buf: &[u8]) -> Result<usize> {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(buf.to_vec());
        Ok(buf.len())
    }
}

#[cfg(test)]
mod test {

    use super::*;

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "nobody home"))
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writer_sink() {
        let sink = WriterSink::new(Vec::new());
        assert_eq!(sink.send(b"{\"a\":1}").unwrap(), 8);
        sink.send(b"{\"b\":2}").unwrap();
        assert_eq!(sink.into_inner(), b"{\"a\":1}\n{\"b\":2}\n");

        let sink = WriterSink::new(Broken);
        assert!(matches!(sink.send(b"{}"), Err(Error::Sink { .. })));
    }

    #[test]
    fn memory_sink() {
        let sink = std::sync::Arc::new(MemorySink::new());
        let other = sink.clone();
        other.send(b"one").unwrap();
        (&*other).send(b"two").unwrap();
        assert_eq!(sink.take(), vec![b"one".to_vec(), b"two".to_vec()]);
        assert!(sink.take().is_empty());
    }
}
