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

//! A [`Write`] implementation speaking GELF.
//!
//! Not every logger in a process goes through [`tracing`]; plenty of them just want somewhere to
//! write lines. [`GelfWriter`] treats each `write` call as one raw log payload, builds a
//! [`LogMessage`] from it via [`LogMessage::from_raw`], tags it with the source location of
//! whoever called into the writer, & hands the encoded result to a [`Sink`].
//!
//! # Examples
//!
//! ```rust
//! use gelf_tracing::{identity::Identity, sink::MemorySink, writer::GelfWriter};
//! use std::{io::Write, sync::Arc};
//!
//! let sink = Arc::new(MemorySink::new());
//! let mut writer = GelfWriter::builder(sink.clone())
//!     .identity(Identity::builder().host("bree.local").build())
//!     .build();
//! writer.write_all(br#"{"level": 3, "short_message": "disk full", "_mount": "/var"}"#).unwrap();
//!
//! let sent = sink.take();
//! assert_eq!(sent.len(), 1);
//! ```

use crate::{
    caller,
    error::Result,
    identity::Identity,
    message::LogMessage,
    sink::Sink,
};

use std::io::{self, Write};

/// Source path suffixes a [`GelfWriter`] always passes over when looking for its caller, beyond its
/// own source file: those of the standard library's `io` & `fmt` plumbing (`write_all` & friends).
pub const DEFAULT_IGNORED: &[&str] = &[
    "/std/src/io/mod.rs",
    "/std/src/io/impls.rs",
    "/core/src/fmt/mod.rs",
];

/// An [`io::Write`] implementation producing one GELF message per `write` call.
///
/// `write` never splits its input: a payload containing line breaks becomes a single message whose
/// first line is the short message (see [`LogMessage::from_raw`]). Likewise, `write!` & `writeln!`
/// produce one message per invocation. Zero-length writes are accepted & dropped.
pub struct GelfWriter<K: Sink> {
    identity: Identity,
    sink: K,
    resolve_caller: bool,
    ignored: Vec<String>,
}

pub struct GelfWriterBuilder<K: Sink> {
    identity: Option<Identity>,
    sink: K,
    resolve_caller: bool,
    ignored: Vec<String>,
}

impl<K: Sink> GelfWriterBuilder<K> {
    pub fn identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }
    /// Turn caller resolution (& hence the "_file" & "_line" fields) on or off; on by default
    pub fn resolve_caller(mut self, resolve_caller: bool) -> Self {
        self.resolve_caller = resolve_caller;
        self
    }
    /// Pass over frames from source files ending in `suffix` when resolving the caller, in
    /// addition to [`DEFAULT_IGNORED`]. Typically used by logging libraries layered on top of
    /// this writer to hide their own frames.
    pub fn ignore(mut self, suffix: impl Into<String>) -> Self {
        self.ignored.push(suffix.into());
        self
    }
    /// Absent an explicit [`Identity`], the local host is discovered here
    pub fn build(self) -> GelfWriter<K> {
        let mut imp = GelfWriter::new(self.identity.unwrap_or_default(), self.sink);
        imp.resolve_caller = self.resolve_caller;
        imp.ignored.extend(self.ignored);
        imp
    }
}

impl<K: Sink> GelfWriter<K> {
    pub fn new(identity: Identity, sink: K) -> GelfWriter<K> {
        GelfWriter {
            identity,
            sink,
            resolve_caller: true,
            ignored: std::iter::once(caller::own_source(file!()))
                .chain(DEFAULT_IGNORED.iter().map(|s| s.to_string()))
                .collect(),
        }
    }
    /// Begin building a [`GelfWriter`] sending to `sink`; the [`Identity`] defaults to one
    /// discovered from the local host.
    pub fn builder(sink: K) -> GelfWriterBuilder<K> {
        GelfWriterBuilder {
            identity: None,
            sink,
            resolve_caller: true,
            ignored: Vec::new(),
        }
    }
    pub fn identity(&self) -> &Identity {
        &self.identity
    }
    pub fn sink(&self) -> &K {
        &self.sink
    }
    /// Build, encode & send a message from one raw payload, returning the number of bytes the
    /// sink accepted
    pub fn emit(&self, payload: &[u8]) -> Result<usize> {
        let mut msg = LogMessage::from_raw(payload, &self.identity)?;
        // A structured payload that names its own location knows better than we do
        if self.resolve_caller && !msg.extra.contains_key("_file") {
            let ignored: Vec<&str> = self.ignored.iter().map(String::as_str).collect();
            let location = caller::resolve(0, &ignored);
            if !location.is_unknown() {
                msg.insert_extra("_file", location.file)
                    .insert_extra("_line", location.line);
            }
        }
        let buf = msg.encode()?;
        self.sink.send(&buf)
    }
}

fn to_io_error(err: crate::error::Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err)
}

impl<K: Sink> Write for GelfWriter<K> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (&*self).write(buf)
    }
    fn write_fmt(&mut self, args: std::fmt::Arguments<'_>) -> io::Result<()> {
        (&*self).write_fmt(args)
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// As with [`std::fs::File`], a shared reference is enough to write.
impl<K: Sink> Write for &GelfWriter<K> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.emit(buf).map_err(to_io_error)?;
        Ok(buf.len())
    }
    // The provided implementation writes each piece of `args` separately, which would make one
    // message of each.
    fn write_fmt(&mut self, args: std::fmt::Arguments<'_>) -> io::Result<()> {
        let text = std::fmt::format(args);
        self.write(text.as_bytes()).map(|_| ())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
