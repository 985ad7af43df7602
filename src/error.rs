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
//! [gelf-tracing](crate) errors

use backtrace::Backtrace;

/// [gelf-tracing](crate) error type
///
/// Like its sibling crates, [gelf-tracing](crate) eschews libraries like [thiserror] & [anyhow]
/// in favor of a straightforward enumeration with a few match arms chosen on the basis what the
/// caller will need to respond.
///
/// [thiserror]: https://docs.rs/thiserror
/// [anyhow]: https://docs.rs/anyhow
#[non_exhaustive]
pub enum Error {
    /// A [`LogMessage`](crate::message::LogMessage) could not be serialized
    Encode {
        source: serde_json::Error,
        back: Backtrace,
    },
    /// The input to a decode operation was not a JSON object
    Decode {
        source: serde_json::Error,
        back: Backtrace,
    },
    /// A recognized GELF field carried a value of the wrong JSON type
    FieldType {
        field: String,
        expected: &'static str,
        back: Backtrace,
    },
    /// A structured log line had no numeric "level"
    MissingSeverity { back: Backtrace },
    /// Pre-serialized extra fields were valid JSON, but not an object
    BadRawExtra { back: Backtrace },
    /// Failed to fetch hostname (via libc)
    NoHostname {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// A [`Sink`](crate::sink::Sink) failed to accept an encoded message
    Sink {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
}

impl std::fmt::Display for Error {
    // `Error` is non-exhaustive so that adding variants won't be a breaking change to our
    // callers. That means the compiler won't catch us if we miss a variant here, so we
    // always include a `_` arm.
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Encode { source, .. } => write!(f, "While encoding a GELF message, got {}", source),
            Error::Decode { source, .. } => write!(f, "Not a GELF JSON object: {}", source),
            Error::FieldType {
                field, expected, ..
            } => write!(f, "Invalid type for field {}: expected {}", field, expected),
            Error::MissingSeverity { .. } => {
                write!(f, "The log line carried no numeric \"level\" field")
            }
            Error::BadRawExtra { .. } => {
                write!(f, "Pre-serialized extra fields must form a JSON object")
            }
            Error::NoHostname { source, .. } => write!(f, "Couldn't fetch the hostname: {}", source),
            Error::Sink { source, .. } => write!(f, "Sink error: {}", source),
            _ => write!(f, "Other gelf-tracing error"),
        }
    }
}

impl std::fmt::Debug for Error {
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Encode { back, .. }
            | Error::Decode { back, .. }
            | Error::FieldType { back, .. }
            | Error::MissingSeverity { back }
            | Error::BadRawExtra { back }
            | Error::NoHostname { back, .. }
            | Error::Sink { back, .. } => write!(f, "{}\n{:?}", self, back),
            err => write!(f, "gelf-tracing error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Encode { source, .. } | Error::Decode { source, .. } => Some(source),
            Error::NoHostname { source, .. } | Error::Sink { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
