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

//! GELF severity levels.
//!
//! GELF borrows its "level" field from syslog: it is "equal to the standard syslog levels". The
//! wire format is just a number, but [`Level`] replicates the names used in `<syslog.h>` so that
//! callers needn't remember that 3 is an error & 4 a warning.

type StdResult<T, E> = std::result::Result<T, E>;

/// The eight syslog severity levels. The enumeration values duplicate the constants documented in
/// the `syslog()` manual [page] & defined in `<syslog.h>`.
///
/// [page]: https://man7.org/linux/man-pages/man3/syslog.3.html
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// system is unusable
    LOG_EMERG,
    /// action must be take immediately
    LOG_ALERT,
    /// critical conditions
    LOG_CRIT,
    /// error conditions
    LOG_ERR,
    /// warning conditions
    LOG_WARNING,
    /// normal, but significant condition
    LOG_NOTICE,
    /// informational message
    LOG_INFO,
    /// debug-level message
    LOG_DEBUG,
}

impl Level {
    /// The short, human-readable label written to the GELF "level_name" field
    pub fn label(&self) -> &'static str {
        match self {
            Level::LOG_EMERG => "EMERG",
            Level::LOG_ALERT => "ALERT",
            Level::LOG_CRIT => "CRIT",
            Level::LOG_ERR => "ERROR",
            Level::LOG_WARNING => "WARN",
            Level::LOG_NOTICE => "NOTICE",
            Level::LOG_INFO => "INFO",
            Level::LOG_DEBUG => "DEBUG",
        }
    }
}

impl std::default::Default for Level {
    /// Messages that say nothing about their severity are informational.
    fn default() -> Self {
        Level::LOG_INFO
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> StdResult<(), std::fmt::Error> {
        write!(
            f,
            "{}",
            match self {
                Level::LOG_EMERG => "LOG_EMERG",
                Level::LOG_ALERT => "LOG_ALERT",
                Level::LOG_CRIT => "LOG_CRIT",
                Level::LOG_ERR => "LOG_ERR",
                Level::LOG_WARNING => "LOG_WARNING",
                Level::LOG_NOTICE => "LOG_NOTICE",
                Level::LOG_INFO => "LOG_INFO",
                Level::LOG_DEBUG => "LOG_DEBUG",
            }
        )
    }
}

impl std::convert::From<Level> for f64 {
    fn from(level: Level) -> f64 {
        level as u8 as f64
    }
}

impl std::convert::From<&tracing::Level> for Level {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::TRACE | tracing::Level::DEBUG => Level::LOG_DEBUG,
            tracing::Level::INFO => Level::LOG_INFO,
            tracing::Level::WARN => Level::LOG_WARNING,
            tracing::Level::ERROR => Level::LOG_ERR,
        }
    }
}
