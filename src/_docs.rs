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

//! # General gelf-tracing Documentation
//!
//! ## Introduction
//!
//! General (i.e. not documenting a particular struct or a method) documentation goes here.
//!
//! ## The GELF Message
//!
//! A [GELF] message is a single, flat JSON object. A handful of keys are fixed by the format:
//!
//! [GELF]: https://go2docs.graylog.org/current/getting_in_log_data/gelf.html
//!
//! | key             | type   | notes                                                      |
//! |-----------------|--------|------------------------------------------------------------|
//! | `version`       | string | always "1.1"                                               |
//! | `host`          | string | the originating host                                       |
//! | `short_message` | string | never empty; "-" stands in when there's nothing to say     |
//! | `full_message`  | string | omitted when empty                                         |
//! | `timestamp`     | number | seconds since the epoch, with fractional part              |
//! | `level`         | number | syslog severity, 0 (emergency) through 7 (debug)           |
//!
//! To these [LogMessage] adds `level_name`, `facility`, `environment` & `service`, each omitted
//! when empty. Every other key is an "additional field": it must begin with an underscore, & may
//! not be `_id` (Graylog reserves that one for itself).
//!
//! [LogMessage]: crate::message::LogMessage
//!
//! Additional fields come from two places: `extra`, a JSON map the caller builds up field by
//! field, & `raw_extra`, a JSON object that arrived already serialized (from a configuration file,
//! say, or an upstream producer). Both are written into the same object in one pass; should a key
//! appear in both, the value in `extra` wins.
//!
//! ## From tracing Events to GELF Messages
//!
//! The translation from tracing [Event]s to GELF on the wire happens in three steps:
//!
//! [Event]: tracing::Event
//!
//! 1. mapping the [Event] to a [LogMessage]
//! 2. encoding that message as JSON
//! 3. handing the encoded bytes to a [Sink]
//!
//! [Sink]: crate::sink::Sink
//!
//! Trait [TracingFormatter] governs the first step. The default implementation maps the [Event]'s
//! "message" field to the short & full messages & every other field to an additional field of the
//! same name (prefixed with an underscore), preserving its JSON type. The [Event]'s source location
//! rides along as "_file" & "_line".
//!
//! [TracingFormatter]: crate::tracing::TracingFormatter
//!
//! The second step is fixed by the format. The third is up to you: this crate doesn't compress,
//! chunk or transmit messages, but a [Sink] implementation that does is easy to plug in. A couple
//! are provided:
//!
//! - [WriterSink](crate::sink::WriterSink), for newline- (or null-) delimited JSON to any [Write]
//! - [MemorySink](crate::sink::MemorySink), handy in tests
//!
//! [Write]: std::io::Write
//!
//! These three steps are strung together by the [Layer] type, which implements
//! [tracing_subscriber::layer::Layer] & so can be "stacked" on top of other layers in your
//! tracing [Subscriber]:
//!
//! [Layer]: crate::layer::Layer
//! [Subscriber]: tracing::Subscriber
//!
//! ```ignore
//! pub struct Layer<S, F: TracingFormatter<S>, K: Sink> where
//!    S: Subscriber + for<'a> LookupSpan<'a>,
//! ```
//!
//! ## From Raw Log Lines to GELF Messages
//!
//! Loggers that just want an [Write] to write to can use [GelfWriter]. Each write is taken to
//! be a single log payload: its first line becomes the short message & the whole thing the full
//! message. If that first line is itself a JSON object, it's treated as a structured log line: its
//! "short_message", "level" & "level_name" keys fill in the corresponding fields & its
//! underscore-prefixed keys become additional fields. A structured line _must_ carry a numeric
//! "level".
//!
//! [GelfWriter]: crate::writer::GelfWriter
//!
//! ## Caller Resolution
//!
//! Since the interesting source location for a message written through [GelfWriter] is that of
//! the code that called the logger (not that of the logger itself, nor of the standard library's
//! formatting machinery), [GelfWriter] walks the stack to find it, passing over frames whose source
//! files end in any of a configurable set of suffixes. The logic lives in [caller], & is usable
//! on its own.
//!
//! [caller]: crate::caller
