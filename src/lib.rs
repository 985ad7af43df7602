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
//! Encoding log records as [GELF] (the Graylog Extended Log Format), with a [`tracing-subscriber`]
//! [`Layer`] implementation on top
//!
//! [GELF]: https://go2docs.graylog.org/current/getting_in_log_data/gelf.html
//! [`tracing-subscriber`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/index.html
//! [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
//!
//! # Introduction
//!
//! [Graylog] ingests log records as GELF: flat JSON objects with a few well-known keys ("host",
//! "short_message", "level" & so forth) plus any number of underscore-prefixed "additional
//! fields". This crate provides:
//!
//! [Graylog]: https://graylog.org
//!
//! - [`LogMessage`](message::LogMessage): the GELF message itself, with a strict decoder & an
//!   encoder that merges additional fields built up in code with ones that arrived pre-serialized
//! - [`LogMessage::from_raw`](message::LogMessage::from_raw): building a message out of a raw log
//!   line, which may itself be a structured (JSON) record
//! - [`caller`]: locating the application code responsible for a log record by walking the stack
//!   & passing over the logging machinery's own frames
//! - a [`Layer`](layer::Layer) for dispatching [`tracing`] [`Event`]s as GELF, & a
//!   [`GelfWriter`](writer::GelfWriter) for loggers that just want something to write to
//!
//! [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html
//! [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html
//!
//! Getting the encoded bytes to Graylog (compression, chunking, UDP or TCP) is left to a
//! [`Sink`](sink::Sink) implementation of your choosing.
//!
//! # Usage
//!
//! [`gelf-tracing`](crate)'s [`Layer`] comes with sane defaults:
//!
//! ```rust
//! use tracing::info;
//! use gelf_tracing::layer::Layer;
//! use tracing_subscriber::registry::Registry;
//! use tracing_subscriber::layer::SubscriberExt; // Needed to get `with()`
//!
//! // The default configuration discovers the local hostname & writes one GELF message per line
//! // to stdout.
//! let subscriber = Registry::default().with(Layer::stdout());
//!
//! tracing::subscriber::with_default(subscriber, || {
//!     info!(user_id = 9001, "Hello, world!");
//! });
//! ```
//!
//! Will produce lines that look something like this:
//!
//! ```text
//! {"version":"1.1","host":"bree","short_message":"Hello, world!","timestamp":1655942955.12,"level":6.0,"level_name":"INFO","_user_id":9001,"_file":"src/main.rs","_line":9}
//! ```
//!
//! That said, the host identity, the mapping from [`tracing`] [`Event`]s & the destination are
//! configurable:
//!
//! ```rust
//! use gelf_tracing::{identity::Identity, layer::Layer, message::LogMessage, sink::MemorySink};
//! use std::sync::Arc;
//! use tracing_subscriber::{layer::SubscriberExt, registry::Registry};
//!
//! let sink = Arc::new(MemorySink::new());
//! let identity = Identity::builder()
//!     .host("bree.local")
//!     .facility("billing")
//!     .build();
//! let subscriber = Registry::default().with(Layer::with_identity_and_sink(identity, sink.clone()));
//!
//! tracing::subscriber::with_default(subscriber, || {
//!     tracing::warn!("card declined");
//! });
//!
//! let sent = sink.take();
//! let msg = LogMessage::decode(&sent[0]).unwrap();
//! assert_eq!(msg.host, "bree.local");
//! assert_eq!(msg.short, "card declined");
//! assert_eq!(msg.level, Some(4.0));
//! ```

pub mod _docs;
pub mod caller;
pub mod error;
pub mod identity;
pub mod layer;
pub mod level;
pub mod message;
pub mod sink;
pub mod tracing;
pub mod writer;
