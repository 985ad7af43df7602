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

//! [gelf-tracing](crate) [`Layer`] implementation.
//!
//! [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
//!
//! A basic struct [`Layer`] is defined, parameterized by a [`TracingFormatter`] & a [`Sink`].
//! Consumers of this crate are of course free to implement those traits for themselves & provide
//! their own implementations.

use crate::{
    error::Error as CrateError,
    identity::Identity,
    sink::{Sink, WriterSink},
    tracing::{DefaultTracingFormatter, TracingFormatter},
};

use backtrace::Backtrace;
use chrono::prelude::*;
use tracing::Event;
use tracing_subscriber::layer::Context;

// When the tracing-log feature is enabled, use NormalizeEvent to extract file/line metadata
// from events that originated from the `log` crate. This follows the same pattern used by
// tracing-subscriber's fmt layer.
// See: https://github.com/tokio-rs/tracing/blob/master/tracing-subscriber/src/fmt/fmt_layer.rs
#[cfg(feature = "tracing-log")]
use tracing_log::NormalizeEvent;

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                       module error type                                        //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// module error type
#[non_exhaustive]
pub enum Error {
    /// Formatting layer error
    Format {
        source: Box<dyn std::error::Error>,
        back: Backtrace,
    },
    /// Encoding error
    Encode { source: CrateError },
    /// Sink error
    Sink { source: CrateError },
}

impl std::fmt::Display for Error {
    // `Error` is non-exhaustive so that adding variants won't be a breaking change to our
    // callers. That means the compiler won't catch us if we miss a variant here, so we
    // always include a `_` arm.
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Format { source, .. } => {
                write!(f, "While formatting an Event, got {}", source)
            }
            Error::Encode { source } => write!(f, "{}", source),
            Error::Sink { source } => write!(f, "While sending a GELF message, got {}", source),
            _ => write!(f, "GELF layer error"),
        }
    }
}

impl std::fmt::Debug for Error {
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Format { source: _, back } => write!(f, "{}\n{:#?}", self, back),
            Error::Encode { source } | Error::Sink { source } => write!(f, "{:?}", source),
            _ => write!(f, "{}", self),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// Describe a failure to handle an Event as a single JSON object.
///
/// This can't go through [`tracing`]; we *are* the tracing pipeline. Instead, the [`Layer`] hands
/// the encoded object to its diagnostics [`Sink`] (stderr, by default).
fn diagnostic(err: &Error) -> serde_json::Value {
    serde_json::json!({
        "@t": Utc::now().to_rfc3339(),
        "@l": "ERROR",
        "@mt": "GELF layer failed to handle an event",
        "@x": err.to_string(),
    })
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                          struct Layer                                          //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A [`tracing-subscriber`]-compliant [`Layer`] implementation that will encode [`Event`]s as
/// GELF & hand them to a [`Sink`].
///
/// [`tracing-subscriber`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/index.html
/// [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
/// [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html
pub struct Layer<S, F: TracingFormatter<S>, K: Sink>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    identity: Identity,
    tracing_formatter: F,
    sink: K,
    diagnostics: Box<dyn Sink + Send + Sync>,
    // I need the Subscriber implementation type as a type parameter to transmit it to the
    // TracingFormatter trait. 👇 gets the compiler to shut-up about unused type parameters.
    subscriber_type: std::marker::PhantomData<fn(S)>,
}

/// A [`Layer`] implementation with the following characteristics:
///
/// - Uses the default formatter for mapping from Tracing events to GELF messages
/// - Discovers its host identity on its own
/// - Writes the resulting messages to stdout, one per line
impl<S> Layer<S, DefaultTracingFormatter, WriterSink<std::io::Stdout>>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    pub fn stdout() -> Self {
        Layer::with_sink(WriterSink::stdout())
    }
}

/// Customize a [`Layer`] implementation using the default formatter, with a custom [`Sink`].
impl<S, K: Sink> Layer<S, DefaultTracingFormatter, K>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    /// Construct a Layer that will send GELF messages to `sink`
    pub fn with_sink(sink: K) -> Self {
        Layer::new(Identity::default(), DefaultTracingFormatter::default(), sink)
    }

    /// Construct a Layer that will send GELF messages, identified by `identity`, to `sink`
    pub fn with_identity_and_sink(identity: Identity, sink: K) -> Self {
        Layer::new(identity, DefaultTracingFormatter::default(), sink)
    }
}

impl<S, F: TracingFormatter<S>, K: Sink> Layer<S, F, K>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    /// construct Layer with custom inners
    pub fn new(identity: Identity, tracing_formatter: F, sink: K) -> Self {
        Layer {
            identity,
            tracing_formatter,
            sink,
            diagnostics: Box::new(WriterSink::new(std::io::stderr())),
            subscriber_type: std::marker::PhantomData,
        }
    }

    /// Send failure reports to `diagnostics` rather than stderr
    pub fn with_diagnostics(mut self, diagnostics: impl Sink + Send + Sync + 'static) -> Self {
        self.diagnostics = Box::new(diagnostics);
        self
    }

    fn report(&self, err: &Error) {
        // Nowhere left to complain to if this fails
        if let Ok(buf) = serde_json::to_vec(&diagnostic(err)) {
            let _ = self.diagnostics.send(&buf);
        }
    }

    fn handle(
        &self,
        event: &Event<'_>,
        meta: &tracing::Metadata<'_>,
        ctx: Context<'_, S>,
    ) -> Result<()> {
        let msg = self
            .tracing_formatter
            .on_event(event, meta, &self.identity, ctx)
            .map_err(|err| Error::Format {
                source: Box::new(err),
                back: Backtrace::new(),
            })?;
        if let Some(msg) = msg {
            let buf = msg.encode().map_err(|source| Error::Encode { source })?;
            self.sink
                .send(&buf)
                .map_err(|source| Error::Sink { source })?;
        }
        Ok(())
    }
}

/// This is the Big Tuna-- the [`Layer`] implementation.
///
/// [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
impl<S, F, K> tracing_subscriber::layer::Layer<S> for Layer<S, F, K>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    F: TracingFormatter<S> + 'static,
    K: Sink + 'static,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        // When the tracing-log feature is enabled, use normalized_metadata() to get
        // file/line info for events that originated from the `log` crate.
        // For native tracing events, normalized_metadata() returns None and we use
        // the event's own metadata.
        #[cfg(feature = "tracing-log")]
        let normalized_meta = event.normalized_metadata();
        #[cfg(feature = "tracing-log")]
        let meta = normalized_meta.as_ref().unwrap_or_else(|| event.metadata());
        #[cfg(not(feature = "tracing-log"))]
        let meta = event.metadata();

        if let Err(err) = self.handle(event, meta, ctx) {
            self.report(&err);
        }
    }
}
