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

//! Primitives for mapping [`tracing`] entities to GELF messages.
//!
//! [`TracingFormatter`] implementations turn [`Event`]s into [`LogMessage`]s. This module provides
//! a single implementation, [`DefaultTracingFormatter`], which maps the "message" field onto the
//! short (& possibly full) message & every other field onto an additional field.
//!
//! [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html

use crate::{
    identity::Identity,
    level::Level,
    message::{self, LogMessage, SHORT_MESSAGE_PLACEHOLDER},
};

use serde_json::Value;

type StdResult<T, E> = std::result::Result<T, E>;

/// Format [`tracing`] [`Event`]s as GELF messages.
///
/// [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html
/// [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html
///
/// The translation from [`tracing`] events to GELF on the wire occurs in three parts:
///
/// 1. mapping the Event to a [`LogMessage`]
///
/// 2. encoding that message as JSON
///
/// 3. handing the encoded bytes to a [`Sink`](crate::sink::Sink)
///
/// Trait [`TracingFormatter`] formally defines step 1; step 2 is fixed by GELF. `meta` is the
/// Event's metadata, possibly normalized (if the Event was bridged from the `log` crate, its own
/// metadata will not carry the originating file & line).
pub trait TracingFormatter<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    type Error: std::error::Error + 'static;
    /// An event has occurred
    fn on_event(
        &self,
        event: &tracing::Event,
        meta: &tracing::Metadata<'_>,
        identity: &Identity,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) -> StdResult<Option<LogMessage>, Self::Error>;
}

fn default_level_mapping(level: &tracing::Level) -> Level {
    Level::from(level)
}

/// A [`TracingFormatter`] that maps an [`Event`]'s "message" field to the GELF short & full
/// messages, & all its other fields to GELF additional fields (prefixed with an underscore).
///
/// [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html
///
/// Optionally, the Event's source location (on by default), target & module path are included
/// as the additional fields "_file" & "_line", "_target" & "_module", respectively.
pub struct DefaultTracingFormatter {
    map_level: Box<dyn Fn(&tracing::Level) -> Level + Send + Sync>,
    include_source_location: bool,
    include_target: bool,
    include_module: bool,
}

impl std::default::Default for DefaultTracingFormatter {
    fn default() -> Self {
        DefaultTracingFormatter {
            map_level: Box::new(default_level_mapping),
            include_source_location: true,
            include_target: false,
            include_module: false,
        }
    }
}

pub struct DefaultTracingFormatterBuilder {
    imp: DefaultTracingFormatter,
}

impl DefaultTracingFormatterBuilder {
    /// Replace the default mapping from [`tracing::Level`] to GELF [`Level`]
    pub fn map_level(
        mut self,
        map_level: impl Fn(&tracing::Level) -> Level + Send + Sync + 'static,
    ) -> Self {
        self.imp.map_level = Box::new(map_level);
        self
    }
    pub fn with_source_location(mut self, include: bool) -> Self {
        self.imp.include_source_location = include;
        self
    }
    pub fn with_target(mut self, include: bool) -> Self {
        self.imp.include_target = include;
        self
    }
    pub fn with_module(mut self, include: bool) -> Self {
        self.imp.include_module = include;
        self
    }
    pub fn build(self) -> DefaultTracingFormatter {
        self.imp
    }
}

impl DefaultTracingFormatter {
    pub fn builder() -> DefaultTracingFormatterBuilder {
        DefaultTracingFormatterBuilder {
            imp: DefaultTracingFormatter::default(),
        }
    }

    /// The work of [`TracingFormatter::on_event`], independent of any [`tracing::Subscriber`]
    pub fn format(
        &self,
        event: &tracing::Event,
        meta: &tracing::Metadata<'_>,
        identity: &Identity,
    ) -> LogMessage {
        let mut visitor = GelfEventVisitor::default();
        event.record(&mut visitor);

        let level = (*self.map_level)(meta.level());
        let mut msg = LogMessage {
            version: message::GELF_VERSION.to_string(),
            host: identity.host().to_string(),
            timestamp: message::now(),
            level: Some(level.into()),
            level_name: level.label().to_string(),
            facility: identity.facility().to_string(),
            environment: identity.environment().to_string(),
            service: identity.service().to_string(),
            extra: visitor.fields,
            ..Default::default()
        };

        if let Some(text) = visitor.message {
            let (short, full) = message::split_message(text.trim());
            msg.short = short.to_string();
            msg.full = full.to_string();
        }
        if msg.short.is_empty() {
            msg.short = SHORT_MESSAGE_PLACEHOLDER.to_string();
        }

        if self.include_source_location {
            if let Some(file) = meta.file() {
                msg.insert_extra("_file", file);
            }
            if let Some(line) = meta.line() {
                msg.insert_extra("_line", line);
            }
        }
        if self.include_target {
            msg.insert_extra("_target", meta.target());
        }
        if self.include_module {
            if let Some(module) = meta.module_path() {
                msg.insert_extra("_module", module);
            }
        }

        msg
    }
}

/// Collects an [`Event`]'s fields: "message" on its own, the rest as JSON values keyed by
/// underscore-prefixed field name.
///
/// [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html
#[derive(Default)]
struct GelfEventVisitor {
    message: Option<String>,
    fields: serde_json::Map<String, Value>,
}

impl GelfEventVisitor {
    fn record(&mut self, field: &tracing::field::Field, value: Value) {
        if field.name() == "message" {
            self.message = Some(match value {
                Value::String(s) => s,
                other => other.to_string(),
            });
        } else if field.name() != "id" {
            // "_id" is reserved by GELF
            self.fields.insert(format!("_{}", field.name()), value);
        }
    }
}

impl tracing::field::Visit for GelfEventVisitor {
    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        // JSON has no representation for NaN or the infinities
        let value = serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(value.to_string()));
        self.record(field, value);
    }
    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.record(field, value.into());
    }
    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.record(field, value.into());
    }
    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.record(field, value.into());
    }
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.record(field, value.into());
    }
    fn record_error(
        &mut self,
        field: &tracing::field::Field,
        value: &(dyn std::error::Error + 'static),
    ) {
        self.record(field, value.to_string().into());
    }
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        // The tracing macros "pre-format" the `message` field so that `value` refers to a
        // `std::fmt::Arguments` instance, which will print to a debug format without enclosing
        // double-quotes.
        self.record(field, format!("{:?}", value).into());
    }
}

impl<S> TracingFormatter<S> for DefaultTracingFormatter
where
    S: tracing_core::subscriber::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    type Error = std::convert::Infallible;
    fn on_event(
        &self,
        event: &tracing::Event,
        meta: &tracing::Metadata<'_>,
        identity: &Identity,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) -> StdResult<Option<LogMessage>, std::convert::Infallible> {
        Ok(Some(self.format(event, meta, identity)))
    }
}
