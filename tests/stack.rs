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

//! Caller resolution against the live stack.
//!
//! These can't live alongside the resolver: it drops frames from its own source file.

use gelf_tracing::{
    caller::{self, Location},
    identity::Identity,
    message::LogMessage,
    sink::MemorySink,
    writer::GelfWriter,
};

use std::{io::Write, sync::Arc};

#[inline(never)]
fn where_was_i_called() -> Location {
    caller::resolve(1, &[])
}

#[inline(never)]
fn log_helper() -> Location {
    caller::resolve(0, &["tests/stack.rs"])
}

#[test]
fn resolves_the_immediate_caller() {
    let (location, line) = (caller::resolve(0, &[]), line!());
    assert!(location.file.ends_with("stack.rs"), "{}", location);
    assert_eq!(location.line, line);
}

#[test]
fn skip_walks_up_the_stack() {
    let (location, line) = (where_was_i_called(), line!());
    assert!(location.file.ends_with("stack.rs"), "{}", location);
    assert_eq!(location.line, line);
}

#[test]
fn ignored_frames_are_passed_over() {
    // Everything in this file is ignored, so whatever turns up must be the test harness (or the
    // sentinel, should the harness lack debug info)
    let location = log_helper();
    assert!(!location.file.ends_with("tests/stack.rs"), "{}", location);
}

#[test]
fn writer_reports_its_caller() {
    let sink = Arc::new(MemorySink::new());
    let mut writer = GelfWriter::builder(sink.clone())
        .identity(Identity::builder().host("bree.local").build())
        .build();

    let (_, line) = (writer.write(b"cache miss").unwrap(), line!());

    let sent = sink.take();
    assert_eq!(sent.len(), 1);
    let msg = LogMessage::decode(&sent[0]).unwrap();
    assert_eq!(msg.short, "cache miss");
    let file = msg.extra["_file"].as_str().unwrap();
    assert!(file.ends_with("stack.rs"), "{}", file);
    assert_eq!(msg.extra["_line"], serde_json::json!(line));
}

#[test]
fn structured_lines_keep_their_own_location() {
    let sink = Arc::new(MemorySink::new());
    let mut writer = GelfWriter::builder(sink.clone())
        .identity(Identity::builder().host("bree.local").build())
        .build();

    writer
        .write_all(br#"{"level": 4, "short_message": "slow query", "_file": "db.go", "_line": 88}"#)
        .unwrap();

    let msg = LogMessage::decode(&sink.take()[0]).unwrap();
    assert_eq!(msg.extra["_file"], "db.go");
    assert_eq!(msg.extra["_line"], 88);
}

#[test]
fn formatted_writes_report_their_caller() {
    let sink = Arc::new(MemorySink::new());
    let mut writer = GelfWriter::builder(sink.clone())
        .identity(Identity::builder().host("bree.local").build())
        .build();

    let line = line!() + 1;
    writeln!(writer, "user {} logged in", "alice").unwrap();

    let sent = sink.take();
    assert_eq!(sent.len(), 1);
    let msg = LogMessage::decode(&sent[0]).unwrap();
    assert_eq!(msg.short, "user alice logged in");
    let file = msg.extra["_file"].as_str().unwrap();
    assert!(file.ends_with("stack.rs"), "{}", file);
    assert_eq!(msg.extra["_line"], serde_json::json!(line));
}
