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

//! Caller resolution.
//!
//! When a log record is produced by a logging library, the interesting source location is not the
//! library's, but that of the application code that called into it. [`resolve`] walks the current
//! thread's stack, passing over frames whose source path ends with any of a set of "ignored"
//! suffixes (say, "/src/writer.rs"), & reports the first frame that remains.
//!
//! Resolution is best-effort: if the stack runs out (or carries no debug info) the result is
//! [`Location::unknown`], never an error.
//!
//! Walking the stack is delegated to a [`CallStack`] implementation so that the matching logic
//! can be exercised against synthetic frames; [`LiveStack`] is the real thing.
//!
//! # Examples
//!
//! ```rust
//! use gelf_tracing::caller::{resolve_in, Frame, Location};
//! let stack = vec![
//!     Frame::new("/home/me/log/src/lib.rs", 10),
//!     Frame::new("/home/me/app/src/main.rs", 42),
//! ];
//! assert_eq!(
//!     resolve_in(&stack, 0, &["/log/src/lib.rs"]),
//!     Location::new("/home/me/app/src/main.rs", 42)
//! );
//! ```

use backtrace::Backtrace;

/// A source location
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    pub line: u32,
}

impl Location {
    pub fn new(file: impl Into<String>, line: u32) -> Location {
        Location {
            file: file.into(),
            line,
        }
    }
    /// The sentinel returned when no suitable frame can be found: "???", line zero
    pub fn unknown() -> Location {
        Location::new("???", 0)
    }
    pub fn is_unknown(&self) -> bool {
        self.line == 0 && self.file == "???"
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// One level of a call stack.
pub type Frame = Location;

/// Anything that can produce the current call stack, innermost frame first.
///
/// The first frame must be that of the function that invoked the resolver.
pub trait CallStack {
    fn frames(&self) -> Vec<Frame>;
}

impl CallStack for Vec<Frame> {
    fn frames(&self) -> Vec<Frame> {
        self.clone()
    }
}

impl<T: CallStack + ?Sized> CallStack for &T {
    fn frames(&self) -> Vec<Frame> {
        (**self).frames()
    }
}

/// The path of one of this crate's own source files (given as `file!()`), as a stack frame would
/// report it.
///
/// `file!()` alone is relative to whatever workspace built the crate, so it can be as short as
/// "src/writer.rs", which an application's own "src/writer.rs" would match as well. Anchor it at
/// this package's directory instead.
pub(crate) fn own_source(file: &str) -> String {
    let name = file.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(file);
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("src")
        .join(name)
        .to_string_lossy()
        .into_owned()
}

/// The calling thread's actual stack, as seen by the [`backtrace`] crate.
///
/// [`backtrace`]: https://docs.rs/backtrace
///
/// Inlined functions are reported as frames of their own. Frames belonging to the backtrace
/// machinery & to this module are dropped from the front, so that the first frame is that of the
/// function that called into this module. Frames lacking debug info are reported as
/// [`Location::unknown`].
#[derive(Clone, Copy, Debug, Default)]
pub struct LiveStack;

impl CallStack for LiveStack {
    fn frames(&self) -> Vec<Frame> {
        let back = Backtrace::new();
        let all = back
            .frames()
            .iter()
            .flat_map(|frame| frame.symbols())
            .map(|sym| match (sym.filename(), sym.lineno()) {
                (Some(file), line) => Frame::new(file.to_string_lossy(), line.unwrap_or(0)),
                (None, _) => Location::unknown(),
            });

        // Everything up to & including our own frames is bookkeeping. If we never find ourselves
        // (no debug info, say), we have nothing trustworthy to report.
        let this_file = own_source(file!());
        let mut seen_self = false;
        all.skip_while(|frame| {
            let ours = frame.file.ends_with(&this_file);
            seen_self |= ours;
            !seen_self || ours
        })
        .collect()
    }
}

/// Walk `stack`, starting `skip` levels above its first frame, & return the first frame whose
/// file does not end with any of `ignored`.
pub fn resolve_in<C: CallStack>(stack: C, skip: usize, ignored: &[&str]) -> Location {
    stack
        .frames()
        .into_iter()
        .skip(skip)
        .find(|frame| !ignored.iter().any(|suffix| frame.file.ends_with(suffix)))
        .unwrap_or_else(Location::unknown)
}

/// Resolve the caller on the current thread's stack.
///
/// Level zero is the function calling [`resolve`]; pass one to start with its caller, & so on.
/// Frames from files ending in any of `ignored` are then passed over.
pub fn resolve(skip: usize, ignored: &[&str]) -> Location {
    resolve_in(LiveStack, skip, ignored)
}

#[cfg(test)]
mod test {

    use super::*;

    fn stack() -> Vec<Frame> {
        vec![
            Frame::new("/build/gelf-tracing/src/writer.rs", 101),
            Frame::new("/rustc/abc/library/std/src/io/mod.rs", 1700),
            Frame::new("/home/me/app/src/handlers.rs", 17),
            Frame::new("/home/me/app/src/main.rs", 42),
        ]
    }

    #[test]
    fn skips_ignored_suffixes() {
        assert_eq!(
            resolve_in(stack(), 0, &["/src/writer.rs", "/std/src/io/mod.rs"]),
            Location::new("/home/me/app/src/handlers.rs", 17)
        );
        // no suffixes: the first frame wins
        assert_eq!(
            resolve_in(stack(), 0, &[]),
            Location::new("/build/gelf-tracing/src/writer.rs", 101)
        );
    }

    #[test]
    fn honors_skip() {
        assert_eq!(
            resolve_in(stack(), 3, &[]),
            Location::new("/home/me/app/src/main.rs", 42)
        );
        // skipping past an ignored frame doesn't make it less ignored
        assert_eq!(
            resolve_in(stack(), 2, &["handlers.rs"]),
            Location::new("/home/me/app/src/main.rs", 42)
        );
        assert!(resolve_in(stack(), 4, &[]).is_unknown());
    }

    #[test]
    fn suffixes_are_case_sensitive() {
        assert_eq!(resolve_in(stack(), 0, &["/SRC/WRITER.RS"]).line, 101);
    }

    #[test]
    fn all_frames_ignored() {
        let loc = resolve_in(stack(), 0, &[".rs"]);
        assert_eq!(loc, Location::unknown());
        assert_eq!(format!("{}", loc), "???:0");
        assert!(resolve_in(Vec::<Frame>::new(), 0, &[]).is_unknown());
    }

    #[test]
    fn own_sources_are_anchored_at_the_package() {
        let ours = own_source("src/writer.rs");
        assert!(ours.starts_with(env!("CARGO_MANIFEST_DIR")));
        assert!(ours.ends_with("writer.rs"));
        assert_ne!(ours, "src/writer.rs");

        // An application file of the same name is not mistaken for ours
        let stack = vec![
            Frame::new(ours.clone(), 120),
            Frame::new("/home/me/app/src/writer.rs", 9),
        ];
        assert_eq!(
            resolve_in(stack, 0, &[ours.as_str()]),
            Location::new("/home/me/app/src/writer.rs", 9)
        );
    }

    #[test]
    fn live_stack_everything_ignored() {
        // The empty suffix matches every path
        assert!(resolve(0, &[""]).is_unknown());
    }
}
