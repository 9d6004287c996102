//! # 调用栈捕获
//!
//! A [`StackTrace`] is built from the text form of a
//! [`std::backtrace::Backtrace`]. Frames belonging to the panic machinery
//! itself are dropped so that the first frame is the function that panicked,
//! and the result is cut down to the configured maximum.
//!
//! A panic re-raised with `std::panic::resume_unwind` never reaches the panic
//! hook, so its stack can only be taken where `Recover` caught it. By then
//! the panicking frames are gone: that trace starts at the caller of the
//! catching `Recover` and does not name the handler.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;

use super::max_stack_frames;

/// 单个调用帧
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Demangled function path, `<unknown>` when symbols are missing.
    pub function: String,
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl Frame {
    fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            file: None,
            line: None,
        }
    }

    fn set_location(&mut self, location: &str) {
        // "path/to/file.rs:LINE:COL"，路径本身可能包含冒号
        let mut parts = location.rsplitn(3, ':');
        let last = parts.next();
        let middle = parts.next();
        let rest = parts.next();

        match (rest, middle, last) {
            (Some(file), Some(line), Some(column))
                if line.parse::<u32>().is_ok() && column.parse::<u32>().is_ok() =>
            {
                self.file = Some(file.to_owned());
                self.line = line.parse().ok();
            }
            (_, Some(file), Some(line)) if line.parse::<u32>().is_ok() => {
                let file = rest.map_or_else(|| file.to_owned(), |rest| format!("{rest}:{file}"));
                self.file = Some(file);
                self.line = line.parse().ok();
            }
            _ => self.file = Some(location.to_owned()),
        }
    }

    /// Whether this frame is part of the std/core panic entry path.
    fn is_panic_machinery(&self) -> bool {
        let f = self.function.as_str();
        f.starts_with("core::panicking::")
            || f.starts_with("std::panicking::begin_panic")
            || f.starts_with("std::panicking::rust_panic")
            || f.starts_with("std::panicking::panic_with_hook")
            || f.starts_with("std::panic::panic_any")
            || f.contains("rust_begin_unwind")
            || f.contains("__rust_end_short_backtrace")
            || f.ends_with("::unwrap_failed")
            || f.ends_with("::expect_failed")
    }

    /// Frames of `Backtrace` itself and of [`StackTrace::capture`].
    fn is_capture_machinery(&self) -> bool {
        let f = self.function.as_str();
        f.starts_with("std::backtrace")
            || f.contains("recover::trace::capture_frames")
            || f.contains("StackTrace::capture")
    }

    /// Frames between the catch site and the capture call.
    fn is_recovery_internal(&self) -> bool {
        let f = self.function.as_str();
        self.is_capture_machinery()
            || f.contains("error_slot::recover::")
            || f.starts_with("core::ops::function::")
            || f.starts_with("core::option::")
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.function)?;
        match (&self.file, self.line) {
            (Some(file), Some(line)) => write!(f, "\n\tat {file}:{line}"),
            (Some(file), None) => write!(f, "\n\tat {file}"),
            _ => Ok(()),
        }
    }
}

fn capture_frames() -> Vec<Frame> {
    let backtrace = Backtrace::force_capture();
    if backtrace.status() == BacktraceStatus::Captured {
        parse_frames(&backtrace.to_string())
    } else {
        Vec::new()
    }
}

fn parse_frames(text: &str) -> Vec<Frame> {
    let mut frames: Vec<Frame> = Vec::new();

    for line in text.lines().map(str::trim) {
        if let Some(location) = line.strip_prefix("at ") {
            if let Some(frame) = frames.last_mut() {
                frame.set_location(location);
            }
        } else if let Some((index, function)) = line.split_once(": ") {
            if !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()) {
                frames.push(Frame::new(function.trim()));
            }
        }
    }
    frames
}

fn drop_leading(mut frames: Vec<Frame>, skip: impl Fn(&Frame) -> bool) -> Vec<Frame> {
    let keep_from = frames.iter().position(|frame| !skip(frame)).unwrap_or(frames.len());
    frames.drain(..keep_from);
    frames
}

/// Drop everything above and including the innermost `boundary` frame. When
/// the boundary frame was inlined away, only this crate's own leading frames
/// are dropped.
fn cut_below(mut frames: Vec<Frame>, boundary: &str) -> Vec<Frame> {
    match frames.iter().position(|frame| frame.function.contains(boundary)) {
        Some(index) => {
            frames.drain(..=index);
            frames
        }
        None => drop_leading(frames, Frame::is_recovery_internal),
    }
}

/// Immutable, bounded list of frames, innermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackTrace {
    frames: Vec<Frame>,
    truncated: bool,
}

impl StackTrace {
    /// Capture the current thread's stack, bounded by [`max_stack_frames`].
    /// The first frame is the caller of `capture`.
    #[must_use]
    pub fn capture() -> Self {
        let frames = capture_frames();
        Self::bounded(drop_leading(frames, Frame::is_capture_machinery), max_stack_frames())
    }

    /// Stack at the point where a panic was caught, starting at the caller of
    /// the innermost frame whose function contains `boundary`.
    pub(crate) fn capture_below(boundary: &str) -> Self {
        Self::bounded(cut_below(capture_frames(), boundary), max_stack_frames())
    }

    #[must_use]
    pub fn from_backtrace(backtrace: &Backtrace, max_frames: usize) -> Self {
        if backtrace.status() != BacktraceStatus::Captured {
            return Self::default();
        }
        Self::parse(&backtrace.to_string(), max_frames)
    }

    /// Parse the `Display` output of a [`Backtrace`].
    #[must_use]
    pub fn parse(text: &str, max_frames: usize) -> Self {
        let mut frames = parse_frames(text);

        // 跳过 panic 入口之前的帧
        if let Some(entry) = frames.iter().rposition(Frame::is_panic_machinery) {
            if entry + 1 < frames.len() {
                frames.drain(..=entry);
            }
        }

        Self::bounded(frames, max_frames)
    }

    fn bounded(mut frames: Vec<Frame>, max_frames: usize) -> Self {
        let max_frames = max_frames.max(1);
        let truncated = frames.len() > max_frames;
        frames.truncate(max_frames);

        Self { frames, truncated }
    }

    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Whether frames were dropped to respect the size limit.
    #[must_use]
    pub const fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Whether any frame's function path contains `needle`.
    #[must_use]
    pub fn contains_function(&self, needle: &str) -> bool {
        self.frames.iter().any(|frame| frame.function.contains(needle))
    }
}

impl fmt::Display for StackTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, frame) in self.frames.iter().enumerate() {
            if index > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{frame}")?;
        }
        if self.truncated {
            f.write_str("\n...additional frames elided...")?;
        }
        Ok(())
    }
}
