//! Bounded call-stack snapshots attached to new errors.

use std::backtrace::Backtrace;

/// Produces a textual snapshot of the current call stack.
pub trait StackCapture {
    /// Capture at most `max_depth` frames, or `None` when unavailable.
    fn capture(&self, max_depth: usize) -> Option<String>;
}

/// Never captures anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStackCapture;

impl StackCapture for NoStackCapture {
    fn capture(&self, _max_depth: usize) -> Option<String> {
        None
    }
}

/// Captures frames through [`std::backtrace::Backtrace`].
///
/// Frames belonging to the backtrace machinery and to error construction
/// itself are skipped so the snapshot starts at the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct BacktraceCapture;

const SKIPPED_FRAMES: &[&str] = &[
    "std::backtrace",
    "std::backtrace_rs",
    "lazyview::error::stack",
    "lazyview::error::view_error",
];

impl StackCapture for BacktraceCapture {
    fn capture(&self, max_depth: usize) -> Option<String> {
        if max_depth == 0 {
            return None;
        }
        let rendered = Backtrace::force_capture().to_string();
        let snapshot = bounded_frames(&rendered, max_depth);
        if snapshot.is_empty() {
            None
        } else {
            Some(snapshot)
        }
    }
}

/// Reduce a rendered backtrace to its first `max_depth` relevant frames.
///
/// A rendered frame is a numbered function line (`  3: path::to::fn`)
/// optionally followed by an indented `at file:line` line.
fn bounded_frames(rendered: &str, max_depth: usize) -> String {
    let mut frames: Vec<String> = Vec::new();
    let mut keep_location = false;

    for line in rendered.lines() {
        let trimmed = line.trim_start();
        if let Some(function) = frame_function(trimmed) {
            keep_location = false;
            if frames.len() >= max_depth {
                break;
            }
            // Trait impls render as `<Type as Trait>::method`.
            let path = function.trim_start_matches('<');
            if SKIPPED_FRAMES.iter().any(|skip| path.starts_with(skip)) {
                continue;
            }
            frames.push(function.to_string());
            keep_location = true;
        } else if keep_location && trimmed.starts_with("at ") {
            if let Some(last) = frames.last_mut() {
                last.push_str(" (");
                last.push_str(trimmed.trim_start_matches("at "));
                last.push(')');
            }
            keep_location = false;
        }
    }

    frames.join("\n")
}

fn frame_function(line: &str) -> Option<&str> {
    let (index, rest) = line.split_once(": ")?;
    if index.is_empty() || !index.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(rest.trim())
}
