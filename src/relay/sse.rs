// SSE line framing and heartbeat pacing.
//
// The upstream body may already be SSE, may be raw line-oriented text, or may
// be line-less text. The framer re-frames all three into valid SSE without
// corrupting upstream output that already speaks the protocol.

use std::time::{Duration, Instant};

/// Field prefixes that mark a line as already SSE-shaped.
const SSE_FIELD_PREFIXES: [&str; 5] = ["data:", "event:", "id:", "retry:", ":"];

fn is_sse_field(line: &str) -> bool {
    SSE_FIELD_PREFIXES.iter().any(|p| line.starts_with(p))
}

/// Frame rule: SSE-shaped lines pass through verbatim with a single newline;
/// raw text is wrapped as a complete `data:` event.
pub fn to_frame(line: &str) -> String {
    if is_sse_field(line) {
        format!("{}\n", line)
    } else {
        format!("data: {}\n\n", line)
    }
}

/// Per-call framing state. `line_buffer` never holds an embedded newline
/// after a framing pass completes.
#[derive(Debug, Default)]
pub struct SseLineFramer {
    line_buffer: String,
}

impl SseLineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one decoded text fragment; returns the frames ready to emit, in
    /// input order.
    pub fn push(&mut self, fragment: &str) -> Vec<String> {
        let mut frames = Vec::new();
        self.line_buffer.push_str(fragment);

        if !self.line_buffer.contains('\n') {
            // A partial `data:` field from an SSE upstream must not be
            // forwarded split; anything else goes out immediately so
            // character-by-character upstreams stay low-latency.
            if self.line_buffer.starts_with("data:") {
                return frames;
            }
            if !self.line_buffer.is_empty() {
                frames.push(to_frame(&self.line_buffer));
                self.line_buffer.clear();
            }
            return frames;
        }

        while let Some(idx) = self.line_buffer.find('\n') {
            let mut line: String = self.line_buffer.drain(..=idx).collect();
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
            if line.is_empty() {
                // blank-line event terminator from an SSE upstream
                frames.push("\n".to_string());
            } else {
                frames.push(to_frame(&line));
            }
        }
        frames
    }

    /// Stream end: flush whatever is still buffered as one final, fully
    /// terminated event.
    pub fn finish(mut self) -> Option<String> {
        let tail = self.line_buffer.trim();
        if tail.is_empty() {
            return None;
        }
        let mut frame = to_frame(tail);
        if !frame.ends_with("\n\n") {
            frame.push('\n');
        }
        self.line_buffer.clear();
        Some(frame)
    }
}

/// Paces `: ping` comment frames between upstream chunks. Evaluated only on
/// chunk arrival, so an upstream that goes silent while holding the
/// connection open receives no heartbeat during the stall (known gap,
/// preserved from the source behavior).
#[derive(Debug)]
pub struct Heartbeat {
    interval: Duration,
    last: Option<Instant>,
}

impl Heartbeat {
    pub const FRAME: &'static str = ": ping\n\n";

    /// interval 0 disables heartbeats entirely.
    pub fn new(interval_secs: u64) -> Self {
        Self {
            interval: Duration::from_secs(interval_secs),
            last: None,
        }
    }

    /// Call once per received chunk, before emitting its frames; true means a
    /// heartbeat comment is due now.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.last {
            None => {
                self.last = Some(now);
                false
            }
            Some(prev) => {
                if !self.interval.is_zero() && now.duration_since(prev) >= self.interval {
                    self.last = Some(now);
                    true
                } else {
                    false
                }
            }
        }
    }
}
