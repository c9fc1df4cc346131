// Incremental UTF-8 decoding for streamed response bodies.
//
// Chunk boundaries from the network are arbitrary and routinely land in the
// middle of a multi-byte character. The carry holds the bytes of at most one
// partially received character between chunks; everything decodable is
// returned immediately.

/// Cross-chunk decoder state. This is the only memory the decoding stage
/// keeps between chunks.
#[derive(Debug, Default)]
pub struct Utf8Carry {
    pending: Vec<u8>,
}

impl Utf8Carry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one chunk. Bytes that do not yet form a complete character are
    /// held back and prefixed onto the next call. Invalid sequences are
    /// replaced rather than raised; a dangling incomplete tail at stream end
    /// is dropped silently when the carry goes away with the session.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut buf = std::mem::take(&mut self.pending);
        buf.extend_from_slice(chunk);

        let split = complete_prefix_len(&buf);
        self.pending = buf.split_off(split);

        String::from_utf8_lossy(&buf).into_owned()
    }
}

/// Expected sequence length for a UTF-8 lead byte; None for continuation or
/// invalid lead bytes.
fn utf8_seq_len(lead: u8) -> Option<usize> {
    match lead {
        0x00..=0x7F => Some(1),
        0xC0..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF7 => Some(4),
        _ => None,
    }
}

/// Index where a trailing incomplete sequence starts; `buf.len()` when the
/// buffer ends on a character boundary. Only the last three bytes can belong
/// to an incomplete character, so the scan is bounded.
fn complete_prefix_len(buf: &[u8]) -> usize {
    let n = buf.len();
    for i in (n.saturating_sub(3)..n).rev() {
        if let Some(len) = utf8_seq_len(buf[i]) {
            return if len > n - i { i } else { n };
        }
    }
    n
}
