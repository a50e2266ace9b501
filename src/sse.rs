//! Incremental server-sent-event framing.
//!
//! Bytes are buffered until a blank line (`\n\n`) closes an event block. Only
//! complete blocks are decoded to text, so a UTF-8 sequence split across
//! network chunks is never mangled.

const BOUNDARY: &[u8] = b"\n\n";
const DATA_PREFIX: &str = "data:";

/// One complete event block, split into trimmed lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseBlock {
    pub lines: Vec<String>,
}

impl SseBlock {
    fn parse(raw: &[u8]) -> Self {
        let text = String::from_utf8_lossy(raw);
        Self {
            lines: text.split('\n').map(|l| l.trim().to_string()).collect(),
        }
    }
}

/// Payload of a `data:` line, trimmed. `None` for any other line or an empty payload.
pub fn data_payload(line: &str) -> Option<&str> {
    line.strip_prefix(DATA_PREFIX)
        .map(str::trim)
        .filter(|payload| !payload.is_empty())
}

/// Accumulates raw chunks and yields finished blocks.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and drain every block it completes, in stream order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseBlock> {
        // A boundary can straddle the previous chunk, so rescan from one byte back.
        let scan_from = self.buffer.len().saturating_sub(BOUNDARY.len() - 1);
        self.buffer.extend_from_slice(chunk);

        let mut blocks = Vec::new();
        let mut start = 0;
        let mut cursor = scan_from;
        while let Some(pos) = find(&self.buffer[cursor..], BOUNDARY) {
            let end = cursor + pos;
            blocks.push(SseBlock::parse(&self.buffer[start..end]));
            start = end + BOUNDARY.len();
            cursor = start;
        }
        self.buffer.drain(..start);
        blocks
    }

    /// Bytes of an unterminated trailing block.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
