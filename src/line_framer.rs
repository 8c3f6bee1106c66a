/// Output of [`LineFramer::feed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramedLine {
    /// A complete, trimmed, non-empty line (without its `\n`).
    Line(String),
    /// An unterminated run grew past the line length ceiling and was dropped.
    /// The rest of that line, up to its terminator, is skipped silently.
    Overflow {
        /// Number of bytes discarded from the accumulator.
        discarded: usize,
        /// Leading bytes of the dropped run, for diagnosis.
        head: String,
    },
}

/// Splits a chunked byte stream into newline-terminated text lines.
///
/// Bytes are accumulated across calls to [`feed`](Self::feed), so a line may
/// arrive split over any number of reads.
#[derive(Debug)]
pub struct LineFramer {
    buffer: Vec<u8>,
    max_line_len: usize,
    /// Inside an overflowed line; input is ignored until the next `\n`.
    skipping: bool,
}

impl LineFramer {
    pub const DEFAULT_MAX_LINE_LEN: usize = 64 * 1024;

    /// How many bytes of an overflowing run are kept in [`FramedLine::Overflow`].
    const OVERFLOW_HEAD_LEN: usize = 64;

    pub fn new(max_line_len: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_line_len: max_line_len.max(1),
            skipping: false,
        }
    }

    /// Append `data` and return every line it completed, in stream order.
    pub fn feed(&mut self, data: &[u8]) -> Vec<FramedLine> {
        let data = if self.skipping {
            match data.iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    self.skipping = false;
                    &data[pos + 1..]
                }
                None => return Vec::new(),
            }
        } else {
            data
        };
        self.buffer.extend_from_slice(data);

        let mut frames = Vec::new();
        let mut start = 0;
        while let Some(pos) = self.buffer[start..].iter().position(|&b| b == b'\n') {
            let line = self.buffer[start..start + pos].trim_ascii();
            if !line.is_empty() {
                frames.push(FramedLine::Line(String::from_utf8_lossy(line).into_owned()));
            }
            start += pos + 1;
        }
        self.buffer.drain(..start);

        if self.buffer.len() > self.max_line_len {
            let discarded = self.buffer.len();
            let head_len = discarded.min(Self::OVERFLOW_HEAD_LEN);
            let head = String::from_utf8_lossy(&self.buffer[..head_len]).into_owned();
            self.buffer.clear();
            self.skipping = true;
            log::warn!("Dropped {discarded} bytes without a line terminator");
            frames.push(FramedLine::Overflow { discarded, head });
        }

        frames
    }

    /// Bytes waiting for a terminator.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_LINE_LEN)
    }
}
