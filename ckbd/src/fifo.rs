//! FIFO Line Reader (spec.md §4.2). Grounded on `devnode.c`'s
//! `readlines`/rolling read buffer. Per spec.md §9 design note this state
//! is per-slot, not a process-wide singleton (see `state::slot::DeviceSlot`).

pub const INITIAL_BUFFER: usize = 4 * 1024;
pub const MAX_BUFFER: usize = 16 * 1024 - 1;
pub const MAX_LINES: usize = 512;

/// Accumulates bytes read from one FIFO across ticks and yields complete
/// lines. Grows from `INITIAL_BUFFER` up to `MAX_BUFFER`; once at capacity
/// with no newline in sight, the buffered bytes are delivered as a single
/// "line" anyway (spec.md §9 open question (a), resolved in favor of
/// forward progress — see SPEC_FULL.md §4.2).
#[derive(Debug, Default)]
pub struct LineReader {
    buf: Vec<u8>,
}

impl LineReader {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(INITIAL_BUFFER),
        }
    }

    /// Feed freshly read bytes in and extract as many complete lines as are
    /// present, up to `MAX_LINES` per call (spec.md §4.2: a single flood of
    /// input cannot starve other slots' frame-loop processing forever).
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while lines.len() < MAX_LINES {
            if let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
                let line = self.buf.drain(..=pos).collect::<Vec<u8>>();
                let line = &line[..line.len() - 1];
                lines.push(String::from_utf8_lossy(line).into_owned());
                continue;
            }

            if self.buf.len() >= MAX_BUFFER {
                let line = std::mem::take(&mut self.buf);
                lines.push(String::from_utf8_lossy(&line).into_owned());
            }
            break;
        }
        lines
    }

    pub fn pending_bytes(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_newline_terminated_line_is_extracted() {
        let mut reader = LineReader::new();
        let lines = reader.feed(b"rgb ff0000\n");
        assert_eq!(lines, vec!["rgb ff0000".to_string()]);
        assert_eq!(reader.pending_bytes(), 0);
    }

    #[test]
    fn partial_line_waits_for_more_bytes() {
        let mut reader = LineReader::new();
        assert!(reader.feed(b"rgb ff").is_empty());
        let lines = reader.feed(b"0000\n");
        assert_eq!(lines, vec!["rgb ff0000".to_string()]);
    }

    #[test]
    fn multiple_lines_in_one_feed_are_all_returned() {
        let mut reader = LineReader::new();
        let lines = reader.feed(b"mode 1\nrgb ff0000\n");
        assert_eq!(lines, vec!["mode 1".to_string(), "rgb ff0000".to_string()]);
    }

    #[test]
    fn overflow_without_newline_is_split_not_dropped() {
        let mut reader = LineReader::new();
        let flood = vec![b'a'; MAX_BUFFER];
        let lines = reader.feed(&flood);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), MAX_BUFFER);
        assert_eq!(reader.pending_bytes(), 0);
    }

    #[test]
    fn more_than_max_lines_per_feed_are_deferred_to_next_call() {
        let mut reader = LineReader::new();
        let mut flood = Vec::new();
        for _ in 0..(MAX_LINES + 5) {
            flood.extend_from_slice(b"x\n");
        }
        let lines = reader.feed(&flood);
        assert_eq!(lines.len(), MAX_LINES);
        assert!(reader.pending_bytes() > 0);
    }
}
