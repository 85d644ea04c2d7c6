use crate::domain::error::{AppError, Result};
use crate::infrastructure::response::decode_model_bytes;
use tracing::debug;

/// What one line of a streamed completion contributes.
#[derive(Debug, PartialEq)]
pub(crate) enum StreamLine {
    Content(String),
    Done,
    Skip,
    Error(String),
}

/// Reassembles newline-delimited stream frames that may arrive split across
/// network chunks, concatenating the content fragments.
pub(crate) struct StreamAccumulator {
    buffer: Vec<u8>,
    text: String,
    done: bool,
    parse_line: fn(&str) -> StreamLine,
}

impl StreamAccumulator {
    pub(crate) fn new(parse_line: fn(&str) -> StreamLine) -> Self {
        Self {
            buffer: Vec::new(),
            text: String::new(),
            done: false,
            parse_line,
        }
    }

    pub(crate) fn push(&mut self, bytes: &[u8]) -> Result<()> {
        self.buffer.extend_from_slice(bytes);
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.consume(&line)?;
            if self.done {
                break;
            }
        }
        Ok(())
    }

    pub(crate) fn is_done(&self) -> bool {
        self.done
    }

    pub(crate) fn finish(mut self) -> Result<String> {
        if !self.done && !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            self.consume(&rest)?;
        }
        Ok(self.text)
    }

    fn consume(&mut self, line: &[u8]) -> Result<()> {
        let decoded = decode_model_bytes(line);
        let line = decoded.trim();
        if line.is_empty() {
            return Ok(());
        }
        match (self.parse_line)(line) {
            StreamLine::Content(fragment) => self.text.push_str(&fragment),
            StreamLine::Done => self.done = true,
            StreamLine::Skip => debug!(line_len = line.len(), "Skipping unreadable stream line"),
            StreamLine::Error(msg) => return Err(AppError::LLMError(msg)),
        }
        Ok(())
    }
}

pub(crate) async fn read_stream(
    mut response: reqwest::Response,
    parse_line: fn(&str) -> StreamLine,
) -> Result<String> {
    let mut accumulator = StreamAccumulator::new(parse_line);
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| AppError::LLMError(format!("Stream read failed: {}", e)))?
    {
        accumulator.push(&chunk)?;
        if accumulator.is_done() {
            break;
        }
    }
    accumulator.finish()
}
