//! NDJSON event stream iterator.

use anyhow::Result;
use std::io::{BufRead, BufReader};

use super::events::DaemonEvent;

/// Iterator over an NDJSON stream of daemon events
pub struct EventStream<R: std::io::Read> {
    reader: BufReader<R>,
    buffer: String,
    line_number: usize,
}

impl<R: std::io::Read> EventStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            buffer: String::new(),
            line_number: 0,
        }
    }
}

impl<R: std::io::Read> Iterator for EventStream<R> {
    type Item = Result<DaemonEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buffer.clear();

            match self.reader.read_line(&mut self.buffer) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line_number += 1;
                    let trimmed = self.buffer.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    return match serde_json::from_str::<DaemonEvent>(trimmed) {
                        Ok(event) => Some(Ok(event)),
                        Err(e) => Some(Err(anyhow::anyhow!(
                            "Failed to parse event on line {}: {} (line: {})",
                            self.line_number,
                            e,
                            trimmed
                        ))),
                    };
                }
                Err(e) => return Some(Err(anyhow::anyhow!("Failed to read from stream: {}", e))),
            }
        }
    }
}
