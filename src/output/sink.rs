//! Message sinks

use crate::engine::Message;
use crate::error::Result;
use crate::state::State;
use crate::types::JsonValue;
use std::io::Write;

/// Receiver of everything a sync produces.
///
/// Calls arrive in emission order. A checkpoint's state snapshot is always
/// emitted after the records it covers.
pub trait MessageSink: Send {
    /// Emit one record of `stream`
    fn emit_record(&mut self, stream: &str, record: &JsonValue) -> Result<()>;

    /// Emit the full state after a checkpoint
    fn emit_state(&mut self, state: &State) -> Result<()>;
}

/// Writes each message as a single JSON line
#[derive(Debug)]
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
}

impl JsonLinesSink<std::io::Stdout> {
    /// Sink writing to stdout
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Sink writing to `writer`
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Recover the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_message(&mut self, message: &JsonValue) -> Result<()> {
        serde_json::to_writer(&mut self.writer, message)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

impl<W: Write + Send> MessageSink for JsonLinesSink<W> {
    fn emit_record(&mut self, stream: &str, record: &JsonValue) -> Result<()> {
        let message = serde_json::json!({
            "type": "RECORD",
            "stream": stream,
            "record": record,
        });
        self.write_message(&message)
    }

    fn emit_state(&mut self, state: &State) -> Result<()> {
        let message = Message::state(state.clone()).to_json();
        self.write_message(&message)?;
        // A checkpoint is on the wire before the next window starts
        self.writer.flush()?;
        Ok(())
    }
}

/// Collects messages in memory
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    messages: Vec<Message>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages in emission order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Records of one stream
    pub fn records(&self, stream: &str) -> Vec<&JsonValue> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                Message::Record { stream: s, record } if s == stream => Some(record),
                _ => None,
            })
            .collect()
    }

    /// State snapshots in emission order
    pub fn states(&self) -> Vec<&State> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                Message::State { value } => Some(value),
                Message::Record { .. } => None,
            })
            .collect()
    }

    /// Take all collected messages
    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

impl MessageSink for MemorySink {
    fn emit_record(&mut self, stream: &str, record: &JsonValue) -> Result<()> {
        self.messages.push(Message::record(stream, record.clone()));
        Ok(())
    }

    fn emit_state(&mut self, state: &State) -> Result<()> {
        self.messages.push(Message::state(state.clone()));
        Ok(())
    }
}
