use crate::domain::message::QueueMessage;
use crate::error::Result;
use serde::Deserialize;
use std::io::Read;

#[derive(Deserialize)]
#[serde(untagged)]
enum BatchDocument {
    Event {
        #[serde(rename = "Records")]
        records: Vec<QueueMessage>,
    },
    Messages(Vec<QueueMessage>),
}

/// Reads a queue batch from a JSON source.
///
/// Accepts either a queue event (`{"Records": [...]}`) or a bare array of
/// messages. Only the envelope is parsed here; message bodies stay raw so a
/// malformed body affects only its own message.
pub struct BatchReader<R: Read> {
    source: R,
}

impl<R: Read> BatchReader<R> {
    pub fn new(source: R) -> Self {
        Self { source }
    }

    pub fn messages(self) -> Result<Vec<QueueMessage>> {
        let document: BatchDocument = serde_json::from_reader(self.source)?;
        Ok(match document {
            BatchDocument::Event { records } => records,
            BatchDocument::Messages(messages) => messages,
        })
    }
}
