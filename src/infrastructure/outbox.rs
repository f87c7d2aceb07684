use crate::domain::notification::Notification;
use crate::domain::ports::{DeadLetterSink, Notifier};
use crate::domain::request::DeadLetterPayload;
use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

/// Appends dead-lettered requests to a file, one JSON document per line.
pub struct JsonLinesDeadLetterSink {
    path: PathBuf,
    // Serializes appends so lines from concurrent lanes never interleave.
    write_lock: Mutex<()>,
}

impl JsonLinesDeadLetterSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl DeadLetterSink for JsonLinesDeadLetterSink {
    async fn send(&self, payload: &DeadLetterPayload) -> Result<()> {
        let mut line = serde_json::to_vec(payload)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Delivers notifications to the log.
#[derive(Default, Clone)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<()> {
        info!(subject = %notification.subject, body = %notification.body, "notification");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::request::ProvisioningRequest;

    #[tokio::test]
    async fn test_dead_letters_are_appended_as_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dead-letters.jsonl");
        let sink = JsonLinesDeadLetterSink::new(&path);

        let request = ProvisioningRequest::from_json(
            r#"{"correlationId": "9",
                "adGroupAttributes": {"groupName": "g", "description": "d", "owner": "o"},
                "pamSafeAttributes": {"safeName": "s", "description": "d", "managingCPM": "c"}}"#,
        )
        .unwrap();

        sink.send(&DeadLetterPayload::new(request.clone(), "first"))
            .await
            .unwrap();
        sink.send(&DeadLetterPayload::new(request, "second"))
            .await
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["errorMessage"], "first");
        assert_eq!(lines[1]["errorMessage"], "second");
        assert_eq!(lines[1]["correlationId"], "9");
    }
}
