//! JSON-lines sink: one serialized [`SinkMessage`] per line.

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use super::ProgressSink;
use crate::core::{JobId, ProgressUpdate, SinkMessage};
use crate::errors::SinkError;

/// Writes every message as a single JSON line and flushes it.
#[derive(Debug)]
pub struct JsonLinesProgressSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesProgressSink<W> {
    /// Wraps a writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn write_message(&self, message: &SinkMessage) -> Result<(), SinkError> {
        let line = serde_json::to_string(message)?;
        let mut writer = self.writer.lock();
        writeln!(writer, "{line}")?;
        writer.flush()?;
        Ok(())
    }
}

impl JsonLinesProgressSink<io::Stdout> {
    /// Writes to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl JsonLinesProgressSink<BufWriter<File>> {
    /// Appends to a file, creating it if needed.
    pub fn append_to(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write + Send> ProgressSink for JsonLinesProgressSink<W> {
    fn on_stage_set_registered(&self, job_id: &JobId, stages: &[String]) -> Result<(), SinkError> {
        self.write_message(&SinkMessage::stage_set_registered(
            job_id.clone(),
            stages.to_vec(),
        ))
    }

    fn on_progress(&self, update: &ProgressUpdate) -> Result<(), SinkError> {
        self.write_message(&SinkMessage::Progress(update.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Fraction;
    use std::io::Read;

    #[test]
    fn test_writes_one_line_per_message() {
        let sink = JsonLinesProgressSink::new(Vec::new());
        let job = JobId::new("job");

        sink.on_stage_set_registered(&job, &["A".to_string(), "B".to_string()])
            .unwrap();
        sink.on_progress(&ProgressUpdate::new(job.clone(), "A", 0, 2, None))
            .unwrap();
        sink.on_progress(&ProgressUpdate::new(job, "A", 0, 2, Fraction::new(3, 10)))
            .unwrap();

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["type"], "stage_set_registered");
        assert_eq!(lines[1]["type"], "progress");
        assert!(lines[1].get("numerator").is_none());
        assert_eq!(lines[2]["numerator"], 3);
        assert_eq!(lines[2]["denominator"], 10);
    }

    #[test]
    fn test_append_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.jsonl");

        {
            let sink = JsonLinesProgressSink::append_to(&path).unwrap();
            sink.on_stage_set_registered(&JobId::new("job"), &["A".to_string()])
                .unwrap();
        }

        let mut contents = String::new();
        File::open(&path)
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        let message: SinkMessage = serde_json::from_str(contents.trim()).unwrap();
        assert_eq!(message.job_id().as_str(), "job");
    }
}
