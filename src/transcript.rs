//! Transaction transcript
//!
//! Appends one timestamped line per direction to a log file:
//!
//! ```text
//! [2026-10-18 14:02:11.503] TX 64 32 c8 1e 49
//! [2026-10-18 14:02:11.651] RX 07 2a
//! ```

use crate::exchange::{InputVector, OutputVector};
use chrono::Local;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct Transcript {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl Transcript {
    /// Open (or create) a transcript file for appending
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record_tx(&mut self, inputs: &InputVector) -> io::Result<()> {
        self.write_line(&format!("TX {}", hex(&inputs.frame())))
    }

    pub fn record_rx(&mut self, output: Option<&OutputVector>) -> io::Result<()> {
        match output {
            Some(out) => self.write_line(&format!("RX {}", hex(out.as_bytes()))),
            None => self.write_line("RX timeout"),
        }
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        writeln!(self.writer, "[{}] {}", timestamp, line)?;
        self.writer.flush()
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_records_frame_and_reply() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.log");

        let mut transcript = Transcript::open(&path).unwrap();
        transcript.record_tx(&InputVector::new([100, 50, 200, 30])).unwrap();
        transcript.record_rx(Some(&OutputVector::new([7, 42]))).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("] TX 64 32 c8 1e 49"));
        assert!(lines[1].ends_with("] RX 07 2a"));
    }

    #[test]
    fn test_appends_across_sessions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.log");

        for _ in 0..2 {
            let mut transcript = Transcript::open(&path).unwrap();
            transcript.record_tx(&InputVector::new([0, 0, 0, 0])).unwrap();
            transcript.record_rx(None).unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 4);
        assert_eq!(content.matches("RX timeout").count(), 2);
    }
}
