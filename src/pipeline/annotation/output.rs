//! Append-only JSON Lines sink.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::error::AnnotationError;
use super::types::AnnotatedRecord;

/// Appends records to the output file, one JSON object per line.
///
/// Each batch is serialised in full before anything is written, then written
/// with a single call and synced. A crash therefore leaves at most one
/// partial trailing line, which resume loading skips. The next append starts
/// on a fresh line after it.
#[derive(Debug, Clone)]
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create missing parent directories and check the file opens for append.
    pub fn ensure_writable(&self) -> Result<(), AnnotationError> {
        let not_writable = |source: io::Error| AnnotationError::OutputNotWritable {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(not_writable)?;
        }
        self.open().map(drop).map_err(not_writable)
    }

    /// Append `records`. Returns how many lines were written.
    pub fn append(&self, records: &[AnnotatedRecord]) -> io::Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut file = self.open()?;
        let mut buf = Vec::with_capacity(records.len() * 256);
        if ends_mid_line(&mut file)? {
            tracing::warn!(path = %self.path.display(), "Output ends with a partial line, starting a new one");
            buf.push(b'\n');
        }
        for record in records {
            serde_json::to_writer(&mut buf, record)?;
            buf.push(b'\n');
        }

        file.write_all(&buf)?;
        file.flush()?;
        file.sync_data()?;
        Ok(records.len())
    }

    fn open(&self) -> io::Result<File> {
        OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
    }
}

fn ends_mid_line(file: &mut File) -> io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::annotation::types::Entity;

    fn record(text: &str, label: &str) -> AnnotatedRecord {
        AnnotatedRecord::new(text, vec![Entity::new(text, label)])
    }

    #[test]
    fn appends_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlSink::new(&dir.path().join("out.jsonl"));

        assert_eq!(sink.append(&[record("a", "PER"), record("b", "LOC")]).unwrap(), 2);
        assert_eq!(sink.append(&[record("c", "ORG")]).unwrap(), 1);

        let content = fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        let last: AnnotatedRecord = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(last, record("c", "ORG"));
        assert!(content.ends_with('\n'));
    }

    #[test]
    fn keeps_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        fs::write(&path, "{\"text\":\"old\",\"entities\":[]}\n").unwrap();

        JsonlSink::new(&path).append(&[record("new", "NUM")]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("{\"text\":\"old\""));
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn partial_trailing_line_is_not_extended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        fs::write(&path, "{\"text\":\"a\",\"entities\":[]}\n{\"text\":\"b\",\"ent").unwrap();

        JsonlSink::new(&path).append(&[record("c", "PER")]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "{\"text\":\"b\",\"ent");
        let last: AnnotatedRecord = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(last, record("c", "PER"));
    }

    #[test]
    fn non_ascii_is_written_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlSink::new(&dir.path().join("out.jsonl"));
        sink.append(&[record("မန္တလေး", "LOC")]).unwrap();
        let content = fs::read_to_string(sink.path()).unwrap();
        assert!(content.contains("မန္တလေး"));
        assert!(!content.contains("\\u"));
    }

    #[test]
    fn empty_append_does_not_create_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlSink::new(&dir.path().join("out.jsonl"));
        assert_eq!(sink.append(&[]).unwrap(), 0);
        assert!(!sink.path().exists());
    }

    #[test]
    fn ensure_writable_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlSink::new(&dir.path().join("nested/deeper/out.jsonl"));
        sink.ensure_writable().unwrap();
        assert!(sink.path().exists());
    }

    #[test]
    fn ensure_writable_fails_when_parent_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();
        let sink = JsonlSink::new(&blocker.join("out.jsonl"));
        assert!(matches!(
            sink.ensure_writable(),
            Err(AnnotationError::OutputNotWritable { .. })
        ));
    }
}
