//! Resume support: the set of sentences a previous run already wrote.
//!
//! Matching is exact on the `text` field. The oracle sometimes normalises a
//! sentence (spacing, punctuation), and such a sentence will not match its
//! input line and is annotated again on resume.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;

use serde::Deserialize;

#[derive(Deserialize)]
struct TextOnly {
    text: String,
}

/// Sentence texts present in an existing output file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResumeSet {
    texts: HashSet<String>,
}

impl ResumeSet {
    pub fn contains(&self, sentence: &str) -> bool {
        self.texts.contains(sentence)
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}

impl FromIterator<String> for ResumeSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            texts: iter.into_iter().collect(),
        }
    }
}

/// Load the resume set from a JSON Lines output file.
///
/// Never fails: a missing file is an empty set, and lines that are not
/// UTF-8, not JSON, or lack a string `text` field are skipped. A trailing
/// partial line left by a crash is skipped the same way.
pub fn load_resume_set(path: &Path) -> ResumeSet {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return ResumeSet::default(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Cannot read existing output, starting fresh");
            return ResumeSet::default();
        }
    };

    let mut texts = HashSet::new();
    let mut skipped = 0usize;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Error while reading existing output, using lines read so far");
                break;
            }
        }

        let line = match std::str::from_utf8(&buf) {
            Ok(s) => s.trim(),
            Err(_) => {
                skipped += 1;
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<TextOnly>(line) {
            Ok(record) => {
                texts.insert(record.text);
            }
            Err(_) => skipped += 1,
        }
    }

    if skipped > 0 {
        tracing::debug!(skipped, "Ignored unreadable lines in existing output");
    }
    tracing::info!(
        path = %path.display(),
        processed = texts.len(),
        "Loaded previously processed sentences"
    );

    ResumeSet { texts }
}
