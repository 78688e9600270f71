//! Corpus files: reading the input artifact and merging raw text dumps.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::pipeline::annotation::AnnotationError;

/// Read one sentence per line. Lines are trimmed and blank lines dropped.
pub fn read_sentences(path: &Path) -> Result<Vec<String>, AnnotationError> {
    if !path.is_file() {
        return Err(AnnotationError::InputNotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)?;
    Ok(sentences_from_str(&content))
}

fn sentences_from_str(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Outcome of [`merge_text_files`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub files: usize,
    pub sentences: usize,
}

/// Concatenate every `*.txt` file in `source_dir`, sorted by file name, into
/// `output`. Lines are trimmed and blank lines dropped.
///
/// `output` is overwritten. If it sits inside `source_dir` with a `.txt`
/// extension it is excluded from the inputs.
pub fn merge_text_files(source_dir: &Path, output: &Path) -> Result<MergeReport, AnnotationError> {
    if !source_dir.is_dir() {
        return Err(AnnotationError::InputNotFound(source_dir.to_path_buf()));
    }

    let output_canonical = output.canonicalize().ok();
    let mut inputs: Vec<PathBuf> = fs::read_dir(source_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "txt"))
        .filter(|p| output_canonical.is_none() || p.canonicalize().ok() != output_canonical)
        .collect();
    inputs.sort();

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| AnnotationError::OutputNotWritable {
            path: output.to_path_buf(),
            source,
        })?;
    }
    let file = fs::File::create(output).map_err(|source| AnnotationError::OutputNotWritable {
        path: output.to_path_buf(),
        source,
    })?;
    let mut writer = BufWriter::new(file);

    let mut sentences = 0;
    for path in &inputs {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable corpus file");
                continue;
            }
        };
        let lines = sentences_from_str(&content);
        tracing::debug!(path = %path.display(), sentences = lines.len(), "Merged corpus file");
        for line in &lines {
            writeln!(writer, "{line}")?;
        }
        sentences += lines.len();
    }
    writer.flush()?;

    tracing::info!(
        files = inputs.len(),
        sentences,
        output = %output.display(),
        "Corpus merge complete"
    );

    Ok(MergeReport {
        files: inputs.len(),
        sentences,
    })
}
