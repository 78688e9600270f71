//! BatchOrchestrator: drives a whole annotation run.
//!
//! Input → resume filter → fixed-size batches → Extraction → Correction →
//! append to output. Runs sequentially, one oracle call at a time.

use std::path::Path;
use std::time::Instant;

use super::corrector::CorrectionStage;
use super::error::AnnotationError;
use super::extractor::ExtractionStage;
use super::output::JsonlSink;
use super::resume::ResumeSet;
use super::types::{AnnotationConfig, BatchStatusEvent, RunSummary};
use crate::corpus::read_sentences;
use crate::pipeline::oracle::{Oracle, Sleeper};

/// Split `sentences` into consecutive batches of at most `batch_size`.
/// Every batch but the last is full.
pub fn partition(sentences: &[String], batch_size: usize) -> Vec<&[String]> {
    sentences.chunks(batch_size.max(1)).collect()
}

/// Drop sentences the resume set already holds. Returns the rest in input
/// order and how many were dropped.
pub fn filter_resumed(sentences: Vec<String>, resume: Option<&ResumeSet>) -> (Vec<String>, usize) {
    let Some(resume) = resume.filter(|r| !r.is_empty()) else {
        return (sentences, 0);
    };
    let total = sentences.len();
    let remaining: Vec<String> = sentences.into_iter().filter(|s| !resume.contains(s)).collect();
    let resumed = total - remaining.len();
    (remaining, resumed)
}

/// Orchestrates a full annotation run.
pub struct BatchOrchestrator {
    extraction: ExtractionStage,
    correction: CorrectionStage,
    batch_size: usize,
}

impl BatchOrchestrator {
    pub fn new(extraction: ExtractionStage, correction: CorrectionStage, batch_size: usize) -> Self {
        Self {
            extraction,
            correction,
            batch_size,
        }
    }

    pub fn from_config(config: &AnnotationConfig) -> Result<Self, AnnotationError> {
        config.validate().map_err(AnnotationError::Config)?;
        Ok(Self::new(
            ExtractionStage::from_config(config),
            CorrectionStage::from_config(config),
            config.batch_size,
        ))
    }

    /// Annotate every sentence of `input` not already in `resume`, appending
    /// kept records to `output` after each batch.
    ///
    /// Only a missing input or an unwritable output is fatal. Both are checked
    /// before the first oracle call. Failed or unconverged batches are counted
    /// in the summary and the run moves on.
    pub fn run(
        &mut self,
        oracle: &dyn Oracle,
        sleeper: &dyn Sleeper,
        input: &Path,
        output: &Path,
        resume: Option<&ResumeSet>,
        progress_fn: Option<&dyn Fn(BatchStatusEvent)>,
    ) -> Result<RunSummary, AnnotationError> {
        let start = Instant::now();
        let run_id = uuid::Uuid::new_v4();
        let _span = tracing::info_span!("annotation_run", %run_id).entered();

        let sentences = read_sentences(input)?;
        let sink = JsonlSink::new(output);
        sink.ensure_writable()?;

        let total_sentences = sentences.len();
        let (remaining, resumed) = filter_resumed(sentences, resume);
        let batches = partition(&remaining, self.batch_size);
        let total = batches.len() as u32;

        tracing::info!(
            oracle = %oracle.describe(),
            total_sentences,
            resumed,
            remaining = remaining.len(),
            batches = total,
            batch_size = self.batch_size,
            "Starting annotation run"
        );

        if let Some(progress) = progress_fn {
            progress(BatchStatusEvent::Started {
                sentence_count: remaining.len() as u32,
                resumed_count: resumed as u32,
                batch_count: total,
            });
        }

        let mut summary = RunSummary {
            resumed_sentences: resumed as u32,
            ..RunSummary::default()
        };

        for (i, batch) in batches.into_iter().enumerate() {
            let number = i as u32 + 1;

            let extraction = self.extraction.extract(oracle, sleeper, batch);
            let dropped = extraction.dropped();
            if extraction.records.is_empty() {
                summary.failed_batches += 1;
                tracing::warn!(
                    batch = number,
                    total,
                    sentences = batch.len(),
                    status = ?extraction.status,
                    "Batch produced no records"
                );
            }

            let report = self.correction.correct(oracle, sleeper, extraction.records);
            if !report.converged {
                summary.unconverged_batches += 1;
            }

            let returned = report.records.len();
            let kept: Vec<_> = report
                .records
                .into_iter()
                .filter(|r| r.has_entities())
                .collect();
            let skipped = (returned - kept.len() + dropped) as u32;

            let written = sink
                .append(&kept)
                .map_err(|source| AnnotationError::OutputNotWritable {
                    path: output.to_path_buf(),
                    source,
                })? as u32;

            summary.batches_processed += 1;
            summary.records_written += written;
            summary.records_skipped += skipped;

            if skipped > 0 {
                tracing::warn!(batch = number, skipped, "Skipped records without entities");
            }
            tracing::info!(
                batch = number,
                total,
                written,
                skipped,
                repair_calls = report.repair_calls,
                converged = report.converged,
                "Batch complete"
            );

            if let Some(progress) = progress_fn {
                progress(BatchStatusEvent::BatchCompleted {
                    batch: number,
                    total,
                    written,
                    skipped,
                    converged: report.converged,
                });
            }
        }

        summary.duration_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            batches = summary.batches_processed,
            written = summary.records_written,
            skipped = summary.records_skipped,
            failed_batches = summary.failed_batches,
            unconverged_batches = summary.unconverged_batches,
            resumed = summary.resumed_sentences,
            duration_ms = summary.duration_ms,
            "Annotation run complete"
        );

        if let Some(progress) = progress_fn {
            progress(BatchStatusEvent::Completed {
                summary: summary.clone(),
            });
        }

        Ok(summary)
    }
}
