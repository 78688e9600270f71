//! Core types for the annotation pipeline.
//!
//! These types model the full lifecycle:
//! Sentence → Batch → Extraction → Correction → JSON Lines output.

use serde::{Deserialize, Serialize};

use crate::pipeline::oracle::RetryPolicy;

// ═══════════════════════════════════════════
// Records
// ═══════════════════════════════════════════

/// One labelled span of a sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    pub label: String,
}

impl Entity {
    pub fn new(text: &str, label: &str) -> Self {
        Self {
            text: text.to_string(),
            label: label.to_string(),
        }
    }
}

/// A sentence together with its extracted entities. One output line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedRecord {
    pub text: String,
    #[serde(default)]
    pub entities: Vec<Entity>,
}

impl AnnotatedRecord {
    pub fn new(text: &str, entities: Vec<Entity>) -> Self {
        Self {
            text: text.to_string(),
            entities,
        }
    }

    /// The oracle signals "not a valid sentence" with an empty entity list.
    pub fn has_entities(&self) -> bool {
        !self.entities.is_empty()
    }
}

/// A record whose labels failed validation, queued for one repair call.
/// Only lives for a single correction loop.
#[derive(Debug, Clone)]
pub struct CorrectionTask {
    pub index: usize,
    pub record: AnnotatedRecord,
    pub invalid: Vec<Entity>,
}

// ═══════════════════════════════════════════
// Stage results
// ═══════════════════════════════════════════

/// How an extraction call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionStatus {
    /// Reply parsed. `dropped` list items did not look like records.
    Parsed { dropped: usize },
    /// Reply was not JSON or lacked the `sentences` list.
    Malformed,
    /// Every attempt failed at the oracle level.
    Exhausted,
}

/// Output of [`super::ExtractionStage`] for one batch.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub records: Vec<AnnotatedRecord>,
    pub status: ExtractionStatus,
}

impl ExtractionResult {
    pub fn empty(status: ExtractionStatus) -> Self {
        Self {
            records: Vec::new(),
            status,
        }
    }

    pub fn dropped(&self) -> usize {
        match self.status {
            ExtractionStatus::Parsed { dropped } => dropped,
            _ => 0,
        }
    }
}

/// Output of [`super::CorrectionStage`] for one batch.
#[derive(Debug, Clone)]
pub struct CorrectionReport {
    /// Same length and order as the input records.
    pub records: Vec<AnnotatedRecord>,
    /// Number of scan+repair generations that issued oracle calls.
    pub loops_run: u32,
    /// Repair calls issued (one per offending record per loop).
    pub repair_calls: u32,
    /// True when a final scan found no invalid label.
    pub converged: bool,
    /// Entities still carrying an invalid label.
    pub unresolved_entities: usize,
}

// ═══════════════════════════════════════════
// Configuration
// ═══════════════════════════════════════════

/// Configuration for an annotation run.
#[derive(Debug, Clone)]
pub struct AnnotationConfig {
    /// Sentences per extraction call.
    pub batch_size: usize,
    /// Extraction temperature. 0.0 keeps extraction reproducible.
    pub extraction_temperature: f32,
    /// Attempts per extraction call.
    pub extraction_attempts: u32,
    /// Attempts per repair call.
    pub correction_attempts: u32,
    /// Maximum validate-and-repair generations per batch.
    pub max_correction_loops: u32,
    /// Few-shot examples included in each extraction prompt.
    pub few_shot_count: usize,
    /// Seed for few-shot sampling. `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            extraction_temperature: 0.0,
            extraction_attempts: 5,
            correction_attempts: 3,
            max_correction_loops: 5,
            few_shot_count: 2,
            seed: None,
        }
    }
}

impl AnnotationConfig {
    pub fn extraction_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.extraction_attempts)
    }

    pub fn correction_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.correction_attempts)
    }

    /// Reject values that would make the run meaningless.
    pub fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("batch size must be at least 1".into());
        }
        if self.extraction_attempts == 0 {
            return Err("extraction attempts must be at least 1".into());
        }
        if !(0.0..=2.0).contains(&self.extraction_temperature) {
            return Err(format!(
                "extraction temperature {} is outside 0.0-2.0",
                self.extraction_temperature
            ));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════
// Progress & Summary
// ═══════════════════════════════════════════

/// Totals for a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub batches_processed: u32,
    pub records_written: u32,
    pub records_skipped: u32,
    /// Batches whose extraction produced no records at all.
    pub failed_batches: u32,
    /// Batches emitted with invalid labels after the loop budget ran out.
    pub unconverged_batches: u32,
    /// Input sentences filtered out because a prior run already wrote them.
    pub resumed_sentences: u32,
    pub duration_ms: u64,
}

/// Progress notifications emitted by the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchStatusEvent {
    Started {
        sentence_count: u32,
        resumed_count: u32,
        batch_count: u32,
    },
    BatchCompleted {
        batch: u32,
        total: u32,
        written: u32,
        skipped: u32,
        converged: bool,
    },
    Completed {
        summary: RunSummary,
    },
}
