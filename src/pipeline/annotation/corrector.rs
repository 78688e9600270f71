//! CorrectionStage: bounded validate-and-repair loop over a batch's records.
//!
//! Each generation scans every record for labels outside the taxonomy and
//! issues one repair call per offending record. The loop stops as soon as a
//! scan comes back clean, or after `max_loops` generations. Records that are
//! still invalid at that point are returned as they are.

use super::parser::parse_correction_reply;
use super::prompt::build_correction_prompt;
use super::taxonomy::Taxonomy;
use super::types::{AnnotatedRecord, AnnotationConfig, CorrectionReport, CorrectionTask};
use crate::pipeline::oracle::{call_with_retry, Oracle, OracleError, RetryPolicy, Sleeper};

/// Repairs are always requested deterministically.
const CORRECTION_TEMPERATURE: f32 = 0.0;

pub struct CorrectionStage {
    taxonomy: Taxonomy,
    max_loops: u32,
    policy: RetryPolicy,
}

impl CorrectionStage {
    pub fn new(taxonomy: Taxonomy, max_loops: u32, policy: RetryPolicy) -> Self {
        Self {
            taxonomy,
            max_loops,
            policy,
        }
    }

    pub fn from_config(config: &AnnotationConfig) -> Self {
        Self::new(
            Taxonomy::cner(),
            config.max_correction_loops,
            config.correction_policy(),
        )
    }

    /// Collect one task per record that has at least one invalid label.
    pub fn scan(&self, records: &[AnnotatedRecord]) -> Vec<CorrectionTask> {
        records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| {
                let invalid = self.taxonomy.invalid_entities(record);
                (!invalid.is_empty()).then(|| CorrectionTask {
                    index,
                    record: record.clone(),
                    invalid,
                })
            })
            .collect()
    }

    /// Run the loop. The returned records keep the input's indices.
    pub fn correct(
        &self,
        oracle: &dyn Oracle,
        sleeper: &dyn Sleeper,
        mut records: Vec<AnnotatedRecord>,
    ) -> CorrectionReport {
        let mut loops_run = 0;
        let mut repair_calls = 0;

        for generation in 1..=self.max_loops {
            let tasks = self.scan(&records);
            if tasks.is_empty() {
                tracing::info!(generation, "Validation loop: batch is clean");
                return CorrectionReport {
                    records,
                    loops_run,
                    repair_calls,
                    converged: true,
                    unresolved_entities: 0,
                };
            }

            loops_run = generation;
            tracing::info!(
                generation,
                offending_records = tasks.len(),
                invalid_entities = tasks.iter().map(|t| t.invalid.len()).sum::<usize>(),
                "Validation loop: correcting invalid labels"
            );

            for task in tasks {
                repair_calls += 1;
                if let Some(repaired) = self.repair(oracle, sleeper, &task) {
                    records[task.index] = repaired;
                }
            }
        }

        let remaining = self.scan(&records);
        let unresolved_entities: usize = remaining.iter().map(|t| t.invalid.len()).sum();
        let converged = remaining.is_empty();
        if !converged {
            tracing::warn!(
                max_loops = self.max_loops,
                unresolved_records = remaining.len(),
                unresolved_entities,
                "Exceeded max validation loops, some invalid labels remain"
            );
        }

        CorrectionReport {
            records,
            loops_run,
            repair_calls,
            converged,
            unresolved_entities,
        }
    }

    /// One repair call with retries. `None` keeps the previous version.
    fn repair(
        &self,
        oracle: &dyn Oracle,
        sleeper: &dyn Sleeper,
        task: &CorrectionTask,
    ) -> Option<AnnotatedRecord> {
        let prompt = build_correction_prompt(&task.record, &task.invalid);

        let result = call_with_retry(&self.policy, sleeper, "correction", |_| {
            let raw = oracle.generate(&prompt, CORRECTION_TEMPERATURE, true)?;
            parse_correction_reply(&raw).map_err(OracleError::Other)
        });

        match result {
            Ok(mut repaired) => {
                if repaired.text != task.record.text {
                    tracing::debug!(
                        index = task.index,
                        "Correction changed the sentence text, keeping the original"
                    );
                    repaired.text = task.record.text.clone();
                }
                Some(repaired)
            }
            Err(e) => {
                tracing::error!(
                    index = task.index,
                    attempts = e.attempts,
                    error = %e.last_error,
                    "Failed to correct record after retries, keeping previous version"
                );
                None
            }
        }
    }
}
