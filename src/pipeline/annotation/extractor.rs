//! ExtractionStage: one oracle call per batch, parsed into partial records.

use super::parser::{parse_extraction_reply, ExtractionReply};
use super::prompt::{build_extraction_prompt, FewShotExample, FEW_SHOT_EXAMPLES};
use super::sampler::{ExampleSampler, RandomSampler};
use super::types::{AnnotationConfig, ExtractionResult, ExtractionStatus};
use crate::pipeline::oracle::{call_with_retry, Oracle, RetryPolicy, Sleeper};

pub struct ExtractionStage {
    policy: RetryPolicy,
    temperature: f32,
    few_shot_count: usize,
    pool: &'static [FewShotExample],
    sampler: Box<dyn ExampleSampler>,
}

impl ExtractionStage {
    pub fn new(
        policy: RetryPolicy,
        temperature: f32,
        few_shot_count: usize,
        sampler: Box<dyn ExampleSampler>,
    ) -> Self {
        Self {
            policy,
            temperature,
            few_shot_count,
            pool: FEW_SHOT_EXAMPLES,
            sampler,
        }
    }

    pub fn from_config(config: &AnnotationConfig) -> Self {
        Self::new(
            config.extraction_policy(),
            config.extraction_temperature,
            config.few_shot_count,
            Box::new(RandomSampler::new(config.seed)),
        )
    }

    /// Extract records for one batch.
    ///
    /// The result may hold fewer records than `batch` has sentences: the
    /// oracle drops lines it judges not to be sentences. A malformed reply or
    /// an exhausted retry budget yields no records at all.
    pub fn extract(
        &mut self,
        oracle: &dyn Oracle,
        sleeper: &dyn Sleeper,
        batch: &[String],
    ) -> ExtractionResult {
        if batch.is_empty() {
            return ExtractionResult::empty(ExtractionStatus::Parsed { dropped: 0 });
        }

        let examples = self.sampler.sample(self.pool, self.few_shot_count);
        let prompt = build_extraction_prompt(batch, &examples);
        tracing::debug!(
            sentences = batch.len(),
            examples = examples.len(),
            prompt_chars = prompt.chars().count(),
            "Built extraction prompt"
        );

        let raw = match call_with_retry(&self.policy, sleeper, "extraction", |_| {
            oracle.generate(&prompt, self.temperature, true)
        }) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(
                    attempts = e.attempts,
                    error = %e.last_error,
                    "Failed to process batch after retries"
                );
                return ExtractionResult::empty(ExtractionStatus::Exhausted);
            }
        };

        match parse_extraction_reply(&raw) {
            ExtractionReply::Parsed { records, dropped } => {
                if dropped > 0 {
                    tracing::warn!(dropped, "Extraction reply contained items that are not records");
                }
                ExtractionResult {
                    records,
                    status: ExtractionStatus::Parsed { dropped },
                }
            }
            ExtractionReply::Malformed { raw, reason } => {
                tracing::warn!(
                    reason = %reason,
                    reply_chars = raw.chars().count(),
                    "Unexpected extraction reply structure, discarding batch"
                );
                ExtractionResult::empty(ExtractionStatus::Malformed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::annotation::sampler::FixedSampler;
    use crate::pipeline::oracle::mock::{MockOracle, RecordingSleeper};
    use crate::pipeline::oracle::OracleError;
    use std::time::Duration;

    fn stage(attempts: u32) -> ExtractionStage {
        ExtractionStage::new(RetryPolicy::new(attempts), 0.0, 2, Box::new(FixedSampler::new(vec![0, 2])))
    }

    fn batch(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    const TWO_RECORDS: &str = r#"{"sentences": [
        {"text": "ဦးနု သည် ဝန်ကြီးချုပ် ဖြစ်သည်။", "entities": [{"text": "ဦးနု", "label": "PER"}]},
        {"text": "ရန်ကုန် မြို့ ကြီး ဖြစ်သည်။", "entities": [{"text": "ရန်ကုန်", "label": "LOC"}]}
    ]}"#;

    #[test]
    fn extracts_records_in_reply_order() {
        let oracle = MockOracle::new().then_reply(TWO_RECORDS);
        let sleeper = RecordingSleeper::default();
        let result = stage(5).extract(&oracle, &sleeper, &batch(&["a", "b"]));

        assert_eq!(result.status, ExtractionStatus::Parsed { dropped: 0 });
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[1].entities[0].label, "LOC");
        assert!(sleeper.recorded().is_empty());
    }

    #[test]
    fn requests_json_at_configured_temperature() {
        let oracle = MockOracle::new().then_reply(TWO_RECORDS);
        let mut stage = ExtractionStage::new(RetryPolicy::new(1), 0.0, 0, Box::new(FixedSampler::none()));
        stage.extract(&oracle, &RecordingSleeper::default(), &batch(&["a"]));

        let call = &oracle.calls()[0];
        assert!(call.require_json);
        assert_eq!(call.temperature, 0.0);
        assert!(call.prompt.contains("1. a\n"));
    }

    #[test]
    fn prompt_uses_sampled_examples() {
        let oracle = MockOracle::new().then_reply(TWO_RECORDS);
        stage(1).extract(&oracle, &RecordingSleeper::default(), &batch(&["a"]));

        let prompt = &oracle.calls()[0].prompt;
        assert!(prompt.contains(FEW_SHOT_EXAMPLES[0].input));
        assert!(prompt.contains(FEW_SHOT_EXAMPLES[2].input));
        assert!(!prompt.contains(FEW_SHOT_EXAMPLES[4].input));
    }

    #[test]
    fn fewer_records_than_sentences_is_fine() {
        let oracle = MockOracle::new().then_reply(TWO_RECORDS);
        let result = stage(1).extract(&oracle, &RecordingSleeper::default(), &batch(&["a", "b", "c", "d"]));
        assert_eq!(result.records.len(), 2);
    }

    #[test]
    fn retries_transient_failures_with_linear_backoff() {
        let oracle = MockOracle::new()
            .then_fail(OracleError::RateLimited("429".into()))
            .then_fail(OracleError::ServerError { status: 503, body: String::new() })
            .then_reply(TWO_RECORDS);
        let sleeper = RecordingSleeper::default();

        let result = stage(5).extract(&oracle, &sleeper, &batch(&["a", "b"]));

        assert_eq!(result.records.len(), 2);
        assert_eq!(oracle.call_count(), 3);
        assert_eq!(sleeper.recorded(), vec![Duration::from_secs(15), Duration::from_secs(30)]);
    }

    #[test]
    fn other_failures_wait_two_seconds() {
        let oracle = MockOracle::new()
            .then_fail(OracleError::Other("bad key".into()))
            .then_reply(TWO_RECORDS);
        let sleeper = RecordingSleeper::default();

        stage(5).extract(&oracle, &sleeper, &batch(&["a"]));

        assert_eq!(sleeper.recorded(), vec![Duration::from_secs(2)]);
    }

    #[test]
    fn exhausted_budget_returns_empty() {
        let oracle = MockOracle::new();
        let result = stage(3).extract(&oracle, &RecordingSleeper::default(), &batch(&["a"]));

        assert_eq!(result.status, ExtractionStatus::Exhausted);
        assert!(result.records.is_empty());
        assert_eq!(oracle.call_count(), 3);
    }

    #[test]
    fn malformed_reply_returns_empty_without_retry() {
        let oracle = MockOracle::always(r#"{"unexpected": true}"#);
        let result = stage(5).extract(&oracle, &RecordingSleeper::default(), &batch(&["a", "b"]));

        assert_eq!(result.status, ExtractionStatus::Malformed);
        assert!(result.records.is_empty());
        assert_eq!(oracle.call_count(), 1);
    }

    #[test]
    fn non_json_reply_returns_empty_without_retry() {
        let oracle = MockOracle::always("I could not find any entities.");
        let result = stage(5).extract(&oracle, &RecordingSleeper::default(), &batch(&["a"]));

        assert_eq!(result.status, ExtractionStatus::Malformed);
        assert_eq!(oracle.call_count(), 1);
    }

    #[test]
    fn empty_batch_skips_oracle() {
        let oracle = MockOracle::new();
        let result = stage(5).extract(&oracle, &RecordingSleeper::default(), &[]);
        assert!(result.records.is_empty());
        assert_eq!(oracle.call_count(), 0);
    }

    #[test]
    fn seeded_stages_build_identical_prompts() {
        let config = AnnotationConfig {
            seed: Some(9),
            ..AnnotationConfig::default()
        };
        let a = MockOracle::always(TWO_RECORDS);
        let b = MockOracle::always(TWO_RECORDS);
        let mut stage_a = ExtractionStage::from_config(&config);
        let mut stage_b = ExtractionStage::from_config(&config);
        for _ in 0..3 {
            stage_a.extract(&a, &RecordingSleeper::default(), &batch(&["x"]));
            stage_b.extract(&b, &RecordingSleeper::default(), &batch(&["x"]));
        }
        let prompts_a: Vec<String> = a.calls().into_iter().map(|c| c.prompt).collect();
        let prompts_b: Vec<String> = b.calls().into_iter().map(|c| c.prompt).collect();
        assert_eq!(prompts_a, prompts_b);
    }
}
