//! Cost and time estimation for an annotation run.
//!
//! Gives a rough figure before committing to a paid run: token volume and
//! price from per-sentence averages, and wall time from the number of
//! extraction requests at a fixed request rate. Correction calls are not
//! included, so the result is a lower bound.

use serde::Serialize;

// ═══════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════

/// Average prompt tokens contributed by one sentence.
const TOKENS_IN_PER_SENTENCE: u64 = 50;

/// Average reply tokens produced for one sentence.
const TOKENS_OUT_PER_SENTENCE: u64 = 50;

/// USD per million input tokens.
const PRICE_IN_PER_MILLION: f64 = 0.30;

/// USD per million output tokens.
const PRICE_OUT_PER_MILLION: f64 = 2.50;

/// Sustained request rate allowed by the oracle.
const REQUESTS_PER_MINUTE: u32 = 60;

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Inputs to [`estimate_generation`]. Defaults match Gemini Flash pricing.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimateParams {
    pub batch_size: usize,
    pub tokens_in_per_sentence: u64,
    pub tokens_out_per_sentence: u64,
    pub price_in_per_million: f64,
    pub price_out_per_million: f64,
    pub requests_per_minute: u32,
}

impl Default for EstimateParams {
    fn default() -> Self {
        Self {
            batch_size: 50,
            tokens_in_per_sentence: TOKENS_IN_PER_SENTENCE,
            tokens_out_per_sentence: TOKENS_OUT_PER_SENTENCE,
            price_in_per_million: PRICE_IN_PER_MILLION,
            price_out_per_million: PRICE_OUT_PER_MILLION,
            requests_per_minute: REQUESTS_PER_MINUTE,
        }
    }
}

/// Estimated cost and duration of annotating a corpus.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationEstimate {
    pub sentences: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// USD.
    pub input_cost: f64,
    /// USD.
    pub output_cost: f64,
    /// Extraction calls only.
    pub requests: u64,
    pub minutes: f64,
}

impl GenerationEstimate {
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    pub fn total_cost(&self) -> f64 {
        self.input_cost + self.output_cost
    }

    pub fn hours(&self) -> f64 {
        self.minutes / 60.0
    }
}

// ═══════════════════════════════════════════════════════════
// Estimation
// ═══════════════════════════════════════════════════════════

/// Estimate tokens, cost and time for `sentences` input sentences.
///
/// Requests: `ceil(sentences / batch_size)`. Time: `requests / rpm` minutes.
pub fn estimate_generation(sentences: usize, params: &EstimateParams) -> GenerationEstimate {
    let n = sentences as u64;
    let batch_size = params.batch_size.max(1) as u64;
    let rpm = params.requests_per_minute.max(1); // avoid division by zero

    let input_tokens = n * params.tokens_in_per_sentence;
    let output_tokens = n * params.tokens_out_per_sentence;
    let requests = n.div_ceil(batch_size);

    GenerationEstimate {
        sentences,
        input_tokens,
        output_tokens,
        input_cost: input_tokens as f64 / 1_000_000.0 * params.price_in_per_million,
        output_cost: output_tokens as f64 / 1_000_000.0 * params.price_out_per_million,
        requests,
        minutes: requests as f64 / f64::from(rpm),
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
