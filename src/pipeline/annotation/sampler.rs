//! Few-shot example selection.
//!
//! Each extraction prompt carries a small random subset of the example pool.
//! The strategy is pluggable so tests can pin the subset.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::prompt::FewShotExample;

/// Picks which few-shot examples go into the next prompt.
pub trait ExampleSampler {
    fn sample<'a>(&mut self, pool: &'a [FewShotExample], count: usize) -> Vec<&'a FewShotExample>;
}

/// Draws without replacement, in random order.
pub struct RandomSampler {
    rng: StdRng,
}

impl RandomSampler {
    /// Seeded sampler; `None` seeds from OS entropy.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }
}

impl ExampleSampler for RandomSampler {
    fn sample<'a>(&mut self, pool: &'a [FewShotExample], count: usize) -> Vec<&'a FewShotExample> {
        pool.choose_multiple(&mut self.rng, count.min(pool.len()))
            .collect()
    }
}

/// Always returns the same pool indices. Out-of-range indices are ignored.
pub struct FixedSampler {
    indices: Vec<usize>,
}

impl FixedSampler {
    pub fn new(indices: Vec<usize>) -> Self {
        Self { indices }
    }

    /// No examples at all.
    pub fn none() -> Self {
        Self::new(Vec::new())
    }
}

impl ExampleSampler for FixedSampler {
    fn sample<'a>(&mut self, pool: &'a [FewShotExample], count: usize) -> Vec<&'a FewShotExample> {
        self.indices
            .iter()
            .filter_map(|&i| pool.get(i))
            .take(count)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::annotation::prompt::FEW_SHOT_EXAMPLES;

    fn inputs(picked: &[&FewShotExample]) -> Vec<&'static str> {
        picked.iter().map(|e| e.input).collect()
    }

    #[test]
    fn random_sampler_respects_count() {
        let mut sampler = RandomSampler::new(Some(7));
        assert_eq!(sampler.sample(FEW_SHOT_EXAMPLES, 2).len(), 2);
        assert_eq!(sampler.sample(FEW_SHOT_EXAMPLES, 0).len(), 0);
    }

    #[test]
    fn random_sampler_caps_at_pool_size() {
        let mut sampler = RandomSampler::new(Some(7));
        let picked = sampler.sample(FEW_SHOT_EXAMPLES, 100);
        assert_eq!(picked.len(), FEW_SHOT_EXAMPLES.len());
    }

    #[test]
    fn random_sampler_never_repeats_within_a_draw() {
        let mut sampler = RandomSampler::new(Some(11));
        for _ in 0..50 {
            let picked = inputs(&sampler.sample(FEW_SHOT_EXAMPLES, 3));
            let mut unique = picked.clone();
            unique.sort_unstable();
            unique.dedup();
            assert_eq!(unique.len(), picked.len());
        }
    }

    #[test]
    fn same_seed_same_sequence() {
        let mut a = RandomSampler::new(Some(42));
        let mut b = RandomSampler::new(Some(42));
        for _ in 0..10 {
            assert_eq!(
                inputs(&a.sample(FEW_SHOT_EXAMPLES, 2)),
                inputs(&b.sample(FEW_SHOT_EXAMPLES, 2))
            );
        }
    }

    #[test]
    fn selection_varies_across_calls() {
        let mut sampler = RandomSampler::new(Some(3));
        let first = inputs(&sampler.sample(FEW_SHOT_EXAMPLES, 2));
        let differs = (0..30).any(|_| inputs(&sampler.sample(FEW_SHOT_EXAMPLES, 2)) != first);
        assert!(differs, "30 draws of 2 from 7 should not all match the first");
    }

    #[test]
    fn fixed_sampler_returns_requested_indices() {
        let mut sampler = FixedSampler::new(vec![4, 0, 99]);
        let picked = sampler.sample(FEW_SHOT_EXAMPLES, 5);
        assert_eq!(inputs(&picked), vec![FEW_SHOT_EXAMPLES[4].input, FEW_SHOT_EXAMPLES[0].input]);
    }

    #[test]
    fn fixed_sampler_respects_count() {
        let mut sampler = FixedSampler::new(vec![1, 2, 3]);
        assert_eq!(sampler.sample(FEW_SHOT_EXAMPLES, 1).len(), 1);
        assert!(FixedSampler::none().sample(FEW_SHOT_EXAMPLES, 2).is_empty());
    }
}
