//! Model pair selection.
//!
//! Picks distinct models from the configured pool uniformly at random,
//! without replacement. The random source is passed in so runs can be
//! reproduced with `--seed` and tests stay deterministic.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::{Error, Result};

/// Number of models compared per issue.
pub const PAIR: usize = 2;

/// Split a comma-separated model list, trimming whitespace and dropping
/// empty entries.
#[must_use]
pub fn parse_model_pool(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from)
        .collect()
}

/// Select `k` distinct models from `pool`.
///
/// Duplicate entries in the pool count once, so a pool like `[a, a, b]`
/// offers two candidates, not three, and `a` is not favoured.
///
/// # Errors
///
/// Returns a configuration error if the pool is empty or holds fewer than
/// `k` distinct models.
pub fn select_models<R: Rng + ?Sized>(pool: &[String], k: usize, rng: &mut R) -> Result<Vec<String>> {
    let mut distinct: Vec<&String> = Vec::with_capacity(pool.len());
    for model in pool {
        if !distinct.contains(&model) {
            distinct.push(model);
        }
    }

    if distinct.is_empty() {
        return Err(Error::Configuration("model pool is empty".to_string()));
    }
    if distinct.len() < k {
        return Err(Error::Configuration(format!(
            "model pool has {} distinct model(s), need at least {k}",
            distinct.len()
        )));
    }

    Ok(distinct
        .choose_multiple(rng, k)
        .map(|m| (*m).clone())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashMap;

    fn pool(models: &[&str]) -> Vec<String> {
        models.iter().map(|m| (*m).to_string()).collect()
    }

    #[test]
    fn test_parse_model_pool() {
        assert_eq!(
            parse_model_pool(" gpt-4o, claude-3-5-sonnet ,,llama "),
            pool(&["gpt-4o", "claude-3-5-sonnet", "llama"])
        );
        assert!(parse_model_pool(" , ").is_empty());
    }

    #[test]
    fn test_selects_two_distinct_members() {
        let models = pool(&["model-A", "model-B", "model-C"]);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..200 {
            let picked = select_models(&models, PAIR, &mut rng).unwrap();
            assert_eq!(picked.len(), 2);
            assert_ne!(picked[0], picked[1]);
            assert!(picked.iter().all(|m| models.contains(m)));
        }
    }

    #[test]
    fn test_selection_is_roughly_uniform() {
        let models = pool(&["a", "b", "c", "d"]);
        let mut rng = StdRng::seed_from_u64(42);
        let mut counts: HashMap<String, usize> = HashMap::new();
        let trials = 20_000;

        for _ in 0..trials {
            for m in select_models(&models, PAIR, &mut rng).unwrap() {
                *counts.entry(m).or_default() += 1;
            }
        }

        // Each model appears in k/n = 1/2 of the pairs.
        let expected = trials / 2;
        for model in &models {
            let seen = counts[model];
            let deviation = seen.abs_diff(expected);
            assert!(deviation < expected / 20, "{model}: {seen} vs {expected}");
        }
    }

    #[test]
    fn test_duplicates_do_not_bias_or_satisfy_count() {
        let mut rng = StdRng::seed_from_u64(1);

        let err = select_models(&pool(&["a", "a"]), PAIR, &mut rng).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let picked = select_models(&pool(&["a", "a", "b"]), PAIR, &mut rng).unwrap();
        assert_ne!(picked[0], picked[1]);
    }

    #[test]
    fn test_empty_pool_is_configuration_error() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = select_models(&[], PAIR, &mut rng).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_same_seed_same_pair() {
        let models = pool(&["a", "b", "c", "d", "e"]);
        let first = select_models(&models, PAIR, &mut StdRng::seed_from_u64(99)).unwrap();
        let second = select_models(&models, PAIR, &mut StdRng::seed_from_u64(99)).unwrap();
        assert_eq!(first, second);
    }
}
