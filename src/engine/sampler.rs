//! Uniform random capping of enumerated resource collections.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

/// Draw `min(items.len(), cap)` elements uniformly without replacement.
///
/// Each round picks a random index among the not-yet-picked elements, moves
/// that element into the result and swaps the last unpicked element into the
/// vacated slot. When `cap >= items.len()` every item is returned.
pub fn sample<T, R>(mut items: Vec<T>, cap: usize, rng: &mut R) -> Vec<T>
where
    R: Rng + ?Sized,
{
    if cap >= items.len() {
        return items;
    }

    let mut picked = Vec::with_capacity(cap);
    for _ in 0..cap {
        let idx = rng.gen_range(0..items.len());
        picked.push(items.swap_remove(idx));
    }
    picked
}

/// Result of passing a population through a [`Sampler`].
#[derive(Debug, Clone)]
pub struct Sampled<T> {
    pub items: Vec<T>,
    /// Size of the population before capping.
    pub population: usize,
}

impl<T> Sampled<T> {
    pub fn was_capped(&self) -> bool {
        self.items.len() < self.population
    }
}

/// Seedable sampler applying one cap to every resource family.
#[derive(Debug)]
pub struct Sampler {
    cap: usize,
    rng: StdRng,
}

impl Sampler {
    /// A fixed `seed` makes every draw reproducible.
    pub fn new(cap: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { cap, rng }
    }

    pub fn sample<T>(&mut self, resource: &str, items: Vec<T>) -> Sampled<T> {
        let population = items.len();
        if population > self.cap {
            info!(
                resource,
                population,
                cap = self.cap,
                "Population exceeds sampling cap, selecting a random subset"
            );
        }
        Sampled {
            items: sample(items, self.cap, &mut self.rng),
            population,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("snap-{i:04}")).collect()
    }

    #[test]
    fn test_sample_caps_length() {
        let mut rng = StdRng::seed_from_u64(7);
        let picked = sample(ids(250), 100, &mut rng);
        assert_eq!(picked.len(), 100);
        let distinct: HashSet<_> = picked.iter().collect();
        assert_eq!(distinct.len(), 100);
    }

    #[test]
    fn test_sample_zero_cap_is_empty() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(sample(ids(10), 0, &mut rng).is_empty());
    }

    #[test]
    fn test_sample_cap_above_len_returns_everything() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut picked = sample(ids(5), 100, &mut rng);
        picked.sort();
        assert_eq!(picked, ids(5));
    }

    #[test]
    fn test_sample_is_deterministic_for_seed() {
        let a = sample(ids(50), 10, &mut StdRng::seed_from_u64(42));
        let b = sample(ids(50), 10, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_every_element_reachable() {
        // With cap 1 over 4 items, enough seeded draws hit each element.
        let mut rng = StdRng::seed_from_u64(99);
        let mut seen = HashSet::new();
        for _ in 0..200 {
            seen.extend(sample(ids(4), 1, &mut rng));
        }
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn test_sampler_reports_population() {
        let mut sampler = Sampler::new(3, Some(5));
        let sampled = sampler.sample("buckets", ids(8));
        assert_eq!(sampled.population, 8);
        assert_eq!(sampled.items.len(), 3);
        assert!(sampled.was_capped());

        let small = sampler.sample("buckets", ids(2));
        assert!(!small.was_capped());
    }
}
