//! Weighted outcome selection shared by the simulated and fallback paths

use rand::Rng;

/// Sum of all weights
pub fn total_weight(weights: &[f64]) -> f64 {
    weights.iter().sum()
}

/// Draw an index with probability proportional to its weight
///
/// Caller guarantees a non-empty slice with a positive total.
pub fn select_outcome<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> usize {
    let total = total_weight(weights);
    let draw = rng.gen::<f64>() * total;
    select_outcome_with_draw(weights, draw)
}

/// Deterministic half of [`select_outcome`] for a draw in `[0, total)`
///
/// Subtracts each weight from the draw and returns the first index where the
/// remainder is `<= 0`; rounding leftovers land on the last index.
pub fn select_outcome_with_draw(weights: &[f64], draw: f64) -> usize {
    let mut remaining = draw;
    for (index, weight) in weights.iter().enumerate() {
        remaining -= weight;
        if remaining <= 0.0 {
            return index;
        }
    }
    weights.len().saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_index_always_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let bets: [&[f64]; 4] = [&[1.0], &[0.5, 0.5], &[0.0, 2.0, 0.0, 1.0], &[1e-9, 3.0, 1e9]];
        for bet in bets {
            for _ in 0..1_000 {
                let index = select_outcome(bet, &mut rng);
                assert!(index < bet.len());
            }
        }
    }

    #[test]
    fn test_single_nonzero_weight_always_wins() {
        let mut rng = StdRng::seed_from_u64(42);
        let bet = [0.0, 0.0, 2.0, 0.0];
        for _ in 0..1_000 {
            assert_eq!(select_outcome(&bet, &mut rng), 2);
        }
    }

    #[test]
    fn test_fixed_draw_is_deterministic() {
        let bet = [3.0, 0.0];
        assert_eq!(select_outcome_with_draw(&bet, 0.0), 0);
        assert_eq!(select_outcome_with_draw(&bet, 2.999), 0);

        let bet = [1.0, 1.0, 1.0];
        assert_eq!(select_outcome_with_draw(&bet, 0.5), 0);
        assert_eq!(select_outcome_with_draw(&bet, 1.0), 0);
        assert_eq!(select_outcome_with_draw(&bet, 1.5), 1);
        assert_eq!(select_outcome_with_draw(&bet, 2.5), 2);
    }

    #[test]
    fn test_draw_past_total_falls_back_to_last_index() {
        assert_eq!(select_outcome_with_draw(&[1.0, 1.0], 5.0), 1);
    }

    #[test]
    fn test_distribution_roughly_follows_weights() {
        let mut rng = StdRng::seed_from_u64(1234);
        let bet = [1.0, 3.0];
        let rounds = 20_000;
        let hits = (0..rounds).filter(|_| select_outcome(&bet, &mut rng) == 1).count();
        let ratio = hits as f64 / rounds as f64;
        assert!((0.70..0.80).contains(&ratio), "ratio was {}", ratio);
    }
}
