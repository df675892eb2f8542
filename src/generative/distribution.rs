use rand::{ Rng, RngCore };

use crate::scalar::Real;


/// Primitive probability distribution that random choices get drawn from.

pub trait Distribution<T: Real> {
  type Value;

  fn random(&self, rng: &mut dyn RngCore) -> Self::Value;

  /// Log-density (or log-mass) of `value`.

  fn logpdf(&self, value: &Self::Value) -> T;
}


/// Discrete distribution over `0..probs.len()`.

#[derive(Debug, Clone, PartialEq)]
pub struct Categorical<T: Real> {
  probs: Vec<T>,
}

impl<T: Real> Categorical<T> {
  /// Panics unless `probs` is a non-empty, non-negative vector summing to one.

  pub fn new(probs: &[T]) -> Self {
    assert!(!probs.is_empty(), "Categorical needs at least one class");
    assert!(probs.iter().all(|&p| p >= T::zero() ),
      "Categorical probabilities must be non-negative, got {:?}", probs);
    let total: T = probs.iter().copied().sum();
    assert!((total - T::one()).abs() < T::from(1e-3).unwrap(),
      "Categorical probabilities sum to {:?}", total);
    Self { probs: probs.to_vec() }
  }

  pub fn num_classes(&self) -> usize {
    self.probs.len()
  }

  pub fn probs(&self) -> &[T] {
    &self.probs
  }
}

impl<T: Real> Distribution<T> for Categorical<T> {
  type Value = usize;

  fn random(&self, rng: &mut dyn RngCore) -> usize {
    let total: T = self.probs.iter().copied().sum();
    let threshold = rng.gen_range(T::zero(), T::one()) * total;
    let mut cumulative = T::zero();
    for (k, &p) in self.probs.iter().enumerate() {
      cumulative += p;
      if threshold < cumulative { return k }
    }
    // Rounding left the draw past the last bucket
    self.probs.iter().rposition(|&p| p > T::zero() ).unwrap_or(0)
  }

  fn logpdf(&self, value: &usize) -> T {
    match self.probs.get(*value) {
      Some(&p) => p.ln(),
      None => T::neg_infinity(),
    }
  }
}


#[cfg(test)]
mod tests {
  use rand::{ SeedableRng, rngs::StdRng };

  use super::*;

  #[test]
  fn logpdf() {
    let dist = Categorical::new(&[0.25, 0.75]);
    assert_eq!(dist.logpdf(&1), 0.75_f64.ln());
    assert_eq!(dist.logpdf(&2), f64::NEG_INFINITY);
  }

  #[test]
  fn degenerate_draws() {
    let dist = Categorical::new(&[0.0, 1.0, 0.0_f32]);
    let mut rng = StdRng::seed_from_u64(1);
    assert!((0..50).all(|_| dist.random(&mut rng) == 1 ));
  }

  #[test]
  fn frequencies() {
    let dist = Categorical::new(&[0.2, 0.5, 0.3]);
    let mut rng = StdRng::seed_from_u64(42);
    let mut counts = [0usize; 3];
    for _ in 0..10_000 {
      counts[dist.random(&mut rng)] += 1;
    }
    assert!((counts[1] as f64 / 10_000.0 - 0.5).abs() < 0.03, "{:?}", counts);
  }

  #[test]
  #[should_panic(expected = "sum to")]
  fn unnormalized() {
    Categorical::new(&[0.5, 0.6]);
  }
}
