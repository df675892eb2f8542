use rand::{ RngCore, seq::index };
use serde::{ Serialize, Deserialize };

use crate::{
  scalar::Real,
  optimize::{ Optimizer, Strategy },
  generative::{ GenerativeFunction, ChoiceMap },
};


/// Source of training examples, each being the arguments of a
/// generative function along with the choices it should reproduce.

pub trait DataGenerator<A> {
  fn next_example(&mut self, rng: &mut dyn RngCore) -> (A, ChoiceMap);
}

impl<A, F> DataGenerator<A> for F
where
  F: FnMut(&mut dyn RngCore) -> (A, ChoiceMap)
{
  fn next_example(&mut self, rng: &mut dyn RngCore) -> (A, ChoiceMap) {
    self(rng)
  }
}


/// Iteration structure of [train].
///
/// Setting every count but `num_epoch` to one reduces training to a
/// flat loop of fetch, trace, gradient and update.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
  pub num_epoch: usize,
  /// Examples drawn from the data generator per epoch.
  pub epoch_size: usize,
  pub num_minibatch: usize,
  /// Distinct examples per minibatch, at most `epoch_size`.
  pub minibatch_size: usize,
  /// Fresh examples the objective gets estimated on after each epoch.
  pub evaluation_size: usize,
}

impl Default for TrainConfig {
  fn default() -> Self {
    Self {
      num_epoch: 10_000,
      epoch_size: 1,
      num_minibatch: 1,
      minibatch_size: 1,
      evaluation_size: 1,
    }
  }
}

impl TrainConfig {
  fn validate(&self) {
    assert!(self.epoch_size > 0 && self.minibatch_size > 0 && self.evaluation_size > 0,
      "Training counts must be positive, got {:?}", self);
    assert!(self.minibatch_size <= self.epoch_size,
      "Minibatch of {} cannot be drawn from an epoch of {}", self.minibatch_size, self.epoch_size);
  }
}


/// Fit the parameters of `gen_fn` by stochastic gradient ascent on the
/// log-probability of the choices produced by `data`.
///
/// Every minibatch runs [generate](GenerativeFunction::generate) under each
/// example's observed choices, accumulates the score gradient averaged over
/// the minibatch and lets `optimizer` apply it. After each epoch the mean
/// importance weight on fresh examples gets recorded as an estimate of the
/// expected conditional log-likelihood, reported to `callback` and returned.

pub fn train<T, G, D, S>(
  gen_fn: &G,
  data: &mut D,
  optimizer: &mut Optimizer<T, S>,
  config: &TrainConfig,
  rng: &mut dyn RngCore,
  mut callback: impl FnMut(usize, T),
) -> Vec<T>
where
  T: Real,
  G: GenerativeFunction<T>,
  D: DataGenerator<G::Args>,
  S: Strategy<T>,
{
  config.validate();
  let params = gen_fn.parameters();
  let scale = T::one() / T::from(config.minibatch_size).unwrap();
  let mut scores = Vec::with_capacity(config.num_epoch);

  for epoch in 0..config.num_epoch {
    // Gather this epoch's examples
    let examples: Vec<_> = (0..config.epoch_size)
      .map(|_| data.next_example(rng) )
      .collect();

    for minibatch in 0..config.num_minibatch {
      let picked = index::sample(rng, config.epoch_size, config.minibatch_size);
      for i in picked.iter() {
        let (args, constraints) = &examples[i];
        let (trace, _) = gen_fn.generate(args, constraints, rng);
        trace.accumulate_param_gradients(None, scale);
      }
      optimizer.apply(&params);
      log::debug!("Epoch {epoch}, minibatch {minibatch} applied");
    }

    // Estimate the objective on fresh data
    let total = (0..config.evaluation_size)
      .map(|_| {
        let (args, constraints) = data.next_example(rng);
        gen_fn.generate(&args, &constraints, rng).1
      })
      .fold(T::zero(), |acc, weight| acc + weight );
    let score = total / T::from(config.evaluation_size).unwrap();
    if !score.is_finite() {
      log::warn!("Epoch {epoch}: objective is {score:?}");
    }
    log::info!("Epoch {epoch}: objective {score:?}");
    callback(epoch, score);
    scores.push(score);
  }

  scores
}


#[cfg(test)]
mod tests {
  use rand::{ SeedableRng, rngs::StdRng };

  use super::*;
  use crate::{
    tensor::Tensor,
    ops::*,
    data::{ Dataset, LabeledBatches, label_choices },
    model::LabelModel,
    optimize::FixedStep,
    generative::GraphFunction,
    model::softmax_regression,
  };

  fn toy_model() -> LabelModel<f64> {
    LabelModel::new(softmax_regression(6, 3))
  }

  #[test]
  fn update_changes_parameters() {
    let model = toy_model();
    let dataset = Dataset::synthetic(10, 6, 3, &mut StdRng::seed_from_u64(4));
    let mut data = LabeledBatches::new(&dataset, 5);
    let mut optimizer = Optimizer::new(1e-5, FixedStep);
    let config = TrainConfig { num_epoch: 1, ..TrainConfig::default() };
    let before: Vec<Tensor<f64>> = model.parameters().iter().map(|p| p.tensor().detach() ).collect();
    train(&model, &mut data, &mut optimizer, &config, &mut StdRng::seed_from_u64(0), |_, _| {});
    let changed = model.parameters().iter()
      .zip(&before)
      .any(|(param, old)| param.tensor() != old );
    assert!(changed);
  }

  #[test]
  fn records_each_epoch() {
    let model = toy_model();
    let dataset = Dataset::synthetic(30, 6, 3, &mut StdRng::seed_from_u64(4));
    let mut data = LabeledBatches::new(&dataset, 4);
    let mut optimizer = Optimizer::new(0.1, FixedStep);
    let config = TrainConfig {
      num_epoch: 3,
      epoch_size: 4,
      num_minibatch: 2,
      minibatch_size: 2,
      evaluation_size: 2,
    };
    let mut seen = vec![];
    let scores = train(&model, &mut data, &mut optimizer, &config,
      &mut StdRng::seed_from_u64(0), |epoch, score| seen.push((epoch, score)) );
    assert_eq!(scores.len(), 3);
    assert_eq!(seen.iter().map(|&(e, _)| e ).collect::<Vec<_>>(), vec![0, 1, 2]);
    assert!(scores.iter().all(|s| s.is_finite() && *s <= 0.0 ));
    assert_eq!(optimizer.step(), 7);
  }

  #[test]
  fn first_score_is_uniform_likelihood() {
    // Zero step keeps the model at its uniform initialization
    let model = toy_model();
    let mut data = |_: &mut dyn RngCore| {
      (Tensor::<f64>::ones(&[4, 6]), label_choices(&[0, 1, 2, 0]))
    };
    let mut optimizer = Optimizer::new(0.0, FixedStep);
    let config = TrainConfig { num_epoch: 2, ..TrainConfig::default() };
    let scores = train(&model, &mut data, &mut optimizer, &config, &mut StdRng::seed_from_u64(0), |_, _| {});
    for score in scores {
      assert!((score - 4.0 * (1.0_f64 / 3.0).ln()).abs() < 1e-9);
    }
  }

  #[test]
  fn gradients_average_over_minibatch() {
    // Identical examples make the averaged gradient equal a single one
    let single = GraphFunction::new(vec![("bias", Tensor::<f64>::zeros(&[2]))], |x, p| (x + &p[0]).softmax() );
    let model = LabelModel::new(single);
    let mut data = |_: &mut dyn RngCore| (Tensor::<f64>::zeros(&[1, 2]), label_choices(&[1]));
    let mut optimizer = Optimizer::new(1.0, FixedStep);
    let config = TrainConfig { num_epoch: 1, epoch_size: 3, minibatch_size: 3, ..TrainConfig::default() };
    train(&model, &mut data, &mut optimizer, &config, &mut StdRng::seed_from_u64(0), |_, _| {});
    let bias = model.classifier().parameter("bias").unwrap();
    assert!((bias.tensor().to_vec()[1] - 0.5).abs() < 1e-12);
    assert!((bias.tensor().to_vec()[0] + 0.5).abs() < 1e-12);
  }

  #[test]
  #[should_panic(expected = "cannot be drawn")]
  fn oversized_minibatch() {
    let model = toy_model();
    let mut data = |_: &mut dyn RngCore| (Tensor::<f64>::ones(&[1, 6]), label_choices(&[0]));
    let config = TrainConfig { minibatch_size: 2, ..TrainConfig::default() };
    train(&model, &mut data, &mut Optimizer::new(0.1, FixedStep), &config, &mut StdRng::seed_from_u64(0), |_, _| {});
  }
}
