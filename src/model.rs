use rand::RngCore;

use crate::{
  scalar::Real,
  tensor::Tensor,
  variable::Variable,
  ops::*,
  generative::{ GenerativeFunction, GraphFunction, Trace, ChoiceMap, Address, Categorical, Distribution },
};


/// Pixels per flattened 28×28 MNIST image.
pub const NUM_FEATURES: usize = 784;

/// Digit classes.
pub const NUM_CLASSES: usize = 10;

/// Name of the label choice family, addressed as `("y", i)`.
pub const LABEL: &str = "y";


/// Multinomial logistic regression `softmax(x·W + b)` with
/// zero-initialised `weights` (`num_features × num_classes`) and `bias`.

pub fn softmax_regression<T: Real>(num_features: usize, num_classes: usize) -> GraphFunction<T> {
  GraphFunction::new(vec![
    ("weights", Tensor::zeros(&[num_features, num_classes])),
    ("bias", Tensor::zeros(&[num_classes])),
  ], |x, params| (x.mm(&params[0]) + &params[1]).softmax() )
}


/// Probabilistic program drawing one label per input row from
/// the class probabilities a wrapped [GraphFunction] assigns to it.
///
/// For every sample `i` the label at `("y", i)` is either sampled from
/// `Categorical(p_i)` or, when constrained, taken as given. The score is
/// `Σ_i log p[i, y_i]`, differentiable in the wrapped function's parameters.

#[derive(Debug)]
pub struct LabelModel<T: Real> {
  classifier: GraphFunction<T>,
}

impl<T: Real> LabelModel<T> {
  pub fn new(classifier: GraphFunction<T>) -> Self {
    Self { classifier }
  }

  /// Zero-initialised softmax regression over MNIST sized inputs.

  pub fn mnist() -> Self {
    Self::new(softmax_regression(NUM_FEATURES, NUM_CLASSES))
  }

  pub fn classifier(&self) -> &GraphFunction<T> {
    &self.classifier
  }

  /// Most probable class per input row.

  pub fn classify(&self, x: &Tensor<T>) -> Tensor<usize> {
    self.classifier.run(x).argmax()
  }

  fn probabilities(&self, x: &Tensor<T>) -> Variable<T> {
    let probs = self.classifier.run(x);
    assert_eq!(probs.rank(), 2, "Classifier must return a matrix, got {}", probs.shape());
    assert_eq!(probs.dim(0), x.dim(0),
      "Classifier returned {} rows for {} inputs", probs.dim(0), x.dim(0));
    probs
  }
}

impl<T: Real> GenerativeFunction<T> for LabelModel<T> {
  type Args = Tensor<T>;
  type Output = ();

  fn simulate(&self, x: &Tensor<T>, rng: &mut dyn RngCore) -> Trace<T, Tensor<T>, ()> {
    self.generate(x, &ChoiceMap::new(), rng).0
  }

  fn generate(
    &self,
    x: &Tensor<T>,
    constraints: &ChoiceMap,
    rng: &mut dyn RngCore,
  ) -> (Trace<T, Tensor<T>, ()>, T) {
    let probs = self.probabilities(x);
    let num_classes = probs.dim(-1);
    let mut choices = ChoiceMap::new();
    let mut labels = Vec::with_capacity(probs.dim(0));
    let mut weight = T::zero();
    let mut visited = 0;
    for i in 0..probs.dim(0) {
      let dist = Categorical::new(&probs.at(&[i]).to_vec());
      let address = Address::indexed(LABEL, i);
      let label = match constraints.get(&address) {
        Some(label) => {
          assert!(label < num_classes,
            "Constrained label {label} at {address} outside of {num_classes} classes");
          visited += 1;
          weight += dist.logpdf(&label);
          label
        },
        None => dist.random(rng),
      };
      choices.set(address, label);
      labels.push(label);
    }
    assert_eq!(visited, constraints.len(),
      "{} constrained addresses were never visited", constraints.len() - visited);
    let score = probs.pick(&labels).log().sum(0);
    let trace = Trace::new(x.clone(), choices, (), score.item())
      .with_score_node(score);
    (trace, weight)
  }

  fn parameters(&self) -> Vec<Variable<T>> {
    self.classifier.parameters()
  }
}
