use std::collections::HashMap;

use crate::{
  scalar::Real,
  tensor::Tensor,
  variable::Variable,
  ops::BaseOps,
};


/// An update strategy to be used with [Optimizer].
///
/// Strategies turn a parameter's accumulated gradient into the change
/// that gets added to it. All strategies ascend, so the objective the
/// gradient was taken of is expected to increase.

pub trait Strategy<R: Real>: std::fmt::Debug {
  fn update(&mut self, param: &Variable<R>, rate: R, step: usize) -> Tensor<R>;
}

impl<R: Real> Strategy<R> for Box<dyn Strategy<R>> {
  fn update(&mut self, param: &Variable<R>, rate: R, step: usize) -> Tensor<R> {
    (**self).update(param, rate, step)
  }
}


/// Generic optimizer that allows for several update [strategies](Strategy) to be used.

#[derive(Debug)]
pub struct Optimizer<R: Real, S: Strategy<R>> {
  strategy: S,
  pub learning_rate: R,
  step: usize,
}

impl<R: Real, S: Strategy<R>> Optimizer<R, S> {
  pub fn new(learning_rate: R, strategy: S) -> Self {
    Self { strategy, learning_rate, step: 1 }
  }

  /// Number of updates applied so far, plus one.

  pub fn step(&self) -> usize {
    self.step
  }

  /// Move every parameter along its accumulated gradient, then
  /// clear the gradients.

  pub fn apply(&mut self, params: &[Variable<R>]) {
    for param in params {
      assert!(param.is_trainable(), "Non-trainable variables cannot be optimized");

      // Execute strategy
      let change = self.strategy.update(param, self.learning_rate, self.step);

      // Apply change
      let weights = param.tensor();
      weights.assign(&(weights + change));
      param.zero_grad();
    }
    self.step += 1;
  }

  /// Back-propagate `objective` and take one ascending step on `params`.

  pub fn maximize(&mut self, objective: &Variable<R>, params: &[Variable<R>]) {
    objective.backward();
    self.apply(params);
  }
}


fn gradient<R: Real>(param: &Variable<R>) -> &Tensor<R> {
  param.grad().expect("Trainable variables always carry a gradient")
}


/// Plain gradient ascent with a fixed step size.

#[derive(Debug, Clone, Default)]
pub struct FixedStep;

impl<R: Real> Strategy<R> for FixedStep {
  fn update(&mut self, param: &Variable<R>, rate: R, _step: usize) -> Tensor<R> {
    gradient(param) * rate
  }
}


/// Gradient ascent with a step size that decays as `rate * (beta + 1) / (beta + t)`.

#[derive(Debug, Clone)]
pub struct Decaying<R: Real> {
  pub beta: R,
}

impl<R: Real> Decaying<R> {
  pub fn new(beta: R) -> Self {
    Self { beta }
  }
}

impl<R: Real> Default for Decaying<R> {
  fn default() -> Self {
    Self::new(R::from(1000.0).unwrap())
  }
}

impl<R: Real> Strategy<R> for Decaying<R> {
  fn update(&mut self, param: &Variable<R>, rate: R, step: usize) -> Tensor<R> {
    let step = R::from(step).unwrap();
    gradient(param) * (rate * (self.beta + R::one()) / (self.beta + step))
  }
}


/// Adaptive Movement Estimation strategy (ADAM)

#[derive(Debug, Clone)]
pub struct Adam<R: Real> {
  pub beta1: R,
  pub beta2: R,
  m: HashMap<usize, Tensor<R>>,
  v: HashMap<usize, Tensor<R>>,
}

impl<R: Real> Adam<R> {
  pub fn new(beta1: R, beta2: R) -> Self {
    Self {
      beta1,
      beta2,
      m: HashMap::new(),
      v: HashMap::new(),
    }
  }
}

impl<R: Real> Default for Adam<R> {
  fn default() -> Self {
    Self::new(R::from(0.9).unwrap(), R::from(0.999).unwrap())
  }
}

impl<R: Real> Strategy<R> for Adam<R> {
  fn update(&mut self, param: &Variable<R>, rate: R, step: usize) -> Tensor<R> {
    let id = param.id();
    let grad = gradient(param);
    let shape = &param.shape().dims;
    let m = self.m.entry(id).or_insert_with(|| Tensor::zeros(shape) );
    m.assign(&(&*m * self.beta1 + grad * (R::one() - self.beta1)));
    let v = self.v.entry(id).or_insert_with(|| Tensor::zeros(shape) );
    v.assign(&(&*v * self.beta2 + grad.vectorize(|g| g * g ) * (R::one() - self.beta2)));
    let step = R::from(step).unwrap();
    let mt = &self.m[&id] / (R::one() - self.beta1.powf(step));
    let vt = &self.v[&id] / (R::one() - self.beta2.powf(step));
    let eps = R::from(1e-8).unwrap();
    mt * rate / vt.vectorize(|a| a.sqrt() + eps )
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::ops::*;

  #[test]
  fn fixed_step_ascends() {
    let x = Tensor::vec(&[1.0, -2.0]).trained();
    let mut optimizer = Optimizer::new(0.5, FixedStep);
    optimizer.maximize(&(&x * 2.0).sum(0), &[x.clone()]);
    assert_eq!(x.tensor(), &Tensor::vec(&[2.0, -1.0]));
    assert_eq!(x.grad(), Some(&Tensor::vec(&[0.0, 0.0])));
    assert_eq!(optimizer.step(), 2);
  }

  #[test]
  fn decaying_step_shrinks() {
    let x = Tensor::vec(&[0.0_f64]).trained();
    let mut optimizer = Optimizer::new(1.0, Decaying::new(1.0));
    optimizer.maximize(&x.sum(0), &[x.clone()]);
    assert_eq!(x.item(), 1.0);
    optimizer.maximize(&x.sum(0), &[x.clone()]);
    assert!((x.item() - (1.0 + 2.0 / 3.0)).abs() < 1e-12);
  }

  #[test]
  fn adam_climbs_concave_objective() {
    let x = Tensor::vec(&[0.0_f64]).trained();
    let mut optimizer: Optimizer<f64, Box<dyn Strategy<f64>>> =
      Optimizer::new(0.1, Box::new(Adam::default()));
    for _ in 0..200 {
      // Maximum at x = 3
      let objective = -((&x - 3.0) * (&x - 3.0)).sum(0);
      optimizer.maximize(&objective, &[x.clone()]);
    }
    assert!((x.item() - 3.0).abs() < 0.2, "{}", x.item());
  }
}
