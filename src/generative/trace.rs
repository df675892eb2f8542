use crate::{
  scalar::Real,
  tensor::Tensor,
  variable::Variable,
  ops::BaseOps,
  generative::ChoiceMap,
};


/// Record of a single execution of a generative function.
///
/// Holds the arguments, every random choice made, the return value and
/// the log-probability (score) of those choices. Traces are read-only
/// once created.
///
/// A trace keeps the differentiable nodes its score and return value were
/// computed from, which allows gradients to flow back into the trainable
/// parameters involved. These nodes live in the producing function's
/// graph, so gradients should be accumulated before that function
/// is invoked again.

#[derive(Debug, Clone)]
pub struct Trace<T: Real, A, O> {
  args: A,
  choices: ChoiceMap,
  retval: O,
  score: T,
  score_node: Option<Variable<T>>,
  retval_node: Option<Variable<T>>,
}

impl<T: Real, A, O> Trace<T, A, O> {
  pub fn new(args: A, choices: ChoiceMap, retval: O, score: T) -> Self {
    Self {
      args,
      choices,
      retval,
      score,
      score_node: None,
      retval_node: None,
    }
  }

  /// Attach the differentiable scalar this trace's score was read from.

  pub fn with_score_node(mut self, node: Variable<T>) -> Self {
    assert_eq!(node.size(), 1, "Score node must be a scalar, got {}", node.shape());
    self.score_node = Some(node);
    self
  }

  /// Attach the differentiable node the return value was read from.

  pub fn with_retval_node(mut self, node: Variable<T>) -> Self {
    self.retval_node = Some(node);
    self
  }

  pub fn args(&self) -> &A {
    &self.args
  }

  pub fn choices(&self) -> &ChoiceMap {
    &self.choices
  }

  pub fn retval(&self) -> &O {
    &self.retval
  }

  pub fn into_retval(self) -> O {
    self.retval
  }

  /// Log-probability of all random choices in this trace.

  pub fn score(&self) -> T {
    self.score
  }

  /// Add `scale` times the gradient of the score, plus `scale` times
  /// the vector-Jacobian product of `retval_grad` with the return value,
  /// onto the gradients of all trainable parameters involved.

  pub fn accumulate_param_gradients(&self, retval_grad: Option<&Tensor<T>>, scale: T) {
    if let Some(node) = self.score_node.as_ref().filter(|node| node.grad().is_some() ) {
      node.backward_with(&Tensor::scalar(scale));
    }
    if let Some(grad) = retval_grad {
      let node = self.retval_node.as_ref()
        .expect("Trace has no differentiable return value");
      node.backward_with(&(grad * scale));
    }
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::ops::*;

  #[test]
  fn score_gradient_scaled() {
    let w = Tensor::vec(&[1.0, 2.0]).trained();
    let score = (&w * &w).sum(0);
    let trace = Trace::new((), ChoiceMap::new(), (), score.item())
      .with_score_node(score);
    trace.accumulate_param_gradients(None, 0.5);
    trace.accumulate_param_gradients(None, 0.5);
    assert_eq!(trace.score(), 5.0);
    assert_eq!(w.grad(), Some(&Tensor::vec(&[2.0, 4.0])));
  }

  #[test]
  fn retval_gradient() {
    let w = Tensor::vec(&[1.0, 2.0]).trained();
    let out = &w * 3.0;
    let trace = Trace::new((), ChoiceMap::new(), out.tensor().detach(), 0.0)
      .with_retval_node(out);
    trace.accumulate_param_gradients(Some(&Tensor::vec(&[1.0, -1.0])), 2.0);
    assert_eq!(w.grad(), Some(&Tensor::vec(&[6.0, -6.0])));
  }
}
