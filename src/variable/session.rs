use itertools::Itertools;

use crate::{
  internal::*,
  ops::BaseOps,
  scalar::Real,
  variable::{ Variable, Node },
  Tensor,
};


/// Traced computation graph with designated placeholder inputs and outputs.
///
/// Running a session refills the placeholders with new data and
/// re-evaluates every node that leads to the outputs, leaving
/// the results in the output variables.

#[derive(Debug, Clone)]
pub struct Session<T: Real> {
  inputs: Vec<Variable<T>>,
  outputs: Vec<Variable<T>>,
}

impl<T: Real> Session<T> {
  pub fn new(inputs: &[Variable<T>], outputs: &[Variable<T>]) -> Self {
    for input in inputs {
      assert!(input.node.op.is_none() && !input.is_trainable(),
        "Session inputs must be tracked placeholders, got {input}");
    }
    Self {
      inputs: inputs.to_vec(),
      outputs: outputs.to_vec(),
    }
  }

  pub fn inputs(&self) -> &[Variable<T>] {
    &self.inputs
  }

  pub fn outputs(&self) -> &[Variable<T>] {
    &self.outputs
  }

  /// Feed new data into the placeholders and recompute all outputs.
  ///
  /// Panics when the number of feeds or any of their shapes differs
  /// from the placeholders the session was traced with.

  pub fn run(&self, feeds: &[&Tensor<T>]) -> &[Variable<T>] {
    assert_eq!(self.inputs.len(), feeds.len(),
      "Session expects {} inputs, got {}", self.inputs.len(), feeds.len());
    for (input, data) in self.inputs.iter().zip(feeds) {
      assert_eq!(input.shape().dims, data.shape().dims,
        "Placeholder is {}, fed {}", input.shape(), data.shape());
      input.assign(data);
    }
    for node in self.history() {
      node.forward();
    }
    &self.outputs
  }

  /// Trainable variables reachable from any output.

  pub fn parameters(&self) -> Vec<Variable<T>> {
    self.history()
      .into_iter()
      .filter(|node| node.trainable )
      .map(|node| Variable { node } )
      .collect()
  }

  fn history(&self) -> Vec<RcT<Node<T>>> {
    let mut history = self.outputs
      .iter()
      .map(|out| out.history() )
      .collect::<Vec<_>>()
      .concat();
    // Ids grow with creation, so sorting yields a topological order
    history.sort_by_key(|node| node.id );
    history.into_iter().unique_by(|node| node.id ).collect()
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::ops::*;

  #[test]
  fn rerun_with_new_input() {
    let w = Tensor::new(&[2,1], vec![1.0, 2.0]).trained();
    let x = Tensor::<f64>::zeros(&[1,2]).tracked();
    let y = x.mm(&w) + 1.0;
    let session = Session::new(&[x], &[y.clone()]);
    session.run(&[&Tensor::new(&[1,2], vec![3.0, 4.0])]);
    assert_eq!(y.tensor(), &Tensor::new(&[1,1], vec![12.0]));
    assert_eq!(session.parameters().len(), 1);
  }

  #[test]
  fn shared_nodes_run_once() {
    let x = Tensor::vec(&[1.0, 2.0]).tracked();
    let a = &x * 2.0;
    let b = a.sum(0);
    let c = &a - 1.0;
    let session = Session::new(&[x], &[b.clone(), c.clone()]);
    let outputs = session.run(&[&Tensor::vec(&[5.0, 6.0])]);
    assert_eq!(outputs[0].item(), 22.0);
    assert_eq!(c.tensor(), &Tensor::vec(&[9.0, 11.0]));
  }

  #[test]
  #[should_panic(expected = "Placeholder is")]
  fn wrong_feed_shape() {
    let x = Tensor::<f32>::zeros(&[2]).tracked();
    let y = x.exp();
    Session::new(&[x], &[y]).run(&[&Tensor::zeros(&[3])]);
  }
}
