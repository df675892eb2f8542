use std::collections::HashSet;
use std::fmt::Debug;

mod mops;
mod session;

pub use session::Session;

use crate::{
  internal::*,
  tensor::Tensor,
  scalar::Real,
  ops::{ BaseOps, NumericOps, Hops },
};


/// Unary computational operation that can also compute its derivative.

pub trait UnaryOp<T: Real>: Debug {
  fn run(&self, lhs: &Tensor<T>) -> Tensor<T>;
  fn derive(&self, lhs: &Tensor<T>, grad: &Tensor<T>) -> Tensor<T>;
}


/// Binary computational operation that can also compute its derivative.

pub trait BinaryOp<T: Real>: Debug {
  fn run(&self, lhs: &Tensor<T>, rhs: &Tensor<T>) -> Tensor<T>;
  fn derive(&self, lhs: &Tensor<T>, rhs: &Tensor<T>, grad: &Tensor<T>) -> (Tensor<T>, Tensor<T>);
}


#[derive(Debug)]
enum Op<T: Real> {
  Unary(Box<dyn UnaryOp<T>>),
  Binary(Box<dyn BinaryOp<T>>),
}


/// Node in a computation graph, containing a [Variable]'s data and gradient,
/// as well as the operation used to create it.

#[derive(Debug)]
struct Node<T: Real> {
  id: usize,
  data: Tensor<T>,
  grad: Option<Tensor<T>>,
  op: Option<Op<T>>,
  previous: Vec<RcT<Self>>,
  trainable: bool,
}

impl<T: Real> Node<T> {
  fn reset_gradient(&self, filler: T) {
    if let Some(grad) = &self.grad {
      grad.refill(filler);
    }
  }

  fn forward(&self) {
    if let Some(op) = &self.op {
      let lhs = &self.previous[0].data;
      let value = match op {
        Op::Unary(op) => op.run(lhs),
        Op::Binary(op) => op.run(lhs, &self.previous[1].data),
      };
      self.data.assign(&value);
    }
  }

  fn backward(&self) {
    if let (Some(op), Some(grad)) = (&self.op, &self.grad) {
      let lhs = &self.previous[0];
      let changes = match op {
        Op::Unary(op) => vec![op.derive(&lhs.data, grad)],
        Op::Binary(op) => {
          let rhs = &self.previous[1];
          let (l, r) = op.derive(&lhs.data, &rhs.data, grad);
          vec![l, r]
        },
      };
      for (change, prev) in changes.iter().zip(self.previous.iter()) {
        if let Some(grad) = &prev.grad {
          grad.assign(&(grad + change));
        }
      }
    }
  }
}


/// Variables track the computational operations used to create them and allow
/// for computing their gradient with respect to all trainable variables involved.
///
/// They get created by calling [tracked](Tensor::tracked) or
/// [trained](Tensor::trained) on any differentiable [Tensor] type.
/// A tracked variable without predecessors acts as a placeholder
/// that can be refilled and re-evaluated through a [Session].
///
/// Variables dereference to their underlying [Tensor] automatically for
/// non-differentiable operations. Differentiable operations, on the other hand,
/// will always return another Variable.

#[derive(Debug, Clone)]
pub struct Variable<T: Real> {
  node: RcT<Node<T>>,
}

impl<T: Real> Hops<T> for Variable<T> {}

impl<T: Real> std::ops::Deref for Variable<T> {
  type Target = Tensor<T>;

  fn deref(&self) -> &Self::Target {
    &self.node.data
  }
}

impl<T: Real> PartialEq for Variable<T> {
  fn eq(&self, rhs: &Self) -> bool {
    self.node.data == rhs.node.data
  }
}

impl<T: Real> Variable<T> {
  pub(crate) fn from_tensor(tensor: Tensor<T>, trainable: bool) -> Self {
    Self {
      node: RcT::new(Node {
        id: make_id(),
        grad: trainable.then(|| Tensor::zeros(&tensor.shape().dims) ),
        data: tensor,
        op: None,
        previous: vec![],
        trainable,
      }),
    }
  }

  fn operation(op: Op<T>, data: Tensor<T>, grad: bool, previous: Vec<RcT<Node<T>>>) -> Self {
    Self {
      node: RcT::new(Node {
        id: make_id(),
        grad: grad.then(|| Tensor::zeros(&data.shape().dims) ),
        data,
        op: Some(op),
        previous,
        trainable: false,
      }),
    }
  }

  pub fn id(&self) -> usize {
    self.node.id
  }

  pub fn tensor(&self) -> &Tensor<T> {
    &self.node.data
  }

  pub fn grad(&self) -> Option<&Tensor<T>> {
    self.node.grad.as_ref()
  }

  pub fn is_trainable(&self) -> bool {
    self.node.trainable
  }

  pub fn unary_op(&self, op: impl UnaryOp<T> + 'static) -> Self {
    let data = op.run(&self.node.data);
    Self::operation(
      Op::Unary(Box::new(op)),
      data,
      self.grad().is_some(),
      vec![self.node.clone()],
    )
  }

  pub fn binary_op(&self, op: impl BinaryOp<T> + 'static, rhs: &Self) -> Self {
    let data = op.run(&self.node.data, &rhs.node.data);
    Self::operation(
      Op::Binary(Box::new(op)),
      data,
      self.grad().is_some() || rhs.grad().is_some(),
      vec![self.node.clone(), rhs.node.clone()],
    )
  }

  /// Reevaluate this Variable's graph to produce a new output.

  pub fn forward(&self) {
    for node in self.history() {
      node.forward();
    }
  }

  /// Compute gradients across this Variable's entire graph.

  pub fn backward(&self) {
    self.backward_with(&Tensor::scalar(T::one()));
  }

  /// Back-propagate `seed` as the gradient of this Variable.
  ///
  /// Gradients of intermediate nodes are cleared first, while those of
  /// trainable parameters keep accumulating until [reset](Self::reset)
  /// or [zero_grad](Self::zero_grad).

  pub fn backward_with(&self, seed: &Tensor<T>) {
    let Some(grad) = self.grad() else {
      panic!("Cannot compute gradients for constant {self}")
    };
    let history = self.history();
    for node in history.iter().filter(|node| !node.trainable ) {
      node.reset_gradient(T::zero());
    }
    grad.assign(&seed.broadcast(grad.shape()));
    for node in history.iter().rev() {
      node.backward();
    }
  }

  /// List all trainable parameters in this Variable's graph.

  pub fn parameters(&self) -> Vec<Self> {
    self.history()
      .into_iter()
      .filter(|node| node.trainable )
      .map(|node| Self { node } )
      .collect()
  }

  /// List all leaf variables without a gradient, ie. constants and placeholders.

  pub fn inputs(&self) -> Vec<Self> {
    self.history()
      .into_iter()
      .filter(|node| node.op.is_none() && !node.trainable )
      .map(|node| Self { node } )
      .collect()
  }

  /// Set gradients to zero for this Variable's entire graph.

  pub fn reset(&self) {
    for node in self.history() {
      node.reset_gradient(T::zero());
    }
  }

  pub fn zero_grad(&self) {
    self.node.reset_gradient(T::zero());
  }

  fn history(&self) -> Vec<RcT<Node<T>>> {
    let mut history = vec![];
    Self::history_recurse(&self.node, &mut history, &mut HashSet::new());
    history
  }

  fn history_recurse(node: &RcT<Node<T>>, history: &mut Vec<RcT<Node<T>>>, visited: &mut HashSet<usize>) {
    if visited.contains(&node.id) { return }
    visited.insert(node.id);
    for prev in &node.previous {
      Self::history_recurse(prev, history, visited);
    }
    history.push(node.clone());
  }

  /// Compute a function's gradient with respect to a given
  /// input numerically and compare it to the automatically derived
  /// solution.
  ///
  /// Returns the largest absolute difference between both gradients.

  pub fn check_gradients<F>(input: &Tensor<T>, generator: F) -> T
  where
    F: Fn(&Self) -> Self
  {
    let eps = T::from(1e-4).unwrap();
    let two = T::from(2.0).unwrap();
    // Compute gradient using auto diff
    let var = input.detach().trained();
    let output = generator(&var).sum(0);
    output.backward();
    let grad = var.grad().unwrap().detach();
    // Compute gradient numerically for every element of input
    let values = input.to_vec();
    let num_grad: Vec<T> = (0..values.len()).map(|i| {
      let shifted = |delta: T| {
        let mut moved = values.clone();
        moved[i] += delta;
        let moved = Tensor::new(&input.shape().dims, moved).tracked();
        generator(&moved).sum(0).item()
      };
      (shifted(eps) - shifted(-eps)) / (two * eps)
    }).collect();
    let num_grad = Tensor::new(&grad.shape().dims, num_grad);
    grad.max_abs_diff(&num_grad)
  }

  pub fn tracked(&self) -> Self { panic!("Tensor is already being tracked") }
  pub fn trained(&self) -> Self { panic!("Tensor is already being tracked") }
}

impl<T: Real> std::fmt::Display for Variable<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    let title = if self.node.trainable {
      "Trainable"
    } else if self.node.grad.is_some() {
      "Computed"
    } else {
      "Tracked"
    };
    write!(f, "{title} {}", self.tensor())
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn x_squared() {
    let x = Tensor::vec(&[3.0, 5.0]).trained();
    let z = &x * &x + 2.0;
    z.backward_with(&Tensor::ones(&[2]));
    assert_eq!(z.tensor(), &Tensor::vec(&[11.0, 27.0]));
    assert_eq!(x.grad(), Some(&Tensor::vec(&[6.0, 10.0])));
  }

  #[test]
  fn accumulates_parameter_gradients() {
    let x = Tensor::vec(&[1.0, 2.0]).trained();
    let y = (&x * 3.0).sum(0);
    y.backward();
    y.backward();
    assert_eq!(x.grad(), Some(&Tensor::vec(&[6.0, 6.0])));
    y.reset();
    assert_eq!(x.grad(), Some(&Tensor::vec(&[0.0, 0.0])));
  }

  #[test]
  fn forward_refills_placeholder() {
    let w = Tensor::vec(&[2.0]).trained();
    let x = Tensor::vec(&[1.0]).tracked();
    let y = &x * &w;
    x.assign(&Tensor::vec(&[4.0]));
    y.forward();
    assert_eq!(y.tensor(), &Tensor::vec(&[8.0]));
    assert_eq!(y.parameters().len(), 1);
    assert_eq!(y.inputs().len(), 1);
  }

  #[test]
  #[should_panic(expected = "Cannot compute gradients")]
  fn constant_backward() {
    Tensor::vec(&[1.0_f64]).tracked().backward();
  }
}
