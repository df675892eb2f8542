use std::ops::{ Sub, Div };

use crate::internal::*;
use crate::Shape;
use crate::scalar::{ Inner, Numeric, Real };


/// Differentiable mid-level operations that are also implemented
/// for non-differentiable [Inner] types.

pub trait BaseOps<I: Inner>: Clone {
  fn scalar(item: I) -> Self;
  fn shape(&self) -> &Shape;
  fn broadcast(&self, shape: &Shape) -> Self;
  fn reshape(&self, dims: &[usize]) -> Self;
  fn unsqueeze(&self, dim: isize) -> Self;
  fn transpose(&self, dim1: isize, dim2: isize) -> Self;

  /// Select one element per row of a matrix, producing a vector.

  fn pick(&self, indices: &[usize]) -> Self;

  fn dim(&self, dim: isize) -> usize {
    self.shape()[dim]
  }
}


/// Differentiable mid-level operations that are also implemented
/// for non-differentiable [Numeric] inner types.

pub trait NumericOps<I: Numeric>: Sized {
  /// Collapse all dimensions from `dim` onward.
  fn sum(&self, dim: isize) -> Self;
  fn max(&self, dim: isize) -> Self;
}


/// Differentiable mid-level operations.

pub trait RealOps<I: Real>: Sized {
  fn mm(&self, rhs: &Self) -> Self;
  fn exp(&self) -> Self;
  fn log(&self) -> Self;
}


/// High-level operations, implemented exclusively on top of
/// the mid-level ones. As a result, these are all
/// differentiable when called on a [Variable](crate::Variable).

pub trait Hops<I: Real>: BaseOps<I> + NumericOps<I> + RealOps<I> + Div<I, Output = Self>
where
  for<'a> &'a Self: Sub<&'a Self, Output = Self> + Div<&'a Self, Output = Self>,
{
  fn mean(&self, dim: isize) -> Self {
    let udim = negative_index(dim, self.shape().rank(), false);
    let n: usize = self.shape().dims[udim..].iter().product();
    self.sum(dim) / I::from(n).unwrap()
  }

  /// Normalized exponentials over the last axis.

  fn softmax(&self) -> Self {
    let exp = (self - &self.max(-1).unsqueeze(-1)).exp();
    &exp / &exp.sum(-1).unsqueeze(-1)
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::Tensor;

  #[test]
  fn mean() {
    let a = Tensor::new(&[3,2], vec![1., 2., 3., 4., 5., 6.]).trained();
    assert_eq!(a.mean(0).tensor(), &Tensor::scalar(3.5));
    assert_eq!(a.mean(-1).tensor(), &Tensor::vec(&[1.5, 3.5, 5.5]));
  }

  #[test]
  fn softmax() {
    let a = Tensor::arrange(&[3,2], 1.0, 1.0).softmax();
    for i in 0..3 {
      assert!((a.at(&[i]).sum(0).item() - 1.0_f64).abs() < 1e-12);
    }
  }

  #[test]
  fn softmax_equal_logits() {
    let a = Tensor::<f32>::zeros(&[4,10]).softmax();
    assert!(a.raw().iter().all(|&p| (p - 0.1).abs() < 1e-6 ));
  }
}
