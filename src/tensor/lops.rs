use crate::{
  shape::Shape,
  tensor::{ Tensor, cops::Cops },
  scalar::{ Inner, Numeric, Real },
  ops::{ BaseOps, NumericOps, RealOps },
};


impl<T: Inner> BaseOps<T> for Tensor<T> {
  fn scalar(item: T) -> Self {
    Self::new(&[], vec![item])
  }

  fn shape(&self) -> &Shape {
    &self.shape
  }

  fn broadcast(&self, shape: &Shape) -> Self {
    Self {
      shape: self.shape.broadcast(shape),
      data: self.data.clone(),
    }
  }

  fn reshape(&self, dims: &[usize]) -> Self {
    let this = self.contiguous();
    Self { shape: this.shape.view(dims), data: this.data }
  }

  fn unsqueeze(&self, dim: isize) -> Self {
    let shape = self.shape.unsqueeze(dim);
    let data = self.data.clone();
    Self { shape, data }
  }

  fn transpose(&self, dim1: isize, dim2: isize) -> Self {
    let shape = self.shape.transpose(dim1, dim2);
    let data = self.data.clone();
    Self { shape, data }
  }

  fn pick(&self, indices: &[usize]) -> Self {
    assert_eq!(self.rank(), 2, "Can only pick from matrices, got {}", self.shape);
    assert_eq!(self.shape[0], indices.len(),
      "Got {} indices for {} rows", indices.len(), self.shape[0]);
    let data = indices.iter()
      .enumerate()
      .map(|(row, &col)| {
        assert!(col < self.shape[1], "Column {} out of bounds for {}", col, self.shape);
        self.raw()[self.shape.index(&[row, col])]
      })
      .collect();
    Self::new(&[indices.len()], data)
  }
}

impl<T: Numeric> NumericOps<T> for Tensor<T> {
  fn sum(&self, dim: isize) -> Self {
    self.collapse(dim, |values| values.iter().copied().sum() )
  }

  fn max(&self, dim: isize) -> Self {
    self.collapse(dim, |values| {
      values.iter()
        .copied()
        .reduce(|a, b| if b > a { b } else { a } )
        .expect("Cannot take the maximum of an empty dimension")
    })
  }
}

impl<T: Real> RealOps<T> for Tensor<T> {
  fn mm(&self, rhs: &Self) -> Self {
    assert!(self.rank() == 2 && rhs.rank() == 2,
      "Matrix multiply expects two matrices, got {} & {}", self.shape, rhs.shape);
    let data = self.matmul(rhs);
    Self::new(&[self.shape[0], rhs.shape[1]], data)
  }

  fn exp(&self) -> Self {
    self.vectorize(|a| a.exp() )
  }

  fn log(&self) -> Self {
    self.vectorize(|a| a.ln() )
  }
}

impl<T: Numeric + std::ops::Neg<Output = T>> std::ops::Neg for &Tensor<T> {
  type Output = Tensor<T>;

  fn neg(self) -> Self::Output {
    self.vectorize(|a| -a )
  }
}

impl<T: Numeric + std::ops::Neg<Output = T>> std::ops::Neg for Tensor<T> {
  type Output = Tensor<T>;

  fn neg(self) -> Self::Output {
    -&self
  }
}

macro_rules! add_operator {
  ($trait:ident, $meth:ident, $symbol:tt) => {
    impl<T: Numeric> std::ops::$trait for &Tensor<T> { // &self * &other
      type Output = Tensor<T>;

      fn $meth(self, rhs: Self) -> Tensor<T> {
        Tensor::$meth(self, rhs)
      }
    }

    impl<T: Numeric> std::ops::$trait for Tensor<T> { // tensor * other
      type Output = Tensor<T>;

      fn $meth(self, rhs: Self) -> Tensor<T> {
        &self $symbol &rhs
      }
    }

    impl<T: Numeric> std::ops::$trait<Tensor<T>> for &Tensor<T> { // &tensor * other
      type Output = Tensor<T>;

      fn $meth(self, rhs: Tensor<T>) -> Tensor<T> {
        self $symbol &rhs
      }
    }

    impl<T: Numeric> std::ops::$trait<&Tensor<T>> for Tensor<T> { // tensor * &other
      type Output = Tensor<T>;

      fn $meth(self, rhs: &Tensor<T>) -> Tensor<T> {
        &self $symbol rhs
      }
    }

    impl<T: Numeric> std::ops::$trait<T> for &Tensor<T> { // &tensor * T
      type Output = Tensor<T>;

      fn $meth(self, rhs: T) -> Tensor<T> {
        self $symbol &Tensor::scalar(rhs)
      }
    }

    impl<T: Numeric> std::ops::$trait<T> for Tensor<T> { // tensor * T
      type Output = Tensor<T>;

      fn $meth(self, rhs: T) -> Tensor<T> {
        &self $symbol &Tensor::scalar(rhs)
      }
    }
  };
}

add_operator!(Add, add, +);
add_operator!(Sub, sub, -);
add_operator!(Mul, mul, *);
add_operator!(Div, div, /);


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sum() {
    let a = Tensor::new(&[3,2], vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(a.sum(0), Tensor::new(&[], vec![21]));
    assert_eq!(a.sum(-1), Tensor::new(&[3], vec![3, 7, 11]));
  }

  #[test]
  fn sum_empty() {
    let a = Tensor::<i32>::zeros(&[0,4]);
    assert_eq!(a.sum(-1), Tensor::new(&[0], vec![]));
    assert_eq!(a.sum(0), Tensor::new(&[], vec![0]));
    assert_eq!(Tensor::<i32>::zeros(&[2,0]).sum(-1), Tensor::vec(&[0, 0]));
  }

  #[test]
  fn max() {
    let a = Tensor::new(&[2,3], vec![1, 9, 3, 4, 2, 6]);
    assert_eq!(a.max(-1), Tensor::vec(&[9, 6]));
  }

  #[test]
  fn pick() {
    let a = Tensor::new(&[3,2], vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(a.pick(&[1, 0, 1]), Tensor::vec(&[2, 3, 6]));
  }

  #[test]
  fn reshape_transposed() {
    let a = Tensor::new(&[2,3], vec![1, 2, 3, 4, 5, 6]).transpose(0, 1);
    assert_eq!(a.reshape(&[6]), Tensor::vec(&[1, 4, 2, 5, 3, 6]));
  }

  #[test]
  fn scalar_operators() {
    let a = Tensor::vec(&[1.0, 2.0]);
    assert_eq!(&a * 2.0 - 1.0, Tensor::vec(&[1.0, 3.0]));
    assert_eq!(-&a, Tensor::vec(&[-1.0, -2.0]));
  }
}
