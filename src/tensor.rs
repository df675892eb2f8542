use std::rc::Rc;
use std::cell::{ Ref, RefMut, RefCell };

use rand::{ Rng, RngCore };
use serde::{ Serialize, Deserialize };

mod cops;
mod lops;

use crate::{
  internal::*,
  shape::Shape,
  variable::Variable,
  scalar::{ Inner, Numeric, Real },
  ops::{ BaseOps, Hops },
};


/// Multidimensional array.
///
/// Tensors may contain any type that satisfies [Inner], but
/// additional methods are available for [Numeric] and [Real]
/// inner types. Clones and views share storage, so [assign](Tensor::assign)
/// is visible through every handle.
///
/// [Real] tensor types can be wrapped in a [Variable] by
/// calling [tracked](Tensor::tracked) or [trained](Tensor::trained).

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tensor<T: Inner> {
  shape: Shape,
  data: Rc<RefCell<Vec<T>>>,
}

impl<T: Real> Hops<T> for Tensor<T> {}

impl<T: Inner> PartialEq for Tensor<T> {
  fn eq(&self, rhs: &Self) -> bool {
    if self.shape.dims != rhs.shape.dims { return false }
    self.param_iter().zip(rhs.param_iter()).all(|(a, b)| a == b )
  }
}

impl<T: Inner> Tensor<T> {
  pub fn from_shape(shape: Shape, data: Vec<T>) -> Self {
    assert_eq!(shape.size(), data.len(),
      "{} doesn't match data length {}", shape, data.len());
    Self { shape, data: Rc::new(RefCell::new(data)) }
  }

  pub fn new(shape: &[usize], data: Vec<T>) -> Self {
    Self::from_shape(Shape::new(shape), data)
  }

  pub fn vec(vec: &[T]) -> Self {
    Self::new(&[vec.len()], vec.to_vec())
  }

  pub fn fill(shape: &[usize], filler: T) -> Self {
    Self::new(shape, vec![filler; shape.iter().product()])
  }

  pub fn raw(&self) -> Ref<Vec<T>> {
    self.data.borrow()
  }

  pub(crate) fn raw_mut(&self) -> RefMut<Vec<T>> {
    self.data.borrow_mut()
  }

  pub fn to_vec(&self) -> Vec<T> {
    self.param_iter().collect()
  }

  pub fn size(&self) -> usize {
    self.shape.size()
  }

  pub fn rank(&self) -> usize {
    self.shape.rank()
  }

  pub fn shared_with(&self, other: &Self) -> bool {
    Rc::ptr_eq(&self.data, &other.data)
  }

  /// Overwrite this tensor's elements in place.
  ///
  /// Panics when the shapes differ.

  pub fn assign(&self, other: &Self) {
    assert!(self.shape.dims == other.shape.dims,
      "Could not assign {} tensor to {} tensor", other.shape, self.shape);
    // Avoid clashing borrow when tensors share storage
    let other = if self.shared_with(other) {
      other.detach()
    } else {
      other.clone()
    };
    let mut data = self.data.borrow_mut();
    let other_data = other.data.borrow();
    for (i, j) in self.shape.iter().zip(other.shape.iter()) {
      data[i] = other_data[j];
    }
  }

  pub fn refill(&self, filler: T) {
    let mut data = self.data.borrow_mut();
    for i in self.shape.iter() {
      data[i] = filler;
    }
  }

  pub fn contiguous(&self) -> Self {
    if self.shape.contiguous() {
      self.clone()
    } else {
      self.detach()
    }
  }

  /// Copy into fresh, contiguous storage.

  pub fn detach(&self) -> Self {
    self.vectorize(|a| a )
  }

  pub fn zip<O, F>(&self, rhs: &Self, cb: F) -> Tensor<O>
  where
    O: Inner,
    F: Fn((T, T)) -> O,
  {
    let lhs = self.broadcast(&rhs.shape);
    let rhs = rhs.broadcast(&self.shape);
    let data: Vec<O> = lhs.param_iter()
      .zip(rhs.param_iter())
      .map(cb)
      .collect();
    Tensor::new(&lhs.shape.dims, data)
  }

  pub fn vectorize<O, F>(&self, cb: F) -> Tensor<O>
  where
    O: Inner,
    F: FnMut(T) -> O,
  {
    let data = self.param_iter().map(cb).collect();
    Tensor::new(&self.shape.dims, data)
  }

  /// Reduce all dimensions from `dim` onward, passing each
  /// contiguous block of elements to `cb`.

  pub fn collapse<O, F>(&self, dim: isize, cb: F) -> Tensor<O>
  where
    O: Inner,
    F: Fn(&[T]) -> O,
  {
    let dim = negative_index(dim, self.rank(), false);
    let block: usize = self.shape.dims[dim..].iter().product();
    let values = self.to_vec();
    let data = if block == 0 {
      let outer: usize = self.shape.dims[..dim].iter().product();
      (0..outer).map(|_| cb(&[]) ).collect()
    } else {
      values.chunks(block).map(cb).collect()
    };
    Tensor::new(&self.shape.dims[..dim], data)
  }

  pub fn param_iter(&self) -> TensorIterator<T> {
    TensorIterator::new(self)
  }

  /// View of the sub-tensor addressed by the leading `indices`.

  pub fn at(&self, indices: &[usize]) -> Self {
    let shape = self.shape.take(indices);
    let data = self.data.clone();
    Self { shape, data }
  }

  pub fn item(&self) -> T {
    assert!(self.size() == 1,
      "Can't extract item from non-scalar {}", self.shape);
    self.raw()[self.shape.offset]
  }

  pub fn squeeze_only(&self, dim: isize) -> Self {
    let shape = self.shape.squeeze_only(dim);
    let data = self.data.clone();
    Self { shape, data }
  }

  pub fn equal(&self, rhs: &Self) -> Tensor<bool> {
    self.zip(rhs, |(a, b)| a == b )
  }
}

impl<T: Numeric> Tensor<T> {
  pub fn ones(shape: &[usize]) -> Self {
    Self::fill(shape, T::one())
  }

  pub fn zeros(shape: &[usize]) -> Self {
    Self::fill(shape, T::zero())
  }

  pub fn arrange(shape: &[usize], start: T, step: T) -> Self {
    Self::new(shape, (0..shape.iter().product())
      .map(|i| T::from(i).unwrap() * step + start )
      .collect())
  }

  pub fn add(&self, rhs: &Self) -> Self {
    self.zip(rhs, |(a, b)| a + b )
  }

  pub fn sub(&self, rhs: &Self) -> Self {
    self.zip(rhs, |(a, b)| a - b )
  }

  pub fn mul(&self, rhs: &Self) -> Self {
    self.zip(rhs, |(a, b)| a * b )
  }

  pub fn div(&self, rhs: &Self) -> Self {
    self.zip(rhs, |(a, b)| a / b )
  }

  /// Sum a broadcasted tensor back down to `dims`.

  pub fn sum_to(&self, dims: &[usize]) -> Self {
    if self.shape.dims == dims { return self.clone() }
    let out = Self::zeros(dims);
    let target = out.shape.broadcast(&self.shape);
    assert!(target.dims == self.shape.dims,
      "Could not reduce {} to Shape{:?}", self.shape, dims);
    {
      let mut data = out.raw_mut();
      for (i, value) in target.iter().zip(self.param_iter()) {
        data[i] += value;
      }
    }
    out
  }

  /// Collapse the last dimension using the index of its greatest value.

  pub fn argmax(&self) -> Tensor<usize> {
    self.collapse(-1, |values| {
      let mut index = 0;
      for (i, &value) in values.iter().enumerate() {
        if value > values[index] { index = i }
      }
      index
    })
  }

  pub fn cast<I: Numeric>(&self) -> Tensor<I> {
    self.vectorize(|a| I::from(a).unwrap() )
  }
}

impl<T: Real> Tensor<T> {
  /// Uniform samples from `[0, 1)`.

  pub fn rand(shape: &[usize], rng: &mut dyn RngCore) -> Self {
    let data = (0..shape.iter().product())
      .map(|_| rng.gen_range(T::zero(), T::one()) )
      .collect();
    Self::new(shape, data)
  }

  /// Standard normal samples.

  pub fn randn(shape: &[usize], rng: &mut dyn RngCore) -> Self {
    let len: usize = shape.iter().product();
    let mut data = vec![T::zero(); len];
    for i in 0..(len + 1) / 2 {
      let j = i * 2;
      let (r1, r2): (T, T) = randn(rng);
      data[j] = r1;
      if j + 1 < len { data[j + 1] = r2 }
    }
    Self::new(shape, data)
  }

  pub fn trained(&self) -> Variable<T> {
    Variable::from_tensor(self.clone(), true)
  }

  pub fn tracked(&self) -> Variable<T> {
    Variable::from_tensor(self.clone(), false)
  }

  /// Largest absolute elementwise difference to `rhs`.

  pub fn max_abs_diff(&self, rhs: &Self) -> T {
    self.zip(rhs, |(a, b)| (a - b).abs() )
      .param_iter()
      .fold(T::zero(), |acc, a| acc.max(a) )
  }
}

impl Tensor<usize> {
  pub fn one_hot<O: Numeric>(&self, size: usize) -> Tensor<O> {
    let mut dims = self.shape.dims.clone();
    dims.push(size);
    let data = self.param_iter()
      .flat_map(|i| {
        assert!(i < size, "Class {} out of range for {} classes", i, size);
        let mut hot = vec![O::zero(); size];
        hot[i] = O::one();
        hot
      })
      .collect();
    Tensor::new(&dims, data)
  }

  /// Fraction of entries equal to `labels`.

  pub fn accuracy<O: Real>(&self, labels: &Self) -> O {
    let hits = self.equal(labels).param_iter().filter(|&hit| hit ).count();
    O::from(hits).unwrap() / O::from(labels.size()).unwrap()
  }
}

impl<T: Inner> std::fmt::Display for Tensor<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(f, "Tensor{:?} ", self.shape.dims)?;
    print_chunks(0, &self.shape, &self.to_vec(), f)?;
    Ok(())
  }
}

fn print_chunks<T: std::fmt::Debug>(idx: usize, shape: &Shape, vec: &[T], f: &mut std::fmt::Formatter) -> std::fmt::Result {
  let indent = (0..idx * 2).map(|_| " ").collect::<String>();
  if shape.rank() == 0 {
    write!(f, "{indent}{:?}", vec[0])?;
  } else if idx == shape.rank() - 1 {
    writeln!(f, "{indent}{:?}", vec)?;
  } else if shape.dims[idx] > 0 {
    writeln!(f, "{indent}[")?;
    for chunk in vec.chunks((vec.len() / shape.dims[idx]).max(1)) {
      print_chunks(idx + 1, shape, chunk, f)?;
    }
    writeln!(f, "{indent}]")?;
  }
  Ok(())
}


pub struct TensorIterator<'a, T: Inner> {
  data: Ref<'a, Vec<T>>,
  shape_iter: Box<dyn Iterator<Item=usize> + 'a>,
}

impl<'a, T: Inner> TensorIterator<'a, T> {
  fn new(tensor: &'a Tensor<T>) -> Self {
    Self {
      data: tensor.data.borrow(),
      shape_iter: tensor.shape.iter(),
    }
  }
}

impl<T: Inner> Iterator for TensorIterator<'_, T> {
  type Item = T;

  fn next(&mut self) -> Option<Self::Item> {
    self.shape_iter.next().map(|i| self.data[i] )
  }
}


#[cfg(test)]
mod tests {
  use rand::{ SeedableRng, rngs::StdRng };

  use super::*;

  #[test]
  fn index() {
    let x = Tensor::new(&[2,2,2], vec![1, 2, 3, 4, 5, 6, 7, 8]);
    assert_eq!(x.at(&[0,0]), Tensor::vec(&[1, 2]));
    assert_eq!(x.at(&[1,1]), Tensor::vec(&[7, 8]));
    assert_eq!(x.at(&[0]), Tensor::new(&[2,2], vec![1, 2, 3, 4]));
    assert_eq!(x.at(&[0,1,1]).item(), 4);
  }

  #[test]
  fn broadcast() {
    let x = Tensor::new(&[1,2,3], vec![1, 2, 3, 4, 5, 6]);

    let y = Tensor::new(&[    1], vec![1]);
    assert_eq!(x.add(&y), Tensor::new(&[1,2,3], vec![2, 3, 4, 5, 6, 7]));

    let y = Tensor::new(&[    3], vec![1, 2, 3]);
    assert_eq!(x.add(&y), Tensor::new(&[1,2,3], vec![2, 4, 6, 5, 7, 9]));

    let y = Tensor::new(&[  2,3], vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(x.add(&y), Tensor::new(&[1,2,3], vec![2, 4, 6, 8, 10, 12]));
  }

  #[test]
  fn sum_to() {
    let grad = Tensor::arrange(&[3,2], 0, 1);
    assert_eq!(grad.sum_to(&[2]), Tensor::vec(&[6, 9]));
    assert_eq!(grad.sum_to(&[3,1]), Tensor::new(&[3,1], vec![1, 5, 9]));
  }

  #[test]
  fn assign_shared() {
    let a = Tensor::vec(&[1.0, 2.0]);
    let b = a.clone();
    a.assign(&Tensor::vec(&[3.0, 4.0]));
    assert_eq!(b, Tensor::vec(&[3.0, 4.0]));
  }

  #[test]
  #[should_panic(expected = "Could not assign")]
  fn assign_mismatch() {
    Tensor::<f32>::zeros(&[2,3]).assign(&Tensor::zeros(&[3,2]));
  }

  #[test]
  fn argmax() {
    let a = Tensor::new(&[2,3], vec![0.1, 0.7, 0.2, 0.5, 0.2, 0.3]);
    assert_eq!(a.argmax(), Tensor::vec(&[1, 0]));
  }

  #[test]
  fn one_hot() {
    let labels = Tensor::vec(&[2usize, 0]);
    let hot: Tensor<f32> = labels.one_hot(3);
    assert_eq!(hot, Tensor::new(&[2,3], vec![0., 0., 1., 1., 0., 0.]));
  }

  #[test]
  fn accuracy() {
    let pred = Tensor::vec(&[1usize, 2, 3, 4]);
    let real = Tensor::vec(&[1usize, 2, 0, 0]);
    assert_eq!(pred.accuracy::<f64>(&real), 0.5);
  }

  #[test]
  fn seeded_randn() {
    let a = Tensor::<f64>::randn(&[5], &mut StdRng::seed_from_u64(7));
    let b = Tensor::<f64>::randn(&[5], &mut StdRng::seed_from_u64(7));
    assert_eq!(a, b);
    assert_eq!(a.size(), 5);
  }
}
