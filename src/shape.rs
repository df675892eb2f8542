use serde::{ Serialize, Deserialize };

use crate::internal::*;


/// The shape of a [Tensor](crate::Tensor).

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
  pub dims: Vec<usize>,
  pub(crate) strides: Vec<isize>,
  pub(crate) offset: usize,
}

impl Shape {
  pub fn new(dims: &[usize]) -> Self {
    Self {
      dims: dims.to_vec(),
      strides: Self::make_strides(dims),
      offset: 0,
    }
  }

  fn make_strides(dims: &[usize]) -> Vec<isize> {
    if dims.is_empty() { return vec![] }
    let mut strides = vec![0; dims.len()];
    strides[dims.len() - 1] = 1;
    for i in (1..dims.len()).rev() {
      strides[i - 1] = dims[i] as isize * strides[i];
    }
    strides
  }

  pub fn size(&self) -> usize {
    self.dims.iter().product()
  }

  pub fn rank(&self) -> usize {
    self.dims.len()
  }

  pub fn contiguous(&self) -> bool {
    self.strides == Self::make_strides(&self.dims)
  }

  pub(crate) fn index(&self, indices: &[usize]) -> usize {
    assert!(indices.len() <= self.rank(),
      "Too many indices ({}) for {}", indices.len(), self);
    (indices.iter()
      .zip(&self.strides)
      .map(|(&i, &s)| i as isize * s )
      .sum::<isize>() + self.offset as isize
    ) as usize
  }

  pub fn iter(&self) -> Box<dyn Iterator<Item=usize> + '_> {
    if self.contiguous() {
      Box::new(self.offset..self.offset + self.size())
    } else {
      Box::new(ShapeIterator::new(self))
    }
  }

  /// Sub-shape addressed by fixing the leading `indices`.

  pub fn take(&self, indices: &[usize]) -> Self {
    for (d, &i) in indices.iter().enumerate() {
      assert!(i < self.dims[d], "Index {} out of bounds for dim {} of {}", i, d, self);
    }
    Self {
      dims: self.dims[indices.len()..].to_vec(),
      strides: self.strides[indices.len()..].to_vec(),
      offset: self.index(indices),
    }
  }

  /// Reinterpret a contiguous shape with new dimensions.

  pub fn view(&self, dims: &[usize]) -> Self {
    assert!(self.contiguous(), "Cannot view non-contiguous {}", self);
    assert_eq!(self.size(), dims.iter().product::<usize>(),
      "Cannot view {} as Shape{:?}", self, dims);
    Self {
      dims: dims.to_vec(),
      strides: Self::make_strides(dims),
      offset: self.offset,
    }
  }

  pub fn unsqueeze(&self, dim: isize) -> Self {
    let d = negative_index(dim, self.rank(), true);
    let mut shape = self.clone();
    let stride = if d < shape.dims.len() {
      shape.strides[d].abs() * shape.dims[d] as isize
    } else { 1 };
    shape.strides.insert(d, stride);
    shape.dims.insert(d, 1);
    shape
  }

  pub fn squeeze_only(&self, dim: isize) -> Self {
    let d = negative_index(dim, self.rank(), false);
    assert_eq!(self.dims[d], 1, "Cannot squeeze dim {} of {}", d, self);
    let mut shape = self.clone();
    shape.dims.remove(d);
    shape.strides.remove(d);
    shape
  }

  /// Broadcast to the common shape of `self` and `other`, following
  /// numpy rules. Expanded dimensions get a stride of zero.

  pub fn broadcast(&self, other: &Self) -> Self {
    let rank = self.rank().max(other.rank());
    let mut dims = vec![];
    let mut strides = vec![];
    self.dims.iter()
      .rev()
      .chain(std::iter::repeat(&1))
      .zip(other.dims.iter()
        .rev()
        .chain(std::iter::repeat(&1)))
      .zip(self.strides.iter()
        .rev()
        .chain(std::iter::repeat(&0)))
      .take(rank)
      .for_each(|((&dl, &dr), &stride)| {
        assert!(dl == dr || dl == 1 || dr == 1, "Could not broadcast {} & {}", self, other);
        dims.push(if dl == 1 { dr } else { dl });
        strides.push(if dl == 1 && dr != 1 { 0 } else { stride });
      });
    dims.reverse();
    strides.reverse();
    Self { dims, strides, offset: self.offset }
  }

  pub fn transpose(&self, dim1: isize, dim2: isize) -> Self {
    let dim1 = negative_index(dim1, self.rank(), false);
    let dim2 = negative_index(dim2, self.rank(), false);
    let mut shape = self.clone();
    shape.dims.swap(dim1, dim2);
    shape.strides.swap(dim1, dim2);
    shape
  }
}

impl std::ops::Index<isize> for Shape {
  type Output = usize;

  fn index(&self, i: isize) -> &usize {
    let idx = negative_index(i, self.rank(), false);
    &self.dims[idx]
  }
}

impl std::fmt::Display for Shape {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    write!(f, "Shape{:?}", self.dims)
  }
}


/// Iterate through a [Shape]'s storage indices in row-major order.

pub struct ShapeIterator<'a> {
  shape: &'a Shape,
  counter: Vec<usize>,
  remaining: usize,
  idx: isize,
}

impl<'a> ShapeIterator<'a> {
  fn new(shape: &'a Shape) -> Self {
    Self {
      counter: vec![0; shape.rank()],
      remaining: shape.size(),
      idx: shape.offset as isize,
      shape,
    }
  }
}

impl<'a> Iterator for ShapeIterator<'a> {
  type Item = usize;

  fn next(&mut self) -> Option<Self::Item> {
    if self.remaining == 0 { return None }
    self.remaining -= 1;
    let out = self.idx as usize;
    // Odometer over dimensions, rightmost fastest
    for d in (0..self.counter.len()).rev() {
      self.counter[d] += 1;
      self.idx += self.shape.strides[d];
      if self.counter[d] < self.shape.dims[d] { break }
      self.idx -= self.shape.strides[d] * self.shape.dims[d] as isize;
      self.counter[d] = 0;
    }
    Some(out)
  }
}
