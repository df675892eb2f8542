use crate::{
  tensor::Tensor,
  scalar::Real,
};


/// Low-level compute operations.

pub(crate) trait Cops<T: Real> {
  fn matmul(&self, rhs: &Self) -> Vec<T>;
}

impl<T: Real> Cops<T> for Tensor<T> {
  fn matmul(&self, rhs: &Self) -> Vec<T> {
    let rows_l = self.shape[-2];
    let cols_l = self.shape[-1];
    let cols_r = rhs.shape[-1];
    assert_eq!(cols_l, rhs.shape[-2],
      "Could not multiply {} & {}", self.shape, rhs.shape);

    let mut data = vec![T::zero(); rows_l * cols_r];
    if cols_l == 0 { return data }

    let data_l = self.raw();
    let data_r = rhs.raw();

    T::gemm(
      rows_l, cols_l, cols_r,
      &data_l[self.shape.offset..], self.shape.strides[0], self.shape.strides[1],
      &data_r[rhs.shape.offset..], rhs.shape.strides[0], rhs.shape.strides[1],
      &mut data,
    );

    data
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::ops::{ BaseOps, RealOps };

  #[test]
  fn matmul() {
    let x = Tensor::new(&[2,3], vec![1., 2., 3., 4., 5., 6.]);
    let y = Tensor::new(&[3,2], vec![1., 2., 3., 4., 5., 6.]);
    assert_eq!(x.mm(&y), Tensor::new(&[2,2], vec![22., 28., 49., 64.]));
  }

  #[test]
  fn matmul_vector() {
    let x = Tensor::new(&[2,3], vec![1.0_f32, 2., 3., 4., 5., 6.]);
    let y = Tensor::new(&[3,1], vec![1., 2., 3.]);
    assert_eq!(x.mm(&y), Tensor::new(&[2,1], vec![14., 32.]));
  }

  #[test]
  fn matmul_transposed() {
    let x = Tensor::new(&[3,2], vec![1., 4., 2., 5., 3., 6.]).transpose(0, 1);
    let y = Tensor::new(&[3,2], vec![1., 2., 3., 4., 5., 6.]);
    assert_eq!(x.mm(&y), Tensor::new(&[2,2], vec![22., 28., 49., 64.]));
  }

  #[test]
  #[should_panic(expected = "Could not multiply")]
  fn matmul_mismatch() {
    let x = Tensor::<f64>::zeros(&[2,3]);
    x.mm(&Tensor::zeros(&[2,3]));
  }
}
