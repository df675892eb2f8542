use rand::distributions::uniform::SampleUniform;
use num_traits::{ Num, NumAssignOps, NumCast };


/// All types that may be used in a [Tensor](crate::Tensor).
///
/// This trait gets implemented automatically for all types
/// that satisfy its dependent traits.

pub trait Inner: PartialEq + Clone + Copy + std::fmt::Debug {}
impl<T: PartialEq + Clone + Copy + std::fmt::Debug> Inner for T {}


/// All numeric types.
///
/// This trait gets implemented automatically for all types
/// that satisfy its dependent traits.

pub trait Numeric: Inner + PartialOrd + Num + NumCast + NumAssignOps + std::iter::Sum {}
impl<T: Inner + PartialOrd + Num + NumCast + NumAssignOps + std::iter::Sum> Numeric for T {}


/// All continuous numeric types that can be differentiated.
///
/// Implemented for `f32` and `f64`.

pub trait Real: Numeric + num_traits::Float + SampleUniform + Gemm {}
impl<T: Numeric + num_traits::Float + SampleUniform + Gemm> Real for T {}


/// General matrix multiplication `c = a · b` over strided storage,
/// where `a` is `m×k`, `b` is `k×n` and `c` is a contiguous `m×n` buffer.

pub trait Gemm: Sized {
  #[allow(clippy::too_many_arguments)]
  fn gemm(
    m: usize, k: usize, n: usize,
    a: &[Self], rsa: isize, csa: isize,
    b: &[Self], rsb: isize, csb: isize,
    c: &mut [Self],
  );
}

macro_rules! impl_gemm {
  ($t:ty, $kernel:ident) => {
    impl Gemm for $t {
      #[cfg(feature = "unsafe")]
      fn gemm(
        m: usize, k: usize, n: usize,
        a: &[Self], rsa: isize, csa: isize,
        b: &[Self], rsb: isize, csb: isize,
        c: &mut [Self],
      ) {
        assert!(c.len() >= m * n);
        if m == 0 || n == 0 { return }
        unsafe {
          matrixmultiply::$kernel(
            m, k, n,
            1.0,
            a.as_ptr(), rsa, csa,
            b.as_ptr(), rsb, csb,
            0.0,
            c.as_mut_ptr(), n as isize, 1,
          );
        }
      }

      #[cfg(not(feature = "unsafe"))]
      fn gemm(
        m: usize, k: usize, n: usize,
        a: &[Self], rsa: isize, csa: isize,
        b: &[Self], rsb: isize, csb: isize,
        c: &mut [Self],
      ) {
        for i in 0..m {
          for j in 0..n {
            let mut acc = 0.0;
            for l in 0..k {
              acc +=
                a[(i as isize * rsa + l as isize * csa) as usize] *
                b[(l as isize * rsb + j as isize * csb) as usize];
            }
            c[i * n + j] = acc;
          }
        }
      }
    }
  };
}

impl_gemm!(f32, sgemm);
impl_gemm!(f64, dgemm);
