use std::fs;
use std::path::Path;

use rand::{ Rng, RngCore };

use crate::{
  error::{ Error, Result },
  scalar::Real,
  tensor::Tensor,
  ops::BaseOps,
  generative::{ ChoiceMap, Address },
  model::LABEL,
  train::DataGenerator,
};


const IMAGES_MAGIC: u32 = 0x803;
const LABELS_MAGIC: u32 = 0x801;


/// In-memory labeled samples, one flattened image per row with
/// intensities scaled to `[0, 1]`.

#[derive(Debug, Clone)]
pub struct Dataset<T: Real> {
  images: Tensor<T>,
  labels: Vec<usize>,
}

impl<T: Real> Dataset<T> {
  pub fn new(images: Tensor<T>, labels: Vec<usize>) -> Self {
    assert_eq!(images.rank(), 2, "Images must be stacked as a matrix, got {}", images.shape());
    assert_eq!(images.dim(0), labels.len(),
      "Got {} images but {} labels", images.dim(0), labels.len());
    Self { images: images.detach(), labels }
  }

  /// Read a pair of IDX files, as distributed with MNIST.

  pub fn from_idx(images: impl AsRef<Path>, labels: impl AsRef<Path>) -> Result<Self> {
    let (rows, cols, pixels) = parse_images(&fs::read(images)?)?;
    let labels = parse_labels(&fs::read(labels)?)?;
    if labels.len() != rows {
      return Err(Error::Format(format!("{rows} images but {} labels", labels.len())))
    }
    let scale = T::from(255.0).unwrap();
    let data = pixels.into_iter()
      .map(|px| T::from(px).unwrap() / scale )
      .collect();
    log::info!("Read {rows} samples with {cols} features");
    Ok(Self::new(Tensor::new(&[rows, cols], data), labels))
  }

  /// Standard MNIST training or test split inside `dir`.

  pub fn mnist(dir: impl AsRef<Path>, train: bool) -> Result<Self> {
    let prefix = if train { "train" } else { "t10k" };
    let dir = dir.as_ref();
    Self::from_idx(
      dir.join(format!("{prefix}-images-idx3-ubyte")),
      dir.join(format!("{prefix}-labels-idx1-ubyte")),
    )
  }

  /// Noisy, linearly separable samples where every class lights up its
  /// own subset of features.

  pub fn synthetic(num_samples: usize, num_features: usize, num_classes: usize, rng: &mut dyn RngCore) -> Self {
    assert!(num_features >= num_classes,
      "Need at least one feature per class, got {num_features} for {num_classes}");
    let labels: Vec<usize> = (0..num_samples).map(|_| rng.gen_range(0, num_classes) ).collect();
    let noise = T::from(0.2).unwrap();
    let data = labels.iter()
      .flat_map(|&label| (0..num_features)
        .map(|j| {
          let on = if j % num_classes == label { T::one() - noise } else { T::zero() };
          on + rng.gen_range(T::zero(), noise)
        })
        .collect::<Vec<_>>())
      .collect();
    Self::new(Tensor::new(&[num_samples, num_features], data), labels)
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }

  pub fn num_features(&self) -> usize {
    self.images.dim(1)
  }

  pub fn images(&self) -> &Tensor<T> {
    &self.images
  }

  pub fn labels(&self) -> &[usize] {
    &self.labels
  }

  /// Gather the samples at `indices`.

  pub fn get(&self, indices: &[usize]) -> (Tensor<T>, Vec<usize>) {
    let cols = self.num_features();
    let raw = self.images.raw();
    let mut data = Vec::with_capacity(indices.len() * cols);
    for &i in indices {
      assert!(i < self.len(), "Sample {i} out of bounds for {} samples", self.len());
      data.extend_from_slice(&raw[i * cols..(i + 1) * cols]);
    }
    let labels = indices.iter().map(|&i| self.labels[i] ).collect();
    (Tensor::new(&[indices.len(), cols], data), labels)
  }

  /// `n` samples drawn uniformly at random, with replacement.

  pub fn batch(&self, n: usize, rng: &mut dyn RngCore) -> (Tensor<T>, Vec<usize>) {
    assert!(!self.is_empty(), "Cannot draw from an empty dataset");
    let indices: Vec<usize> = (0..n).map(|_| rng.gen_range(0, self.len()) ).collect();
    self.get(&indices)
  }
}


/// Observed labels as constraints on the `("y", i)` addresses.

pub fn label_choices(labels: &[usize]) -> ChoiceMap {
  labels.iter()
    .enumerate()
    .map(|(i, &label)| (Address::indexed(LABEL, i), label) )
    .collect()
}


/// Data generator producing fixed size random batches of
/// images along with their observed labels.

#[derive(Debug, Clone)]
pub struct LabeledBatches<'a, T: Real> {
  dataset: &'a Dataset<T>,
  batch_size: usize,
}

impl<'a, T: Real> LabeledBatches<'a, T> {
  pub fn new(dataset: &'a Dataset<T>, batch_size: usize) -> Self {
    assert!(batch_size > 0, "Batch size must be positive");
    Self { dataset, batch_size }
  }

  pub fn batch_size(&self) -> usize {
    self.batch_size
  }
}

impl<T: Real> DataGenerator<Tensor<T>> for LabeledBatches<'_, T> {
  fn next_example(&mut self, rng: &mut dyn RngCore) -> (Tensor<T>, ChoiceMap) {
    let (images, labels) = self.dataset.batch(self.batch_size, rng);
    (images, label_choices(&labels))
  }
}


fn read_u32(bytes: &[u8], offset: &mut usize) -> Result<u32> {
  let word = bytes.get(*offset..*offset + 4)
    .ok_or_else(|| Error::Format("truncated header".into()) )?;
  *offset += 4;
  Ok(u32::from_be_bytes([word[0], word[1], word[2], word[3]]))
}

fn check_magic(bytes: &[u8], offset: &mut usize, expected: u32) -> Result<()> {
  let magic = read_u32(bytes, offset)?;
  if magic != expected {
    return Err(Error::Format(format!("bad magic number {magic:#x}, expected {expected:#x}")))
  }
  Ok(())
}

fn payload(bytes: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
  let end = offset.checked_add(len)
    .ok_or_else(|| Error::Format(format!("payload of {len} bytes overflows")) )?;
  bytes.get(offset..end)
    .ok_or_else(|| Error::Format(format!("expected {len} bytes of data, got {}", bytes.len().saturating_sub(offset))) )
}

/// Returns sample count, features per sample and raw pixel bytes.

fn parse_images(bytes: &[u8]) -> Result<(usize, usize, Vec<u8>)> {
  let mut offset = 0;
  check_magic(bytes, &mut offset, IMAGES_MAGIC)?;
  let count = read_u32(bytes, &mut offset)? as usize;
  let rows = read_u32(bytes, &mut offset)? as usize;
  let cols = read_u32(bytes, &mut offset)? as usize;
  let (features, len) = rows.checked_mul(cols)
    .and_then(|features| Some((features, features.checked_mul(count)?)) )
    .ok_or_else(|| Error::Format("image payload size overflows".to_string()) )?;
  let pixels = payload(bytes, offset, len)?;
  Ok((count, features, pixels.to_vec()))
}

fn parse_labels(bytes: &[u8]) -> Result<Vec<usize>> {
  let mut offset = 0;
  check_magic(bytes, &mut offset, LABELS_MAGIC)?;
  let count = read_u32(bytes, &mut offset)? as usize;
  let labels = payload(bytes, offset, count)?;
  Ok(labels.iter().map(|&label| label as usize ).collect())
}


#[cfg(test)]
mod tests {
  use rand::{ SeedableRng, rngs::StdRng };

  use super::*;

  fn idx_images(count: u32, rows: u32, cols: u32, pixels: &[u8]) -> Vec<u8> {
    [IMAGES_MAGIC, count, rows, cols].iter()
      .flat_map(|word| word.to_be_bytes())
      .chain(pixels.iter().copied())
      .collect()
  }

  fn idx_labels(labels: &[u8]) -> Vec<u8> {
    [LABELS_MAGIC, labels.len() as u32].iter()
      .flat_map(|word| word.to_be_bytes())
      .chain(labels.iter().copied())
      .collect()
  }

  #[test]
  fn parse_idx() {
    let (count, features, pixels) = parse_images(&idx_images(2, 1, 2, &[0, 255, 51, 0])).unwrap();
    assert_eq!((count, features), (2, 2));
    assert_eq!(pixels, vec![0, 255, 51, 0]);
    assert_eq!(parse_labels(&idx_labels(&[7, 3])).unwrap(), vec![7, 3]);
  }

  #[test]
  fn bad_magic() {
    let result = parse_labels(&idx_images(1, 1, 1, &[0]));
    assert!(matches!(result, Err(Error::Format(msg)) if msg.contains("magic")));
  }

  #[test]
  fn truncated() {
    assert!(matches!(parse_images(&idx_images(3, 2, 2, &[1, 2, 3])), Err(Error::Format(_))));
    assert!(matches!(parse_labels(&[0, 0, 8]), Err(Error::Format(_))));
  }

  #[test]
  fn huge_header() {
    let bytes = idx_images(u32::MAX, u32::MAX, u32::MAX, &[0; 16]);
    match parse_images(&bytes) {
      Err(Error::Format(message)) => assert!(message.contains("overflows")),
      other => panic!("expected a format error, got {:?}", other.map(|(count, features, _)| (count, features) )),
    }
    assert!(matches!(payload(&[0; 4], usize::MAX, 2), Err(Error::Format(_))));
  }

  #[test]
  fn from_files() {
    let dir = std::env::temp_dir();
    let images = dir.join("gentensor-test-images-idx3-ubyte");
    let labels = dir.join("gentensor-test-labels-idx1-ubyte");
    fs::write(&images, idx_images(2, 1, 2, &[0, 255, 51, 0])).unwrap();
    fs::write(&labels, idx_labels(&[4, 9])).unwrap();
    let dataset = Dataset::<f64>::from_idx(&images, &labels).unwrap();
    assert_eq!(dataset.len(), 2);
    assert_eq!(dataset.images(), &Tensor::new(&[2,2], vec![0.0, 1.0, 0.2, 0.0]));
    assert_eq!(dataset.labels(), &[4, 9]);
    fs::remove_file(images).unwrap();
    fs::remove_file(labels).unwrap();
  }

  #[test]
  fn missing_file() {
    let result = Dataset::<f32>::mnist("/nonexistent/mnist", true);
    assert!(matches!(result, Err(Error::Io(_))));
  }

  #[test]
  fn fixed_batch_size() {
    let mut rng = StdRng::seed_from_u64(3);
    let dataset = Dataset::<f32>::synthetic(50, 12, 4, &mut rng);
    let mut batches = LabeledBatches::new(&dataset, 8);
    for _ in 0..5 {
      let (x, y) = batches.next_example(&mut rng);
      assert_eq!(x.shape().dims, vec![8, 12]);
      assert_eq!(y.len(), 8);
      assert!(y.iter().all(|(address, label)| address.index.unwrap() < 8 && label < 4 ));
    }
  }

  #[test]
  fn gather() {
    let dataset = Dataset::new(Tensor::new(&[3,2], vec![1, 2, 3, 4, 5, 6]).cast::<f64>(), vec![0, 1, 2]);
    let (x, y) = dataset.get(&[2, 0]);
    assert_eq!(x, Tensor::new(&[2,2], vec![5.0, 6.0, 1.0, 2.0]));
    assert_eq!(y, vec![2, 0]);
  }

  #[test]
  fn synthetic_is_separable() {
    let dataset = Dataset::<f64>::synthetic(20, 6, 3, &mut StdRng::seed_from_u64(1));
    for (i, &label) in dataset.labels().iter().enumerate() {
      let row = dataset.images().at(&[i]).to_vec();
      assert!(row[label] > 0.7 && row[(label + 1) % 3] < 0.3);
    }
  }
}
