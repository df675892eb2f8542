use std::fs;
use std::path::{ Path, PathBuf };

use serde::{ Serialize, Deserialize };

use crate::{
  error::Result,
  scalar::Real,
  train::TrainConfig,
  optimize::{ Optimizer, Strategy, FixedStep, Decaying, Adam },
};


/// Parameter update rule, as stored in configuration files.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UpdateConfig {
  FixedStep { step: f64 },
  Decaying { step: f64, beta: f64 },
  Adam { rate: f64, beta1: f64, beta2: f64 },
}

impl Default for UpdateConfig {
  fn default() -> Self {
    UpdateConfig::FixedStep { step: 1e-5 }
  }
}

impl UpdateConfig {
  pub fn build<T: Real + 'static>(&self) -> Optimizer<T, Box<dyn Strategy<T>>> {
    let cast = |value: f64| T::from(value).unwrap();
    let (rate, strategy): (f64, Box<dyn Strategy<T>>) = match *self {
      UpdateConfig::FixedStep { step } => (step, Box::new(FixedStep)),
      UpdateConfig::Decaying { step, beta } => (step, Box::new(Decaying::new(cast(beta)))),
      UpdateConfig::Adam { rate, beta1, beta2 } => (rate, Box::new(Adam::new(cast(beta1), cast(beta2)))),
    };
    Optimizer::new(cast(rate), strategy)
  }
}


/// Everything a training run needs besides the model itself.
///
/// Missing fields fall back to their defaults, which reproduce the
/// classic setup: batches of 100 images, fixed step of `1e-5`
/// and all nested training counts at one.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
  /// Directory holding the four MNIST IDX files.
  pub data_dir: PathBuf,
  pub batch_size: usize,
  pub seed: u64,
  pub train: TrainConfig,
  pub update: UpdateConfig,
  /// Where to write the recorded scores as JSON.
  pub scores_path: Option<PathBuf>,
  pub checkpoint_path: Option<PathBuf>,
}

impl Default for ExperimentConfig {
  fn default() -> Self {
    Self {
      data_dir: PathBuf::from("data/mnist"),
      batch_size: 100,
      seed: 0,
      train: TrainConfig::default(),
      update: UpdateConfig::default(),
      scores_path: None,
      checkpoint_path: None,
    }
  }
}

impl ExperimentConfig {
  pub fn load(path: impl AsRef<Path>) -> Result<Self> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
  }

  pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(self)?)?;
    Ok(())
  }
}


#[cfg(test)]
mod tests {
  use super::*;
  use crate::{ tensor::Tensor, error::Error, ops::* };

  #[test]
  fn partial_json() {
    let config: ExperimentConfig = serde_json::from_str(r#"{
      "batch_size": 32,
      "train": { "num_epoch": 50 },
      "update": { "kind": "decaying", "step": 0.01, "beta": 100.0 }
    }"#).unwrap();
    assert_eq!(config.batch_size, 32);
    assert_eq!(config.train.num_epoch, 50);
    assert_eq!(config.train.minibatch_size, 1);
    assert_eq!(config.update, UpdateConfig::Decaying { step: 0.01, beta: 100.0 });
    assert_eq!(config.data_dir, PathBuf::from("data/mnist"));
  }

  #[test]
  fn defaults() {
    let config: ExperimentConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config, ExperimentConfig::default());
    assert_eq!(config.update, UpdateConfig::FixedStep { step: 1e-5 });
  }

  #[test]
  fn builds_optimizer() {
    let x = Tensor::vec(&[1.0_f32]).trained();
    let mut optimizer = UpdateConfig::FixedStep { step: 0.5 }.build::<f32>();
    optimizer.maximize(&x.sum(0), &[x.clone()]);
    assert_eq!(x.item(), 1.5);
  }

  #[test]
  fn unknown_update() {
    let result: std::result::Result<UpdateConfig, _> = serde_json::from_str(r#"{ "kind": "lbfgs" }"#);
    assert!(result.is_err());
  }

  #[test]
  fn save_and_load() {
    let config = ExperimentConfig {
      seed: 42,
      update: UpdateConfig::Adam { rate: 0.5, beta1: 0.75, beta2: 0.875 },
      scores_path: Some(PathBuf::from("scores.json")),
      ..ExperimentConfig::default()
    };
    let path = std::env::temp_dir().join("gentensor_config_test.json");
    config.save(&path).unwrap();
    let loaded = ExperimentConfig::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(loaded, config);
  }

  #[test]
  fn missing_file() {
    assert!(matches!(ExperimentConfig::load("/nonexistent/config.json"), Err(Error::Io(_))));
  }
}
