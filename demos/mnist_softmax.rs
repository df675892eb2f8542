// This demo trains a softmax regression digit classifier on MNIST.

// The classifier is wrapped as a generative function and called from a
// label model that draws one digit per image. Training constrains those
// draws to the observed labels and climbs the gradient of their
// log-likelihood with respect to the classifier's weights and bias.

// Expects the four MNIST IDX files in the configured data directory
// (`data/mnist` by default). Pass a JSON config file as the first argument
// to override any setting, and set RUST_LOG=info to follow the objective.

use std::{ env, fs };

use anyhow::Context;
use rand::{ SeedableRng, rngs::StdRng };

use gentensor::{
  Tensor,
  config::ExperimentConfig,
  data::{ Dataset, LabeledBatches },
  model::LabelModel,
  train::train,
};

fn main() -> anyhow::Result<()> {
  env_logger::init();

  let config = match env::args().nth(1) {
    Some(path) => ExperimentConfig::load(&path).with_context(|| format!("reading config {path}"))?,
    None => ExperimentConfig::default(),
  };

  let train_set = Dataset::<f32>::mnist(&config.data_dir, true)
    .with_context(|| format!("loading MNIST from {}", config.data_dir.display()))?;
  let test_set = Dataset::<f32>::mnist(&config.data_dir, false)?;

  let mut rng = StdRng::seed_from_u64(config.seed);

  // Zero-initialised 784×10 weights and 10 biases
  let model = LabelModel::<f32>::mnist();

  // Fresh batch of labeled images on every call
  let mut batches = LabeledBatches::new(&train_set, config.batch_size);

  let mut optimizer = config.update.build();
  let scores = train(&model, &mut batches, &mut optimizer, &config.train, &mut rng, |epoch, score| {
    if epoch % 100 == 0 {
      println!("{epoch:>6}  {score:.4}");
    }
  });

  let labels = Tensor::vec(test_set.labels());
  let accuracy: f32 = model.classify(test_set.images()).accuracy(&labels);
  println!("Test accuracy {:.2}%", accuracy * 100.0);

  if let Some(path) = &config.scores_path {
    fs::write(path, serde_json::to_string(&scores)?)?;
  }
  if let Some(path) = &config.checkpoint_path {
    model.classifier().save_parameters(path)?;
  }

  Ok(())
}
