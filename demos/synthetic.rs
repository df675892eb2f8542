// This demo trains the same label model as the MNIST demo, but on
// generated data, so it runs without any files.

// Every class lights up its own subset of features, which makes the
// problem linearly separable and the objective climb quickly.

use rand::{ SeedableRng, rngs::StdRng };

use gentensor::{
  Tensor,
  config::UpdateConfig,
  data::{ Dataset, LabeledBatches },
  model::{ LabelModel, softmax_regression },
  train::{ train, TrainConfig },
};

fn main() {
  env_logger::init();

  let mut rng = StdRng::seed_from_u64(7);
  let dataset = Dataset::<f64>::synthetic(2000, 64, 10, &mut rng);

  let model = LabelModel::<f64>::new(softmax_regression(64, 10));
  let mut batches = LabeledBatches::new(&dataset, 50);

  let mut optimizer = UpdateConfig::Adam { rate: 0.01, beta1: 0.9, beta2: 0.999 }.build();
  let config = TrainConfig {
    num_epoch: 100,
    epoch_size: 4,
    num_minibatch: 2,
    minibatch_size: 2,
    evaluation_size: 2,
  };

  let scores = train(&model, &mut batches, &mut optimizer, &config, &mut rng, |epoch, score| {
    if epoch % 10 == 0 {
      println!("{epoch:>4}  {:.4}", score / 50.0);
    }
  });

  let labels = Tensor::vec(dataset.labels());
  let accuracy: f64 = model.classify(dataset.images()).accuracy(&labels);
  println!("Final objective {:.4}, accuracy {:.2}%", scores[scores.len() - 1], accuracy * 100.0);
}
