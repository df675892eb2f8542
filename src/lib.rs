//! Generative functions over a tiny tensor graph runtime.
//! CPU only. Few dependencies.
//!
//! # Features
//!
//! - **Graph sessions**: Computation graphs get traced once from an eager
//! computation on placeholders and can be re-run with new input data, keeping
//! their trainable parameters in place.
//!
//! - **Auto-grad**: Reverse-mode gradients for every operation the
//! graphs use, with gradients of trainable variables accumulating across
//! back-propagations until reset.
//!
//! - **Generative functions**: Traceable stochastic functions with
//! addressed random choices that can be simulated, constrained and scored.
//! Any computation graph can be wrapped as one with [GraphFunction](generative::GraphFunction).
//!
//! - **Training**: Stochastic gradient ascent on the log-likelihood of
//! observed choices, with fixed, decaying and ADAM step rules.
//!
//! - **MNIST**: Reading of IDX files and random batch sampling.
//!
//! # Examples
//!
//! Fitting a softmax regression classifier through a generative label model:
//! ```
//! use rand::{ SeedableRng, rngs::StdRng };
//! use gentensor::{
//!   data::{ Dataset, LabeledBatches },
//!   generative::GenerativeFunction,
//!   model::{ LabelModel, softmax_regression },
//!   optimize::{ Optimizer, FixedStep },
//!   train::{ train, TrainConfig },
//! };
//!
//! let mut rng = StdRng::seed_from_u64(0);
//! let dataset = Dataset::<f32>::synthetic(200, 16, 4, &mut rng);
//!
//! // Every label y[i] is drawn from the class probabilities of row i
//! let model = LabelModel::<f32>::new(softmax_regression(16, 4));
//!
//! let mut batches = LabeledBatches::new(&dataset, 20);
//! let mut optimizer = Optimizer::new(0.05, FixedStep);
//! let config = TrainConfig { num_epoch: 50, ..TrainConfig::default() };
//! let scores = train(&model, &mut batches, &mut optimizer, &config, &mut rng, |_, _| {});
//!
//! assert_eq!(scores.len(), 50);
//! let trace = model.simulate(dataset.images(), &mut rng);
//! assert_eq!(trace.choices().len(), 200);
//! ```
//!
//! ## More examples
//! Check the `/demos` folder for complete programs.
//!
//!
//! # Optional features
//!
//! - `unsafe` *(default)*: Accelerated matrix math using [matrixmultiply] crate.

mod internal;
mod shape;
mod tensor;
mod variable;

pub mod ops;
pub mod scalar;
pub mod optimize;
pub mod error;
pub mod generative;
pub mod model;
pub mod data;
pub mod train;
pub mod config;

pub use shape::Shape;
pub use tensor::Tensor;
pub use variable::{ Variable, Session, UnaryOp, BinaryOp };
pub use error::{ Error, Result };
