use std::cell::RefCell;
use std::fs;
use std::path::Path;

use rand::RngCore;
use serde::{ Serialize, Deserialize, de::DeserializeOwned };

use crate::{
  error::{ Error, Result },
  scalar::Real,
  tensor::Tensor,
  variable::{ Variable, Session },
  ops::BaseOps,
  generative::{ GenerativeFunction, ChoiceMap, Trace },
};


type Builder<T> = dyn Fn(&Variable<T>, &[Variable<T>]) -> Variable<T>;


/// Deterministic generative function backed by a traced computation graph.
///
/// The graph gets built by running `builder` once on a placeholder and the
/// registered parameters. The resulting [Session] is kept and re-run for
/// every invocation, so parameter state persists across calls. A new
/// session gets traced whenever the input dimensions change, reusing
/// the same parameter variables.
///
/// The function makes no random choices. Its score is always zero,
/// but traces keep the output node, so return value gradients can be
/// back-propagated into the parameters.

pub struct GraphFunction<T: Real> {
  names: Vec<String>,
  params: Vec<Variable<T>>,
  builder: Box<Builder<T>>,
  session: RefCell<Option<Session<T>>>,
}

impl<T: Real> GraphFunction<T> {
  /// Register named initial parameter values and the graph builder.

  pub fn new<F>(params: Vec<(&str, Tensor<T>)>, builder: F) -> Self
  where
    F: Fn(&Variable<T>, &[Variable<T>]) -> Variable<T> + 'static
  {
    let (names, params) = params.into_iter()
      .map(|(name, tensor)| (name.to_string(), tensor.trained()) )
      .unzip();
    Self {
      names,
      params,
      builder: Box::new(builder),
      session: RefCell::new(None),
    }
  }

  pub fn parameter(&self, name: &str) -> Option<&Variable<T>> {
    self.names.iter()
      .position(|n| n == name )
      .map(|i| &self.params[i] )
  }

  pub fn named_parameters(&self) -> impl Iterator<Item = (&str, &Variable<T>)> {
    self.names.iter().map(|n| n.as_str() ).zip(self.params.iter())
  }

  /// Run the graph on `input`, returning the differentiable output node.
  ///
  /// The node is shared with the cached session and gets overwritten
  /// by the next run.

  pub fn run(&self, input: &Tensor<T>) -> Variable<T> {
    let mut session = self.session.borrow_mut();
    let stale = session.as_ref()
      .map_or(true, |s| s.inputs()[0].shape().dims != input.shape().dims );
    if stale { *session = None }
    let session = session.get_or_insert_with(|| {
      log::debug!("Tracing graph for input {}", input.shape());
      let placeholder = Tensor::zeros(&input.shape().dims).tracked();
      let output = (self.builder)(&placeholder, &self.params);
      Session::new(&[placeholder], &[output])
    });
    session.run(&[input])[0].clone()
  }
}

impl<T: Real> GenerativeFunction<T> for GraphFunction<T> {
  type Args = Tensor<T>;
  type Output = Tensor<T>;

  fn simulate(&self, args: &Tensor<T>, _rng: &mut dyn RngCore) -> Trace<T, Tensor<T>, Tensor<T>> {
    let output = self.run(args);
    Trace::new(args.clone(), ChoiceMap::new(), output.tensor().detach(), T::zero())
      .with_retval_node(output)
  }

  fn generate(
    &self,
    args: &Tensor<T>,
    constraints: &ChoiceMap,
    rng: &mut dyn RngCore,
  ) -> (Trace<T, Tensor<T>, Tensor<T>>, T) {
    assert!(constraints.is_empty(),
      "Graph functions make no random choices, got {} constraints", constraints.len());
    (self.simulate(args, rng), T::zero())
  }

  fn parameters(&self) -> Vec<Variable<T>> {
    self.params.clone()
  }

  fn call(&self, args: &Tensor<T>, _rng: &mut dyn RngCore) -> Tensor<T> {
    self.run(args).tensor().detach()
  }
}

#[derive(Serialize, Deserialize)]
struct Checkpoint<T: Real> {
  params: Vec<(String, Tensor<T>)>,
}

impl<T: Real + Serialize + DeserializeOwned> GraphFunction<T> {
  /// Write all named parameter values to `path`.

  pub fn save_parameters(&self, path: impl AsRef<Path>) -> Result<()> {
    let checkpoint = Checkpoint {
      params: self.named_parameters()
        .map(|(name, param)| (name.to_string(), param.tensor().detach()) )
        .collect(),
    };
    let bytes = postcard::to_allocvec(&checkpoint)?;
    fs::write(path, bytes)?;
    Ok(())
  }

  /// Overwrite parameter values in place with those stored at `path`.
  ///
  /// Every parameter must be present in the checkpoint with a matching shape.

  pub fn load_parameters(&self, path: impl AsRef<Path>) -> Result<()> {
    let bytes = fs::read(path)?;
    let checkpoint: Checkpoint<T> = postcard::from_bytes(&bytes)?;
    for (name, param) in self.named_parameters() {
      let (_, value) = checkpoint.params.iter()
        .find(|(n, _)| n == name )
        .ok_or_else(|| Error::Checkpoint(format!("missing parameter '{name}'")) )?;
      if value.shape().dims != param.shape().dims {
        return Err(Error::Checkpoint(format!(
          "parameter '{name}' is {}, checkpoint holds {}", param.shape(), value.shape())))
      }
    }
    for (name, value) in checkpoint.params {
      if let Some(param) = self.parameter(&name) {
        param.tensor().assign(&value);
      }
    }
    log::info!("Loaded {} parameters", self.params.len());
    Ok(())
  }
}

impl<T: Real> std::fmt::Debug for GraphFunction<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    f.debug_struct("GraphFunction")
      .field("parameters", &self.names)
      .finish()
  }
}
