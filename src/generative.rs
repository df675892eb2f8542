use rand::{ RngCore, rngs::mock::StepRng };

mod choices;
mod distribution;
mod trace;
mod graph_function;

pub use choices::{ Address, ChoiceMap };
pub use distribution::{ Distribution, Categorical };
pub use trace::Trace;
pub use graph_function::GraphFunction;

use crate::{
  scalar::Real,
  variable::Variable,
};


/// Stochastic function whose executions can be traced, constrained and scored.
///
/// Implementors decide which random choices they make and at which
/// [Address]. Trainable parameters are exposed so that gradients
/// accumulated through [Trace::accumulate_param_gradients] can be applied
/// by an [Optimizer](crate::optimize::Optimizer).

pub trait GenerativeFunction<T: Real> {
  type Args: Clone;
  type Output;

  /// Run the function, sampling every random choice freely.

  fn simulate(&self, args: &Self::Args, rng: &mut dyn RngCore) -> Trace<T, Self::Args, Self::Output>;

  /// Run the function, taking the value of every address present in
  /// `constraints` instead of sampling it.
  ///
  /// Returns the trace along with its importance weight, the
  /// log-probability of the constrained choices.

  fn generate(
    &self,
    args: &Self::Args,
    constraints: &ChoiceMap,
    rng: &mut dyn RngCore,
  ) -> (Trace<T, Self::Args, Self::Output>, T);

  /// Trainable parameters the function's score or return value depends on.

  fn parameters(&self) -> Vec<Variable<T>>;

  /// Run the function for its return value alone.

  fn call(&self, args: &Self::Args, rng: &mut dyn RngCore) -> Self::Output {
    self.simulate(args, rng).into_retval()
  }

  /// Log-probability of a complete set of choices.
  ///
  /// Panics when `choices` leaves any random choice unspecified.

  fn assess(&self, args: &Self::Args, choices: &ChoiceMap) -> T {
    let (trace, weight) = self.generate(args, choices, &mut StepRng::new(0, 1));
    assert!(trace.choices() == choices,
      "Choices do not fully specify the function's random choices");
    weight
  }
}
