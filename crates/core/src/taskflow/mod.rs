//! Declarative task macros
//!
//! A recipe is a named list of agent actions. Parameters and the results of
//! earlier steps are spliced into later steps through `${...}` placeholders,
//! then the steps run one after another.

pub mod interpreter;
pub mod recipe;
pub mod substitute;

pub use interpreter::{Interpreter, RecipeRun, StepExecutor, StepFailure, StepOutcome};
pub use recipe::{ParameterSpec, Recipe, Step};
pub use substitute::{substitute, Scope};
