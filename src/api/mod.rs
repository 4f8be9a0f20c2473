//! User-facing entry points: the command line and the single-passenger form.

pub mod cli;
pub mod form;

pub use cli::{run, run_pipeline, Cli, Command};
pub use form::{FormArgs, FormInput};
