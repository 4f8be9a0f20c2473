// lib.rs - pipeline crate root
pub mod common;
pub mod data;
pub mod preprocess;
pub mod training;
pub mod inference;
pub mod evaluation;
pub mod api;

pub use common::{TitanicCode, TitanicError, TitanicResult};
