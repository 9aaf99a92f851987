//! Error accumulation and validator orchestration.
//!
//! # Sub-modules
//!
//! - [`context`] - [`ValidationContext`] and [`ValidationError`].
//! - [`kind`] - The [`ErrorKind`] discriminator.
//! - [`pipeline`] - The [`Validator`] trait and [`ValidationPipeline`].

pub mod context;
pub mod kind;
pub mod pipeline;

pub use context::{FileRoot, ValidationContext, ValidationError};
pub use kind::ErrorKind;
pub use pipeline::{ValidationPipeline, Validator, ValidatorFailure};
