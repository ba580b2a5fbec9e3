//! Expression tools domain.
//!
//! Expression tools are declared at runtime by callers: a name, a
//! description and a short expression such as `a * b`. They are stored in
//! [`ExpressionToolStore`] and run by [`ExpressionExecutor`], which binds the
//! caller's arguments as variables and evaluates the expression with the
//! small language in [`language`].

mod error;
mod executor;
pub mod language;
mod store;

pub use error::ExpressionError;
pub use executor::ExpressionExecutor;
pub use store::{ExpressionTool, ExpressionToolStore};
