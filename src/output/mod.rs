//! Output schemas: strict-mode transformation and final-output validation.

mod schema;
mod validator;

pub use schema::{check_strict_compatible, transform_for_strict};
pub use validator::OutputSchema;
