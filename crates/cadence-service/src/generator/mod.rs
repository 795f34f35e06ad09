//! Generator lifecycle: validation, save-time reconciliation of already
//! materialized occurrences, generation and exception handling.

mod exceptions;
mod generate;
mod save;
mod validate;

pub use exceptions::{add_exception, remove_exception, reset_exceptions};
pub use generate::{create_occurrence, generate};
pub use save::{SaveOptions, delete_generator, save_generator};
pub use validate::validate_generator;
