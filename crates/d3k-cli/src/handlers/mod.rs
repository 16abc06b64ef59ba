//! Command handlers.
//!
//! Each handler takes the shared [`CliContext`](crate::bootstrap::CliContext),
//! calls into the runtime crate and formats the result for the terminal or
//! as JSON. No log parsing or classification happens here.

pub mod errors;
pub mod list;
pub mod logs;
pub mod paths;
pub mod rotate;
pub mod run;
pub mod sessions;
pub mod tail;
