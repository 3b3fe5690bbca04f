//! The stream-walking engine: active-step resolution, cursor transitions,
//! the recursive step runner, and whole-flow information extraction.

mod extract;
mod next;
mod resolve;
mod runner;

pub use extract::extract_all;
pub use next::next_cursor;
pub use resolve::{is_stream, resolve_active, Active};
pub use runner::run;

pub(crate) use runner::dispatch_prompt;
