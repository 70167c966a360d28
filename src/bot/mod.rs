//! Bot module - state, event routing and the runtime.

pub mod diagnostics;
pub mod dispatcher;
mod runtime;
pub mod state;

pub use diagnostics::{DiagnosticSink, Diagnostics, ThreadSink, TracingSink};
pub use dispatcher::{EventRouter, RouterError};
pub use runtime::{Extensions, run, run_with};
pub use state::AppState;
