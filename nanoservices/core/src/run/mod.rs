pub mod executor;
pub mod retry;
pub mod state;

pub use executor::{CancelHandle, Executor, RunDefaults};
pub use retry::RetryPolicy;
pub use state::{RunOutcome, RunReport, RunState, TaskReport, TaskState};
