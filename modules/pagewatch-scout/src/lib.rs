pub mod checker;
pub mod cycle;
pub mod scheduling;
pub mod snippet;
pub mod tasks;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use checker::{CheckMode, CheckOutcome, StopReason, TaskChecker};
pub use cycle::CheckCycle;
pub use scheduling::scheduler::TaskScheduler;
pub use tasks::{normalize_task_url, TaskService};
pub use traits::TaskStore;
