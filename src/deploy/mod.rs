// ABOUTME: Deployment lifecycle: locking, the deploy sequence and background reconciliation.
// ABOUTME: Exports the error type shared by every lifecycle operation.

mod error;
mod lock;
mod reconciler;
mod sequencer;

pub use error::{DeployError, DeployErrorKind};
pub use lock::LockManager;
pub use reconciler::{DEFAULT_POLL_INTERVAL, Reconciler, SweepReport};
pub use sequencer::{DeployOptions, Sequencer, Submitted};
