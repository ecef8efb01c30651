//! Transfer supervision and progress estimation.
//!
//! The bulk fetch is a blocking call with no progress callbacks. Progress is
//! therefore approximated from the outside: the registry's expected sizes are
//! fetched once, and the bytes landing on disk are measured on every tick.
//!
//! # Components
//!
//! - [`DiskScanner`] - measures bytes on disk for one repository
//! - [`ProgressEstimator`] - turns snapshots into percent, ETA and a label
//! - [`BulkFetch`] / [`HubFetcher`] - the opaque fetch primitive
//! - [`ExecutionBackend`] - where the fetch runs (thread or child process)
//! - [`TransferSupervisor`] - state machine and monitor loop
//! - [`StatusStore`] - the observable [`ProgressState`]
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use modeldock::transfer::{HubFetcher, SupervisorConfig, ThreadBackend, TransferSupervisor};
//!
//! let supervisor = Arc::new(TransferSupervisor::new(
//!     SupervisorConfig::new("/models", "/models/.cache"),
//!     probe,
//!     Arc::new(ThreadBackend::new(Arc::new(HubFetcher::new()))),
//! ));
//! supervisor.submit("TheBloke/Llama-2-7B-GGUF", "Q4_K_M")?;
//! let mut updates = supervisor.status().subscribe();
//! ```

mod backend;
mod error;
mod estimator;
mod fetch;
mod scanner;
mod state;
mod status;
mod supervisor;

pub use backend::{
    ExecutionBackend, SubprocessBackend, ThreadBackend, FETCH_EXIT_FAILURE, FETCH_EXIT_REGISTRY,
};
pub use error::{SubmitError, TransferError};
pub use estimator::{
    eta_seconds, Estimate, ProgressEstimator, HEURISTIC_BASE_PERCENT,
    HEURISTIC_BYTES_PER_PERCENT, HEURISTIC_MAX_PERCENT,
};
pub use fetch::{BulkFetch, FetchJob, FetchSummary, HubFetcher};
pub use scanner::{DiskScanner, DiskSnapshot};
pub use state::{Phase, ProgressState, MAX_IN_FLIGHT_PERCENT};
pub use status::StatusStore;
pub use supervisor::{SupervisorConfig, TransferSupervisor, TransferTicket};
