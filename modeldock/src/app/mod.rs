//! Application facade.
//!
//! [`ModelDockApp`] wires the registry probe, the execution backend and the
//! transfer supervisor together and exposes the operations callers need:
//!
//! - submit, observe and cancel a transfer
//! - list the stored catalog
//! - delete entries or matching files, refusing paths an active transfer
//!   writes into
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      ModelDockApp                         │
//! │                                                           │
//! │  RegistrySizeProbe ──┐                                    │
//! │  (ReqwestClient)     ├──► TransferSupervisor ──► StatusStore
//! │  ExecutionBackend ───┘     (thread | subprocess)          │
//! │                                                           │
//! │  catalog::list_models / delete_entry / delete_matching    │
//! └──────────────────────────────────────────────────────────┘
//! ```

mod bootstrap;
mod config;
mod error;

pub use bootstrap::ModelDockApp;
pub use config::{AppConfig, SubprocessCommand};
pub use error::AppError;
