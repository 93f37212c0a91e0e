//! Monitoring engine: probing, scheduling, and the state-owning actor.
//!
//! This module is responsible for:
//! - Executing HTTP/HTTPS health probes with bounded timeouts
//! - Scheduling sweeps (normal interval and the startup-watch burst)
//! - Owning target statuses and publishing snapshots to observers

pub mod checker;
pub mod engine;
pub mod scheduler;
pub mod types;

pub use engine::{EngineHandle, MonitorEngine};
pub use types::{EngineEvent, StatusSnapshot};
