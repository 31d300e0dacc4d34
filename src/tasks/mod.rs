//! Background Tasks Module
//!
//! Contains background tasks that run periodically while a cache is alive.
//!
//! # Tasks
//! - TTL Sweep: Reclaims expired and invalidated entries at a fixed interval

mod sweep;

pub use sweep::{spawn_sweep_task, spawn_sweep_thread, Sweep, SweepHandle};
