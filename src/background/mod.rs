//! Background Tasks Module
//!
//! Periodic work running alongside the server: the cache sweep and the
//! overdue task scanner.

mod overdue;
mod sweep;

pub use overdue::{scan_overdue, spawn_overdue_scanner};
pub use sweep::spawn_sweep_task;
