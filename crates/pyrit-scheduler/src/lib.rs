//! The FIFO compute scheduler (component E) and its core workers
//! (component F), §4.5-§4.6.
//!
//! [`Scheduler`] owns the ingress/egress queues and slice accounting;
//! [`core::CoreWorker`] wraps a [`core::Solver`] in the generic
//! gather/solve/scatter loop every core class (CPU, accelerator, network)
//! shares (§9: no multiple inheritance, one capability trait).

pub mod core;
pub mod net;
pub mod scheduler;

pub use core::{adapt_buffer_size, selftest, validate_solver, CoreStats, CoreWorker, CpuSolver, Solver};
pub use scheduler::{GatherId, Scheduler};
