//! # Sistema de Workers
//! src/workers/mod.rs
//!
//! Pool de threads de tamaño fijo que convierte el trabajo bloqueante de
//! atender conexiones en concurrencia acotada.
//!
//! ```text
//! accept() → enqueue(task) → TaskQueue → worker-N → task()
//! ```

pub mod pool;
pub mod queue;

pub use pool::{ErrorHook, PoolError, TaskFailure, WorkerPool};
pub use queue::{Task, TaskQueue};
