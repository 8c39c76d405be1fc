//! # Pool de Workers
//! src/workers/pool.rs
//!
//! Número fijo de threads de larga vida que consumen la `TaskQueue`.
//!
//! ## Ciclo de vida
//!
//! 1. `start(n)` lanza exactamente `n` workers antes de retornar.
//! 2. `enqueue(task)` agrega la tarea y despierta a un worker. Con el pool
//!    detenido falla con `PoolError::Closed` y la tarea se descarta sin
//!    ejecutarse (al soltarla se cierra el socket que capture).
//! 3. `shutdown()` cierra la cola, deja que los workers la vacíen y espera
//!    a que todos terminen. También se llama al soltar el pool.
//!
//! Un panic dentro de una tarea no mata al worker: se atrapa, se reporta al
//! hook de errores y el worker vuelve a esperar la siguiente tarea.

use super::queue::{Task, TaskQueue};
use std::any::Any;
use std::io;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use thiserror::Error;

/// Errores del pool
#[derive(Debug, Error)]
pub enum PoolError {
    /// El pool ya fue detenido
    #[error("pool closed")]
    Closed,

    /// Se pidió un pool sin workers
    #[error("worker pool needs at least one worker")]
    NoWorkers,

    /// El sistema operativo no pudo crear un thread
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] io::Error),
}

/// Falla de una tarea, entregada al hook de errores
#[derive(Debug, Clone)]
pub struct TaskFailure {
    /// Nombre del thread que ejecutaba la tarea
    pub worker: String,

    /// Mensaje del panic
    pub message: String,
}

/// Hook que recibe las fallas de tareas
pub type ErrorHook = Arc<dyn Fn(&TaskFailure) + Send + Sync + 'static>;

struct Worker {
    name: String,
    handle: thread::JoinHandle<()>,
}

/// Pool de tamaño fijo
pub struct WorkerPool {
    queue: Arc<TaskQueue>,
    workers: Mutex<Vec<Worker>>,
    size: usize,
}

impl WorkerPool {
    /// Lanza `size` workers que reportan fallas con `tracing`
    pub fn start(size: usize) -> Result<Self, PoolError> {
        Self::start_with_hook(size, |failure: &TaskFailure| {
            tracing::error!(worker = %failure.worker, message = %failure.message, "tarea falló");
        })
    }

    /// Lanza `size` workers con un hook de errores propio
    pub fn start_with_hook<H>(size: usize, hook: H) -> Result<Self, PoolError>
    where
        H: Fn(&TaskFailure) + Send + Sync + 'static,
    {
        if size == 0 {
            return Err(PoolError::NoWorkers);
        }

        let queue = Arc::new(TaskQueue::new());
        let hook: ErrorHook = Arc::new(hook);
        let mut workers = Vec::with_capacity(size);

        for id in 0..size {
            let name = format!("worker-{}", id);
            let spawned = thread::Builder::new().name(name.clone()).spawn({
                let queue = Arc::clone(&queue);
                let hook = Arc::clone(&hook);
                let name = name.clone();
                move || Self::worker_loop(&name, &queue, &hook)
            });

            match spawned {
                Ok(handle) => workers.push(Worker { name, handle }),
                Err(e) => {
                    // Los workers ya lanzados no deben quedar colgados en la cola
                    queue.close();
                    for worker in workers {
                        let _ = worker.handle.join();
                    }
                    return Err(PoolError::Spawn(e));
                }
            }
        }

        tracing::debug!(workers = size, "pool de workers iniciado");

        Ok(Self {
            queue,
            workers: Mutex::new(workers),
            size,
        })
    }

    /// Loop principal del worker
    fn worker_loop(name: &str, queue: &TaskQueue, hook: &ErrorHook) {
        tracing::trace!(worker = name, "worker iniciado");

        while let Some(task) = queue.pop() {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
                let failure = TaskFailure {
                    worker: name.to_string(),
                    message: panic_message(payload.as_ref()),
                };
                hook(&failure);
            }
        }

        tracing::trace!(worker = name, "worker terminado");
    }

    /// Encola una tarea
    ///
    /// # Errores
    ///
    /// `PoolError::Closed` si el pool ya fue detenido. La tarea no se ejecuta.
    pub fn enqueue<F>(&self, task: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        let task: Task = Box::new(task);
        self.queue.push(task).map_err(|_rejected| PoolError::Closed)
    }

    /// Detiene el pool y espera a que los workers terminen
    ///
    /// Las tareas ya encoladas se ejecutan antes de que los workers salgan.
    /// Llamarlo más de una vez no tiene efecto.
    pub fn shutdown(&self) {
        self.queue.close();

        let workers = mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));
        if workers.is_empty() {
            return;
        }

        let current = thread::current().id();
        for worker in workers {
            // Un worker no puede esperarse a sí mismo
            if worker.handle.thread().id() == current {
                continue;
            }
            if worker.handle.join().is_err() {
                tracing::error!(worker = %worker.name, "worker terminó con panic");
            }
        }

        tracing::debug!("pool de workers detenido");
    }

    /// Número de workers del pool
    pub fn thread_count(&self) -> usize {
        self.size
    }

    /// Tareas esperando un worker
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Extrae el mensaje de un panic
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic sin mensaje".to_string()
    }
}
