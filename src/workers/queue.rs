//! # Cola de Tareas
//! src/workers/queue.rs
//!
//! Cola FIFO thread-safe que comparten los workers del pool.
//! Sin límite de capacidad: el control de admisión queda del lado de quien
//! embebe el servidor.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Unidad de trabajo: el manejo completo de una conexión
pub type Task = Box<dyn FnOnce() + Send + 'static>;

struct QueueState {
    tasks: VecDeque<Task>,

    /// Una vez cerrada no acepta más tareas
    closed: bool,
}

/// Cola FIFO con bloqueo
pub struct TaskQueue {
    state: Mutex<QueueState>,

    /// Condvar para notificar nuevas tareas o el cierre
    condvar: Condvar,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                tasks: VecDeque::new(),
                closed: false,
            }),
            condvar: Condvar::new(),
        }
    }

    // Las tareas corren fuera del lock, así que un panic no deja el estado a medias
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Encola una tarea y despierta a un worker
    ///
    /// Si la cola está cerrada retorna la tarea sin ejecutarla.
    pub fn push(&self, task: Task) -> Result<(), Task> {
        {
            let mut state = self.lock();
            if state.closed {
                return Err(task);
            }
            state.tasks.push_back(task);
        }

        self.condvar.notify_one();
        Ok(())
    }

    /// Desencola la tarea más antigua
    ///
    /// Bloquea mientras la cola esté vacía y abierta. Retorna `None` solo
    /// cuando la cola está cerrada y ya no quedan tareas.
    pub fn pop(&self) -> Option<Task> {
        let mut state = self.lock();

        loop {
            if let Some(task) = state.tasks.pop_front() {
                return Some(task);
            }
            if state.closed {
                return None;
            }

            state = self.condvar.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Cierra la cola y despierta a todos los workers
    pub fn close(&self) {
        self.lock().closed = true;
        self.condvar.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Tareas pendientes
    pub fn len(&self) -> usize {
        self.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
