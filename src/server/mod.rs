//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! Este módulo implementa el servidor TCP que:
//! 1. Escucha en un puerto
//! 2. Acepta conexiones entrantes
//! 3. Entrega cada conexión al pool de workers
//! 4. En el worker: lee, parsea, rutea y responde; luego cierra

pub mod connection;
pub mod tcp;

// Re-exportar para facilitar el uso
pub use connection::handle_connection;
pub use tcp::{bind_listener, static_file_handler, Server, ServerError, DEFAULT_HOST, LISTEN_BACKLOG};
