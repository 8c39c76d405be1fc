//! # tinyweb
//! src/lib.rs
//!
//! Servidor HTTP/1.1 mínimo y embebible: cada conexión atiende un único
//! request y se cierra. Las conexiones se reparten entre un pool fijo de
//! workers.
//!
//! ## Arquitectura
//!
//! - `http`: Parsing del request y serialización de la response
//! - `router`: Tabla (método, path) → handler, segura entre threads
//! - `workers`: Pool de threads con cola FIFO bloqueante
//! - `server`: Socket de escucha, loop de accept y manejo de conexiones
//! - `config`: Configuración CLI/env del binario
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use tinyweb::Server;
//!
//! let server = Server::new(4).expect("no se pudo crear el pool");
//! server.get("/", |_req, res| {
//!     res.set_body("Hello, World!");
//!     Ok(())
//! });
//! server.static_file("/logo.png", "./public/logo.png");
//!
//! // Bloquea; solo retorna si no se pudo abrir el socket
//! server.listen(8080).expect("no se pudo escuchar");
//! ```

pub mod config;
pub mod http;
pub mod router;
pub mod server;
pub mod workers;

pub use http::{Method, Request, Response, StatusCode};
pub use router::{Handler, HandlerError, HandlerResult, Router};
pub use server::{Server, ServerError};
pub use workers::{PoolError, WorkerPool};
