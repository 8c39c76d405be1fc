//! # Manejo de Conexiones
//! src/server/connection.rs
//!
//! Orquesta una conexión completa dentro de un worker:
//!
//! ```text
//! READ_HEAD → (READ_BODY) → ROUTE → WRITE → CLOSED
//! ```
//!
//! - Si la primera lectura retorna 0 bytes o falla, se cierra sin responder.
//! - Cualquier error (o panic) al parsear o rutear se convierte en un 500.
//! - Los errores de archivo los resuelve `Response::write_to`.
//! - El stream se recibe por valor, así que se cierra en toda salida.

use crate::http::{Request, Response};
use crate::router::{HandlerError, Router};
use crate::workers::pool::panic_message;
use std::io::{Read, Write};
use std::panic::{self, AssertUnwindSafe};

/// Tamaño de la primera lectura del socket
const INITIAL_READ_SIZE: usize = 8192;

/// Atiende un único request/response sobre `stream`
pub fn handle_connection<S: Read + Write>(mut stream: S, router: &Router) {
    let mut buffer = [0u8; INITIAL_READ_SIZE];

    let bytes_read = match stream.read(&mut buffer) {
        Ok(0) => {
            tracing::trace!("conexión cerrada por el cliente sin datos");
            return;
        }
        Ok(n) => n,
        Err(e) => {
            tracing::debug!(error = %e, "error leyendo la conexión");
            return;
        }
    };

    let response = respond(&buffer[..bytes_read], &mut stream, router);

    if let Err(e) = response.write_to(&mut stream) {
        tracing::warn!(error = %e, "no se pudo enviar la respuesta");
    }
}

/// Parsea, rutea y traduce cualquier falla a un 500
fn respond<S: Read>(initial: &[u8], stream: &mut S, router: &Router) -> Response {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| -> Result<Response, HandlerError> {
        let request = Request::parse(initial, |buf| stream.read(buf))?;
        tracing::debug!(method = %request.method(), path = request.path(), "request recibido");
        router.route(&request)
    }));

    match outcome {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "error atendiendo el request");
            Response::internal_error()
        }
        Err(payload) => {
            tracing::error!(message = %panic_message(payload.as_ref()), "panic atendiendo el request");
            Response::internal_error()
        }
    }
}
