//! # Módulo HTTP
//!
//! Este módulo implementa el subconjunto de HTTP/1.1 que usa el servidor,
//! sin usar librerías de alto nivel. Incluye:
//!
//! - Parsing de requests (con body delimitado por `Content-Length`)
//! - Construcción y escritura de responses (body en memoria o archivo)
//! - Reason phrases de los status codes
//! - Tipos MIME por extensión
//!
//! ## Lo que no soporta
//!
//! - Keep-alive: cada conexión atiende un request y se cierra
//! - Chunked transfer encoding
//! - Percent-decoding de la query
//!
//! ### Formato de Request
//!
//! ```text
//! GET /path?query=value HTTP/1.1\r\n
//! Header-Name: Header-Value\r\n
//! \r\n
//! ```
//!
//! ### Formato de Response
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Content-Type: text/plain\r\n
//! Content-Length: 5\r\n
//! Connection: close\r\n
//! \r\n
//! hello
//! ```

pub mod mime;
pub mod request;
pub mod response;
pub mod status;

pub use request::{Method, ParseError, Request};
pub use response::Response;
pub use status::{reason_phrase, StatusCode};
