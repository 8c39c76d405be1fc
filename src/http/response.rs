//! # Construcción y Escritura de Respuestas HTTP
//! src/http/response.rs
//!
//! Una `Response` se crea por request (200 / body vacío / `text/plain`),
//! el handler la modifica y luego se serializa al socket.
//!
//! ## Formato en el cable
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Content-Type: application/json\r\n
//! Content-Length: 13\r\n
//! Connection: close\r\n
//! X-Extra: valor\r\n
//! \r\n
//! {"ok": true}
//! ```
//!
//! Los headers estándar siempre van primero y `Connection: close` siempre se
//! envía. Los headers extra se agregan después sin verificar colisiones: un
//! handler que agrega `Content-Type` produce una línea duplicada.
//!
//! El body puede venir de memoria o de un archivo. Con archivo, el
//! `Content-Length` se calcula al momento de escribir y el contenido se envía
//! por bloques sin cargarlo completo en memoria.

use super::status::reason_phrase;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Tamaño de cada bloque al hacer streaming de archivos
const FILE_CHUNK_SIZE: usize = 8192;

/// Respuesta que reemplaza a la original si el archivo no se puede leer
const FILE_ERROR_RESPONSE: &[u8] =
    b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

/// Content-Type por defecto
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// Respuesta HTTP/1.1
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,

    content_type: String,

    /// Body en memoria; se ignora si hay archivo
    body: Vec<u8>,

    /// Archivo a enviar en lugar del body
    file: Option<PathBuf>,

    /// Headers extra, escritos después de los estándar
    headers: BTreeMap<String, String>,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: 200,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            body: Vec::new(),
            file: None,
            headers: BTreeMap::new(),
        }
    }
}

impl Response {
    /// Crea la respuesta inicial: 200, body vacío, `text/plain`
    pub fn new() -> Self {
        Self::default()
    }

    /// Respuesta de texto plano con el código indicado
    ///
    /// # Ejemplo
    /// ```
    /// use tinyweb::http::{Response, StatusCode};
    ///
    /// let response = Response::text(StatusCode::NotFound, "404 Not Found");
    /// assert_eq!(response.status(), 404);
    /// assert_eq!(response.body(), b"404 Not Found");
    /// ```
    pub fn text(status: impl Into<u16>, body: &str) -> Self {
        Self::new().with_status(status).with_body(body)
    }

    /// 404 usado cuando no hay ruta o el archivo no existe
    pub fn not_found() -> Self {
        Self::text(404u16, "404 Not Found")
    }

    /// 500 usado cuando falla el parseo o el handler
    pub fn internal_error() -> Self {
        Self::text(500u16, "500 Internal Server Error")
    }

    // === Builders ===

    pub fn with_status(mut self, status: impl Into<u16>) -> Self {
        self.set_status(status);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.set_body(body);
        self
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.set_content_type(content_type);
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.add_header(name, value);
        self
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.set_file(path);
        self
    }

    // === Mutadores usados por los handlers ===

    pub fn set_status(&mut self, status: impl Into<u16>) {
        self.status = status.into();
    }

    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = body.into();
    }

    pub fn set_content_type(&mut self, content_type: &str) {
        self.content_type = content_type.to_string();
    }

    /// Agrega un header extra
    ///
    /// Si el nombre ya estaba entre los extra, se sobrescribe.
    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.insert(name.to_string(), value.to_string());
    }

    /// Marca un archivo para enviarlo como body
    pub fn set_file(&mut self, path: impl Into<PathBuf>) {
        self.file = Some(path.into());
    }

    // === Accesores ===

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Status line y headers, incluyendo la línea vacía final
    fn head(&self, content_length: u64) -> Vec<u8> {
        let mut head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n",
            self.status,
            reason_phrase(self.status),
            self.content_type,
            content_length
        );

        for (name, value) in &self.headers {
            head.push_str(name);
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }

        head.push_str("\r\n");
        head.into_bytes()
    }

    /// Serializa la respuesta con el body en memoria
    ///
    /// # Ejemplo
    /// ```
    /// use tinyweb::http::Response;
    ///
    /// let bytes = Response::new().with_body("Test").to_bytes();
    /// let text = String::from_utf8(bytes).unwrap();
    ///
    /// assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
    /// assert!(text.contains("Content-Length: 4\r\n"));
    /// assert!(text.ends_with("\r\n\r\nTest"));
    /// ```
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.head(self.body.len() as u64);
        bytes.extend_from_slice(&self.body);
        bytes
    }

    /// Escribe la respuesta completa en `out`
    ///
    /// Los errores retornados son fallas de transporte al escribir la status
    /// line o los headers. Un archivo que no se puede abrir produce un 500
    /// vacío; una desconexión durante el streaming corta el envío sin error.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        match &self.file {
            None => {
                out.write_all(&self.to_bytes())?;
                out.flush()
            }
            Some(path) => self.stream_file(path, out),
        }
    }

    /// Abre el archivo y toma su tamaño del mismo descriptor
    ///
    /// Solo acepta archivos regulares: un directorio se puede abrir y
    /// consultar, pero no leer.
    fn open_regular(path: &Path) -> io::Result<(File, u64)> {
        let file = File::open(path)?;
        let meta = file.metadata()?;
        if !meta.is_file() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"));
        }
        Ok((file, meta.len()))
    }

    fn stream_file<W: Write>(&self, path: &Path, out: &mut W) -> io::Result<()> {
        // El tamaño se toma ahora: el archivo pudo cambiar desde el registro.
        // El head solo se escribe si el archivo ya está abierto.
        let (file, size) = match Self::open_regular(path) {
            Ok(opened) => opened,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "no se pudo abrir el archivo");
                out.write_all(FILE_ERROR_RESPONSE)?;
                return out.flush();
            }
        };

        out.write_all(&self.head(size))?;

        // Nunca más bytes que el Content-Length anunciado
        let mut file = file.take(size);
        let mut chunk = [0u8; FILE_CHUNK_SIZE];

        loop {
            let n = match file.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "lectura del archivo interrumpida");
                    break;
                }
            };

            if let Err(e) = out.write_all(&chunk[..n]) {
                tracing::debug!(path = %path.display(), error = %e, "cliente desconectado durante el streaming");
                return Ok(());
            }
        }

        let _ = out.flush();
        Ok(())
    }
}
