//! # Parsing de Requests HTTP/1.1
//! src/http/request.rs
//!
//! Parser escrito a mano para el subconjunto de HTTP/1.1 que soporta el
//! servidor: un request por conexión, body delimitado por `Content-Length`.
//!
//! ## Formato de un Request
//!
//! ```text
//! POST /path?param1=value1&param2 HTTP/1.1\r\n
//! Host: localhost:8080\r\n
//! Content-Length: 5\r\n
//! \r\n
//! hello
//! ```
//!
//! ## Reglas
//!
//! 1. **Request Line**: `METHOD target VERSION`. La versión se guarda pero no
//!    se valida; siempre respondemos como HTTP/1.1.
//! 2. **Target**: se corta en el primer `?`. La query se separa por `&` y cada
//!    par por el primer `=`. No se hace percent-decoding.
//! 3. **Headers**: `Name: Value`, nombre tal cual llega (sin normalizar).
//!    Para claves repetidas (query o headers) gana la última.
//! 4. **Body**: si hay `Content-Length` válido se leen bytes adicionales con
//!    el callback hasta completarlo o hasta que la conexión no entregue más.

use memchr::memmem;
use std::collections::HashMap;
use std::fmt;
use std::io;
use thiserror::Error;

/// Separador entre headers y body
const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Tamaño de cada lectura adicional pedida al callback
const READ_CHUNK_SIZE: usize = 8192;

/// Métodos HTTP
///
/// Solo GET, POST, PUT y DELETE pueden tener rutas. Cualquier otro método se
/// conserva como texto en `Other` y nunca coincide con una ruta.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    GET,
    POST,
    PUT,
    DELETE,
    Other(String),
}

impl Method {
    /// Parsea un método desde el token de la request line
    ///
    /// La comparación distingue mayúsculas: `get` queda como `Other("get")`.
    pub fn parse(token: &str) -> Self {
        match token {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            other => Method::Other(other.to_string()),
        }
    }

    /// Convierte el método a string
    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::Other(token) => token,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errores que pueden ocurrir durante el parsing
///
/// Solo una request line inutilizable es un error. Todo lo demás
/// (Content-Length inválido, body incompleto, headers sin `:`) se degrada
/// a un parseo de mejor esfuerzo.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// No llegó ningún contenido útil
    #[error("Empty request")]
    EmptyRequest,

    /// Falta el método o el target
    #[error("Invalid request line: {0:?}")]
    InvalidRequestLine(String),
}

/// Request HTTP parseado
///
/// Se crea una vez por conexión y no se modifica después.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,

    /// Path sin la query (ej: "/search")
    path: String,

    /// Versión declarada por el cliente, sin validar
    version: String,

    query_params: HashMap<String, String>,

    headers: HashMap<String, String>,

    body: Vec<u8>,
}

impl Request {
    /// Parsea un request a partir de los bytes ya leídos
    ///
    /// `more` se invoca para pedir más bytes solo cuando el `Content-Length`
    /// declarado todavía no está completo. Un `Ok(0)` o un error del callback
    /// se interpreta como fin de datos: el request se retorna con el body
    /// parcial recibido.
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use tinyweb::http::Request;
    ///
    /// let mut rest = vec![b"lo".as_slice()];
    /// let request = Request::parse(
    ///     b"POST /echo HTTP/1.1\r\nContent-Length: 5\r\n\r\nhel",
    ///     |buf| {
    ///         let chunk = rest.pop().unwrap_or(b"");
    ///         buf[..chunk.len()].copy_from_slice(chunk);
    ///         Ok(chunk.len())
    ///     },
    /// ).unwrap();
    ///
    /// assert_eq!(request.body(), b"hello");
    /// ```
    pub fn parse<F>(initial: &[u8], mut more: F) -> Result<Self, ParseError>
    where
        F: FnMut(&mut [u8]) -> io::Result<usize>,
    {
        let head_end = memmem::find(initial, HEAD_TERMINATOR);
        let head_bytes = match head_end {
            Some(end) => &initial[..end],
            None => initial,
        };
        let head = String::from_utf8_lossy(head_bytes);

        let mut lines = head.split('\n').map(|line| line.strip_suffix('\r').unwrap_or(line));

        // 1. Request line
        let request_line = lines.next().unwrap_or_default();
        let (method, target, version) = Self::parse_request_line(request_line)?;
        let (path, query_params) = Self::parse_target(target);

        // 2. Headers hasta la línea vacía o el fin de los datos
        let headers = Self::parse_headers(lines);

        // 3. Body
        let mut body = match head_end {
            Some(end) => initial[end + HEAD_TERMINATOR.len()..].to_vec(),
            None => Vec::new(),
        };

        if head_end.is_some() {
            if let Some(expected) = Self::declared_length(&headers) {
                Self::read_remaining_body(&mut body, expected, &mut more);
                body.truncate(expected);
            }
        }

        Ok(Request {
            method,
            path,
            version,
            query_params,
            headers,
            body,
        })
    }

    /// Parsea un request completo que ya está en memoria
    ///
    /// # Ejemplo
    /// ```
    /// use tinyweb::http::Request;
    ///
    /// let request = Request::from_bytes(b"GET /a?x=1&y=2 HTTP/1.1\r\nHost: h\r\n\r\n").unwrap();
    /// assert_eq!(request.path(), "/a");
    /// assert_eq!(request.query_param("y"), Some("2"));
    /// assert_eq!(request.header("Host"), Some("h"));
    /// ```
    pub fn from_bytes(raw: &[u8]) -> Result<Self, ParseError> {
        Self::parse(raw, |_| Ok(0))
    }

    fn parse_request_line(line: &str) -> Result<(Method, &str, String), ParseError> {
        if line.trim().is_empty() {
            return Err(ParseError::EmptyRequest);
        }

        let mut parts = line.split_whitespace();
        let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
            return Err(ParseError::InvalidRequestLine(line.to_string()));
        };
        let version = parts.next().unwrap_or_default().to_string();

        Ok((Method::parse(method), target, version))
    }

    /// Separa el target en path y query parameters
    ///
    /// La query se toma del target original, antes de recortar el path.
    fn parse_target(target: &str) -> (String, HashMap<String, String>) {
        match target.split_once('?') {
            Some((path, query)) => (path.to_string(), Self::parse_query_string(query)),
            None => (target.to_string(), HashMap::new()),
        }
    }

    fn parse_query_string(query: &str) -> HashMap<String, String> {
        let mut params = HashMap::new();

        for pair in query.split('&') {
            if pair.is_empty() {
                continue;
            }

            // Parámetro sin '=' (ej: "?debug") queda con valor vacío
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            params.insert(key.to_string(), value.to_string());
        }

        params
    }

    fn parse_headers<'a>(lines: impl Iterator<Item = &'a str>) -> HashMap<String, String> {
        let mut headers = HashMap::new();

        for line in lines {
            if line.is_empty() {
                break;
            }

            // Líneas sin ':' se ignoran
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim_start_matches([' ', '\t']);
            headers.insert(name.to_string(), value.to_string());
        }

        headers
    }

    /// Content-Length declarado, si existe y es un entero no negativo
    ///
    /// Solo se reconocen las grafías `Content-Length` y `content-length`.
    fn declared_length(headers: &HashMap<String, String>) -> Option<usize> {
        let raw = headers
            .get("Content-Length")
            .or_else(|| headers.get("content-length"))?;

        raw.trim_matches([' ', '\t']).parse::<usize>().ok()
    }

    fn read_remaining_body<F>(body: &mut Vec<u8>, expected: usize, more: &mut F)
    where
        F: FnMut(&mut [u8]) -> io::Result<usize>,
    {
        let mut chunk = [0u8; READ_CHUNK_SIZE];

        while body.len() < expected {
            match more(&mut chunk) {
                Ok(0) => break,
                Ok(n) => body.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::debug!(error = %e, "lectura del body interrumpida");
                    break;
                }
            }
        }

        if body.len() < expected {
            tracing::debug!(
                expected,
                received = body.len(),
                "body incompleto, se continúa con lo recibido"
            );
        }
    }

    // === Métodos públicos para acceder a los campos ===

    /// Obtiene el método HTTP del request
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Obtiene el path del request (sin query)
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Obtiene la versión HTTP declarada
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    /// Obtiene un query parameter específico
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(|s| s.as_str())
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Obtiene un header por su nombre exacto
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|s| s.as_str())
    }

    /// Obtiene el body del request
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Obtiene el body como texto, si es UTF-8 válido
    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}
