//! # Sistema de Routing
//! src/router/mod.rs
//!
//! Este módulo implementa el router que mapea (método, path) a handlers.
//!
//! ## Arquitectura
//!
//! ```text
//! Request → Router → Handler(&Request, &mut Response) → Response
//! ```
//!
//! - Una tabla por método (GET, POST, PUT, DELETE), todas protegidas por un
//!   único `RwLock`.
//! - El path se compara por igualdad exacta: sin prefijos, sin patrones, sin
//!   normalizar `/` final. `/foo` y `/foo/` son rutas distintas.
//! - Registrar dos veces el mismo (método, path) reemplaza el handler anterior.
//! - El lock solo se toma para buscar o modificar la tabla; el handler se
//!   ejecuta sin ningún lock del router.

use crate::http::{Method, Request, Response};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Error que puede retornar un handler
///
/// Cualquier error convierte la respuesta en un 500.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Resultado de un handler
pub type HandlerResult = Result<(), HandlerError>;

/// Tipo de función handler
///
/// Recibe el request y una respuesta ya inicializada (200, body vacío,
/// `text/plain`) que modifica en el lugar.
pub type Handler = Arc<dyn Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static>;

/// Las cuatro tablas de rutas
#[derive(Default)]
struct RouteTable {
    get: HashMap<String, Handler>,
    post: HashMap<String, Handler>,
    put: HashMap<String, Handler>,
    delete: HashMap<String, Handler>,
}

impl RouteTable {
    fn map(&self, method: &Method) -> Option<&HashMap<String, Handler>> {
        match method {
            Method::GET => Some(&self.get),
            Method::POST => Some(&self.post),
            Method::PUT => Some(&self.put),
            Method::DELETE => Some(&self.delete),
            Method::Other(_) => None,
        }
    }

    fn map_mut(&mut self, method: &Method) -> Option<&mut HashMap<String, Handler>> {
        match method {
            Method::GET => Some(&mut self.get),
            Method::POST => Some(&mut self.post),
            Method::PUT => Some(&mut self.put),
            Method::DELETE => Some(&mut self.delete),
            Method::Other(_) => None,
        }
    }

    fn len(&self) -> usize {
        self.get.len() + self.post.len() + self.put.len() + self.delete.len()
    }
}

/// Router thread-safe
///
/// Se puede registrar y rutear concurrentemente desde varios threads.
#[derive(Default)]
pub struct Router {
    table: RwLock<RouteTable>,
}

impl Router {
    /// Crea un nuevo router vacío
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra una ruta con su handler
    ///
    /// Si ya existía un handler para el mismo (método, path) se reemplaza.
    /// Los métodos fuera de GET/POST/PUT/DELETE no se pueden registrar y se
    /// ignoran con un warning.
    ///
    /// # Ejemplo
    /// ```
    /// use tinyweb::http::{Method, Request, Response};
    /// use tinyweb::router::Router;
    ///
    /// let router = Router::new();
    /// router.register(Method::GET, "/hello", |_req: &Request, res: &mut Response| {
    ///     res.set_body("Hello");
    ///     Ok(())
    /// });
    ///
    /// assert!(router.has_route(&Method::GET, "/hello"));
    /// ```
    pub fn register<F>(&self, method: Method, path: &str, handler: F)
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);

        match table.map_mut(&method) {
            Some(routes) => {
                if routes.insert(path.to_string(), Arc::new(handler)).is_some() {
                    tracing::debug!(%method, path, "ruta reemplazada");
                }
            }
            None => tracing::warn!(%method, path, "método no soportado, ruta ignorada"),
        }
    }

    pub fn get<F>(&self, path: &str, handler: F)
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(Method::GET, path, handler);
    }

    pub fn post<F>(&self, path: &str, handler: F)
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(Method::POST, path, handler);
    }

    pub fn put<F>(&self, path: &str, handler: F)
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(Method::PUT, path, handler);
    }

    pub fn delete<F>(&self, path: &str, handler: F)
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(Method::DELETE, path, handler);
    }

    /// Busca el handler; el lock se libera antes de retornar
    fn lookup(&self, method: &Method, path: &str) -> Option<Handler> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        table.map(method)?.get(path).cloned()
    }

    /// Encuentra y ejecuta el handler apropiado para un request
    ///
    /// Sin ruta retorna 404 con body `404 Not Found`. Si el handler falla, el
    /// error se propaga para que la conexión responda 500.
    pub fn route(&self, request: &Request) -> Result<Response, HandlerError> {
        let Some(handler) = self.lookup(request.method(), request.path()) else {
            return Ok(Response::not_found());
        };

        let mut response = Response::new();
        handler(request, &mut response)?;
        Ok(response)
    }

    /// Indica si existe una ruta para (método, path)
    pub fn has_route(&self, method: &Method, path: &str) -> bool {
        self.lookup(method, path).is_some()
    }

    /// Total de rutas registradas en las cuatro tablas
    pub fn count(&self) -> usize {
        self.table.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}
