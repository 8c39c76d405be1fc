//! # Servidor TCP
//! src/server/tcp.rs
//!
//! Socket de escucha + loop de accept. Cada conexión aceptada se entrega
//! como tarea al `WorkerPool`; el worker ejecuta `handle_connection`.
//!
//! - `SO_REUSEADDR` activado y backlog de 10 conexiones.
//! - Un `accept()` fallido se registra y el loop sigue.
//! - Si el pool rechaza la tarea, la conexión se cierra de inmediato.
//! - No hay apagado ordenado: el loop corre hasta que termina el proceso.

use super::connection::handle_connection;
use crate::config::Config;
use crate::http::{mime, Method, Request, Response, StatusCode};
use crate::router::{HandlerResult, Router};
use crate::workers::{PoolError, WorkerPool};
use socket2::{Domain, SockAddr, Socket, Type};
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Conexiones pendientes que acepta el kernel antes de rechazar
pub const LISTEN_BACKLOG: i32 = 10;

/// Host usado por `Server::listen`
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Errores al arrancar el servidor
///
/// Son fatales: si ocurren, el servidor no empieza a atender.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid listen address {addr}: {source}")]
    Address { addr: String, source: io::Error },

    #[error("failed to create socket: {0}")]
    Socket(#[source] io::Error),

    #[error("failed to bind to {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },

    #[error("failed to listen on {addr}: {source}")]
    Listen { addr: SocketAddr, source: io::Error },

    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Crea el socket de escucha para `host:port`
///
/// Usa la primera dirección que resuelva `host`.
pub fn bind_listener(host: &str, port: u16) -> Result<TcpListener, ServerError> {
    let address_error = |source| ServerError::Address {
        addr: format!("{}:{}", host, port),
        source,
    };

    let addr = (host, port)
        .to_socket_addrs()
        .map_err(address_error)?
        .next()
        .ok_or_else(|| address_error(io::Error::new(io::ErrorKind::NotFound, "no address resolved")))?;

    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, None).map_err(ServerError::Socket)?;
    socket.set_reuse_address(true).map_err(ServerError::Socket)?;
    socket
        .bind(&SockAddr::from(addr))
        .map_err(|source| ServerError::Bind { addr, source })?;
    socket
        .listen(LISTEN_BACKLOG)
        .map_err(|source| ServerError::Listen { addr, source })?;

    Ok(socket.into())
}

/// Handler que sirve un archivo del disco
///
/// La existencia se verifica en cada request: si el archivo no existe o no
/// es un archivo regular responde 404. El contenido se envía por streaming
/// con el tipo MIME según su extensión.
pub fn static_file_handler(file: PathBuf) -> impl Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static {
    move |_req: &Request, res: &mut Response| {
        if file.is_file() {
            res.set_status(StatusCode::Ok);
            res.set_content_type(mime::from_path(&file));
            res.set_file(file.clone());
        } else {
            *res = Response::not_found();
        }
        Ok(())
    }
}

/// Servidor HTTP/1.1 embebible
pub struct Server {
    router: Arc<Router>,
    pool: WorkerPool,

    /// Deadline de lectura/escritura por conexión (None = sin límite)
    io_timeout: Option<Duration>,
}

impl Server {
    /// Crea el servidor con `workers` threads
    pub fn new(workers: usize) -> Result<Self, ServerError> {
        Ok(Self::with_pool(WorkerPool::start(workers)?))
    }

    /// Crea el servidor sobre un pool ya iniciado
    ///
    /// Permite usar `WorkerPool::start_with_hook` para reportar las fallas
    /// de los workers a un destino propio.
    pub fn with_pool(pool: WorkerPool) -> Self {
        Self {
            router: Arc::new(Router::new()),
            pool,
            io_timeout: None,
        }
    }

    /// Crea el servidor con los workers y el timeout de la configuración
    pub fn from_config(config: &Config) -> Result<Self, ServerError> {
        Ok(Self::new(config.workers)?.with_io_timeout(config.io_timeout()))
    }

    /// Deadline de lectura y escritura para cada conexión
    pub fn with_io_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Número de workers que atienden conexiones
    pub fn thread_count(&self) -> usize {
        self.pool.thread_count()
    }

    /// Router compartido; admite registrar rutas mientras se atiende
    pub fn router(&self) -> Arc<Router> {
        Arc::clone(&self.router)
    }

    /// Registra una ruta para cualquier método
    pub fn route<F>(&self, method: Method, path: &str, handler: F)
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.router.register(method, path, handler);
    }

    pub fn get<F>(&self, path: &str, handler: F)
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.router.get(path, handler);
    }

    pub fn post<F>(&self, path: &str, handler: F)
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.router.post(path, handler);
    }

    pub fn put<F>(&self, path: &str, handler: F)
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.router.put(path, handler);
    }

    pub fn delete<F>(&self, path: &str, handler: F)
    where
        F: Fn(&Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.router.delete(path, handler);
    }

    /// Registra `GET path` para servir el archivo `file`
    pub fn static_file(&self, path: &str, file: impl Into<PathBuf>) {
        self.router.get(path, static_file_handler(file.into()));
    }

    /// Escucha en todas las interfaces
    ///
    /// Solo retorna si no se pudo abrir el socket.
    pub fn listen(&self, port: u16) -> Result<(), ServerError> {
        self.listen_on(DEFAULT_HOST, port)
    }

    /// Escucha en `host:port`
    ///
    /// Solo retorna si no se pudo abrir el socket.
    pub fn listen_on(&self, host: &str, port: u16) -> Result<(), ServerError> {
        let listener = bind_listener(host, port)?;
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(%addr, workers = self.thread_count(), "servidor escuchando");
        }
        self.serve(listener)
    }

    /// Loop de accept sobre un socket ya abierto
    pub fn serve(&self, listener: TcpListener) -> ! {
        loop {
            match listener.accept() {
                Ok((stream, peer)) => self.dispatch(stream, peer),
                Err(e) => tracing::warn!(error = %e, "error al aceptar conexión"),
            }
        }
    }

    fn dispatch(&self, stream: TcpStream, peer: SocketAddr) {
        tracing::debug!(%peer, "nueva conexión");

        if let Some(timeout) = self.io_timeout {
            if let Err(e) = stream
                .set_read_timeout(Some(timeout))
                .and_then(|_| stream.set_write_timeout(Some(timeout)))
            {
                tracing::warn!(%peer, error = %e, "no se pudo configurar el timeout");
            }
        }

        let router = Arc::clone(&self.router);
        // Si el pool rechaza la tarea, se suelta aquí junto con el stream
        if let Err(e) = self.pool.enqueue(move || handle_connection(stream, &router)) {
            tracing::error!(%peer, error = %e, "no se pudo encolar la conexión");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::Shutdown;
    use std::thread;

    fn spawn_server(server: Server) -> SocketAddr {
        let listener = bind_listener("127.0.0.1", 0).unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || server.serve(listener));
        addr
    }

    fn send(addr: SocketAddr, raw: &[u8]) -> String {
        let mut client = TcpStream::connect(addr).unwrap();
        client.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        client.write_all(raw).unwrap();
        client.shutdown(Shutdown::Write).unwrap();

        let mut buf = Vec::new();
        client.read_to_end(&mut buf).unwrap();
        String::from_utf8_lossy(&buf).into_owned()
    }

    #[test]
    fn test_bind_listener_ephemeral_port() {
        let listener = bind_listener("127.0.0.1", 0).unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }

    #[test]
    fn test_bind_conflict_is_fatal() {
        let first = bind_listener("127.0.0.1", 0).unwrap();
        let port = first.local_addr().unwrap().port();

        let second = bind_listener("127.0.0.1", port);
        assert!(matches!(second, Err(ServerError::Bind { .. })));
    }

    #[test]
    fn test_invalid_host() {
        let result = bind_listener("definitely not a host", 80);
        assert!(matches!(result, Err(ServerError::Address { .. })));
    }

    #[test]
    fn test_zero_workers_is_startup_error() {
        assert!(matches!(Server::new(0), Err(ServerError::Pool(PoolError::NoWorkers))));
    }

    #[test]
    fn test_static_file_handler() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("data.json");
        std::fs::write(&file, br#"{"k":1}"#).unwrap();

        let handler = static_file_handler(file.clone());
        let request = Request::from_bytes(b"GET /data HTTP/1.1\r\n\r\n").unwrap();

        let mut response = Response::new();
        handler(&request, &mut response).unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.content_type(), "application/json");
        assert_eq!(response.file(), Some(file.as_path()));

        std::fs::remove_file(&file).unwrap();
        let mut response = Response::new();
        handler(&request, &mut response).unwrap();
        assert_eq!(response, Response::not_found());
    }

    #[test]
    fn test_static_file_handler_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let handler = static_file_handler(dir.path().to_path_buf());
        let request = Request::from_bytes(b"GET /dir HTTP/1.1\r\n\r\n").unwrap();

        let mut response = Response::new();
        handler(&request, &mut response).unwrap();
        assert_eq!(response.status(), 404);
    }

    #[test]
    fn test_serve_end_to_end() {
        let server = Server::new(2).unwrap();
        server.get("/", |_req, res| {
            res.set_body("Hello");
            Ok(())
        });
        let addr = spawn_server(server);

        let text = send(addr, b"GET / HTTP/1.1\r\n\r\n");
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.ends_with("\r\n\r\nHello"));
    }

    #[test]
    fn test_with_pool_uses_given_pool() {
        let failures = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let pool = WorkerPool::start_with_hook(1, {
            let failures = Arc::clone(&failures);
            move |_failure: &crate::workers::TaskFailure| {
                failures.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }
        })
        .unwrap();

        let server = Server::with_pool(pool);
        assert_eq!(server.thread_count(), 1);

        server.get("/panic", |_req, _res| panic!("handler panicked"));
        server.get("/", |_req, res| {
            res.set_body("pooled");
            Ok(())
        });
        let addr = spawn_server(server);

        // El panic del handler se resuelve en la conexión, no llega al hook
        let text = send(addr, b"GET /panic HTTP/1.1\r\n\r\n");
        assert!(text.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));

        let text = send(addr, b"GET / HTTP/1.1\r\n\r\n");
        assert!(text.ends_with("\r\n\r\npooled"));
        assert_eq!(failures.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[test]
    fn test_io_timeout_releases_silent_client() {
        let server = Server::new(1).unwrap().with_io_timeout(Some(Duration::from_millis(100)));
        server.get("/ok", |_req, res| {
            res.set_body("ok");
            Ok(())
        });
        let addr = spawn_server(server);

        // Ocupa al único worker sin enviar nada
        let _silent = TcpStream::connect(addr).unwrap();

        let text = send(addr, b"GET /ok HTTP/1.1\r\n\r\n");
        assert!(text.ends_with("ok"));
    }
}
