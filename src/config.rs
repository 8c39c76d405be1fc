//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración del binario de ejemplo con soporte para argumentos CLI y
//! variables de entorno.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./tinyweb --port 8080 \
//!   --workers 8 \
//!   --static /=./public/index.html \
//!   --static /logo.png=./public/logo.png
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 HTTP_HOST=127.0.0.1 WORKERS=8 ./tinyweb
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Configuración del servidor
#[derive(Debug, Clone, Parser)]
#[command(name = "tinyweb")]
#[command(about = "Servidor HTTP/1.1 embebible con pool de workers")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Puerto en el que escucha el servidor
    #[arg(short, long, default_value = "8080", env = "HTTP_PORT")]
    pub port: u16,

    /// Host/IP en el que escucha
    #[arg(long, default_value = "0.0.0.0", env = "HTTP_HOST")]
    pub host: String,

    /// Número de workers que atienden conexiones
    #[arg(short, long, default_value = "4", env = "WORKERS")]
    pub workers: usize,

    /// Timeout de lectura/escritura por conexión en milisegundos (0 = sin límite)
    #[arg(long = "io-timeout", default_value = "0", env = "IO_TIMEOUT_MS")]
    pub io_timeout_ms: u64,

    /// Rutas estáticas con formato RUTA=ARCHIVO (repetible)
    #[arg(long = "static", value_name = "ROUTE=FILE", env = "STATIC_ROUTES", value_delimiter = ',')]
    pub static_routes: Vec<String>,

    /// Nivel de log si RUST_LOG no está definido
    #[arg(long = "log-level", default_value = "info", env = "LOG_LEVEL")]
    pub log_level: String,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Obtiene la dirección completa para bind (host:port)
    ///
    /// # Ejemplo
    ///
    /// ```rust
    /// use tinyweb::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.address(), "0.0.0.0:8080");
    /// ```
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Timeout por conexión, `None` si está desactivado
    pub fn io_timeout(&self) -> Option<Duration> {
        (self.io_timeout_ms > 0).then(|| Duration::from_millis(self.io_timeout_ms))
    }

    /// Separa cada `RUTA=ARCHIVO` en sus dos partes
    pub fn static_files(&self) -> Result<Vec<(String, PathBuf)>, String> {
        self.static_routes
            .iter()
            .map(|entry| Self::parse_static_route(entry))
            .collect()
    }

    fn parse_static_route(entry: &str) -> Result<(String, PathBuf), String> {
        let Some((route, file)) = entry.split_once('=') else {
            return Err(format!("Static route must be ROUTE=FILE: {}", entry));
        };

        if !route.starts_with('/') {
            return Err(format!("Static route must start with '/': {}", entry));
        }
        if file.is_empty() {
            return Err(format!("Static route is missing the file: {}", entry));
        }

        Ok((route.to_string(), PathBuf::from(file)))
    }

    /// Valida la configuración
    ///
    /// Retorna errores si hay valores inválidos
    pub fn validate(&self) -> Result<(), String> {
        if self.workers == 0 {
            return Err("Workers must be >= 1".to_string());
        }

        if self.host.trim().is_empty() {
            return Err("Host must not be empty".to_string());
        }

        self.static_files()?;

        Ok(())
    }

    /// Registra un resumen de la configuración
    pub fn print_summary(&self) {
        tracing::info!(address = %self.address(), workers = self.workers, "configuración de red");

        match self.io_timeout() {
            Some(timeout) => tracing::info!(?timeout, "timeout por conexión"),
            None => tracing::info!("timeout por conexión: desactivado"),
        }

        for entry in &self.static_routes {
            tracing::info!(route = %entry, "ruta estática");
        }
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
            workers: 4,
            io_timeout_ms: 0,
            static_routes: Vec::new(),
            log_level: "info".to_string(),
        }
    }
}
