//! # tinyweb - Entry Point
//! src/main.rs
//!
//! Binario de demostración: arma un servidor con algunas rutas de ejemplo
//! y las rutas estáticas indicadas por configuración.

use serde::Serialize;
use std::time::Instant;
use tinyweb::config::Config;
use tinyweb::{Request, Response, Server, StatusCode};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Body de `GET /api/status`
#[derive(Serialize)]
struct StatusReport {
    status: &'static str,
    version: &'static str,
    workers: usize,
    uptime_secs: u64,
}

/// Body de `POST /api/echo`
#[derive(Serialize)]
struct EchoReport<'a> {
    method: &'a str,
    path: &'a str,
    length: usize,
    body: String,
}

fn json_response<T: Serialize>(res: &mut Response, value: &T) -> serde_json::Result<()> {
    res.set_content_type("application/json");
    res.set_body(serde_json::to_vec(value)?);
    Ok(())
}

fn register_demo_routes(server: &Server, workers: usize) {
    let started = Instant::now();

    server.get("/", |_req, res| {
        res.set_body("Hello from tinyweb!");
        Ok(())
    });

    server.get("/api/status", move |_req, res| {
        let report = StatusReport {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
            workers,
            uptime_secs: started.elapsed().as_secs(),
        };
        json_response(res, &report)?;
        Ok(())
    });

    server.post("/api/echo", |req: &Request, res: &mut Response| {
        let report = EchoReport {
            method: req.method().as_str(),
            path: req.path(),
            length: req.body().len(),
            body: String::from_utf8_lossy(req.body()).into_owned(),
        };
        json_response(res, &report)?;
        Ok(())
    });

    server.put("/api/update", |req, res| {
        res.set_body(format!("updated {} bytes", req.body().len()));
        Ok(())
    });

    server.delete("/api/delete", |_req, res| {
        res.set_status(StatusCode::NoContent);
        Ok(())
    });
}

fn main() {
    let config = Config::new();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "configuración inválida");
        std::process::exit(1);
    }
    config.print_summary();

    let server = match Server::from_config(&config) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "no se pudo crear el servidor");
            std::process::exit(1);
        }
    };

    register_demo_routes(&server, config.workers);

    // validate() ya verificó el formato de cada entrada
    for (route, file) in config.static_files().unwrap_or_default() {
        server.static_file(&route, file);
    }

    if let Err(e) = server.listen_on(&config.host, config.port) {
        tracing::error!(error = %e, "error fatal");
        std::process::exit(1);
    }
}
