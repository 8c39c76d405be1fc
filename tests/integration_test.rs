//! Tests de integración para el servidor HTTP
//! tests/integration_test.rs
//!
//! Cada test levanta su propio servidor en un puerto efímero de 127.0.0.1
//! y habla con él por TCP real.

use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tinyweb::server::bind_listener;
use tinyweb::{Method, Server};

/// Helper: arranca `server` en un thread y retorna su dirección
fn start(server: Server) -> SocketAddr {
    let listener = bind_listener("127.0.0.1", 0).expect("bind");
    let addr = listener.local_addr().expect("local_addr");
    thread::spawn(move || server.serve(listener));
    addr
}

/// Helper: envía los chunks (con una pausa entre ellos) y lee hasta EOF
fn send_chunks(addr: SocketAddr, chunks: &[&[u8]]) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut stream = TcpStream::connect(addr)?;
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;
    stream.set_write_timeout(Some(Duration::from_secs(5)))?;

    for (i, chunk) in chunks.iter().enumerate() {
        if i > 0 {
            thread::sleep(Duration::from_millis(50));
        }
        stream.write_all(chunk)?;
        stream.flush()?;
    }

    let mut response = Vec::new();
    stream.read_to_end(&mut response)?;
    Ok(response)
}

/// Helper: envía un request completo y retorna la response como texto
fn send_request(addr: SocketAddr, raw: &str) -> String {
    let bytes = send_chunks(addr, &[raw.as_bytes()]).expect("Failed to send request");
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Helper: extrae el body de una response HTTP
fn extract_body(response: &str) -> &str {
    match response.find("\r\n\r\n") {
        Some(pos) => &response[pos + 4..],
        None => "",
    }
}

fn header_value<'a>(response: &'a str, name: &str) -> Option<&'a str> {
    let head = &response[..response.find("\r\n\r\n")?];
    head.lines()
        .skip(1)
        .filter_map(|line| line.split_once(": "))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

#[test]
fn test_get_route() {
    let server = Server::new(2).unwrap();
    server.get("/", |_req, res| {
        res.set_body("Hello");
        Ok(())
    });
    let addr = start(server);

    let response = send_request(addr, "GET / HTTP/1.1\r\nHost: x\r\n\r\n");

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "got: {}", response);
    assert_eq!(header_value(&response, "Content-Type"), Some("text/plain"));
    assert_eq!(header_value(&response, "Content-Length"), Some("5"));
    assert_eq!(header_value(&response, "Connection"), Some("close"));
    assert_eq!(extract_body(&response), "Hello");
}

#[test]
fn test_unknown_route_is_404() {
    let server = Server::new(2).unwrap();
    server.get("/", |_req, res| {
        res.set_body("Hello");
        Ok(())
    });
    let addr = start(server);

    let response = send_request(addr, "GET /missing HTTP/1.1\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert_eq!(extract_body(&response), "404 Not Found");

    // Mismo path, otro método
    let response = send_request(addr, "POST / HTTP/1.1\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));

    // Sin normalizar la barra final
    let response = send_request(addr, "GET // HTTP/1.1\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
}

#[test]
fn test_reregister_replaces_handler_while_serving() {
    let server = Server::new(2).unwrap();
    server.get("/v", |_req, res| {
        res.set_body("one");
        Ok(())
    });
    let router = server.router();
    let addr = start(server);

    assert_eq!(extract_body(&send_request(addr, "GET /v HTTP/1.1\r\n\r\n")), "one");

    router.get("/v", |_req, res| {
        res.set_body("two");
        Ok(())
    });
    router.register(Method::PUT, "/late", |_req, res| {
        res.set_body("late");
        Ok(())
    });

    assert_eq!(extract_body(&send_request(addr, "GET /v HTTP/1.1\r\n\r\n")), "two");
    assert_eq!(extract_body(&send_request(addr, "PUT /late HTTP/1.1\r\n\r\n")), "late");
}

#[test]
fn test_post_body_split_across_writes() {
    let server = Server::new(2).unwrap();
    server.post("/echo", |req, res| {
        res.set_body(req.body().to_vec());
        Ok(())
    });
    let addr = start(server);

    let bytes = send_chunks(
        addr,
        &[
            b"POST /echo HTTP/1.1\r\nContent-Length: 11\r\n\r\nhello",
            b" wor",
            b"ld",
        ],
    )
    .unwrap();
    let response = String::from_utf8_lossy(&bytes);

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(extract_body(&response), "hello world");
}

#[test]
fn test_query_and_headers_reach_handler() {
    let server = Server::new(1).unwrap();
    server.get("/search", |req, res| {
        let body = format!(
            "{}|{}|{}",
            req.query_param("q").unwrap_or("-"),
            req.query_param("page").unwrap_or("-"),
            req.header("X-Token").unwrap_or("-"),
        );
        res.set_body(body);
        Ok(())
    });
    let addr = start(server);

    let response = send_request(
        addr,
        "GET /search?q=rust&page=2&flag HTTP/1.1\r\nX-Token:  abc\r\n\r\n",
    );

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(extract_body(&response), "rust|2|abc");
}

#[test]
fn test_static_file_served_with_mime() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("data.json");
    std::fs::write(&file, br#"{"k":1}"#).unwrap();

    let server = Server::new(2).unwrap();
    server.static_file("/data", &file);
    server.static_file("/gone", dir.path().join("missing.json"));
    let addr = start(server);

    let bytes = send_chunks(addr, &[b"GET /data HTTP/1.1\r\n\r\n"]).unwrap();
    let response = String::from_utf8_lossy(&bytes);
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(header_value(&response, "Content-Type"), Some("application/json"));
    assert_eq!(header_value(&response, "Content-Length"), Some("7"));
    assert_eq!(extract_body(&response), r#"{"k":1}"#);

    let response = send_request(addr, "GET /gone HTTP/1.1\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
}

#[test]
fn test_static_binary_file_bytes_exact() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("blob.bin");
    let content: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
    std::fs::write(&file, &content).unwrap();

    let server = Server::new(1).unwrap();
    server.static_file("/blob", &file);
    let addr = start(server);

    let bytes = send_chunks(addr, &[b"GET /blob HTTP/1.1\r\n\r\n"]).unwrap();
    let split = bytes
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("head terminator")
        + 4;

    let head = String::from_utf8_lossy(&bytes[..split]);
    assert!(head.contains("Content-Type: application/octet-stream\r\n"));
    assert!(head.contains("Content-Length: 20000\r\n"));
    assert_eq!(&bytes[split..], content.as_slice());
}

#[test]
fn test_handler_error_is_500_and_server_keeps_serving() {
    let server = Server::new(1).unwrap();
    server.get("/fail", |_req, _res| Err("boom".into()));
    server.get("/panic", |_req, _res| panic!("boom"));
    server.get("/ok", |_req, res| {
        res.set_body("still alive");
        Ok(())
    });
    let addr = start(server);

    let response = send_request(addr, "GET /fail HTTP/1.1\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    assert_eq!(extract_body(&response), "500 Internal Server Error");

    let response = send_request(addr, "GET /panic HTTP/1.1\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));

    // Un solo worker: si hubiera muerto, este request no se atendería
    let response = send_request(addr, "GET /ok HTTP/1.1\r\n\r\n");
    assert_eq!(extract_body(&response), "still alive");
}

#[test]
fn test_custom_status_and_headers() {
    let server = Server::new(1).unwrap();
    server.delete("/item", |_req, res| {
        res.set_status(204u16);
        Ok(())
    });
    server.get("/teapot", |_req, res| {
        res.set_status(418u16);
        res.add_header("X-Brew", "earl grey");
        Ok(())
    });
    let addr = start(server);

    let response = send_request(addr, "DELETE /item HTTP/1.1\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 204 No Content\r\n"));
    assert_eq!(header_value(&response, "Content-Length"), Some("0"));

    let response = send_request(addr, "GET /teapot HTTP/1.1\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 418 Unknown\r\n"));
    assert_eq!(header_value(&response, "X-Brew"), Some("earl grey"));
}

#[test]
fn test_connection_closes_after_one_response() {
    let server = Server::new(1).unwrap();
    server.get("/", |_req, res| {
        res.set_body("x");
        Ok(())
    });
    let addr = start(server);

    // El cliente pide keep-alive y no cierra su lado: el servidor cierra igual
    let bytes = send_chunks(addr, &[b"GET / HTTP/1.1\r\nConnection: keep-alive\r\n\r\n"]).unwrap();
    let response = String::from_utf8_lossy(&bytes);
    assert_eq!(header_value(&response, "Connection"), Some("close"));
    assert_eq!(extract_body(&response), "x");
}

#[test]
fn test_client_closing_without_data_is_ignored() {
    let server = Server::new(1).unwrap();
    server.get("/", |_req, res| {
        res.set_body("ok");
        Ok(())
    });
    let addr = start(server);

    let stream = TcpStream::connect(addr).unwrap();
    stream.shutdown(Shutdown::Both).unwrap();
    drop(stream);

    assert_eq!(extract_body(&send_request(addr, "GET / HTTP/1.1\r\n\r\n")), "ok");
}

#[test]
fn test_concurrent_clients() {
    let hits = Arc::new(AtomicUsize::new(0));
    let server = Server::new(4).unwrap();
    {
        let hits = Arc::clone(&hits);
        server.get("/slow", move |req, res| {
            thread::sleep(Duration::from_millis(100));
            hits.fetch_add(1, Ordering::SeqCst);
            res.set_body(req.query_param("id").unwrap_or("").to_string());
            Ok(())
        });
    }
    let addr = start(server);

    let clients: Vec<_> = (0..8)
        .map(|i| {
            thread::spawn(move || {
                let response = send_request(addr, &format!("GET /slow?id={} HTTP/1.1\r\n\r\n", i));
                assert_eq!(extract_body(&response), i.to_string());
            })
        })
        .collect();

    for client in clients {
        client.join().unwrap();
    }
    assert_eq!(hits.load(Ordering::SeqCst), 8);
}
