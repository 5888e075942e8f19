//! End-to-end capture tests: client → proxy → mock backend.

use std::time::Duration;

use audit_proxy::config::ProxyConfig;
use reqwest::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

mod common;

use common::{response_body, summary};

#[tokio::test]
async fn get_json_is_relayed_and_logged() {
    let (backend, mut received) = common::start_recording_backend(
        b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 12\r\nConnection: close\r\n\r\n{\"ok\":true}\n",
    )
    .await;
    let proxy = common::start_proxy(format!("http://{}", backend)).await;

    let res = common::client().get(proxy.url("/items")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "application/json");
    assert_eq!(res.text().await.unwrap(), "{\"ok\":true}\n");

    let upstream_saw = received.recv().await.unwrap();
    assert_eq!(upstream_saw.request_line(), "GET /items HTTP/1.1");
    assert!(upstream_saw.body.is_empty());

    let records = proxy.records(1).await;
    let record = &records[0];
    assert!(record.starts_with("127.0.0.1 - - ["), "{}", record);
    assert!(summary(record).ends_with("\"GET /items HTTP/1.1\" 200 12"), "{}", record);
    assert!(!record.contains("\nBody:\n"));
    assert!(record.contains("Response header: \n"));
    assert!(record.contains("Content-Type: application/json\n"));
    assert_eq!(response_body(record), Some("{\"ok\":true}\n"));
}

#[tokio::test]
async fn post_body_reaches_upstream_and_empty_error_is_logged() {
    let (backend, mut received) = common::start_recording_backend(
        b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
    )
    .await;
    let proxy = common::start_proxy(format!("http://{}", backend)).await;

    let res = common::client()
        .post(proxy.url("/submit"))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("name=x")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(res.bytes().await.unwrap().is_empty());

    let upstream_saw = received.recv().await.unwrap();
    assert_eq!(upstream_saw.request_line(), "POST /submit HTTP/1.1");
    assert_eq!(upstream_saw.body, b"name=x");

    let records = proxy.records(1).await;
    let record = &records[0];
    assert!(summary(record).ends_with("\"POST /submit HTTP/1.1\" 500 0"), "{}", record);
    assert!(record.contains("Header:\n"));
    assert!(record.contains("Content-Type: application/x-www-form-urlencoded\n"));
    assert!(record.contains("\nBody:\nname=x\n"));
    assert_eq!(response_body(record), None);
}

#[tokio::test]
async fn large_request_body_is_forwarded_byte_for_byte() {
    let (backend, mut received) = common::start_recording_backend(
        b"HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n",
    )
    .await;
    let proxy = common::start_proxy(format!("http://{}", backend)).await;

    let payload: Vec<u8> = (0..256 * 1024).map(|i| b'a' + (i % 26) as u8).collect();
    let res = common::client()
        .put(proxy.url("/upload"))
        .body(payload.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let upstream_saw = received.recv().await.unwrap();
    assert_eq!(upstream_saw.body.len(), payload.len());
    assert!(upstream_saw.body == payload);

    proxy.records(1).await;
    let raw = &proxy.sink.records()[0];
    let marker = b"\nBody:\n";
    let start = raw
        .windows(marker.len())
        .position(|w| w == marker)
        .expect("record has a Body: block")
        + marker.len();
    assert!(raw[start..start + payload.len()] == payload[..]);
}

#[tokio::test]
async fn chunked_response_is_delivered_and_captured_identically() {
    let backend = common::start_streaming_backend("0123456789", 20, Duration::from_millis(5)).await;
    let proxy = common::start_proxy(format!("http://{}", backend)).await;

    let res = common::client().get(proxy.url("/stream")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get("content-length").is_none());
    let delivered = res.text().await.unwrap();
    assert_eq!(delivered, "0123456789".repeat(20));

    let records = proxy.records(1).await;
    let record = &records[0];
    assert!(summary(record).ends_with("\"GET /stream HTTP/1.1\" 200 200"), "{}", record);
    assert_eq!(response_body(record), Some(delivered.as_str()));
    assert!(!record.contains("Transfer-Encoding"));
}

#[tokio::test]
async fn client_disconnect_logs_partial_capture() {
    let backend = common::start_streaming_backend("chunk", 400, Duration::from_millis(20)).await;
    let proxy = common::start_proxy(format!("http://{}", backend)).await;

    let mut socket = TcpStream::connect(proxy.addr).await.unwrap();
    socket
        .write_all(b"GET /stream HTTP/1.1\r\nHost: proxy\r\n\r\n")
        .await
        .unwrap();

    let mut seen = Vec::new();
    let mut buf = [0u8; 1024];
    while !String::from_utf8_lossy(&seen).contains("chunk") {
        let n = socket.read(&mut buf).await.unwrap();
        assert!(n > 0, "proxy closed before first chunk");
        seen.extend_from_slice(&buf[..n]);
    }
    drop(socket);

    let records = proxy.records(1).await;
    let record = &records[0];
    let body = response_body(record).unwrap_or("");
    assert!(body.len() < "chunk".len() * 400);
    assert_eq!(body, "chunk".repeat(body.len() / "chunk".len()));
    assert!(
        summary(record).ends_with(&format!("\"GET /stream HTTP/1.1\" 200 {}", body.len())),
        "{}",
        record
    );

    // The proxy keeps serving after the disconnect.
    let mut socket = TcpStream::connect(proxy.addr).await.unwrap();
    socket
        .write_all(b"GET /again HTTP/1.1\r\nHost: proxy\r\n\r\n")
        .await
        .unwrap();
    let n = socket.read(&mut buf).await.unwrap();
    assert!(String::from_utf8_lossy(&buf[..n]).starts_with("HTTP/1.1 200"));
    drop(socket);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(proxy.records(2).await.len(), 2);
}

#[tokio::test]
async fn requests_are_retargeted_with_forwarding_headers() {
    let (backend, mut received) = common::start_recording_backend(
        b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
    )
    .await;
    let mut config = ProxyConfig::default();
    config.upstream.url = format!("http://{}/api?key=1", backend);
    let proxy = common::start_proxy_with(config).await;

    let res = common::client()
        .get(proxy.url("/v1/items?page=2"))
        .header("x-custom", "kept")
        .header("proxy-authorization", "Basic c2VjcmV0")
        .send()
        .await
        .unwrap();
    assert_eq!(res.text().await.unwrap(), "ok");

    let upstream_saw = received.recv().await.unwrap();
    assert_eq!(upstream_saw.request_line(), "GET /api/v1/items?key=1&page=2 HTTP/1.1");
    assert_eq!(upstream_saw.header("x-custom").as_deref(), Some("kept"));
    assert_eq!(upstream_saw.header("x-forwarded-for").as_deref(), Some("127.0.0.1"));
    assert_eq!(upstream_saw.header("proxy-authorization"), None);
    assert_eq!(
        upstream_saw.header("host"),
        Some(proxy.addr.to_string()),
        "inbound Host is forwarded unchanged"
    );

    // The snapshot keeps the request exactly as received.
    let records = proxy.records(1).await;
    assert!(records[0].contains("\"GET /v1/items?page=2 HTTP/1.1\" 200 2"));
    assert!(records[0].contains("Proxy-Authorization: Basic c2VjcmV0\n"));
}

#[tokio::test]
async fn concurrent_exchanges_do_not_mix() {
    let (backend, _received) = common::start_recording_backend(
        b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\nConnection: close\r\n\r\ndone",
    )
    .await;
    let proxy = common::start_proxy(format!("http://{}", backend)).await;
    let client = common::client();

    let mut tasks = Vec::new();
    for i in 0..16 {
        let client = client.clone();
        let url = proxy.url(&format!("/req/{}", i));
        tasks.push(tokio::spawn(async move {
            client
                .post(url)
                .body(format!("payload-{}", i))
                .send()
                .await
                .unwrap()
                .text()
                .await
                .unwrap()
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), "done");
    }

    let records = proxy.records(16).await;
    assert_eq!(records.len(), 16);
    for record in &records {
        let line = summary(record);
        let id = line
            .split("/req/")
            .nth(1)
            .and_then(|rest| rest.split(' ').next())
            .unwrap();
        assert!(
            record.contains(&format!("\nBody:\npayload-{}\n", id)),
            "record for /req/{} carries another request's body:\n{}",
            id,
            record
        );
    }
}

#[tokio::test]
async fn stalled_upstream_times_out_and_is_logged() {
    // Accepts connections but never answers.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let backend = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let mut config = ProxyConfig::default();
    config.upstream.url = format!("http://{}", backend);
    config.timeouts.upstream_secs = Some(1);
    let proxy = common::start_proxy_with(config).await;

    let res = common::client().get(proxy.url("/slow")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::GATEWAY_TIMEOUT);
    let body = res.text().await.unwrap();

    let records = proxy.records(1).await;
    assert!(
        summary(&records[0]).ends_with(&format!("\"GET /slow HTTP/1.1\" 504 {}", body.len())),
        "{}",
        records[0]
    );
}

#[tokio::test]
async fn client_leaving_before_upstream_answers_is_logged_as_bad_gateway() {
    // Accepts connections but never answers.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let backend = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    let proxy = common::start_proxy(format!("http://{}", backend)).await;

    let mut socket = TcpStream::connect(proxy.addr).await.unwrap();
    socket
        .write_all(b"GET /never HTTP/1.1\r\nHost: proxy\r\n\r\n")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    drop(socket);

    let records = proxy.records(1).await;
    let record = &records[0];
    assert!(
        summary(record).ends_with("\"GET /never HTTP/1.1\" 502 0"),
        "{}",
        record
    );
    assert!(record.ends_with("Response header: \n"), "{}", record);
}
