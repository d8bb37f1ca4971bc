use audio_notes_server::config::ServerConfig;
use audio_notes_server::server::Server;
use audio_notes_server::services::processor::PlaceholderProcessor;
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

async fn get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        path
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).to_string()
}

#[tokio::test]
async fn test_bind_creates_upload_dir() {
    let root = TempDir::new().unwrap();
    let upload_dir = root.path().join("nested").join("uploads");

    let server = Server::bind(
        ServerConfig::development(&upload_dir),
        Arc::new(PlaceholderProcessor),
    )
    .await
    .unwrap();

    assert!(upload_dir.is_dir());
    assert_ne!(server.local_addr().port(), 0);
}

#[tokio::test]
async fn test_independent_instances_start_and_stop() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();

    let a = Server::bind(
        ServerConfig::development(dir_a.path()),
        Arc::new(PlaceholderProcessor),
    )
    .await
    .unwrap()
    .start();
    let b = Server::bind(
        ServerConfig::development(dir_b.path()),
        Arc::new(PlaceholderProcessor),
    )
    .await
    .unwrap()
    .start();

    assert_ne!(a.local_addr(), b.local_addr());

    let response = get(a.local_addr(), "/health").await;
    assert!(response.starts_with("HTTP/1.1 200"), "{}", response);
    assert!(response.contains("\"status\":\"ok\""));

    let addr_a = a.local_addr();
    a.stop().await.unwrap();
    assert!(TcpStream::connect(addr_a).await.is_err());

    // The other instance is unaffected.
    let response = get(b.local_addr(), "/health").await;
    assert!(response.starts_with("HTTP/1.1 200"), "{}", response);

    b.stop().await.unwrap();
}

#[tokio::test]
async fn test_startup_sweep_removes_orphaned_uploads() {
    let dir = TempDir::new().unwrap();
    let orphan = dir.path().join("upload-orphan.part");
    std::fs::write(&orphan, b"left behind by a crash").unwrap();

    let mut config = ServerConfig::development(dir.path());
    config.stale_upload_age = std::time::Duration::ZERO;

    let handle = Server::bind(config, Arc::new(PlaceholderProcessor))
        .await
        .unwrap()
        .start();

    let mut removed = false;
    for _ in 0..50 {
        if !orphan.exists() {
            removed = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    handle.stop().await.unwrap();
    assert!(removed, "startup sweep should remove orphaned uploads");
}
