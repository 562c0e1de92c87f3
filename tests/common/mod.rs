//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use request_tracer::sink::TraceSink;
use request_tracer::trace::TraceLog;

/// Sink that captures emitted traces for assertions.
#[derive(Clone, Default)]
pub struct CaptureSink {
    logs: Arc<Mutex<Vec<TraceLog>>>,
}

impl CaptureSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn logs(&self) -> Vec<TraceLog> {
        self.logs.lock().unwrap().clone()
    }
}

impl TraceSink for CaptureSink {
    fn emit(&self, log: TraceLog) {
        self.logs.lock().unwrap().push(log);
    }
}

/// Start a mock upstream returning a fixed body, on an ephemeral port.
pub async fn start_mock_upstream(content_type: &'static str, body: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        // Drain the request head before answering.
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;

                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            content_type,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}
