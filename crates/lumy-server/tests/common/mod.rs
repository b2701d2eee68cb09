//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::{SinkExt, StreamExt};
use lumy_pipeline::{
    Backend, EngineBackend, InMemoryDataRegistry, LocalEngine, MockBackend, WorkflowCatalog,
};
use lumy_server::{AppState, Server, ServerConfig};
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

/// Page `P` binds page input `a` to the step-less pipeline input `x`; its
/// output `negated` is `negate.y`. Page `Q` shares pipeline input `n`.
pub const WORKFLOW: &str = r#"
meta:
  label: Page P
processing:
  workflow:
    name: page_p
    inputs:
      x:
        type: boolean
        default: false
      n:
        type: number
        default: 2
    steps:
      - id: negate
        module: logic.not
        inputs:
          a: __pipeline__.x
      - id: square
        module: math.pow
        inputs:
          a: __pipeline__.n
          b: __pipeline__.n
ui:
  pages:
    - id: P
      component:
        id: page_p
      mapping:
        inputs:
          - pageIoId: a
            workflowIoId: x
        outputs:
          - pageIoId: negated
            workflowIoId: y
            workflowStepId: negate
    - id: Q
      component:
        id: page_q
      mapping:
        inputs:
          - pageIoId: n
            workflowIoId: n
        outputs:
          - pageIoId: power
            workflowIoId: c
            workflowStepId: square
"#;

/// Write [`WORKFLOW`] into `dir` and return its path.
pub fn write_workflow(dir: &Path) -> Result<PathBuf> {
    let path = dir.join("page_p.yml");
    std::fs::write(&path, WORKFLOW)?;
    Ok(path)
}

/// Engine-backed backend over the local engine.
pub fn engine_backend() -> Arc<dyn Backend> {
    Arc::new(EngineBackend::new(
        Arc::new(LocalEngine::new()),
        Arc::new(InMemoryDataRegistry::new()),
    ))
}

/// A test server that runs in the background.
pub struct TestServer {
    /// The server's address.
    pub addr: SocketAddr,
    /// Handle to the server task.
    _handle: JoinHandle<()>,
    /// Temporary directory holding the workflow catalog.
    pub temp_dir: TempDir,
}

impl TestServer {
    /// Start a server over the mock backend.
    pub async fn start() -> Result<Self> {
        Self::start_with(Arc::new(MockBackend::default())).await
    }

    /// Start a server over `backend`, with [`WORKFLOW`] in its catalog.
    pub async fn start_with(backend: Arc<dyn Backend>) -> Result<Self> {
        let temp_dir = TempDir::new()?;
        write_workflow(temp_dir.path())?;

        let addr = find_available_port().await?;
        let mut catalog = WorkflowCatalog::new();
        catalog.add_dir(temp_dir.path());
        let config = ServerConfig::new()
            .with_bind_address(addr)
            .with_request_logging(false);
        let state = AppState::new(backend, catalog, config)?;

        let server = Server::new(state);
        let handle = tokio::spawn(async move {
            let _ = server.run_on(addr).await;
        });

        wait_for_server(addr).await?;

        Ok(Self {
            addr,
            _handle: handle,
            temp_dir,
        })
    }

    /// Open a socket on one target.
    pub async fn connect(&self, target: &str) -> Result<WsClient> {
        let url = format!("ws://{}/ws/{}", self.addr, target);
        let (stream, _) = connect_async(url).await?;
        Ok(WsClient { stream })
    }

    pub fn workflow_path(&self) -> PathBuf {
        self.temp_dir.path().join("page_p.yml")
    }
}

/// One WebSocket attached to a target.
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    pub async fn send(&mut self, envelope: Value) -> Result<()> {
        self.stream
            .send(Message::Text(envelope.to_string().into()))
            .await?;
        Ok(())
    }

    pub async fn send_raw(&mut self, message: Message) -> Result<()> {
        self.stream.send(message).await?;
        Ok(())
    }

    /// Next JSON text frame, or `None` if nothing arrives within `wait`.
    pub async fn recv_within(&mut self, wait: Duration) -> Result<Option<Value>> {
        loop {
            let frame = match timeout(wait, self.stream.next()).await {
                Ok(Some(frame)) => frame?,
                Ok(None) | Err(_) => return Ok(None),
            };
            match frame {
                Message::Text(text) => return Ok(Some(serde_json::from_str(&text)?)),
                Message::Close(_) => return Ok(None),
                _ => continue,
            }
        }
    }

    /// Next JSON text frame; fails after five seconds.
    pub async fn recv(&mut self) -> Result<Value> {
        match self.recv_within(Duration::from_secs(5)).await? {
            Some(value) => Ok(value),
            None => anyhow::bail!("Timeout waiting for a frame"),
        }
    }

    /// Frames until one with `action` arrives.
    pub async fn recv_action(&mut self, action: &str) -> Result<Value> {
        loop {
            let frame = self.recv().await?;
            if frame["action"] == action {
                return Ok(frame);
            }
        }
    }

    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}

/// Find an available port for the test server.
async fn find_available_port() -> Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(addr)
}

/// Wait for the server to accept connections.
async fn wait_for_server(addr: SocketAddr) -> Result<()> {
    let result = timeout(Duration::from_secs(5), async {
        loop {
            match TcpStream::connect(addr).await {
                Ok(_) => return,
                Err(_) => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
    })
    .await;

    match result {
        Ok(()) => Ok(()),
        Err(_) => anyhow::bail!("Timeout waiting for server to start"),
    }
}
