//! End-to-end test infrastructure for vecstore.
//!
//! Provides a TestHarness that runs the real HTTP server on an ephemeral
//! port over a temp data directory, plus vector helpers.

use std::path::Path;
use std::sync::Arc;

use rand::Rng;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use vecstore_client::VectorClient;
use vecstore_index::{EngineConfig, Persistence, VectorStore};
use vecstore_service::serve_with_shutdown;
use vecstore_types::EngineKind;

type ServerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// A running server over its own data directory.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub temp_dir: tempfile::TempDir,
    pub store: Arc<VectorStore>,
    pub client: VectorClient,
    pub config: EngineConfig,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<ServerResult>>,
}

impl TestHarness {
    /// Start a server with the given engine over a fresh temp dir.
    pub async fn start(config: EngineConfig) -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        Self::start_in(temp_dir, config).await
    }

    /// Flat engine, exact results.
    pub async fn flat(dimension: usize) -> Self {
        Self::start(EngineConfig::new(EngineKind::Flat, dimension)).await
    }

    /// HNSW engine.
    pub async fn hnsw(dimension: usize) -> Self {
        Self::start(EngineConfig::new(EngineKind::Hnsw, dimension)).await
    }

    async fn start_in(temp_dir: tempfile::TempDir, config: EngineConfig) -> Self {
        let store = Arc::new(
            VectorStore::open(config.clone(), Persistence::new(temp_dir.path()))
                .expect("Failed to open store"),
        );

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let endpoint = format!("http://{}", listener.local_addr().expect("local addr"));

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let server = tokio::spawn(serve_with_shutdown(listener, store.clone(), async {
            shutdown_rx.await.ok();
        }));

        let client = VectorClient::new(&endpoint).expect("Failed to build client");

        Self {
            temp_dir,
            store,
            client,
            config,
            shutdown_tx: Some(shutdown_tx),
            server: Some(server),
        }
    }

    pub fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Stop the server and wait for it to finish.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            tx.send(()).ok();
        }
        if let Some(server) = self.server.take() {
            server
                .await
                .expect("Server task panicked")
                .expect("Server returned an error");
        }
    }

    /// Stop the server and start a new one over the same data directory,
    /// as a process restart would.
    pub async fn restart(mut self) -> Self {
        self.stop().await;
        let config = self.config.clone();
        let temp_dir = std::mem::replace(
            &mut self.temp_dir,
            tempfile::TempDir::new().expect("Failed to create temp dir"),
        );
        drop(self);
        Self::start_in(temp_dir, config).await
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            tx.send(()).ok();
        }
    }
}

/// Vector with a single 1.0 at `axis`.
pub fn unit_vector(dimension: usize, axis: usize) -> Vec<f32> {
    let mut v = vec![0.0; dimension];
    v[axis % dimension] = 1.0;
    v
}

/// Vector with components uniform in [-1, 1).
pub fn random_vector<R: Rng>(rng: &mut R, dimension: usize) -> Vec<f32> {
    (0..dimension).map(|_| rng.random_range(-1.0..1.0)).collect()
}

/// Cosine similarity, for checking returned scores.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na * nb)
}
