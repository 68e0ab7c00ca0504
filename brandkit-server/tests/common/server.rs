//! Test server harness for integration tests.
//!
//! Spins up the real brandkit router on a random port with an in-memory
//! project store and a throwaway font file.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use brandkit_core::{Project, ProjectRepository, ProjectStore};
use brandkit_renderer::IconRasterizer;
use brandkit_server::{app, AppState, ServerConfig};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Public domain typeface shipped with the renderer tests.
pub const FIXTURE_FONT: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../brandkit-renderer/tests/fixtures/Tuffy.ttf"
);

/// How to build the server under test.
#[derive(Default)]
pub struct TestOptions {
    /// Leave the configured font path pointing at nothing.
    pub missing_font: bool,
    /// Write bytes that hold no font face.
    pub invalid_font: bool,
    /// Mirror projects to this directory.
    pub data_dir: Option<PathBuf>,
    /// Replace the resvg rasterizer.
    pub rasterizer: Option<Arc<dyn IconRasterizer>>,
}

/// A test server instance with control handles.
pub struct TestServer {
    addr: SocketAddr,
    store: Arc<ProjectStore>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
    _font_dir: TempDir,
}

impl TestServer {
    /// Start a new test server on a random available port.
    ///
    /// # Panics
    ///
    /// Panics if no port is available or server fails to bind.
    pub async fn start() -> Self {
        Self::start_with(TestOptions::default()).await
    }

    /// Start a server with custom options.
    #[allow(dead_code)]
    pub async fn start_with(options: TestOptions) -> Self {
        let port = portpicker::pick_unused_port().expect("no available port");
        let addr = SocketAddr::from(([127, 0, 0, 1], port));

        let font_dir = tempfile::tempdir().expect("temp dir");
        let font_path: PathBuf = font_dir.path().join("Inter-ExtraBold.ttf");
        if options.invalid_font {
            std::fs::write(&font_path, b"not a font").expect("write font");
        } else if !options.missing_font {
            std::fs::copy(FIXTURE_FONT, &font_path).expect("copy font");
        }

        let config = ServerConfig {
            port,
            font_path,
            data_dir: options.data_dir.clone(),
        };
        let store = Arc::new(match options.data_dir {
            Some(dir) => ProjectStore::with_data_dir(dir).expect("store with data dir"),
            None => ProjectStore::new(),
        });
        let repository: Arc<dyn ProjectRepository> = store.clone();
        let mut state = AppState::new(config, repository);
        if let Some(rasterizer) = options.rasterizer {
            state = state.with_rasterizer(rasterizer);
        }

        let app = app(state);

        let listener = TcpListener::bind(addr).await.expect("failed to bind");
        let actual_addr = listener.local_addr().expect("failed to get local addr");

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("server error");
        });

        // Give the server a moment to start
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;

        Self {
            addr: actual_addr,
            store,
            shutdown_tx: Some(shutdown_tx),
            handle,
            _font_dir: font_dir,
        }
    }

    /// Get the server's socket address.
    #[allow(dead_code)]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Absolute URL for a path.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Insert a project directly into the store.
    #[allow(dead_code)]
    pub fn seed(&self, project: Project) -> Project {
        self.store.insert(project.clone()).expect("seed project");
        project
    }

    /// Direct access to the store for assertions.
    #[allow(dead_code)]
    pub fn store(&self) -> &ProjectStore {
        &self.store
    }

    /// Gracefully shut down the server.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        let _ = tokio::time::timeout(tokio::time::Duration::from_secs(5), self.handle).await;
    }
}
