#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::Duration;

use onshift::capture::{CaptureConfig, CaptureSource, Frame};
use onshift::events::BufferSink;
use onshift::session::ControllerConfig;
use onshift::store::{BlobStorage, MemoryBlobStorage, MemoryEodReports, MemoryStore};
use onshift::SessionController;

pub struct Harness {
    pub controller: SessionController,
    pub store: Arc<MemoryStore>,
    pub eod: Arc<MemoryEodReports>,
    pub blobs: Arc<MemoryBlobStorage>,
    pub events: Arc<BufferSink>,
}

/// Short capture cadence so scheduler tests finish in milliseconds.
pub fn fast_config() -> ControllerConfig {
    ControllerConfig {
        capture: CaptureConfig {
            interval: Duration::from_millis(20),
            tick_timeout: Duration::from_secs(1),
            ready_poll: Duration::from_millis(5),
            ready_max_attempts: 10,
            ..CaptureConfig::default()
        },
        ..ControllerConfig::default()
    }
}

pub fn harness() -> Harness {
    harness_with_config(ControllerConfig::default())
}

pub fn harness_with_config(config: ControllerConfig) -> Harness {
    let _ = env_logger::builder().is_test(true).try_init();

    let store = Arc::new(MemoryStore::new());
    let eod = Arc::new(MemoryEodReports::new());
    let blobs = Arc::new(MemoryBlobStorage::new());
    let events = Arc::new(BufferSink::new());
    let controller = SessionController::with_config(
        store.clone(),
        eod.clone(),
        blobs.clone(),
        events.clone(),
        config,
    );

    Harness {
        controller,
        store,
        eod,
        blobs,
        events,
    }
}

/// Scripted screen source with a controllable end signal and a release
/// counter for idempotence assertions.
pub struct FakeSource {
    dims: Mutex<(u32, u32)>,
    ended_tx: watch::Sender<bool>,
    released: AtomicUsize,
}

impl FakeSource {
    pub fn ready() -> Arc<Self> {
        let (ended_tx, _) = watch::channel(false);
        Arc::new(Self {
            dims: Mutex::new((640, 480)),
            ended_tx,
            released: AtomicUsize::new(0),
        })
    }

    /// Simulates the user revoking screen share from the browser/OS chrome.
    pub fn end_sharing(&self) {
        let _ = self.ended_tx.send(true);
    }

    pub fn release_count(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptureSource for FakeSource {
    fn dimensions(&self) -> (u32, u32) {
        *self.dims.lock().unwrap()
    }

    async fn grab_frame(&self) -> Result<Frame> {
        Ok(Frame {
            width: 8,
            height: 8,
            rgba: vec![200; 8 * 8 * 4],
        })
    }

    fn ended(&self) -> watch::Receiver<bool> {
        self.ended_tx.subscribe()
    }

    fn release(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Blob storage that refuses every upload.
pub struct FailingBlobStorage;

#[async_trait]
impl BlobStorage for FailingBlobStorage {
    async fn upload(&self, path: &str, _bytes: Vec<u8>) -> Result<String> {
        bail!("upload rejected for {path}")
    }
}
