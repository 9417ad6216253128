use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::store::{AttendanceStore, BlobStorage};

use super::loop_worker::{capture_loop, CaptureLoopCtx};
use super::source::CaptureSource;

/// Capture cadence and warm-up bounds.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Period between captures.
    pub interval: Duration,

    /// Upper bound on a single capture/encode/upload round.
    pub tick_timeout: Duration,

    /// Warm-up poll period while the source reports zero dimensions.
    pub ready_poll: Duration,

    /// Warm-up attempts before proceeding anyway.
    pub ready_max_attempts: u32,

    pub jpeg_quality: u8,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            tick_timeout: Duration::from_secs(30),
            ready_poll: Duration::from_millis(100),
            ready_max_attempts: 50,
            jpeg_quality: 80,
        }
    }
}

/// Owns one session's capture cycle: the loop task, its cancellation token,
/// and the bound source. Never a process-wide singleton; each controller
/// holds its own scheduler.
pub struct CaptureScheduler {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    source: Option<Arc<dyn CaptureSource>>,
    /// Latched immediately before any deliberate stop and cleared once the
    /// stop completes; the loop's source-ended handler consults it to tell
    /// a pause apart from a revocation.
    pending_intentional_stop: Arc<AtomicBool>,
    config: CaptureConfig,
}

impl CaptureScheduler {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            handle: None,
            cancel_token: None,
            source: None,
            pending_intentional_stop: Arc::new(AtomicBool::new(false)),
            config,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Binds the granted source and spawns the capture loop. Unintentional
    /// source loss is reported on `revoked_tx` with the session id.
    pub async fn start(
        &mut self,
        session_id: String,
        user_id: String,
        source: Arc<dyn CaptureSource>,
        store: Arc<dyn AttendanceStore>,
        blobs: Arc<dyn BlobStorage>,
        revoked_tx: mpsc::Sender<String>,
    ) -> Result<()> {
        if self.handle.is_some() {
            bail!("capture already active");
        }

        let cancel_token = CancellationToken::new();
        let ctx = CaptureLoopCtx {
            session_id,
            user_id,
            store,
            blobs,
            config: self.config.clone(),
        };

        let handle = tokio::spawn(capture_loop(
            ctx,
            source.clone(),
            cancel_token.clone(),
            self.pending_intentional_stop.clone(),
            revoked_tx,
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        self.source = Some(source);
        Ok(())
    }

    /// Deliberate stop (break start, clock-out, post-revocation cleanup).
    /// Cancels the loop, joins it, and releases the source exactly once.
    /// Safe to call repeatedly.
    pub async fn stop(&mut self) -> Result<()> {
        self.pending_intentional_stop.store(true, Ordering::SeqCst);

        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        let join_result = match self.handle.take() {
            Some(handle) => handle
                .await
                .context("capture loop task failed to join")
                .map(|_| ()),
            None => Ok(()),
        };

        if let Some(source) = self.source.take() {
            source.release();
        }

        self.pending_intentional_stop.store(false, Ordering::SeqCst);
        join_result
    }
}
