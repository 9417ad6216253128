//! Capture-source boundary. The host obtains a live screen/window source
//! from the user's consent flow and hands it to the scheduler; the engine
//! never requests access on its own.

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::{sleep, Duration};

/// One raw frame from the shared screen, tightly packed RGBA.
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

#[async_trait]
pub trait CaptureSource: Send + Sync {
    /// Reported dimensions; (0, 0) until the source has warmed up.
    fn dimensions(&self) -> (u32, u32);

    async fn grab_frame(&self) -> Result<Frame>;

    /// Flips to `true` when the user stops sharing. A dropped sender is
    /// treated the same as an end signal.
    fn ended(&self) -> watch::Receiver<bool>;

    /// Releases underlying handles. Must be idempotent.
    fn release(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    TimedOut,
}

/// Bounded readiness poll: waits for the source to report non-zero
/// dimensions. On timeout the caller proceeds anyway rather than stalling
/// the session indefinitely.
pub async fn await_nonzero_dimensions(
    source: &dyn CaptureSource,
    poll: Duration,
    max_attempts: u32,
) -> Readiness {
    for _ in 0..max_attempts {
        let (width, height) = source.dimensions();
        if width > 0 && height > 0 {
            return Readiness::Ready;
        }
        sleep(poll).await;
    }
    Readiness::TimedOut
}
