use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error::CaptureError;
use crate::models::ScreenCapture;
use crate::store::{AttendanceStore, BlobStorage};

use super::scheduler::CaptureConfig;
use super::source::{await_nonzero_dimensions, CaptureSource, Frame, Readiness};

pub(crate) struct CaptureLoopCtx {
    pub session_id: String,
    pub user_id: String,
    pub store: Arc<dyn AttendanceStore>,
    pub blobs: Arc<dyn BlobStorage>,
    pub config: CaptureConfig,
}

/// Periodic capture loop for one session. Takes an immediate capture after
/// the readiness wait, then repeats on the configured period until
/// cancelled or until the source ends.
///
/// An end signal during an intentional stop is swallowed; outside of one it
/// is reported on `revoked_tx` so the controller can apply the
/// mandatory-monitoring cancellation edge.
pub(crate) async fn capture_loop(
    ctx: CaptureLoopCtx,
    source: Arc<dyn CaptureSource>,
    cancel_token: CancellationToken,
    pending_intentional_stop: Arc<AtomicBool>,
    revoked_tx: mpsc::Sender<String>,
) {
    match await_nonzero_dimensions(
        source.as_ref(),
        ctx.config.ready_poll,
        ctx.config.ready_max_attempts,
    )
    .await
    {
        Readiness::Ready => {}
        Readiness::TimedOut => warn!(
            "capture source for session {} never reported dimensions; proceeding",
            ctx.session_id
        ),
    }

    let mut ticker = tokio::time::interval(ctx.config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ended = source.ended();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let captured_at = Utc::now();
                let fut = perform_capture(&ctx, source.as_ref(), captured_at);
                match tokio::time::timeout(ctx.config.tick_timeout, fut).await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => error!(
                        "capture tick failed for session {}: {err:?}",
                        ctx.session_id
                    ),
                    Err(_) => warn!(
                        "capture tick timeout (> {:?}) for session {}",
                        ctx.config.tick_timeout, ctx.session_id
                    ),
                }
            }
            changed = ended.changed() => {
                let ended_now = changed.is_err() || *ended.borrow();
                if !ended_now {
                    continue;
                }
                if pending_intentional_stop.load(Ordering::SeqCst) {
                    info!("capture source released during intentional stop");
                } else {
                    warn!("capture source ended unexpectedly for session {}", ctx.session_id);
                    let _ = revoked_tx.send(ctx.session_id.clone()).await;
                }
                break;
            }
            _ = cancel_token.cancelled() => {
                info!("capture loop shutting down for session {}", ctx.session_id);
                break;
            }
        }
    }
}

async fn perform_capture(
    ctx: &CaptureLoopCtx,
    source: &dyn CaptureSource,
    captured_at: DateTime<Utc>,
) -> Result<(), CaptureError> {
    let frame = source.grab_frame().await.map_err(CaptureError::Frame)?;
    let quality = ctx.config.jpeg_quality;

    let jpeg = tokio::task::spawn_blocking(move || encode_jpeg(frame, quality))
        .await
        .map_err(|err| CaptureError::Encode(anyhow!("encode worker join failed: {err}")))?
        .map_err(CaptureError::Encode)?;
    let jpeg_len = jpeg.len();

    let path = ScreenCapture::blob_path(&ctx.user_id, &ctx.session_id, captured_at);
    let image_url = ctx
        .blobs
        .upload(&path, jpeg)
        .await
        .map_err(CaptureError::Upload)?;

    let record = ScreenCapture::new(&ctx.session_id, &ctx.user_id, image_url, captured_at);
    ctx.store
        .insert_capture(&record)
        .await
        .map_err(CaptureError::Persist)?;

    info!(
        "captured {} bytes for session {} at {}",
        jpeg_len, ctx.session_id, captured_at
    );
    Ok(())
}

fn encode_jpeg(frame: Frame, quality: u8) -> anyhow::Result<Vec<u8>> {
    let Frame { width, height, rgba } = frame;
    let buffer = image::RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| anyhow!("frame buffer does not match {width}x{height}"))?;
    let rgb = image::DynamicImage::ImageRgba8(buffer).to_rgb8();

    let mut out = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality);
    rgb.write_with_encoder(encoder)?;
    Ok(out)
}
