use std::sync::Arc;

use chrono::Utc;
use log::{error, info, warn};
use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Duration;

use crate::capture::{CaptureConfig, CaptureScheduler, CaptureSource};
use crate::error::SessionError;
use crate::events::{EventSink, NoticeLevel, SessionEvent};
use crate::ledger::{self, BreakPolicy};
use crate::models::{AttendanceSession, BreakEntry, BreakType};
use crate::policy::{self, GateDecision, ShortfallReport};
use crate::presenter::{self, ElapsedSnapshot};
use crate::store::{AttendanceStore, BlobStorage, EodReports};

use super::state::{SessionPhase, SessionState};

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Display tick period.
    pub tick_interval: Duration,
    pub break_policy: BreakPolicy,
    pub capture: CaptureConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            break_policy: BreakPolicy::default(),
            capture: CaptureConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub session: Option<AttendanceSession>,
    pub open_break_type: Option<BreakType>,
    pub elapsed: Option<ElapsedSnapshot>,
}

/// Result of a clock-out attempt. A shortfall is a soft gate: the caller
/// surfaces the report and retries with `acknowledge_shortfall = true`.
#[derive(Debug, Clone)]
pub enum ClockOutOutcome {
    Completed(AttendanceSession),
    ConfirmationRequired(ShortfallReport),
}

/// Owns one user's attendance session lifecycle: clock-in/out, the break
/// cycle, monitoring consent, and the display ticker. State-mutating calls
/// are expected to be serialized by the owning client; the internal mutex
/// makes interleaving safe, not concurrent.
#[derive(Clone)]
pub struct SessionController {
    state: Arc<Mutex<SessionState>>,
    store: Arc<dyn AttendanceStore>,
    eod: Arc<dyn EodReports>,
    blobs: Arc<dyn BlobStorage>,
    events: Arc<dyn EventSink>,
    capture: Arc<Mutex<CaptureScheduler>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    config: ControllerConfig,
}

impl SessionController {
    pub fn new(
        store: Arc<dyn AttendanceStore>,
        eod: Arc<dyn EodReports>,
        blobs: Arc<dyn BlobStorage>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self::with_config(store, eod, blobs, events, ControllerConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn AttendanceStore>,
        eod: Arc<dyn EodReports>,
        blobs: Arc<dyn BlobStorage>,
        events: Arc<dyn EventSink>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::new())),
            store,
            eod,
            blobs,
            events,
            capture: Arc::new(Mutex::new(CaptureScheduler::new(config.capture.clone()))),
            ticker: Arc::new(Mutex::new(None)),
            config,
        }
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock().await;
        self.build_snapshot(&state)
    }

    pub async fn capture_running(&self) -> bool {
        self.capture.lock().await.is_running()
    }

    /// Starts a session after the duplicate pre-check. With monitoring
    /// required, the session sits in PendingConsent until the host relays a
    /// consent grant; work time still accrues from clock-in.
    pub async fn clock_in(
        &self,
        user_id: &str,
        monitoring_required: bool,
    ) -> Result<SessionSnapshot, SessionError> {
        {
            let state = self.state.lock().await;
            if state.session.is_some() {
                return Err(SessionError::DuplicateSession);
            }
        }

        // Pre-insert duplicate check against the store. Narrows the
        // cross-device race window; the store backend owns true uniqueness.
        if self.store.active_session_for_user(user_id).await?.is_some() {
            self.notify(
                NoticeLevel::Warn,
                "You are already clocked in on another device; clock out there first",
            );
            return Err(SessionError::DuplicateSession);
        }

        let now = Utc::now();
        let session = AttendanceSession::begin(user_id, now);
        self.store.insert_session(&session).await?;
        info!("user {} clocked in, session {}", user_id, session.id);

        {
            let mut state = self.state.lock().await;
            state.begin(session, monitoring_required);
        }

        self.spawn_ticker().await;

        if monitoring_required {
            self.events.emit(SessionEvent::ConsentRequested);
            self.notify(
                NoticeLevel::Info,
                "Share your screen to start the monitored work period",
            );
        }
        self.emit_state_changed().await;
        Ok(self.snapshot().await)
    }

    /// Rebuilds controller state from the store after a client restart.
    /// Capture never carries over; with monitoring required a fresh consent
    /// request is raised.
    pub async fn resume(
        &self,
        user_id: &str,
        monitoring_required: bool,
    ) -> Result<Option<SessionSnapshot>, SessionError> {
        let Some(session) = self.store.active_session_for_user(user_id).await? else {
            return Ok(None);
        };
        let breaks = self.store.breaks_for_session(&session.id).await?;
        info!("resuming active session {} for user {}", session.id, user_id);

        {
            let mut state = self.state.lock().await;
            state.restore(session, breaks, monitoring_required);
        }

        self.spawn_ticker().await;

        if monitoring_required {
            self.events.emit(SessionEvent::ConsentRequested);
        }
        self.emit_state_changed().await;
        Ok(Some(self.snapshot().await))
    }

    /// Clock-out preconditions, in order: no open break, EOD report on
    /// file, then the early gate. A shortfall without acknowledgment
    /// changes nothing and hands back the report.
    pub async fn clock_out(
        &self,
        acknowledge_shortfall: bool,
    ) -> Result<ClockOutOutcome, SessionError> {
        let (session, breaks) = {
            let state = self.state.lock().await;
            let Some(session) = state.session.clone() else {
                return Err(SessionError::NoActiveSession);
            };
            if state.open_break().is_some() {
                self.notify(NoticeLevel::Warn, "End your break before clocking out");
                return Err(SessionError::OnBreak);
            }
            (session, state.breaks.clone())
        };

        if !self.eod.has_report(&session.id).await? {
            self.notify(
                NoticeLevel::Warn,
                "Submit your end-of-day report before clocking out",
            );
            return Err(SessionError::MissingEodReport);
        }

        let now = Utc::now();
        let excess = ledger::excess_minutes(&breaks, now, &self.config.break_policy);
        if let GateDecision::Short(report) = policy::evaluate(session.clock_in, now, &excess) {
            if !acknowledge_shortfall {
                self.notify(
                    NoticeLevel::Warn,
                    format!(
                        "You are {} minutes short of the required {}; confirm to clock out anyway",
                        report.shortfall_minutes, report.required_minutes
                    ),
                );
                return Ok(ClockOutOutcome::ConfirmationRequired(report));
            }
            info!(
                "session {} clocking out {} minutes short after confirmation",
                session.id, report.shortfall_minutes
            );
        }

        // Intentional stop; the source's ended signal must not cancel the
        // session we are about to complete.
        {
            let mut capture = self.capture.lock().await;
            if let Err(err) = capture.stop().await {
                error!("failed to stop capture during clock-out: {err:?}");
            }
        }

        let break_ms = ledger::total_break_ms(&breaks, now);
        let worked_ms = session.elapsed_ms(now).saturating_sub(break_ms);
        let total_hours = round_hours(worked_ms as f64 / 3_600_000.0);

        self.store
            .complete_session(&session.id, now, total_hours)
            .await?;
        self.cancel_ticker().await;

        let completed = {
            let mut state = self.state.lock().await;
            let mut completed = session;
            completed.complete(now, total_hours);
            state.clear();
            completed
        };

        info!(
            "session {} completed with {:.2} worked hours",
            completed.id, total_hours
        );
        self.emit_state_changed().await;
        self.events.emit(SessionEvent::SessionCompleted {
            session: completed.clone(),
        });
        self.notify(NoticeLevel::Info, "Clocked out");
        Ok(ClockOutOutcome::Completed(completed))
    }

    /// Opens a break. Any running capture is paused for its duration; the
    /// stop is flagged intentional so the released source does not read as
    /// a revocation.
    pub async fn start_break(&self, break_type: BreakType) -> Result<(), SessionError> {
        let entry = {
            let state = self.state.lock().await;
            let Some(session) = state.session.as_ref() else {
                return Err(SessionError::NoActiveSession);
            };
            if state.open_break().is_some() {
                return Err(SessionError::BreakAlreadyOpen);
            }
            BreakEntry::begin(&session.id, break_type, Utc::now())
        };

        self.store.insert_break(&entry).await?;
        {
            let mut state = self.state.lock().await;
            state.start_break(entry);
            state.monitoring_active = false;
        }

        {
            let mut capture = self.capture.lock().await;
            if let Err(err) = capture.stop().await {
                error!("failed to pause capture for break: {err:?}");
            }
        }

        info!("{} break started", break_type.as_str());
        self.emit_state_changed().await;
        Ok(())
    }

    /// Closes the open break. With monitoring required, capture does not
    /// restart by itself; a fresh consent request is raised instead.
    pub async fn end_break(&self) -> Result<(), SessionError> {
        let (break_id, break_start, monitoring_required) = {
            let state = self.state.lock().await;
            let Some(open) = state.open_break() else {
                return Err(SessionError::NoOpenBreak);
            };
            (open.id.clone(), open.break_start, state.monitoring_required)
        };

        let ended_at = Utc::now();
        let duration_minutes = (ended_at - break_start).num_minutes().max(0);
        self.store
            .close_break(&break_id, ended_at, duration_minutes)
            .await?;
        {
            let mut state = self.state.lock().await;
            state.end_break(ended_at);
        }

        info!("break ended after {} minutes", duration_minutes);
        if monitoring_required {
            self.events.emit(SessionEvent::ConsentRequested);
            self.notify(
                NoticeLevel::Info,
                "Share your screen again to resume the monitored work period",
            );
        }
        self.emit_state_changed().await;
        Ok(())
    }

    /// Consent grant: binds the scheduler to the shared source and starts
    /// the capture cycle. Moves PendingConsent to Working.
    pub async fn grant_capture_source(
        &self,
        source: Arc<dyn CaptureSource>,
    ) -> Result<(), SessionError> {
        let (session_id, user_id) = {
            let state = self.state.lock().await;
            let Some(session) = state.session.as_ref() else {
                return Err(SessionError::NoActiveSession);
            };
            if state.phase == SessionPhase::OnBreak {
                return Err(SessionError::OnBreak);
            }
            (session.id.clone(), session.user_id.clone())
        };

        let (revoked_tx, mut revoked_rx) = mpsc::channel::<String>(1);
        {
            let mut capture = self.capture.lock().await;
            capture
                .start(
                    session_id.clone(),
                    user_id,
                    source,
                    self.store.clone(),
                    self.blobs.clone(),
                    revoked_tx,
                )
                .await?;
        }

        self.store
            .set_monitoring_enabled(&session_id, true, Utc::now())
            .await?;
        {
            let mut state = self.state.lock().await;
            state.monitoring_active = true;
            if let Some(session) = state.session.as_mut() {
                session.screen_monitoring_enabled = true;
            }
            if state.phase == SessionPhase::PendingConsent {
                state.phase = SessionPhase::Working;
            }
        }

        // Watch for unintentional source loss. The sender side drops
        // without a message on every intentional stop, ending this task.
        let controller = self.clone();
        tokio::spawn(async move {
            if revoked_rx.recv().await.is_some() {
                controller.handle_source_revoked().await;
            }
        });

        info!("screen capture started for session {}", session_id);
        self.notify(NoticeLevel::Info, "Screen monitoring active");
        self.emit_state_changed().await;
        Ok(())
    }

    /// Consent denial. The session stays where it is (PendingConsent is
    /// retryable); only post-grant revocation cancels.
    pub async fn deny_capture_source(&self) -> Result<(), SessionError> {
        let state = self.state.lock().await;
        if state.session.is_none() {
            return Err(SessionError::NoActiveSession);
        }
        drop(state);

        self.notify(
            NoticeLevel::Warn,
            "Screen sharing was denied; monitoring consent is still pending",
        );
        Err(SessionError::CaptureSourceDenied)
    }

    /// The cancellation edge. Revoking a mandatory monitoring source
    /// deletes the session record outright; the worked time is discarded,
    /// never completed. A voluntary source loss just stops capture.
    async fn handle_source_revoked(&self) {
        {
            let mut capture = self.capture.lock().await;
            if let Err(err) = capture.stop().await {
                error!("failed to release capture after revocation: {err:?}");
            }
        }

        let (session, mandatory) = {
            let mut state = self.state.lock().await;
            let Some(session) = state.session.clone() else {
                return;
            };
            if state.monitoring_required {
                state.clear();
                (session, true)
            } else {
                state.monitoring_active = false;
                if let Some(session) = state.session.as_mut() {
                    session.screen_monitoring_enabled = false;
                }
                (session, false)
            }
        };

        if mandatory {
            warn!(
                "monitoring revoked mid-session; deleting session {}",
                session.id
            );
            self.cancel_ticker().await;
            if let Err(err) = self.store.delete_session(&session.id).await {
                error!("failed to delete session {} after revocation: {err:?}", session.id);
            }
            self.events.emit(SessionEvent::SessionCancelled {
                reason: SessionError::CaptureSourceRevoked.to_string(),
            });
            self.notify(
                NoticeLevel::Error,
                "Screen sharing was revoked; the session has been cancelled and its time discarded",
            );
        } else {
            if let Err(err) = self
                .store
                .set_monitoring_enabled(&session.id, false, Utc::now())
                .await
            {
                error!("failed to record monitoring stop: {err:?}");
            }
            self.notify(NoticeLevel::Warn, "Screen monitoring stopped");
        }
        self.emit_state_changed().await;
    }

    async fn spawn_ticker(&self) {
        let mut guard = self.ticker.lock().await;
        if let Some(handle) = guard.take() {
            handle.abort();
        }

        let state = self.state.clone();
        let events = self.events.clone();
        let break_policy = self.config.break_policy.clone();
        let tick_interval = self.config.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick_interval);
            loop {
                interval.tick().await;

                let elapsed = {
                    let state = state.lock().await;
                    let Some(session) = state.session.as_ref() else {
                        break;
                    };
                    presenter::build_snapshot(session, &state.breaks, &break_policy, Utc::now())
                };
                events.emit(SessionEvent::Tick { elapsed });
            }
        });

        *guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }

    fn build_snapshot(&self, state: &SessionState) -> SessionSnapshot {
        SessionSnapshot {
            phase: state.phase,
            session: state.session.clone(),
            open_break_type: state.open_break().map(|entry| entry.break_type),
            elapsed: state.session.as_ref().map(|session| {
                presenter::build_snapshot(
                    session,
                    &state.breaks,
                    &self.config.break_policy,
                    Utc::now(),
                )
            }),
        }
    }

    async fn emit_state_changed(&self) {
        let snapshot = self.snapshot().await;
        self.events.emit(SessionEvent::StateChanged { snapshot });
    }

    fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        self.events.emit(SessionEvent::Notice {
            level,
            message: message.into(),
        });
    }
}

fn round_hours(hours: f64) -> f64 {
    (hours * 100.0).round() / 100.0
}
