use thiserror::Error;

/// Errors surfaced by session lifecycle operations.
///
/// Precondition violations abort the attempted transition and leave the
/// session in its prior state; only source revocation forces a transition,
/// and that path is handled inside the controller rather than returned.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("already clocked in; clock out of the existing session first")]
    DuplicateSession,

    #[error("a break is in progress; end it first")]
    OnBreak,

    #[error("no end-of-day report has been submitted for this session")]
    MissingEodReport,

    #[error("no active session")]
    NoActiveSession,

    #[error("no break is in progress")]
    NoOpenBreak,

    #[error("a break is already in progress")]
    BreakAlreadyOpen,

    #[error("screen sharing request was denied")]
    CaptureSourceDenied,

    #[error("screen sharing stopped while monitoring was required")]
    CaptureSourceRevoked,

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Per-tick capture failures. Logged and skipped; never escalated into
/// session state.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("frame grab failed")]
    Frame(#[source] anyhow::Error),

    #[error("jpeg encode failed")]
    Encode(#[source] anyhow::Error),

    #[error("blob upload failed")]
    Upload(#[source] anyhow::Error),

    #[error("capture record insert failed")]
    Persist(#[source] anyhow::Error),
}
