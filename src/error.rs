// Send-failure classification for Agora
// Remote calls surface loosely structured errors; the engine folds them into
// a small set of user-facing notice classes by matching known substrings and
// status codes. Anything unrecognized falls back to a generic retry notice.

use thiserror::Error;

/// Classified outcome of a failed user-initiated remote operation. The
/// `Display` string of each variant is the text of the system notice shown
/// for it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendErrorKind {
    /// Network unreachable, timeout, connection reset.
    #[error("network error, check your connection and try again")]
    Transport,
    /// Expired or invalid lease that could not be renewed. Rides the session
    /// manager's sign-out side effect.
    #[error("your session has expired, please sign in again")]
    Authorization,
    /// The server reported the daily send limit was reached.
    #[error("daily message limit reached, wait until tomorrow or follow this user to keep chatting")]
    Quota,
    /// The server refused because the recipient does not accept messages
    /// from non-followers.
    #[error("you can't message this user yet, follow them first")]
    Policy,
    /// Rejected client-side before any network call (oversized file,
    /// unsupported type). Carries the specific reason.
    #[error("{0}")]
    Validation(String),
    /// Unrecognized failure.
    #[error("message failed to send, please try again later")]
    Unknown,
}

impl SendErrorKind {
    /// Fold the whole error chain into a notice class. Matching is on known
    /// substrings/codes; the order matters, authorization wins over the
    /// broader transport patterns.
    pub fn classify(err: &anyhow::Error) -> SendErrorKind {
        let text = format!("{:#}", err).to_lowercase();

        if text.contains("401")
            || text.contains("unauthorized")
            || text.contains("expired")
            || text.contains("invalid token")
            || text.contains("signed out")
        {
            return SendErrorKind::Authorization;
        }
        if text.contains("quota") || text.contains("daily limit") || text.contains("429") {
            return SendErrorKind::Quota;
        }
        if text.contains("403")
            || text.contains("forbidden")
            || text.contains("not allowed")
            || text.contains("follow")
        {
            return SendErrorKind::Policy;
        }
        if text.contains("timed out")
            || text.contains("timeout")
            || text.contains("connection")
            || text.contains("unreachable")
            || text.contains("network")
        {
            return SendErrorKind::Transport;
        }
        SendErrorKind::Unknown
    }
}
