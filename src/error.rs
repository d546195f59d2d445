//! Errors returned by the backend client.
//!
//! | Variant | Cause | Client reaction |
//! |---------|-------|-----------------|
//! | [`ClientError::Unauthorized`] | 401, or an expired-token detail | clear session, back to login |
//! | [`ClientError::Rejected`] | other non-2xx with a detail | show detail, keep session |
//! | [`ClientError::Transport`] | connection / read failure | generic notice, keep session |
//! | [`ClientError::Decode`] | 2xx body that breaks the contract | generic notice, keep session |

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("session is not valid: {detail}")]
    Unauthorized { detail: String },

    #[error("request rejected ({status}): {detail}")]
    Rejected { status: StatusCode, detail: String },

    #[error("cannot reach the server: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
}

impl ClientError {
    /// Errors that mean the stored token can no longer be used.
    pub fn is_auth(&self) -> bool {
        matches!(self, ClientError::Unauthorized { .. })
    }

    /// The server-supplied detail, for rejections.
    pub fn detail(&self) -> Option<&str> {
        match self {
            ClientError::Unauthorized { detail } | ClientError::Rejected { detail, .. } => {
                Some(detail)
            }
            _ => None,
        }
    }

    pub(crate) fn decode(endpoint: &str, message: impl ToString) -> Self {
        ClientError::Decode {
            endpoint: endpoint.to_string(),
            message: message.to_string(),
        }
    }
}

/// Does this status/detail pair mean the session is gone?
pub(crate) fn indicates_expired_session(status: StatusCode, detail: &str) -> bool {
    if status == StatusCode::UNAUTHORIZED {
        return true;
    }
    let detail = detail.to_ascii_lowercase();
    detail.contains("token") && detail.contains("expired")
}
