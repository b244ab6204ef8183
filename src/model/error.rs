//! Structured error types for a single upload attempt

use std::fmt;

/// Reasons an upload attempt settles into the error state.
///
/// Every variant is local to one record: the tracker stores the rendered
/// message on the record and moves on to the next queued file.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadError {
    /// Network failure reported by the transport (detail is logged, not displayed)
    Transport(String),
    /// The event stream closed before a response or failure arrived
    Aborted,
    /// The server answered with a non-2xx status
    Rejected { status: u16, reason: String },
    /// The response body is not valid JSON
    InvalidResponse(String),
    /// The body parsed but carries no success flag or no content identifier
    MissingIdentifier,
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadError::Transport(_) => write!(f, "Network error during upload"),
            UploadError::Aborted => write!(f, "Upload aborted"),
            UploadError::Rejected { status, reason } if reason.is_empty() => {
                write!(f, "Upload failed: HTTP {}", status)
            }
            UploadError::Rejected { status, reason } => {
                write!(f, "Upload failed: HTTP {} {}", status, reason)
            }
            UploadError::InvalidResponse(msg) => write!(f, "Invalid server response: {}", msg),
            UploadError::MissingIdentifier => {
                write!(f, "Server response did not include a file identifier")
            }
        }
    }
}

impl std::error::Error for UploadError {}

impl From<serde_json::Error> for UploadError {
    fn from(e: serde_json::Error) -> Self {
        UploadError::InvalidResponse(e.to_string())
    }
}

/// Result type for a single upload attempt
pub type UploadResult<T = ()> = Result<T, UploadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_hides_detail() {
        let err = UploadError::Transport("tcp connect error: refused".into());
        assert_eq!(format!("{}", err), "Network error during upload");
    }

    #[test]
    fn test_rejected_includes_status_text() {
        let err = UploadError::Rejected {
            status: 500,
            reason: "Internal Server Error".into(),
        };
        assert_eq!(
            format!("{}", err),
            "Upload failed: HTTP 500 Internal Server Error"
        );
    }

    #[test]
    fn test_rejected_without_reason() {
        let err = UploadError::Rejected {
            status: 599,
            reason: String::new(),
        };
        assert_eq!(format!("{}", err), "Upload failed: HTTP 599");
    }

    #[test]
    fn test_invalid_response_from_serde() {
        let parse_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: UploadError = parse_err.into();
        assert!(matches!(err, UploadError::InvalidResponse(_)));
        assert!(format!("{}", err).starts_with("Invalid server response: "));
    }

    #[test]
    fn test_every_variant_has_a_message() {
        let errors = vec![
            UploadError::Transport(String::new()),
            UploadError::Aborted,
            UploadError::Rejected {
                status: 404,
                reason: "Not Found".into(),
            },
            UploadError::InvalidResponse("eof".into()),
            UploadError::MissingIdentifier,
        ];
        for err in errors {
            assert!(!err.to_string().is_empty());
        }
    }
}
