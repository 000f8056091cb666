use thiserror::Error;

/// Failure talking to the remote
/// collection resource.
#[derive(Debug, Error)]
pub enum RemoteError {
  #[error("request to {url} failed")]
  Transport {
    url:    String,
    #[source]
    source: reqwest::Error
  },

  #[error("{url} answered HTTP {status}")]
  Status {
    url:    String,
    status: u16,
    body:   String
  },

  #[error("undecodable response from {url}")]
  Decode {
    url:    String,
    #[source]
    source: serde_json::Error
  },

  #[error("remote unavailable: {reason}")]
  Unavailable { reason: String }
}

impl RemoteError {
  pub fn unavailable(
    reason: impl Into<String>
  ) -> Self {
    RemoteError::Unavailable {
      reason: reason.into()
    }
  }

  pub fn status(&self) -> Option<u16> {
    match self {
      | RemoteError::Status {
        status,
        ..
      } => Some(*status),
      | _ => None
    }
  }
}

#[derive(Debug, Error)]
pub enum SyncError {
  #[error("failed to fetch {resource}")]
  FetchFailed {
    resource: String,
    #[source]
    source:   RemoteError
  },

  #[error("failed to {operation}")]
  WriteFailed {
    operation: &'static str,
    #[source]
    source:    RemoteError
  },

  #[error("invalid {field}: {reason}")]
  ValidationFailed {
    field:  &'static str,
    reason: &'static str
  }
}

impl SyncError {
  pub fn is_validation(&self) -> bool {
    matches!(
      self,
      SyncError::ValidationFailed { .. }
    )
  }
}
