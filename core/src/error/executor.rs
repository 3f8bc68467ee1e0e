use thiserror::Error;

/// Errors raised by node executors.
///
/// Executor implementations live outside this crate, so the variants stay
/// transport-agnostic: an HTTP backend maps its client errors into
/// `Request`, a parser problem into `InvalidResponse`, and anything
/// unusual into `Other`.
#[derive(Error, Debug)]
pub enum NodeExecutorError {
    #[error("template error: {0}")]
    Template(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<std::io::Error> for NodeExecutorError {
    fn from(err: std::io::Error) -> Self {
        Self::Request(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes() {
        let err = NodeExecutorError::InvalidResponse("empty choices array".to_string());
        assert_eq!(err.to_string(), "invalid response: empty choices array");
    }

    #[test]
    fn test_from_anyhow_is_transparent() {
        let err: NodeExecutorError = anyhow::anyhow!("model refused").into();
        assert_eq!(err.to_string(), "model refused");
    }
}
