use crate::error::{ApiError, ModelError, StorageError};

/// Convert reqwest errors to ApiError with endpoint context
pub fn convert_request_error(error: reqwest::Error, endpoint: &str, timeout_secs: u64) -> ApiError {
    if error.is_timeout() {
        return convert_timeout_error(endpoint, timeout_secs);
    }
    if let Some(status) = error.status() {
        return ApiError::Http {
            status: status.as_u16(),
            endpoint: endpoint.to_string(),
            message: error.to_string(),
        };
    }
    ApiError::Connection {
        endpoint: endpoint.to_string(),
        message: error.to_string(),
    }
}

/// Convert timeout errors to ApiError with endpoint context
pub fn convert_timeout_error(endpoint: &str, timeout_secs: u64) -> ApiError {
    ApiError::Timeout {
        timeout_secs,
        endpoint: endpoint.to_string(),
    }
}

/// Convert JSON deserialization errors to ApiError with endpoint context
pub fn convert_json_error(error: serde_json::Error, endpoint: &str) -> ApiError {
    ApiError::InvalidResponse {
        endpoint: endpoint.to_string(),
        message: format!("JSON parse error: {}", error),
    }
}

/// Convert JSON deserialization errors of a model payload
pub fn convert_model_error(error: serde_json::Error, context: &str) -> ModelError {
    ModelError::InvalidJson {
        context: context.to_string(),
        message: error.to_string(),
    }
}

/// Convert IO errors to StorageError with path context
pub fn convert_io_error(error: std::io::Error, path: &std::path::Path) -> StorageError {
    StorageError::FileIo {
        path: path.display().to_string(),
        source: error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_timeout_error() {
        let err = convert_timeout_error("/api/nci", 15);
        assert!(matches!(
            err,
            ApiError::Timeout {
                timeout_secs: 15,
                ..
            }
        ));
    }

    #[test]
    fn test_convert_json_error_keeps_endpoint() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = convert_json_error(parse_err, "/api/styles");
        assert_eq!(err.endpoint(), "/api/styles");
        assert_eq!(err.code(), crate::error::codes::BAD_PAYLOAD);
    }

    #[test]
    fn test_convert_io_error_names_path() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = convert_io_error(io, std::path::Path::new("/tmp/doc.json"));
        assert!(err.to_string().contains("/tmp/doc.json"));
    }
}
