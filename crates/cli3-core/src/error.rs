use thiserror::Error;

/// Status codes carried by requests that failed before an HTTP status was available.
///
/// Code `0` is success; HTTP failures carry the HTTP status itself.
pub mod codes {
    pub const SUCCESS: i32 = 0;
    pub const CONNECTION_FAILED: i32 = 1;
    pub const TIMED_OUT: i32 = 2;
    pub const BAD_PAYLOAD: i32 = 3;
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("CliError: {0}")]
    Cli(#[from] CliError),
    #[error("ApiError: {0}")]
    Api(#[from] ApiError),
    #[error("AuthError: {0}")]
    Auth(#[from] AuthError),
    #[error("ConfigError: {0}")]
    Config(#[from] ConfigError),
    #[error("StorageError: {0}")]
    Storage(#[from] StorageError),
    #[error("ModelError: {0}")]
    Model(#[from] ModelError),
    #[error("WindowError: {0}")]
    Window(#[from] WindowError),
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Authentication required")]
    AuthRequired { message: String, hint: String },
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
}

/// Transport-level failures. Never raised across the asynchronous request
/// boundary: the session turns them into `(code, message)` pairs.
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64, endpoint: String },
    #[error("HTTP error: {status} {message}")]
    Http {
        status: u16,
        endpoint: String,
        message: String,
    },
    #[error("Authentication failed: {server_message}")]
    Unauthorized {
        status: u16,
        endpoint: String,
        server_message: String,
    },
    #[error("Connection failed: {message}")]
    Connection { endpoint: String, message: String },
    #[error("Invalid response from {endpoint}: {message}")]
    InvalidResponse { endpoint: String, message: String },
}

impl ApiError {
    /// Numeric code used in request/login notifications.
    pub fn code(&self) -> i32 {
        match self {
            ApiError::Http { status, .. } | ApiError::Unauthorized { status, .. } => {
                i32::from(*status)
            }
            ApiError::Timeout { .. } => codes::TIMED_OUT,
            ApiError::Connection { .. } => codes::CONNECTION_FAILED,
            ApiError::InvalidResponse { .. } => codes::BAD_PAYLOAD,
        }
    }

    pub fn endpoint(&self) -> &str {
        match self {
            ApiError::Timeout { endpoint, .. }
            | ApiError::Http { endpoint, .. }
            | ApiError::Unauthorized { endpoint, .. }
            | ApiError::Connection { endpoint, .. }
            | ApiError::InvalidResponse { endpoint, .. } => endpoint,
        }
    }
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Login failed ({code}): {message}")]
    LoginFailed { code: i32, message: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration field '{field}' is missing")]
    MissingField { field: String },
    #[error("Invalid configuration value for '{field}': {value}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Local I/O failures: configuration, reference-data cache and saved documents.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("File I/O error at {path}: {source}")]
    FileIo {
        path: String,
        source: std::io::Error,
    },
    #[error("Configuration parse error: {message}")]
    ConfigParseError { message: String },
    #[error("Configuration directory not found")]
    ConfigDirNotFound,
    #[error("Cache directory not found")]
    CacheDirNotFound,
    #[error("Reference cache '{name}' is unreadable: {message}")]
    Cache { name: String, message: String },
    #[error("Document {path} is malformed: {message}")]
    DocumentFormat { path: String, message: String },
    #[error("Document format version {found} is not supported (max {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
}

/// Server payload does not have the shape the model needs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Malformed {context} payload: {message}")]
    InvalidJson { context: String, message: String },
    #[error("Answer has no result of type '{kind}'")]
    MissingAttribute { kind: String },
    #[error("Result attribute '{attribute}' has no '{field}'")]
    MissingField { attribute: String, field: String },
    #[error("Column '{column}' declares unknown type '{type_name}'")]
    UnknownColumnType { column: String, type_name: String },
    #[error("Row {row} of column '{column}': cannot read '{value}' as {expected}")]
    Coerce {
        column: String,
        row: usize,
        value: String,
        expected: String,
    },
    #[error("Row {row} has {found} cells, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// Misuse of the document window lifecycle.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WindowError {
    #[error("Window is locked by a refresh in progress")]
    Locked,
    #[error("Window has no request bound")]
    Unbound,
    #[error("Window is closed")]
    Closed,
    #[error("{kind} windows do not support {capability}")]
    Unsupported { kind: String, capability: String },
    #[error("Request {id} failed ({code}): {message}")]
    RequestFailed {
        id: String,
        code: i32,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorSeverity {
    High,
    Medium,
    Low,
}

impl ErrorSeverity {
    pub fn label(&self) -> &'static str {
        match self {
            ErrorSeverity::High => "error",
            ErrorSeverity::Medium => "warning",
            ErrorSeverity::Low => "info",
        }
    }
}

impl AppError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AppError::Cli(_) => ErrorSeverity::Medium,
            AppError::Api(api_error) => match api_error {
                ApiError::Unauthorized { .. } => ErrorSeverity::High,
                ApiError::Timeout { .. } => ErrorSeverity::Medium,
                ApiError::Http { status, .. } if *status >= 500 => ErrorSeverity::High,
                ApiError::Connection { .. } => ErrorSeverity::High,
                _ => ErrorSeverity::Medium,
            },
            AppError::Auth(_) => ErrorSeverity::High,
            AppError::Config(_) => ErrorSeverity::High,
            AppError::Storage(_) => ErrorSeverity::Medium,
            AppError::Model(_) => ErrorSeverity::High,
            AppError::Window(WindowError::Locked) => ErrorSeverity::Low,
            AppError::Window(_) => ErrorSeverity::Medium,
        }
    }

    pub fn display_friendly(&self) -> String {
        match self {
            AppError::Auth(AuthError::LoginFailed { message, .. }) => message.clone(),
            AppError::Api(ApiError::Connection { endpoint, .. }) => {
                format!("Cannot reach server at {}", endpoint)
            }
            AppError::Window(WindowError::Locked) => "Refresh already in progress".to_string(),
            _ => format!("{}", self),
        }
    }

    pub fn troubleshooting_hint(&self) -> Option<String> {
        match self {
            AppError::Auth(AuthError::LoginFailed { .. }) => {
                Some("Check username and password, then try again".to_string())
            }
            AppError::Api(ApiError::Timeout { .. } | ApiError::Connection { .. }) => Some(
                "Check server, port and schema with 'cli3 config show' and try again".to_string(),
            ),
            AppError::Storage(StorageError::UnsupportedVersion { .. }) => {
                Some("The document was saved by a newer client version".to_string())
            }
            AppError::Model(_) => {
                Some("The server answered with an unexpected result shape".to_string())
            }
            _ => None,
        }
    }
}
