//! Input validation for configuration values and command arguments.

use crate::error::{CliError, ConfigError};

/// Validate that a server address is usable
pub fn validate_server(server: &str) -> Result<(), ConfigError> {
    if server.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "server".to_string(),
            value: server.to_string(),
            reason: "server cannot be empty".to_string(),
        });
    }

    if let Some((scheme, _)) = server.split_once("://") {
        if scheme != "http" && scheme != "https" {
            return Err(ConfigError::InvalidValue {
                field: "server".to_string(),
                value: server.to_string(),
                reason: "scheme must be http or https".to_string(),
            });
        }
    }

    Ok(())
}

pub fn validate_port(value: &str) -> Result<u16, ConfigError> {
    match value.trim().parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(ConfigError::InvalidValue {
            field: "port".to_string(),
            value: value.to_string(),
            reason: "port must be a number between 1 and 65535".to_string(),
        }),
    }
}

pub fn validate_schema(schema: &str) -> Result<(), ConfigError> {
    let valid = !schema.is_empty()
        && schema
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field: "schema".to_string(),
            value: schema.to_string(),
            reason: "schema must be a single path segment".to_string(),
        })
    }
}

/// Split a `NAME=VALUE` argument. The value may be empty or contain `=`.
pub fn parse_assignment(arg: &str) -> Result<(String, String), CliError> {
    match arg.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(CliError::InvalidArguments(format!(
            "Expected NAME=VALUE, got '{}'",
            arg
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_server() {
        assert!(validate_server("127.0.0.1").is_ok());
        assert!(validate_server("https://reports.example").is_ok());
        assert!(validate_server("").is_err());
        assert!(validate_server("ftp://reports.example").is_err());
    }

    #[test]
    fn test_validate_port() {
        assert_eq!(validate_port("8000").ok(), Some(8000));
        assert!(validate_port("0").is_err());
        assert!(validate_port("70000").is_err());
        assert!(validate_port("abc").is_err());
    }

    #[test]
    fn test_validate_schema() {
        assert!(validate_schema("common").is_ok());
        assert!(validate_schema("sales_2024").is_ok());
        assert!(validate_schema("a/b").is_err());
        assert!(validate_schema("").is_err());
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("NAME=X").unwrap(),
            ("NAME".to_string(), "X".to_string())
        );
        assert_eq!(
            parse_assignment("EXPR=a=b").unwrap(),
            ("EXPR".to_string(), "a=b".to_string())
        );
        assert_eq!(
            parse_assignment("EMPTY=").unwrap(),
            ("EMPTY".to_string(), String::new())
        );
        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=x").is_err());
    }
}
