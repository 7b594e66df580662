use crate::api::models::{NciDescriptor, NciPayload};
use crate::core::reference::StyleRegistry;
use crate::error::ApiError;
use crate::utils::error_helpers::{convert_json_error, convert_request_error};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = concat!("cli3/", env!("CARGO_PKG_VERSION"));

/// Server endpoints, relative to `<server>/<schema>`.
pub mod endpoints {
    pub const SIGNIN: &str = "/api/auth/signin";
    pub const SIGNOUT: &str = "/api/auth/signout";
    pub const TREE: &str = "/api/docs/tree";
    pub const QUERY: &str = "/api/docs/query";
    pub const REQUEST: &str = "/api/docs/request";
    pub const NCI: &str = "/api/nci";
    pub const STYLES: &str = "/api/styles";

    pub fn signin(username: &str, password: &str) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("username", username)
            .append_pair("password", password)
            .finish();
        format!("{}?{}", SIGNIN, query)
    }

    pub fn query(id: &str) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("id", id)
            .finish();
        format!("{}?{}", QUERY, query)
    }

    pub fn request(query_string: &str) -> String {
        format!("{}?{}", REQUEST, query_string)
    }

    /// The table name is one percent-encoded path segment.
    pub fn nci_table(name: &str) -> String {
        let segment = url::form_urlencoded::byte_serialize(name.as_bytes())
            .collect::<String>()
            .replace('+', "%20");
        format!("{}/{}", NCI, segment)
    }
}

/// HTTP client bound to one server and schema.
///
/// The cookie store carries the session cookie set by the signin endpoint,
/// so every call after a successful login is authorized.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    pub base_url: String,
    timeout_secs: u64,
}

impl ApiClient {
    pub fn new(base_url: String) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(base_url: String, timeout_secs: u64) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .build()
            .map_err(|e| convert_request_error(e, "client_init", timeout_secs))?;

        Ok(ApiClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout_secs,
        })
    }

    /// `http://<server>:<port>/<schema>`; a server without scheme gets `http://`.
    pub fn schema_url(server: &str, port: u16, schema: &str) -> String {
        let server = server.trim_end_matches('/');
        let server = if server.contains("://") {
            server.to_string()
        } else {
            format!("http://{}", server)
        };
        format!("{}:{}/{}", server, port, schema.trim_matches('/'))
    }

    pub fn build_request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client.request(method, url)
    }

    /// GET `path` and return the raw body of a successful response.
    pub async fn get_text(&self, path: &str) -> Result<String, ApiError> {
        log::debug!("GET {}{}", self.base_url, path);
        let response = self
            .build_request(Method::GET, path)
            .send()
            .await
            .map_err(|e| convert_request_error(e, path, self.timeout_secs))?;

        self.handle_response(response, path).await
    }

    pub async fn get_json<T>(&self, path: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let body = self.get_text(path).await?;
        serde_json::from_str(&body).map_err(|e| convert_json_error(e, path))
    }

    pub async fn signin(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let path = endpoints::signin(username, password);
        let response = self
            .build_request(Method::GET, &path)
            .send()
            .await
            .map_err(|e| convert_request_error(e, endpoints::SIGNIN, self.timeout_secs))?;
        // credentials stay out of error messages
        self.handle_response(response, endpoints::SIGNIN).await?;
        Ok(())
    }

    pub async fn signout(&self) -> Result<(), ApiError> {
        self.get_text(endpoints::SIGNOUT).await?;
        Ok(())
    }

    pub async fn nci_list(&self) -> Result<Vec<NciDescriptor>, ApiError> {
        self.get_json(endpoints::NCI).await
    }

    pub async fn nci_table(&self, name: &str) -> Result<NciPayload, ApiError> {
        self.get_json(&endpoints::nci_table(name)).await
    }

    pub async fn styles(&self) -> Result<StyleRegistry, ApiError> {
        self.get_json(endpoints::STYLES).await
    }

    async fn handle_response(&self, response: Response, endpoint: &str) -> Result<String, ApiError> {
        let status = response.status();

        if status.is_success() {
            return response
                .text()
                .await
                .map_err(|e| convert_request_error(e, endpoint, self.timeout_secs));
        }

        let error_text = response
            .text()
            .await
            .ok()
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            });

        match status.as_u16() {
            401 | 403 => Err(ApiError::Unauthorized {
                status: status.as_u16(),
                endpoint: endpoint.to_string(),
                server_message: error_text,
            }),
            408 | 504 => Err(ApiError::Timeout {
                timeout_secs: self.timeout_secs,
                endpoint: endpoint.to_string(),
            }),
            _ => Err(ApiError::Http {
                status: status.as_u16(),
                endpoint: endpoint.to_string(),
                message: error_text,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_client_creation() {
        let client = ApiClient::new("http://example.test/common".to_string());
        assert!(client.is_ok());
    }

    #[test]
    fn test_base_url_trailing_slash_removed() {
        let client = ApiClient::new("http://example.test/common/".to_string())
            .expect("client creation failed");
        assert_eq!(client.base_url, "http://example.test/common");
    }

    #[test]
    fn test_schema_url() {
        assert_eq!(
            ApiClient::schema_url("127.0.0.1", 8000, "common"),
            "http://127.0.0.1:8000/common"
        );
        assert_eq!(
            ApiClient::schema_url("https://reports.example/", 443, "/sales/"),
            "https://reports.example:443/sales"
        );
    }

    #[test]
    fn test_build_request_joins_schema_and_path() {
        let client = ApiClient::new("http://example.test/common".to_string())
            .expect("client creation failed");
        let built = client
            .build_request(Method::GET, &endpoints::query("12"))
            .build()
            .expect("Failed to build request");

        assert_eq!(
            built.url().as_str(),
            "http://example.test/common/api/docs/query?id=12"
        );
        assert_eq!(built.method(), Method::GET);
    }

    #[test]
    fn test_nci_table_name_is_one_path_segment() {
        assert_eq!(endpoints::nci_table("regions"), "/api/nci/regions");
        assert_eq!(endpoints::nci_table("a b?#%"), "/api/nci/a%20b%3F%23%25");
        assert_eq!(endpoints::nci_table("x+y/z"), "/api/nci/x%2By%2Fz");
    }

    #[test]
    fn test_signin_path_is_encoded() {
        assert_eq!(
            endpoints::signin("ann", "p&ss word"),
            "/api/auth/signin?username=ann&password=p%26ss+word"
        );
    }

    #[tokio::test]
    async fn test_get_text_maps_status_codes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/common/api/auth/signin"))
            .and(query_param("username", "ann"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad password"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/common/api/docs/tree"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = ApiClient::new(format!("{}/common", server.uri())).unwrap();

        let err = client.signin("ann", "wrong").await.unwrap_err();
        match err {
            ApiError::Unauthorized {
                status,
                server_message,
                endpoint,
            } => {
                assert_eq!(status, 401);
                assert_eq!(server_message, "bad password");
                assert_eq!(endpoint, endpoints::SIGNIN);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = client.get_text(endpoints::TREE).await.unwrap_err();
        assert_eq!(err.code(), 500);
    }

    #[tokio::test]
    async fn test_get_json_rejects_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/common/api/nci"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = ApiClient::new(format!("{}/common", server.uri())).unwrap();
        let err = client.nci_list().await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_connection_refused_is_connection_error() {
        // port 9 (discard) is not listening in test environments
        let client = ApiClient::with_timeout("http://127.0.0.1:9/common".to_string(), 2).unwrap();
        let err = client.get_text(endpoints::TREE).await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::Connection { .. } | ApiError::Timeout { .. }
        ));
        assert_ne!(err.code(), crate::error::codes::SUCCESS);
    }
}
