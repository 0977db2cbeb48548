use std::sync::Arc;
use std::time::Duration;

use log::debug;
use reqwest::{Certificate, Client};
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use url::Url;

use crate::auth::Token;
use crate::error::{CITreeError, RemoteErrorKind, Result};

pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 64;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

/// Connection settings for one Zuul host.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub host: String,
    pub token: Option<Token>,
    /// PEM file used to identify the host.
    pub cert: Option<std::path::PathBuf>,
    pub timeout: Duration,
    pub max_concurrent_requests: usize,
}

impl SessionSettings {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            token: None,
            cert: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
        }
    }
}

/// Link to a Zuul host's REST API. Every call is a single GET; failures are
/// reported, never retried.
pub struct ZuulSession {
    client: Client,
    host: Url,
    api_url: Url,
    token: Option<Token>,
    semaphore: Arc<Semaphore>,
}

impl ZuulSession {
    pub fn new(settings: SessionSettings) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(concat!("citree/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.timeout);

        if let Some(path) = &settings.cert {
            let pem = std::fs::read(path)?;
            let cert = Certificate::from_pem(&pem).map_err(|e| {
                CITreeError::Config(format!("Invalid certificate '{}': {e}", path.display()))
            })?;
            builder = builder.add_root_certificate(cert);
        }

        let client = builder
            .build()
            .map_err(|e| CITreeError::Config(format!("Failed to create HTTP client: {e}")))?;

        let mut host = settings.host;
        if !host.ends_with('/') {
            host.push('/');
        }

        let host = Url::parse(&host)
            .map_err(|e| CITreeError::Config(format!("Invalid host URL: {e}")))?;

        let api_url = host
            .join("api/")
            .map_err(|e| CITreeError::Config(format!("Invalid API base URL: {e}")))?;

        Ok(Self {
            client,
            host,
            api_url,
            token: settings.token,
            semaphore: Arc::new(Semaphore::new(settings.max_concurrent_requests.max(1))),
        })
    }

    /// Host URL without the trailing slash, used to build web links.
    pub fn host(&self) -> &str {
        self.host.as_str().trim_end_matches('/')
    }

    pub fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.token {
            request.bearer_auth(token.as_str())
        } else {
            request
        }
    }

    /// URL of an API end-point. Every segment is percent-encoded; a `/`
    /// inside a segment still separates, since project names are paths.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.api_url.clone();

        url.path_segments_mut()
            .map_err(|()| {
                CITreeError::Config(format!("Host cannot hold an API path: {}", self.api_url))
            })?
            .pop_if_empty()
            .extend(segments.iter().flat_map(|segment| segment.split('/')));

        Ok(url)
    }

    /// Performs a GET on one of the host's API end-points and decodes the body.
    pub async fn get<T>(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = self.endpoint(segments)?;

        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| CITreeError::Config("HTTP session already closed".to_string()))?;

        debug!("GET {url} {query:?}");

        let response = self
            .auth_request(self.client.get(url).query(query))
            .send()
            .await?;

        let status = response.status();
        let url = response.url().to_string();

        if !status.is_success() {
            return Err(CITreeError::RemoteApi {
                kind: RemoteErrorKind::from_status(status.as_u16()),
                url,
            });
        }

        let body = response.text().await?;

        serde_json::from_str(&body).map_err(|e| CITreeError::IllegibleData {
            url,
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn session(server: &mockito::Server) -> ZuulSession {
        ZuulSession::new(SessionSettings::new(server.url())).unwrap()
    }

    #[test]
    fn host_gets_trailing_slash_normalized() {
        let session = ZuulSession::new(SessionSettings::new("https://zuul.example")).unwrap();
        assert_eq!(session.host(), "https://zuul.example");
        assert_eq!(session.api_url.as_str(), "https://zuul.example/api/");
    }

    #[test]
    fn endpoint_segments_are_encoded() {
        let session = ZuulSession::new(SessionSettings::new("https://zuul.example/zuul")).unwrap();

        let url = session.endpoint(&["tenant", "a?b#c%d", "jobs"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://zuul.example/zuul/api/tenant/a%3Fb%23c%25d/jobs"
        );

        let url = session
            .endpoint(&["tenant", "openstack", "project", "openstack/nova"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://zuul.example/zuul/api/tenant/openstack/project/openstack/nova"
        );
    }

    #[test]
    fn rejects_invalid_host() {
        let result = ZuulSession::new(SessionSettings::new("not a url"));
        assert!(matches!(result, Err(CITreeError::Config(_))));
    }

    #[tokio::test]
    async fn decodes_json_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/tenants")
            .with_status(200)
            .with_body(r#"[{"name": "openstack"}]"#)
            .create_async()
            .await;

        let body: Value = session(&server).get(&["tenants"], &[]).await.unwrap();
        assert_eq!(body[0]["name"], "openstack");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn sends_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/tenants")
            .match_header("authorization", "Bearer s3cr3t")
            .with_body("[]")
            .create_async()
            .await;

        let mut settings = SessionSettings::new(server.url());
        settings.token = Some(Token::from("s3cr3t"));
        let session = ZuulSession::new(settings).unwrap();

        let _: Vec<Value> = session.get(&["tenants"], &[]).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn maps_status_codes_to_remote_errors() {
        let mut server = mockito::Server::new_async().await;
        for (status, expected) in [
            (401, RemoteErrorKind::Unauthorized),
            (403, RemoteErrorKind::Forbidden),
            (404, RemoteErrorKind::NotFound),
            (503, RemoteErrorKind::Unknown(503)),
        ] {
            let path = format!("/api/status/{status}");
            let _mock = server
                .mock("GET", path.as_str())
                .with_status(status)
                .create_async()
                .await;

            let code = status.to_string();
            let err = session(&server)
                .get::<Value>(&["status", &code], &[])
                .await
                .unwrap_err();

            match err {
                CITreeError::RemoteApi { kind, url } => {
                    assert_eq!(kind, expected);
                    assert!(url.ends_with(&format!("/api/status/{status}")));
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[tokio::test]
    async fn undecodable_body_is_illegible_data() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/tenants")
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let err = session(&server)
            .get::<Vec<Value>>(&["tenants"], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, CITreeError::IllegibleData { .. }));
    }

    #[tokio::test]
    async fn passes_query_parameters() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/tenant/openstack/builds")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("job_name".into(), "tox-py3".into()),
                mockito::Matcher::UrlEncoded("result".into(), "SUCCESS".into()),
            ]))
            .with_body("[]")
            .create_async()
            .await;

        let _: Vec<Value> = session(&server)
            .get(
                &["tenant", "openstack", "builds"],
                &[("job_name", "tox-py3"), ("result", "SUCCESS")],
            )
            .await
            .unwrap();
        mock.assert_async().await;
    }
}
