//! Accelerator discovery: mapping a symbolic name to a reachable endpoint

use crate::{
    error::{AppError, Result},
    models::Config,
    types::{Endpoint, SymbolicName},
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use url::Url;

/// Header the metadata server requires on every request
const METADATA_FLAVOR_HEADER: &str = "Metadata-Flavor";
const METADATA_FLAVOR: &str = "Google";

/// Maps a symbolic accelerator name to an endpoint
#[async_trait]
pub trait EndpointResolver: Send + Sync {
    /// Look up an already validated name
    async fn lookup(&self, name: &SymbolicName) -> Result<Endpoint>;

    /// Validate `name`, look it up and check the answer is a usable remote address
    ///
    /// An empty name fails with `InvalidParameter` before any lookup is attempted.
    async fn resolve(&self, name: &str) -> Result<Endpoint> {
        let name = SymbolicName::new(name)?;
        match self.lookup(&name).await? {
            Endpoint::Local => Err(AppError::resolution(format!(
                "Discovery returned no remote address for '{}'",
                name
            ))),
            Endpoint::Remote { address } => Endpoint::remote(address).map_err(|e| {
                AppError::resolution(format!("Discovery answer for '{}' is unusable: {}", name, e.message()))
            }),
        }
    }
}

/// Resolver backed by a fixed name → address table
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    addresses: HashMap<String, String>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a mapping
    pub fn with_address<N: Into<String>, A: Into<String>>(mut self, name: N, address: A) -> Self {
        self.addresses.insert(name.into(), address.into());
        self
    }
}

#[async_trait]
impl EndpointResolver for StaticResolver {
    async fn lookup(&self, name: &SymbolicName) -> Result<Endpoint> {
        self.addresses
            .get(name.as_str())
            .map(|address| Endpoint::Remote { address: address.clone() })
            .ok_or_else(|| AppError::resolution(format!("Unknown accelerator '{}'", name)))
    }
}

/// Node description returned by the discovery API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeResponse {
    #[serde(default)]
    network_endpoints: Vec<NetworkEndpoint>,
    ip_address: Option<String>,
    port: Option<PortValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NetworkEndpoint {
    ip_address: Option<String>,
    port: Option<PortValue>,
}

/// The API reports ports as numbers in some places and strings in others
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PortValue {
    Number(u16),
    Text(String),
}

impl PortValue {
    fn as_port(&self) -> Option<u16> {
        match self {
            PortValue::Number(port) => Some(*port),
            PortValue::Text(text) => text.trim().parse().ok(),
        }
    }
}

impl NodeResponse {
    /// First network endpoint, falling back to the legacy top-level fields
    fn address(&self) -> Option<String> {
        let from_endpoints = self
            .network_endpoints
            .iter()
            .find_map(|ep| ep.ip_address.as_deref().filter(|ip| !ip.is_empty()).map(|ip| (ip, ep.port.as_ref())));

        let (ip, port) = match from_endpoints {
            Some(found) => found,
            None => (
                self.ip_address.as_deref().filter(|ip| !ip.is_empty())?,
                self.port.as_ref(),
            ),
        };

        let port = port
            .and_then(PortValue::as_port)
            .unwrap_or(crate::defaults::DEFAULT_ACCELERATOR_PORT);
        // IPv6 literals need brackets to take a port
        if ip.contains(':') && !ip.starts_with('[') {
            Some(format!("[{}]:{}", ip, port))
        } else {
            Some(format!("{}:{}", ip, port))
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Resolver that asks the cloud discovery API, using the instance metadata
/// server for project, zone and credentials that are not configured
pub struct MetadataResolver {
    client: Client,
    discovery_url: Url,
    metadata_url: Url,
    project: Option<String>,
    zone: Option<String>,
    access_token: Option<String>,
}

impl MetadataResolver {
    /// Create a resolver from the application configuration
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            discovery_url: Url::parse(&config.discovery_url)?,
            metadata_url: Url::parse(&config.metadata_url)?,
            project: config.project.clone(),
            zone: config.zone.clone(),
            access_token: config.access_token.clone(),
        })
    }

    /// Fetch one value from the metadata server
    async fn metadata_value(&self, path: &[&str]) -> Result<String> {
        let url = append_segments(&self.metadata_url, path)?;
        let response = self
            .client
            .get(url.clone())
            .header(METADATA_FLAVOR_HEADER, METADATA_FLAVOR)
            .send()
            .await
            .map_err(|e| transport_failure("metadata server", &e))?;

        if !response.status().is_success() {
            return Err(AppError::resolution(format!(
                "Metadata server returned {} for {}",
                response.status(),
                url.path()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| transport_failure("metadata server", &e))?;
        Ok(body.trim().to_string())
    }

    async fn project(&self) -> Result<String> {
        match &self.project {
            Some(project) => Ok(project.clone()),
            None => self
                .metadata_value(&["computeMetadata", "v1", "project", "project-id"])
                .await
                .map_err(|e| AppError::resolution(format!("Could not determine project: {}", e.message()))),
        }
    }

    /// Zone comes back as `projects/<number>/zones/<zone>`
    async fn zone(&self) -> Result<String> {
        match &self.zone {
            Some(zone) => Ok(zone.clone()),
            None => {
                let full = self
                    .metadata_value(&["computeMetadata", "v1", "instance", "zone"])
                    .await
                    .map_err(|e| AppError::resolution(format!("Could not determine zone: {}", e.message())))?;
                full.rsplit('/')
                    .next()
                    .filter(|zone| !zone.is_empty())
                    .map(str::to_string)
                    .ok_or_else(|| AppError::resolution(format!("Malformed zone from metadata server: '{}'", full)))
            }
        }
    }

    /// A missing token is not fatal; the discovery call then goes out unauthenticated
    async fn access_token(&self) -> Option<String> {
        if let Some(token) = &self.access_token {
            return Some(token.clone());
        }

        let body = self
            .metadata_value(&["computeMetadata", "v1", "instance", "service-accounts", "default", "token"])
            .await
            .ok()?;
        serde_json::from_str::<TokenResponse>(&body)
            .ok()
            .map(|token| token.access_token)
    }

    fn node_url(&self, project: &str, zone: &str, name: &SymbolicName) -> Result<Url> {
        append_segments(
            &self.discovery_url,
            &["v1", "projects", project, "locations", zone, "nodes", name.as_str()],
        )
    }
}

#[async_trait]
impl EndpointResolver for MetadataResolver {
    async fn lookup(&self, name: &SymbolicName) -> Result<Endpoint> {
        let project = self.project().await?;
        let zone = self.zone().await?;
        let url = self.node_url(&project, &zone, name)?;

        let mut request = self.client.get(url);
        if let Some(token) = self.access_token().await {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| transport_failure("discovery service", &e))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(AppError::resolution(format!(
                    "Unknown accelerator '{}' in {}/{}",
                    name, project, zone
                )));
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(AppError::resolution(format!(
                    "Not authorized to look up accelerator '{}' ({})",
                    name,
                    response.status()
                )));
            }
            status => {
                return Err(AppError::resolution(format!(
                    "Discovery service returned {} for '{}'",
                    status, name
                )));
            }
        }

        let node: NodeResponse = response.json().await.map_err(|e| {
            AppError::resolution(format!("Malformed discovery answer for '{}': {}", name, e))
        })?;

        let address = node.address().ok_or_else(|| {
            AppError::resolution(format!("Discovery answer for '{}' has no network endpoint", name))
        })?;

        Ok(Endpoint::Remote { address })
    }
}

/// Build the resolver the configuration asks for
pub fn create_resolver(config: &Config) -> Result<Box<dyn EndpointResolver>> {
    match &config.endpoint_override {
        Some(address) => Ok(Box::new(
            StaticResolver::new().with_address(config.accelerator_name.clone(), address.clone()),
        )),
        None => Ok(Box::new(MetadataResolver::new(config)?)),
    }
}

#[async_trait]
impl<R: EndpointResolver + ?Sized> EndpointResolver for Box<R> {
    async fn lookup(&self, name: &SymbolicName) -> Result<Endpoint> {
        (**self).lookup(name).await
    }
}

/// Append path segments to a base URL, percent-encoding each one
pub(crate) fn append_segments(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| AppError::config(format!("URL '{}' cannot be used as a base", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn transport_failure(service: &str, error: &reqwest::Error) -> AppError {
    if error.is_timeout() {
        AppError::resolution(format!("{} timed out: {}", service, error))
    } else if error.is_connect() {
        AppError::resolution(format!("{} unreachable: {}", service, error))
    } else {
        AppError::resolution(format!("{} request failed: {}", service, error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn config_for(server: &MockServer) -> Config {
        Config {
            discovery_url: server.uri(),
            metadata_url: server.uri(),
            request_timeout_seconds: 5,
            ..Default::default()
        }
    }

    async fn mount_metadata(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/computeMetadata/v1/project/project-id"))
            .and(header("Metadata-Flavor", "Google"))
            .respond_with(ResponseTemplate::new(200).set_body_string("demo-project\n"))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/computeMetadata/v1/instance/zone"))
            .and(header("Metadata-Flavor", "Google"))
            .respond_with(ResponseTemplate::new(200).set_body_string("projects/1234/zones/us-central1-b"))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/computeMetadata/v1/instance/service-accounts/default/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.test",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_static_resolver() {
        let resolver = StaticResolver::new().with_address("alice-tpu-0", "10.0.0.5:8470");
        let endpoint = resolver.resolve("alice-tpu-0").await.unwrap();
        assert_eq!(endpoint.address(), "10.0.0.5:8470");

        assert!(matches!(resolver.resolve("bob-tpu-0").await, Err(AppError::Resolution(_))));
        assert!(matches!(resolver.resolve("").await, Err(AppError::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn test_static_resolver_rejects_malformed_address() {
        let resolver = StaticResolver::new().with_address("alice-tpu-0", "");
        assert!(matches!(resolver.resolve("alice-tpu-0").await, Err(AppError::Resolution(_))));
    }

    #[tokio::test]
    async fn test_metadata_resolver_uses_network_endpoints() {
        let server = MockServer::start().await;
        mount_metadata(&server).await;
        Mock::given(method("GET"))
            .and(path("/v1/projects/demo-project/locations/us-central1-b/nodes/alice-tpu-0"))
            .and(header("Authorization", "Bearer ya29.test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "projects/demo-project/locations/us-central1-b/nodes/alice-tpu-0",
                "state": "READY",
                "networkEndpoints": [{ "ipAddress": "10.0.0.5", "port": 8470 }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let resolver = MetadataResolver::new(&config_for(&server)).unwrap();
        let endpoint = resolver.resolve("alice-tpu-0").await.unwrap();
        assert_eq!(endpoint, Endpoint::Remote { address: "10.0.0.5:8470".to_string() });
        assert_eq!(endpoint.url(), "grpc://10.0.0.5:8470");
    }

    #[tokio::test]
    async fn test_metadata_resolver_legacy_fields_and_configured_location() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/projects/p1/locations/europe-west4-a/nodes/bob-tpu-0"))
            .and(header("Authorization", "Bearer configured-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ipAddress": "10.1.2.3",
                "port": "8470"
            })))
            .mount(&server)
            .await;

        let config = Config {
            project: Some("p1".to_string()),
            zone: Some("europe-west4-a".to_string()),
            access_token: Some("configured-token".to_string()),
            ..config_for(&server)
        };
        let resolver = MetadataResolver::new(&config).unwrap();
        let endpoint = resolver.resolve("bob-tpu-0").await.unwrap();
        assert_eq!(endpoint.address(), "10.1.2.3:8470");
    }

    #[tokio::test]
    async fn test_metadata_resolver_unknown_name() {
        let server = MockServer::start().await;
        mount_metadata(&server).await;
        Mock::given(method("GET"))
            .and(path("/v1/projects/demo-project/locations/us-central1-b/nodes/ghost"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let resolver = MetadataResolver::new(&config_for(&server)).unwrap();
        let error = resolver.resolve("ghost").await.unwrap_err();
        assert!(matches!(error, AppError::Resolution(_)));
        assert!(error.to_string().contains("Unknown accelerator 'ghost'"));
    }

    #[tokio::test]
    async fn test_metadata_resolver_unauthorized() {
        let server = MockServer::start().await;
        mount_metadata(&server).await;
        Mock::given(method("GET"))
            .and(path("/v1/projects/demo-project/locations/us-central1-b/nodes/alice-tpu-0"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let resolver = MetadataResolver::new(&config_for(&server)).unwrap();
        let error = resolver.resolve("alice-tpu-0").await.unwrap_err();
        assert!(error.to_string().contains("Not authorized"));
    }

    #[tokio::test]
    async fn test_metadata_resolver_missing_address() {
        let server = MockServer::start().await;
        mount_metadata(&server).await;
        Mock::given(method("GET"))
            .and(path("/v1/projects/demo-project/locations/us-central1-b/nodes/alice-tpu-0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "state": "CREATING" })))
            .mount(&server)
            .await;

        let resolver = MetadataResolver::new(&config_for(&server)).unwrap();
        let error = resolver.resolve("alice-tpu-0").await.unwrap_err();
        assert!(error.to_string().contains("no network endpoint"));
    }

    #[tokio::test]
    async fn test_empty_name_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let resolver = MetadataResolver::new(&config_for(&server)).unwrap();
        assert!(matches!(resolver.resolve("").await, Err(AppError::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn test_unreachable_discovery_service() {
        let config = Config {
            discovery_url: "http://127.0.0.1:9".to_string(),
            metadata_url: "http://127.0.0.1:9".to_string(),
            project: Some("p".to_string()),
            zone: Some("z".to_string()),
            access_token: Some("t".to_string()),
            request_timeout_seconds: 2,
            ..Default::default()
        };
        let resolver = MetadataResolver::new(&config).unwrap();
        assert!(matches!(resolver.resolve("alice-tpu-0").await, Err(AppError::Resolution(_))));
    }

    #[test]
    fn test_create_resolver_honours_override() {
        let config = Config {
            endpoint_override: Some("10.0.0.9:8470".to_string()),
            ..Default::default()
        };
        assert!(create_resolver(&config).is_ok());
        assert!(create_resolver(&Config::default()).is_ok());
    }

    #[test]
    fn test_node_response_port_defaults() {
        let node: NodeResponse = serde_json::from_value(serde_json::json!({
            "networkEndpoints": [{ "ipAddress": "" }, { "ipAddress": "10.0.0.7" }]
        }))
        .unwrap();
        assert_eq!(node.address().as_deref(), Some("10.0.0.7:8470"));
    }

    #[test]
    fn test_node_response_brackets_ipv6() {
        let node: NodeResponse = serde_json::from_value(serde_json::json!({
            "networkEndpoints": [{ "ipAddress": "fe80::1", "port": 8471 }]
        }))
        .unwrap();
        assert_eq!(node.address().as_deref(), Some("[fe80::1]:8471"));

        let legacy: NodeResponse = serde_json::from_value(serde_json::json!({
            "ipAddress": "[fd00::5]"
        }))
        .unwrap();
        assert_eq!(legacy.address().as_deref(), Some("[fd00::5]:8470"));
    }

    #[tokio::test]
    async fn test_metadata_resolver_ipv6_endpoint() {
        let server = MockServer::start().await;
        mount_metadata(&server).await;
        Mock::given(method("GET"))
            .and(path("/v1/projects/demo-project/locations/us-central1-b/nodes/alice-tpu-0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "networkEndpoints": [{ "ipAddress": "fe80::1", "port": 8470 }]
            })))
            .mount(&server)
            .await;

        let resolver = MetadataResolver::new(&config_for(&server)).unwrap();
        let endpoint = resolver.resolve("alice-tpu-0").await.unwrap();
        assert_eq!(endpoint.address(), "[fe80::1]:8470");
        assert_eq!(endpoint.url(), "grpc://[fe80::1]:8470");
        assert!(url::Url::parse(&format!("http://{}/", endpoint.address())).is_ok());
    }
}
