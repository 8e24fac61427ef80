use std::time::Duration;

use async_trait::async_trait;
use pan_xml::{ApiResponse, DeviceType};
use tracing::{debug, info, warn};
use zone_engine::{MemberLocator, RuleRecord, RulebaseScope, Transport, TransportError};

use crate::error::ApiError;

/// XPath queried to tell Panorama from a firewall and to list device groups.
const DEVICE_GROUP_XPATH: &str = "/config/devices/entry/device-group";

/// Placeholder shown instead of credentials in reported requests.
const REDACTED: &str = "********";

/// Connection settings shared by every request.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Verify the device's TLS certificate. Management interfaces commonly
    /// present self-signed certificates, so this is off unless configured.
    pub verify_tls: bool,
    pub timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            verify_tls: false,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Unauthenticated access to a device's `/api/` endpoint. Only good for
/// generating an API key; see [`ApiClient::authenticate`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    host: String,
    base_url: String,
}

impl ApiClient {
    /// Client for `https://<host>/api/`.
    pub fn new(host: &str, settings: &ApiSettings) -> Result<Self, ApiError> {
        Self::with_base_url(host, format!("https://{host}"), settings)
    }

    /// Client for an explicit base URL (scheme and authority, no path).
    pub fn with_base_url(
        host: impl Into<String>,
        base_url: impl Into<String>,
        settings: &ApiSettings,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(!settings.verify_tls)
            .timeout(settings.timeout)
            .build()
            .map_err(ApiError::Client)?;
        Ok(Self {
            http,
            host: host.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Exchange credentials for an API key.
    ///
    /// Wrong credentials come back as [`ApiError::Rejected`]; an unreachable
    /// device as [`ApiError::Connect`].
    pub async fn generate_key(&self, username: &str, password: &str) -> Result<String, ApiError> {
        let params = [("type", "keygen"), ("user", username), ("password", password)];
        let response = self.send(&params, &["password"]).await?;
        let key = response.api_key().map_err(|source| ApiError::Response {
            status: 200,
            source,
        })?;
        info!(host = %self.host, user = username, "API key generated");
        Ok(key)
    }

    /// Attach an API key, producing a client for configuration calls.
    pub fn authenticate(self, api_key: impl Into<String>) -> PanClient {
        PanClient {
            api: self,
            api_key: api_key.into(),
        }
    }

    /// `base/api/?k=v&...` exactly as composed, with `hidden` values masked.
    fn describe(&self, params: &[(&str, &str)], hidden: &[&str]) -> String {
        let query: Vec<String> = params
            .iter()
            .map(|(k, v)| {
                let v: &str = if hidden.contains(k) { REDACTED } else { v };
                format!("{k}={v}")
            })
            .collect();
        format!("{}/api/?{}", self.base_url, query.join("&"))
    }

    /// Issue one GET and interpret the `<response>` envelope.
    async fn send(&self, params: &[(&str, &str)], hidden: &[&str]) -> Result<ApiResponse, ApiError> {
        let request = self.describe(params, hidden);
        debug!(%request, "sending API request");

        let resp = self
            .http
            .get(format!("{}/api/", self.base_url))
            .query(params)
            .send()
            .await
            .map_err(|source| {
                if source.is_connect() {
                    ApiError::Connect {
                        host: self.host.clone(),
                        source,
                    }
                } else {
                    ApiError::Http(source)
                }
            })?;

        let status = resp.status().as_u16();
        let body = resp.text().await?;
        let response = ApiResponse::parse(&body)
            .map_err(|source| ApiError::Response { status, source })?;

        if !response.is_success() {
            let message = response.message();
            warn!(%request, status, %message, "API request rejected");
            return Err(ApiError::Rejected { request, message });
        }
        Ok(response)
    }
}

/// An authenticated management session: device address plus API key.
///
/// Owned by the caller and passed explicitly; the engine never changes it.
#[derive(Debug, Clone)]
pub struct PanClient {
    api: ApiClient,
    api_key: String,
}

impl PanClient {
    pub fn host(&self) -> &str {
        self.api.host()
    }

    async fn config(&self, action: &str, extra: &[(&str, &str)]) -> Result<ApiResponse, ApiError> {
        let mut params = vec![("type", "config"), ("action", action)];
        params.extend_from_slice(extra);
        params.push(("key", self.api_key.as_str()));
        self.api.send(&params, &["key"]).await
    }

    /// Panorama if the device has any device group.
    pub async fn device_type(&self) -> Result<DeviceType, ApiError> {
        let response = self.config("get", &[("xpath", DEVICE_GROUP_XPATH)]).await?;
        Ok(response.device_type())
    }

    pub async fn device_groups(&self) -> Result<Vec<String>, ApiError> {
        let response = self.config("get", &[("xpath", DEVICE_GROUP_XPATH)]).await?;
        Ok(response.device_groups())
    }

    /// Rules configured in `scope`.
    pub async fn rules(&self, scope: &RulebaseScope) -> Result<Vec<RuleRecord>, ApiError> {
        let xpath = scope.xpath();
        let response = self.config("get", &[("xpath", xpath.as_str())]).await?;
        let rules = response.rules();
        debug!(%scope, count = rules.len(), "rules retrieved");
        Ok(rules)
    }

    /// Characters every additive request for `scope` spends before its
    /// payload: `base/api/?type=config&action=set&xpath=<xpath>&element=&key=<key>`.
    /// Counted unencoded, like the payload it is added to.
    pub fn set_overhead(&self, scope: &RulebaseScope) -> usize {
        format!(
            "{}/api/?type=config&action=set&xpath={}&element=&key={}",
            self.api.base_url,
            scope.xpath(),
            self.api_key
        )
        .chars()
        .count()
    }
}

fn transport_error(err: ApiError, request: String) -> TransportError {
    match err {
        ApiError::Rejected { request, message } => TransportError::new(request, message),
        other => TransportError::new(request, other.to_string()),
    }
}

#[async_trait]
impl Transport for PanClient {
    async fn set_members(&self, scope: &RulebaseScope, payload: &str) -> Result<(), TransportError> {
        let xpath = scope.xpath();
        let extra = [("xpath", xpath.as_str()), ("element", payload)];
        self.config("set", &extra).await.map(drop).map_err(|err| {
            let request = self.api.describe(
                &[
                    ("type", "config"),
                    ("action", "set"),
                    ("xpath", xpath.as_str()),
                    ("element", payload),
                    ("key", REDACTED),
                ],
                &[],
            );
            transport_error(err, request)
        })
    }

    async fn delete_member(
        &self,
        scope: &RulebaseScope,
        locator: &MemberLocator,
    ) -> Result<(), TransportError> {
        let xpath = format!("{}{}", scope.xpath(), locator.xpath_suffix());
        self.config("delete", &[("xpath", xpath.as_str())])
            .await
            .map(drop)
            .map_err(|err| {
                let request = self.api.describe(
                    &[
                        ("type", "config"),
                        ("action", "delete"),
                        ("xpath", xpath.as_str()),
                        ("key", REDACTED),
                    ],
                    &[],
                );
                transport_error(err, request)
            })
    }
}
