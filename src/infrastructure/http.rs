//! HTTP adapters for the REST facades in front of the identity-governance
//! system, the vault, and the ticketing system.

use crate::domain::outcome::CallOutcome;
use crate::domain::ports::{IdentityGroupClient, TicketSystem, VaultSafeClient};
use crate::domain::request::{GroupAttributes, SafeAttributes};
use crate::domain::status::{Created, CreationResponse, GroupStatus};
use crate::error::{ProvisionError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, header};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

pub const GROUP_STATUS_PATH: &str = "/saviynt/checkGroupStatus";
pub const GROUP_CREATE_PATH: &str = "/saviynt/createGroup";
pub const SAFE_CREATE_PATH: &str = "/cyberark/createSafe";
pub const TICKET_CREATE_PATH: &str = "/createRITM";

/// Base URL and credentials of one facade.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl Endpoint {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

/// JSON-over-HTTP client bound to one facade.
#[derive(Clone)]
struct Facade {
    service: &'static str,
    client: Client,
    endpoint: Endpoint,
}

impl Facade {
    fn new(service: &'static str, endpoint: Endpoint, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProvisionError::InternalError(Box::new(e)))?;
        Ok(Self {
            service,
            client,
            endpoint,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint.base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.header(header::ACCEPT, "application/json");
        match &self.endpoint.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let request = self.authorize(self.client.get(self.url(path)).query(query));
        self.execute("GET", path, request).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let request = self.authorize(self.client.post(self.url(path)).json(body));
        self.execute("POST", path, request).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: &str,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T> {
        let response = request.send().await.map_err(|e| {
            warn!(service = self.service, method, path, error = %e, "request failed");
            ProvisionError::dependency(self.service, e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(service = self.service, method, path, %status, "request rejected");
            return Err(ProvisionError::dependency(
                self.service,
                format!("{method} {path} returned {status}: {body}"),
            ));
        }
        debug!(service = self.service, method, path, %status, "request succeeded");

        response
            .json::<T>()
            .await
            .map_err(|e| ProvisionError::dependency(self.service, format!("invalid response body: {e}")))
    }
}

pub struct HttpIdentityGroupClient {
    facade: Facade,
}

impl HttpIdentityGroupClient {
    pub fn new(endpoint: Endpoint, timeout: Duration) -> Result<Self> {
        Ok(Self {
            facade: Facade::new("identity-governance", endpoint, timeout)?,
        })
    }
}

#[async_trait]
impl IdentityGroupClient for HttpIdentityGroupClient {
    async fn check_status(&self, group_name: &str) -> CallOutcome<GroupStatus> {
        CallOutcome::from_result(
            self.facade
                .get::<GroupStatus>(GROUP_STATUS_PATH, &[("groupName", group_name)])
                .await
                .map(CallOutcome::Success),
        )
    }

    async fn create_group(&self, attributes: &GroupAttributes) -> CallOutcome<Created> {
        CallOutcome::from_result(
            self.facade
                .post::<_, CreationResponse>(GROUP_CREATE_PATH, attributes)
                .await
                .map(|response| response.into_outcome("group")),
        )
    }
}

pub struct HttpVaultSafeClient {
    facade: Facade,
}

impl HttpVaultSafeClient {
    pub fn new(endpoint: Endpoint, timeout: Duration) -> Result<Self> {
        Ok(Self {
            facade: Facade::new("vault", endpoint, timeout)?,
        })
    }
}

#[async_trait]
impl VaultSafeClient for HttpVaultSafeClient {
    async fn create_safe(&self, attributes: &SafeAttributes) -> CallOutcome<Created> {
        CallOutcome::from_result(
            self.facade
                .post::<_, CreationResponse>(SAFE_CREATE_PATH, attributes)
                .await
                .map(|response| response.into_outcome("safe")),
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TicketRequest<'a> {
    correlation_id: &'a str,
    description: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TicketResponse {
    ritm_number: String,
}

pub struct HttpTicketSystem {
    facade: Facade,
}

impl HttpTicketSystem {
    pub fn new(endpoint: Endpoint, timeout: Duration) -> Result<Self> {
        Ok(Self {
            facade: Facade::new("ticketing", endpoint, timeout)?,
        })
    }
}

#[async_trait]
impl TicketSystem for HttpTicketSystem {
    async fn create(&self, correlation_id: &str, reason: &str) -> Result<String> {
        let request = TicketRequest {
            correlation_id,
            description: format!("Failed to create AD group: {reason}"),
        };
        let response: TicketResponse = self.facade.post(TICKET_CREATE_PATH, &request).await?;
        Ok(response.ritm_number)
    }
}
