// inventory API client: trait plus the HTTP implementation against ARM
use super::compute::{ScaleSet, VirtualMachine};
use super::resolver_config::ResolverConfig;
use super::resolver_error::{ResolveError, Result};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

const RESOURCE_GROUP_API_VERSION: &str = "2021-04-01";
const COMPUTE_API_VERSION: &str = "2022-08-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Read-only view of the compute inventory. Errors for missing resources
/// must come back as `ResolveError::NotFound`.
#[async_trait]
pub trait InventoryClient: Send + Sync {
    async fn list_resource_groups(&self) -> Result<HashSet<String>>;

    async fn list_scale_sets(&self, resource_group: &str) -> Result<Vec<ScaleSet>>;

    async fn get_vm_name_by_computer_name(
        &self,
        resource_group: &str,
        computer_name: &str,
    ) -> Result<String>;

    async fn get_vm(&self, resource_group: &str, vm_name: &str) -> Result<VirtualMachine>;
}

#[derive(Clone)]
pub struct ArmInventoryClient {
    client: reqwest::Client,
    base_url: String,
    subscription_id: String,
    auth_token: Option<String>,
}

#[derive(Deserialize)]
struct ListResult<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
    #[serde(default, rename = "nextLink")]
    next_link: Option<String>,
}

#[derive(Deserialize)]
struct ResourceGroup {
    name: String,
}

impl ArmInventoryClient {
    pub fn new(base_url: Url, subscription_id: &str, auth_token: Option<String>) -> Result<Self> {
        let client = reqwest::ClientBuilder::new()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                ResolveError::Config(format!("failed to build HTTP client: {}", e))
            })?;
        Ok(Self {
            client,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            subscription_id: subscription_id.to_string(),
            auth_token,
        })
    }

    pub fn from_config(config: &ResolverConfig) -> Result<Self> {
        let base_url = Url::parse(&config.resource_manager_endpoint).map_err(|e| {
            ResolveError::Config(format!(
                "invalid resourceManagerEndpoint {}: {}",
                config.resource_manager_endpoint, e
            ))
        })?;
        Self::new(base_url, &config.subscription_id, config.bearer_token.clone())
    }

    fn subscription_url(&self, path: &str, api_version: &str) -> String {
        format!(
            "{}/subscriptions/{}/{}?api-version={}",
            self.base_url, self.subscription_id, path, api_version
        )
    }

    fn compute_url(&self, resource_group: &str, resource: &str) -> String {
        self.subscription_url(
            &format!(
                "resourceGroups/{}/providers/Microsoft.Compute/{}",
                resource_group, resource
            ),
            COMPUTE_API_VERSION,
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T> {
        let mut req = self.client.get(url);
        if let Some(token) = &self.auth_token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await.map_err(|e| {
            ResolveError::HttpError(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Request failed: {}", e),
            )
        })?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| {
            ResolveError::HttpError(status, format!("Failed to read response: {}", e))
        })?;

        match status {
            s if s.is_success() => Ok(serde_json::from_str(&body)?),
            StatusCode::NOT_FOUND => Err(ResolveError::not_found(what)),
            _ => {
                log::error!("GET {} failed ({}): {}", what, status, body);
                Err(ResolveError::HttpError(status, body))
            }
        }
    }

    /// Collects every page of a list call.
    async fn list_all<T: DeserializeOwned>(&self, url: String, what: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(url);
        while let Some(url) = next {
            let page: ListResult<T> = self.get_json(&url, what).await?;
            items.extend(page.value);
            next = page.next_link.filter(|link| !link.is_empty());
        }
        Ok(items)
    }
}

#[async_trait]
impl InventoryClient for ArmInventoryClient {
    async fn list_resource_groups(&self) -> Result<HashSet<String>> {
        let url = self.subscription_url("resourcegroups", RESOURCE_GROUP_API_VERSION);
        let groups: Vec<ResourceGroup> = self.list_all(url, "resource groups").await?;
        Ok(groups.into_iter().map(|g| g.name).collect())
    }

    async fn list_scale_sets(&self, resource_group: &str) -> Result<Vec<ScaleSet>> {
        let url = self.compute_url(resource_group, "virtualMachineScaleSets");
        self.list_all(url, &format!("scale sets in resource group {}", resource_group))
            .await
    }

    async fn get_vm_name_by_computer_name(
        &self,
        resource_group: &str,
        computer_name: &str,
    ) -> Result<String> {
        let url = self.compute_url(resource_group, "virtualMachines");
        let vms: Vec<VirtualMachine> = self
            .list_all(url, &format!("VMs in resource group {}", resource_group))
            .await?;
        vms.iter()
            .filter(|vm| {
                vm.computer_name()
                    .map_or(false, |name| name.eq_ignore_ascii_case(computer_name))
            })
            .find_map(|vm| vm.name())
            .map(str::to_string)
            .ok_or_else(|| ResolveError::not_found(format!("VM with computer name {}", computer_name)))
    }

    async fn get_vm(&self, resource_group: &str, vm_name: &str) -> Result<VirtualMachine> {
        let url = self.compute_url(resource_group, &format!("virtualMachines/{}", vm_name));
        self.get_json(&url, &format!("VM {}", vm_name)).await
    }
}
