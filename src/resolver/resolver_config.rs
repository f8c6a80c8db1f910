// resolver configuration, read from a JSON cloud config file
use super::resolver_error::{ResolveError, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_VMSS_FLEX_CACHE_TTL_IN_SECONDS: u64 = 600;
pub const DEFAULT_VM_CACHE_TTL_IN_SECONDS: u64 = 60;
pub const DEFAULT_RESOURCE_MANAGER_ENDPOINT: &str = "https://management.azure.com/";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolverConfig {
    pub subscription_id: String,
    /// Resource group searched when mapping a node name to a VM name.
    pub resource_group: String,
    #[serde(default = "default_endpoint")]
    pub resource_manager_endpoint: String,
    #[serde(default, rename = "vmssFlexCacheTTLInSeconds")]
    pub vmss_flex_cache_ttl_in_seconds: u64,
    #[serde(default, rename = "vmCacheTTLInSeconds")]
    pub vm_cache_ttl_in_seconds: u64,
    #[serde(default, rename = "disableAPICallCache")]
    pub disable_api_call_cache: bool,
    #[serde(default)]
    pub bearer_token: Option<String>,
}

fn default_endpoint() -> String {
    DEFAULT_RESOURCE_MANAGER_ENDPOINT.to_string()
}

impl ResolverConfig {
    pub fn new(subscription_id: &str, resource_group: &str) -> Self {
        Self {
            subscription_id: subscription_id.to_string(),
            resource_group: resource_group.to_string(),
            resource_manager_endpoint: default_endpoint(),
            vmss_flex_cache_ttl_in_seconds: 0,
            vm_cache_ttl_in_seconds: 0,
            disable_api_call_cache: false,
            bearer_token: None,
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: ResolverConfig = serde_json::from_str(&raw)?;
        if config.subscription_id.is_empty() {
            return Err(ResolveError::Config(format!(
                "{}: subscriptionId must not be empty",
                path.display()
            )));
        }
        Ok(config)
    }

    /// Zero means "not configured" and falls back to the default.
    pub fn vmss_flex_cache_ttl(&self) -> Duration {
        ttl_or_default(self.vmss_flex_cache_ttl_in_seconds, DEFAULT_VMSS_FLEX_CACHE_TTL_IN_SECONDS)
    }

    pub fn vm_cache_ttl(&self) -> Duration {
        ttl_or_default(self.vm_cache_ttl_in_seconds, DEFAULT_VM_CACHE_TTL_IN_SECONDS)
    }
}

fn ttl_or_default(seconds: u64, default: u64) -> Duration {
    if seconds == 0 {
        Duration::from_secs(default)
    } else {
        Duration::from_secs(seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_ttl_falls_back_to_default() {
        let config = ResolverConfig::new("sub", "rg");
        assert_eq!(config.vmss_flex_cache_ttl(), Duration::from_secs(600));
        assert_eq!(config.vm_cache_ttl(), Duration::from_secs(60));
    }

    #[test]
    fn test_parse_cloud_config() {
        let config: ResolverConfig = serde_json::from_str(
            r#"{
                "subscriptionId": "sub-1",
                "resourceGroup": "rg-nodes",
                "vmssFlexCacheTTLInSeconds": 30,
                "disableAPICallCache": true
            }"#,
        )
        .unwrap();

        assert_eq!(config.subscription_id, "sub-1");
        assert_eq!(config.resource_group, "rg-nodes");
        assert_eq!(config.resource_manager_endpoint, DEFAULT_RESOURCE_MANAGER_ENDPOINT);
        assert_eq!(config.vmss_flex_cache_ttl(), Duration::from_secs(30));
        assert_eq!(config.vm_cache_ttl(), Duration::from_secs(60));
        assert!(config.disable_api_call_cache);
        assert!(config.bearer_token.is_none());
    }

    #[test]
    fn test_from_file_rejects_empty_subscription() {
        let path = std::env::temp_dir().join("flex_resolver_empty_sub.json");
        std::fs::write(&path, r#"{"subscriptionId": "", "resourceGroup": "rg"}"#).unwrap();
        let err = ResolverConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ResolveError::Config(_)));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_from_file_missing() {
        let err = ResolverConfig::from_file("/nonexistent/flex_resolver.json").unwrap_err();
        assert!(matches!(err, ResolveError::Io(_)));
    }
}
