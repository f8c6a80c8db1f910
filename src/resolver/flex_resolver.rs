// node -> VM -> flexible scale set resolution over the caches and indices
use super::compute::{ScaleSet, VirtualMachine};
use super::identity_index::IdentityIndex;
use super::inventory_client::InventoryClient;
use super::keyed_lock::KeyedLock;
use super::resolver_config::ResolverConfig;
use super::resolver_error::{ResolveError, Result};
use super::snapshot::{InventorySnapshot, ScaleSetInventoryLoader};
use super::timed_cache::{CacheLoader, CacheReadType, TimedCache};
use async_trait::async_trait;
use std::sync::Arc;

/// Cache key of the scale-set inventory snapshot.
pub const VMSS_FLEX_KEY: &str = "k8svmssflexKey";
/// Serializes the node/VM name resolutions that may populate the indices.
pub const NODE_SCALE_SET_ID_LOCK_KEY: &str = "k8sgetnodevmssflexidlockkey";

struct VirtualMachineLoader {
    client: Arc<dyn InventoryClient>,
    resource_group: String,
}

#[async_trait]
impl CacheLoader<Arc<VirtualMachine>> for VirtualMachineLoader {
    async fn load(&self, vm_name: &str) -> Result<Arc<VirtualMachine>> {
        let vm = self.client.get_vm(&self.resource_group, vm_name).await?;
        Ok(Arc::new(vm))
    }
}

pub struct FlexResolver {
    config: ResolverConfig,
    client: Arc<dyn InventoryClient>,
    scale_set_cache: TimedCache<Arc<InventorySnapshot>>,
    vm_cache: TimedCache<Arc<VirtualMachine>>,
    index: IdentityIndex,
    locks: KeyedLock,
}

impl FlexResolver {
    pub fn new(config: ResolverConfig, client: Arc<dyn InventoryClient>) -> Self {
        let disabled = config.disable_api_call_cache;
        let scale_set_cache = TimedCache::new(
            config.vmss_flex_cache_ttl(),
            Arc::new(ScaleSetInventoryLoader::new(client.clone())),
            disabled,
        );
        let vm_cache = TimedCache::new(
            config.vm_cache_ttl(),
            Arc::new(VirtualMachineLoader {
                client: client.clone(),
                resource_group: config.resource_group.clone(),
            }),
            disabled,
        );
        Self {
            config,
            client,
            scale_set_cache,
            vm_cache,
            index: IdentityIndex::new(),
            locks: KeyedLock::new(),
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn index(&self) -> &IdentityIndex {
        &self.index
    }

    fn caching_disabled(&self) -> bool {
        self.config.disable_api_call_cache
    }

    /// ID of the scale set owning the node's VM. A miss is retried once
    /// with a forced refresh before NotFound is returned.
    pub async fn get_node_scale_set_id(&self, node_name: &str) -> Result<String> {
        let _guard = self.locks.acquire(NODE_SCALE_SET_ID_LOCK_KEY).await;
        if let Some(scale_set_id) = self.index.scale_set_id_of_node(node_name) {
            return Ok(scale_set_id);
        }

        match self.scale_set_id_of_node(node_name, CacheReadType::Default).await {
            Err(err) if err.is_not_found() => {
                log::info!(
                    "Could not find node ({}) in the existing cache. Forcibly refreshing the cache to check again...",
                    node_name
                );
                self.scale_set_id_of_node(node_name, CacheReadType::ForceRefresh)
                    .await
            }
            result => result,
        }
    }

    async fn scale_set_id_of_node(&self, node_name: &str, read_type: CacheReadType) -> Result<String> {
        let vm = self.get_vm(node_name, read_type).await?;
        vm.scale_set_id()
            .map(str::to_string)
            .ok_or_else(|| ResolveError::not_found(format!("scale set of node {}", node_name)))
    }

    /// Lower-cased node name of a VM, with the same retry policy as
    /// `get_node_scale_set_id`.
    pub async fn get_node_name_by_vm_name(&self, vm_name: &str) -> Result<String> {
        let _guard = self.locks.acquire(NODE_SCALE_SET_ID_LOCK_KEY).await;
        if let Some(node_name) = self.index.node_name_of_vm(vm_name) {
            return Ok(node_name);
        }

        match self.node_name_of_vm(vm_name, CacheReadType::Default).await {
            Err(err) if err.is_not_found() => {
                log::info!(
                    "Could not find node ({}) in the existing cache. Forcibly refreshing the cache to check again...",
                    vm_name
                );
                self.node_name_of_vm(vm_name, CacheReadType::ForceRefresh).await
            }
            result => result,
        }
    }

    async fn node_name_of_vm(&self, vm_name: &str, read_type: CacheReadType) -> Result<String> {
        let vm = self.get_vm_by_vm_name(vm_name, read_type).await?;
        vm.computer_name()
            .map(str::to_lowercase)
            .ok_or_else(|| ResolveError::not_found(format!("node of VM {}", vm_name)))
    }

    /// VM backing the node. Unknown nodes are looked up by computer name.
    pub async fn get_vm(&self, node_name: &str, read_type: CacheReadType) -> Result<Arc<VirtualMachine>> {
        if let Some(vm_name) = self.index.vm_name_of_node(node_name) {
            return self.get_vm_by_vm_name(&vm_name, read_type).await;
        }

        let vm_name = self
            .client
            .get_vm_name_by_computer_name(&self.config.resource_group, node_name)
            .await?;
        self.get_vm_by_vm_name(&vm_name, read_type).await
    }

    /// Fetches the VM and records its identities in the indices.
    pub async fn get_vm_by_vm_name(&self, vm_name: &str, read_type: CacheReadType) -> Result<Arc<VirtualMachine>> {
        let vm = self.vm_cache.get(vm_name, read_type).await?;
        if !self.caching_disabled() {
            self.index.cache_vm(&vm);
        }
        Ok(vm)
    }

    /// Looks the scale set up in the inventory snapshot, forcing one
    /// refresh if it is not there.
    pub async fn get_scale_set_by_id(&self, scale_set_id: &str, read_type: CacheReadType) -> Result<ScaleSet> {
        let snapshot = self.scale_set_cache.get(VMSS_FLEX_KEY, read_type).await?;
        if let Some(scale_set) = snapshot.get(scale_set_id) {
            return Ok(scale_set.clone());
        }

        log::info!(
            "Couldn't find VMSS Flex with ID {}, refreshing the cache",
            scale_set_id
        );
        let snapshot = self
            .scale_set_cache
            .get(VMSS_FLEX_KEY, CacheReadType::ForceRefresh)
            .await?;
        snapshot
            .get(scale_set_id)
            .cloned()
            .ok_or_else(|| ResolveError::not_found(format!("VMSS Flex {}", scale_set_id)))
    }

    pub async fn get_scale_set_by_node_name(&self, node_name: &str, read_type: CacheReadType) -> Result<ScaleSet> {
        let scale_set_id = self.get_node_scale_set_id(node_name).await?;
        self.get_scale_set_by_id(&scale_set_id, read_type).await
    }

    /// Resource ID of the scale set whose short name matches `name`.
    /// Reads the snapshot with default semantics only.
    pub async fn get_scale_set_id_by_name(&self, name: &str) -> Result<String> {
        let snapshot = self
            .scale_set_cache
            .get(VMSS_FLEX_KEY, CacheReadType::Default)
            .await?;
        snapshot
            .find_by_name(name)
            .map(|(id, _)| id.to_string())
            .ok_or_else(|| ResolveError::not_found(format!("VMSS Flex named {}", name)))
    }

    pub async fn get_scale_set_by_name(&self, name: &str) -> Result<ScaleSet> {
        let snapshot = self
            .scale_set_cache
            .get(VMSS_FLEX_KEY, CacheReadType::Default)
            .await?;
        snapshot
            .find_by_name(name)
            .map(|(_, scale_set)| scale_set.clone())
            .ok_or_else(|| ResolveError::not_found(format!("VMSS Flex named {}", name)))
    }

    /// Forgets everything indexed for a deleted node, so the next lookup
    /// goes back to the inventory API.
    pub fn invalidate_node(&self, node_name: &str) {
        if self.caching_disabled() {
            return;
        }
        if let Some(vm_name) = self.index.vm_name_of_node(node_name) {
            self.vm_cache.delete(&vm_name);
        }
        self.index.forget_node(node_name);
        log::info!("DeleteCacheForNode({}) successfully", node_name);
    }
}
