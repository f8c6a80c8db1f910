// full flexible scale-set inventory and the loader that builds it
use super::compute::{resource_name, ScaleSet};
use super::inventory_client::InventoryClient;
use super::resolver_error::Result;
use super::timed_cache::CacheLoader;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Scale sets with flexible orchestration, keyed by resource ID. Built in
/// one go on each refresh and replaced as a whole, never edited.
#[derive(Debug, Default)]
pub struct InventorySnapshot {
    scale_sets: HashMap<String, ScaleSet>,
}

impl InventorySnapshot {
    pub fn from_scale_sets<I>(scale_sets: I) -> Self
    where
        I: IntoIterator<Item = ScaleSet>,
    {
        let mut map = HashMap::new();
        for scale_set in scale_sets {
            let id = match scale_set.id() {
                Some(id) => id.to_string(),
                None => {
                    log::warn!("failed to get the ID of VMSS Flex {:?}", scale_set.name);
                    continue;
                }
            };
            if scale_set.is_flexible() {
                map.insert(id, scale_set);
            }
        }
        Self { scale_sets: map }
    }

    pub fn get(&self, id: &str) -> Option<&ScaleSet> {
        self.scale_sets.get(id)
    }

    /// First entry whose short name matches `name` case-insensitively.
    /// Order among duplicate short names is unspecified.
    pub fn find_by_name(&self, name: &str) -> Option<(&str, &ScaleSet)> {
        self.scale_sets.iter().find_map(|(id, scale_set)| {
            match resource_name(id) {
                Some(short) if short.eq_ignore_ascii_case(name) => Some((id.as_str(), scale_set)),
                _ => None,
            }
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScaleSet)> {
        self.scale_sets.iter().map(|(id, ss)| (id.as_str(), ss))
    }

    pub fn len(&self) -> usize {
        self.scale_sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scale_sets.is_empty()
    }
}

/// Lists scale sets in every resource group of the subscription.
pub struct ScaleSetInventoryLoader {
    client: Arc<dyn InventoryClient>,
}

impl ScaleSetInventoryLoader {
    pub fn new(client: Arc<dyn InventoryClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CacheLoader<Arc<InventorySnapshot>> for ScaleSetInventoryLoader {
    async fn load(&self, _key: &str) -> Result<Arc<InventorySnapshot>> {
        let resource_groups = self.client.list_resource_groups().await?;

        let mut all = Vec::new();
        for resource_group in &resource_groups {
            match self.client.list_scale_sets(resource_group).await {
                Ok(scale_sets) => all.extend(scale_sets),
                Err(err) if err.is_not_found() => {
                    log::warn!(
                        "Skip caching vmss for resource group {} due to error: {}",
                        resource_group,
                        err
                    );
                }
                Err(err) => {
                    log::error!("listing scale sets in {} failed: {}", resource_group, err);
                    return Err(err);
                }
            }
        }

        let snapshot = InventorySnapshot::from_scale_sets(all);
        log::debug!(
            "loaded {} VMSS Flex from {} resource groups",
            snapshot.len(),
            resource_groups.len()
        );
        Ok(Arc::new(snapshot))
    }
}
