// node/VM/scale-set identity lookup tables
use super::compute::VirtualMachine;
use dashmap::DashMap;

/// Concurrent string to string table.
#[derive(Default)]
pub struct IndexTable {
    entries: DashMap<String, String>,
}

impl IndexTable {
    pub fn load(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    pub fn store(&self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    pub fn delete(&self, key: &str) -> Option<String> {
        self.entries.remove(key).map(|(_, v)| v)
    }

    /// Visits entries until `f` returns false.
    pub fn range<F>(&self, mut f: F)
    where
        F: FnMut(&str, &str) -> bool,
    {
        for entry in self.entries.iter() {
            if !f(entry.key(), entry.value()) {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Node names are matched case-insensitively.
pub fn normalize_node_name(node_name: &str) -> String {
    node_name.to_lowercase()
}

/// Three independent tables filled as VM records are observed. They are
/// not updated together atomically and have no expiry; entries go away
/// only through explicit deletes.
#[derive(Default)]
pub struct IdentityIndex {
    pub vm_to_node: IndexTable,
    pub node_to_vm: IndexTable,
    pub node_to_scale_set: IndexTable,
}

impl IdentityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the identities carried by `vm`. VMs without a computer name
    /// are skipped and `false` is returned.
    pub fn cache_vm(&self, vm: &VirtualMachine) -> bool {
        let (vm_name, computer_name) = match (vm.name(), vm.computer_name()) {
            (Some(vm_name), Some(computer_name)) => (vm_name, computer_name),
            _ => {
                log::debug!("skip indexing VM {:?}: no computer name", vm.name);
                return false;
            }
        };

        let node_name = normalize_node_name(computer_name);
        self.vm_to_node.store(vm_name, &node_name);
        self.node_to_vm.store(&node_name, vm_name);
        if let Some(scale_set_id) = vm.scale_set_id() {
            self.node_to_scale_set.store(&node_name, scale_set_id);
        }
        true
    }

    pub fn node_name_of_vm(&self, vm_name: &str) -> Option<String> {
        self.vm_to_node.load(vm_name)
    }

    pub fn vm_name_of_node(&self, node_name: &str) -> Option<String> {
        self.node_to_vm.load(&normalize_node_name(node_name))
    }

    pub fn scale_set_id_of_node(&self, node_name: &str) -> Option<String> {
        self.node_to_scale_set.load(&normalize_node_name(node_name))
    }

    /// Drops every entry for the node, including the reverse VM entry.
    pub fn forget_node(&self, node_name: &str) {
        let node_name = normalize_node_name(node_name);
        if let Some(vm_name) = self.node_to_vm.load(&node_name) {
            self.vm_to_node.delete(&vm_name);
        }
        self.node_to_scale_set.delete(&node_name);
        self.node_to_vm.delete(&node_name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::compute::fixtures::vm;

    #[test]
    fn test_cache_vm_populates_all_tables() {
        let index = IdentityIndex::new();
        assert!(index.cache_vm(&vm("vm-1", Some("Node-1"), Some("ss-b"))));

        assert_eq!(index.node_name_of_vm("vm-1").as_deref(), Some("node-1"));
        assert_eq!(index.vm_name_of_node("node-1").as_deref(), Some("vm-1"));
        assert_eq!(index.vm_name_of_node("NODE-1").as_deref(), Some("vm-1"));
        assert_eq!(index.scale_set_id_of_node("node-1").as_deref(), Some("ss-b"));
    }

    #[test]
    fn test_cache_vm_without_scale_set() {
        let index = IdentityIndex::new();
        assert!(index.cache_vm(&vm("vm-2", Some("node-2"), None)));
        assert_eq!(index.vm_name_of_node("node-2").as_deref(), Some("vm-2"));
        assert!(index.scale_set_id_of_node("node-2").is_none());
    }

    #[test]
    fn test_cache_vm_skips_missing_computer_name() {
        let index = IdentityIndex::new();
        assert!(!index.cache_vm(&vm("vm-3", None, Some("ss-b"))));
        assert!(!index.cache_vm(&vm("vm-4", Some(""), Some("ss-b"))));
        assert!(index.vm_to_node.is_empty());
        assert!(index.node_to_vm.is_empty());
        assert!(index.node_to_scale_set.is_empty());
    }

    #[test]
    fn test_cache_vm_is_idempotent() {
        let index = IdentityIndex::new();
        let record = vm("vm-1", Some("node-1"), Some("ss-b"));
        index.cache_vm(&record);
        index.cache_vm(&record);

        assert_eq!(index.vm_to_node.len(), 1);
        assert_eq!(index.node_to_vm.len(), 1);
        assert_eq!(index.node_to_scale_set.len(), 1);
        assert_eq!(index.scale_set_id_of_node("node-1").as_deref(), Some("ss-b"));
    }

    #[test]
    fn test_forget_node() {
        let index = IdentityIndex::new();
        index.cache_vm(&vm("vm-1", Some("node-1"), Some("ss-b")));
        index.cache_vm(&vm("vm-2", Some("node-2"), Some("ss-b")));

        index.forget_node("Node-1");
        assert!(index.node_name_of_vm("vm-1").is_none());
        assert!(index.vm_name_of_node("node-1").is_none());
        assert!(index.scale_set_id_of_node("node-1").is_none());
        assert_eq!(index.vm_name_of_node("node-2").as_deref(), Some("vm-2"));
    }

    #[test]
    fn test_range_stops_early() {
        let table = IndexTable::default();
        table.store("a", "1");
        table.store("b", "2");
        table.store("c", "3");

        let mut seen = 0;
        table.range(|_, _| {
            seen += 1;
            false
        });
        assert_eq!(seen, 1);
        assert_eq!(table.delete("a").as_deref(), Some("1"));
        assert!(table.delete("a").is_none());
    }
}
