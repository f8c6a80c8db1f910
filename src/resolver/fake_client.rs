// in-memory inventory with call counters, for tests
use super::compute::{ScaleSet, VirtualMachine};
use super::inventory_client::InventoryClient;
use super::resolver_error::{ResolveError, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct FakeInventoryClient {
    scale_sets: Mutex<HashMap<String, Vec<ScaleSet>>>,
    vms: Mutex<HashMap<String, VirtualMachine>>,
    list_failures: Mutex<HashMap<String, ResolveError>>,
    lookup_failure: Mutex<Option<ResolveError>>,
    pub list_resource_groups_calls: AtomicUsize,
    pub lookup_calls: AtomicUsize,
    pub get_vm_calls: AtomicUsize,
}

// ResolveError holds non-Clone sources, so failures are rebuilt per call.
fn replay(err: &ResolveError) -> ResolveError {
    match err {
        ResolveError::NotFound(what) => ResolveError::NotFound(what.clone()),
        ResolveError::HttpError(status, body) => ResolveError::HttpError(*status, body.clone()),
        other => ResolveError::HttpError(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    }
}

impl FakeInventoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_resource_group(&self, resource_group: &str) {
        self.scale_sets
            .lock()
            .unwrap()
            .entry(resource_group.to_string())
            .or_default();
    }

    pub fn add_scale_set(&self, resource_group: &str, scale_set: ScaleSet) {
        self.scale_sets
            .lock()
            .unwrap()
            .entry(resource_group.to_string())
            .or_default()
            .push(scale_set);
    }

    pub fn put_vm(&self, vm: VirtualMachine) {
        let name = vm.name.clone().unwrap_or_default();
        self.vms.lock().unwrap().insert(name, vm);
    }

    pub fn remove_vm(&self, vm_name: &str) {
        self.vms.lock().unwrap().remove(vm_name);
    }

    pub fn fail_list_scale_sets(&self, resource_group: &str, err: ResolveError) {
        self.add_resource_group(resource_group);
        self.list_failures
            .lock()
            .unwrap()
            .insert(resource_group.to_string(), err);
    }

    pub fn fail_lookups(&self, err: Option<ResolveError>) {
        *self.lookup_failure.lock().unwrap() = err;
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InventoryClient for FakeInventoryClient {
    async fn list_resource_groups(&self) -> Result<HashSet<String>> {
        self.list_resource_groups_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.scale_sets.lock().unwrap().keys().cloned().collect())
    }

    async fn list_scale_sets(&self, resource_group: &str) -> Result<Vec<ScaleSet>> {
        if let Some(err) = self.list_failures.lock().unwrap().get(resource_group) {
            return Err(replay(err));
        }
        self.scale_sets
            .lock()
            .unwrap()
            .get(resource_group)
            .cloned()
            .ok_or_else(|| ResolveError::not_found(resource_group))
    }

    async fn get_vm_name_by_computer_name(
        &self,
        _resource_group: &str,
        computer_name: &str,
    ) -> Result<String> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.lookup_failure.lock().unwrap().as_ref() {
            return Err(replay(err));
        }
        self.vms
            .lock()
            .unwrap()
            .values()
            .find(|vm| {
                vm.computer_name()
                    .map_or(false, |name| name.eq_ignore_ascii_case(computer_name))
            })
            .and_then(|vm| vm.name.clone())
            .ok_or_else(|| ResolveError::not_found(computer_name))
    }

    async fn get_vm(&self, _resource_group: &str, vm_name: &str) -> Result<VirtualMachine> {
        self.get_vm_calls.fetch_add(1, Ordering::SeqCst);
        self.vms
            .lock()
            .unwrap()
            .get(vm_name)
            .cloned()
            .ok_or_else(|| ResolveError::not_found(vm_name))
    }
}
