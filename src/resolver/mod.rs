pub mod compute;
pub mod flex_resolver;
pub mod identity_index;
pub mod inventory_client;
pub mod keyed_lock;
pub mod resolver_config;
pub mod resolver_error;
pub mod snapshot;
pub mod timed_cache;

#[cfg(test)]
pub(crate) mod fake_client;

pub use compute::{ScaleSet, VirtualMachine};
pub use flex_resolver::FlexResolver;
pub use inventory_client::{ArmInventoryClient, InventoryClient};
pub use resolver_config::ResolverConfig;
pub use resolver_error::{ErrorKind, ResolveError};
pub use timed_cache::CacheReadType;
