//! Resolves node names to the VMs and flexible scale sets behind them,
//! caching the scale-set inventory and node/VM identities to keep calls to
//! the inventory API down.
pub mod handlers;
pub mod resolver;
