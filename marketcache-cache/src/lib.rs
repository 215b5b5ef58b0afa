//! The Payload Cache, failure-cooldown map, hot-key table, single-flight
//! registry, and hot-set refresher task (§4.4–§4.6).

pub mod builder;
pub mod failure;
pub mod hotkeys;
pub mod refresher;
pub mod single_flight;
pub mod ttl_cache;

pub use builder::PayloadStore;
pub use failure::FailureCooldown;
pub use hotkeys::HotKeyTable;
pub use refresher::spawn_refresher;
pub use single_flight::{Claim, SingleFlight};
pub use ttl_cache::TtlCache;
