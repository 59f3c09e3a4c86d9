pub mod config;
pub mod device;
pub mod errors;
pub mod metrics;
pub mod model;
pub mod rest;
pub mod settings;
pub mod store;
pub mod tasks;
pub mod validate;

pub use config::Config;
pub use device::{HttpRelayClient, RelayClient};
pub use errors::{Error, Result};
pub use settings::{AddressStore, MemoryAddressStore, SettingsFile};
pub use store::{ApplianceStateStore, SharedStore, StoreConfig};
