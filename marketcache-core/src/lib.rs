//! Domain types, configuration, error taxonomy, and timeseries transforms
//! shared by every crate in the market-data cache workspace.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod quote;
pub mod symbol;
pub mod timeseries;
pub mod types;

pub use config::{BackoffConfig, RouteLimit, ServiceConfig, ServiceConfigBuilder};
pub use error::{ServiceError, ServiceResult};
pub use types::{
    Candle, Delta, IndicatorKind, IndicatorPoint, Payload, PayloadKey, Quote, RawFrame,
    SearchResult, Session, Symbol, SymbolMetadata, Timeframe, VolumeBar, VolumeColor,
};
