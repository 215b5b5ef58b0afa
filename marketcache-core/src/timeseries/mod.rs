//! Timeseries transforms: resampling, outlier suppression, indicators, and
//! session splitting. Each function is a pure transform over `Candle` slices
//! so the transform pipeline can compose them without owning any shared
//! state.

pub mod indicators;
pub mod outliers;
pub mod resample;
pub mod session;

pub use indicators::compute_all_indicators;
pub use outliers::{suppress_ext_outliers, suppress_intraday_outliers};
pub use resample::resample_to_4h;
pub use session::{session_kind, split_sessions};
