use serde::{Deserialize, Serialize};
use std::fmt;

/// A canonicalized instrument symbol: uppercase, limited to `[A-Z0-9=.-^/]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Canonicalize a raw symbol string: uppercase, strip any character
    /// outside `[A-Z0-9=.-^/]`. Returns `None` if the result is empty.
    #[must_use]
    pub fn normalize(raw: &str) -> Option<Self> {
        let cleaned: String = raw
            .trim()
            .to_ascii_uppercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || "=.-^/".contains(*c))
            .collect();
        if cleaned.is_empty() {
            None
        } else {
            Some(Self(cleaned))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the symbol's suffix alone marks it as a 24/7-traded
    /// instrument (crypto pair or futures contract), independent of
    /// upstream metadata.
    #[must_use]
    pub fn looks_24_7(&self) -> bool {
        const SUFFIXES: &[&str] = &["-USD", "-USDT", "-USDC", "-BTC", "-ETH", "=F"];
        SUFFIXES.iter().any(|suf| self.0.ends_with(suf))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The set of supported bar durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
    #[serde(rename = "1w")]
    W1,
}

impl Timeframe {
    /// Parse a case-insensitive timeframe token, defaulting unknown tokens
    /// to 5-minute bars per the request-surface contract.
    #[must_use]
    pub fn parse_or_default(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "1m" => Self::M1,
            "5m" => Self::M5,
            "15m" => Self::M15,
            "30m" => Self::M30,
            "1h" => Self::H1,
            "4h" => Self::H4,
            "1d" => Self::D1,
            "1w" => Self::W1,
            _ => Self::M5,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::M1 => "1m",
            Self::M5 => "5m",
            Self::M15 => "15m",
            Self::M30 => "30m",
            Self::H1 => "1h",
            Self::H4 => "4h",
            Self::D1 => "1d",
            Self::W1 => "1w",
        }
    }

    /// Whether this timeframe is intraday (sub-daily).
    #[must_use]
    pub const fn is_intraday(self) -> bool {
        !matches!(self, Self::D1 | Self::W1)
    }

    /// The upstream `(period, interval)` mapping used for the primary
    /// download attempt.
    #[must_use]
    pub const fn upstream_period_interval(self) -> (&'static str, &'static str) {
        match self {
            Self::M1 => ("1d", "1m"),
            Self::M5 => ("5d", "5m"),
            Self::M15 => ("5d", "15m"),
            Self::M30 => ("60d", "30m"),
            Self::H1 => ("1mo", "1h"),
            Self::H4 => ("60d", "1h"),
            Self::D1 => ("1y", "1d"),
            Self::W1 => ("5y", "1wk"),
        }
    }

    /// The fallback download period used when the primary attempt returns
    /// fewer bars than `min_bars`. `4h` and coarser timeframes have no
    /// fallback.
    #[must_use]
    pub const fn fallback_period(self) -> Option<&'static str> {
        match self {
            Self::M1 => Some("7d"),
            Self::M5 => Some("30d"),
            Self::M15 => Some("60d"),
            Self::M30 => Some("1y"),
            Self::H1 => Some("6mo"),
            Self::H4 => Some("1y"),
            Self::D1 | Self::W1 => None,
        }
    }

    /// Minimum acceptable bar count before a fallback re-download is
    /// attempted. Daily and weekly bars have no minimum.
    #[must_use]
    pub const fn min_bars(self) -> Option<usize> {
        match self {
            Self::M1 | Self::M5 | Self::M15 => Some(200),
            Self::M30 => Some(160),
            Self::H1 => Some(120),
            Self::H4 => Some(80),
            Self::D1 | Self::W1 => None,
        }
    }

    /// Cache entry freshness window, in seconds.
    #[must_use]
    pub const fn cache_ttl_secs(self) -> u64 {
        match self {
            Self::M1 => 20,
            Self::M5 => 30,
            Self::M15 => 60,
            Self::M30 => 90,
            Self::H1 => 120,
            Self::H4 => 300,
            Self::D1 => 900,
            Self::W1 => 3600,
        }
    }

    /// Background stream push-loop tick interval, in seconds.
    #[must_use]
    pub const fn stream_tick_secs(self) -> u64 {
        match self {
            Self::M1 => 3,
            Self::M5 => 5,
            Self::M15 => 8,
            Self::M30 => 12,
            Self::H1 => 15,
            Self::H4 | Self::D1 => 30,
            Self::W1 => 45,
        }
    }

    /// Whether the 4h timeframe (the only resampled one) requires
    /// resampling from 1h bars before use.
    #[must_use]
    pub const fn needs_hourly_resample(self) -> bool {
        matches!(self, Self::H4)
    }

    /// Whether session splitting (`ext`) applies to this timeframe.
    /// 4h bars are deliberately excluded: they never emit `ext_candles`.
    #[must_use]
    pub const fn supports_session_split(self) -> bool {
        self.is_intraday() && !matches!(self, Self::H4)
    }
}

/// A single OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// One point of a derived indicator series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorPoint {
    pub time: i64,
    pub value: f64,
}

/// The supported derived indicators, keyed by name in the wire payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorKind {
    Sma20,
    Sma50,
    Sma200,
    Ema12,
    Ema26,
    Rsi14,
    Vwap,
}

impl IndicatorKind {
    #[must_use]
    pub const fn all() -> [Self; 7] {
        [
            Self::Sma20,
            Self::Sma50,
            Self::Sma200,
            Self::Ema12,
            Self::Ema26,
            Self::Rsi14,
            Self::Vwap,
        ]
    }

    #[must_use]
    pub const fn wire_key(self) -> &'static str {
        match self {
            Self::Sma20 => "sma20",
            Self::Sma50 => "sma50",
            Self::Sma200 => "sma200",
            Self::Ema12 => "ema12",
            Self::Ema26 => "ema26",
            Self::Rsi14 => "rsi14",
            Self::Vwap => "vwap",
        }
    }
}

/// A volume bar with an up/down color hint, parallel to the base candles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeBar {
    pub time: i64,
    pub value: f64,
    pub color: VolumeColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeColor {
    Up,
    Down,
}

impl VolumeColor {
    #[must_use]
    pub const fn hex(self) -> &'static str {
        match self {
            Self::Up => "#00d084",
            Self::Down => "#ff5a5f",
        }
    }
}

/// The canonical server-side snapshot for one `(symbol, timeframe, ext)` key.
#[derive(Debug, Clone, Serialize)]
pub struct Payload {
    pub symbol: Symbol,
    pub timeframe: Timeframe,
    pub ext_effective: bool,
    pub candles: Vec<Candle>,
    pub ext_candles: Vec<Candle>,
    pub indicators: std::collections::BTreeMap<&'static str, Vec<IndicatorPoint>>,
    pub volume: Vec<VolumeBar>,
}

/// The key a `Payload` is cached and built under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PayloadKey {
    pub symbol: Symbol,
    pub timeframe: Timeframe,
    pub ext: bool,
}

impl fmt::Display for PayloadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.symbol,
            self.timeframe.as_str(),
            u8::from(self.ext)
        )
    }
}

/// A bandwidth-efficient suffix of a `Payload`: only entries with
/// `time >= since`.
#[derive(Debug, Clone, Serialize)]
pub struct Delta {
    pub symbol: Symbol,
    pub timeframe: Timeframe,
    pub ext: bool,
    pub delta: bool,
    pub since: i64,
    pub latest_time: i64,
    pub candles: Vec<Candle>,
    pub ext_candles: Vec<Candle>,
    pub indicators: std::collections::BTreeMap<&'static str, Vec<IndicatorPoint>>,
    pub volume: Vec<VolumeBar>,
}

/// Which trading session the latest bar of a quote falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Session {
    Rth,
    Pre,
    Post,
}

/// A lightweight point-in-time quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub price: f64,
    pub change: f64,
    pub change_pct: f64,
    pub spark: Vec<f64>,
    pub exchange: String,
    pub name: String,
    pub currency: String,
    pub session: Session,
    pub last_ts: i64,
    pub rth_price: Option<f64>,
    pub ext_price: Option<f64>,
    pub ext_change: Option<f64>,
    pub ext_change_pct: Option<f64>,
    pub rth_change: Option<f64>,
    pub rth_change_pct: Option<f64>,
}

/// Static symbol metadata fetched (and long-TTL cached) from upstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SymbolMetadata {
    pub exchange: String,
    pub quote_type: String,
    pub name: String,
    pub currency: String,
    pub prev_close: Option<f64>,
}

/// A raw OHLCV frame as returned by the upstream client, already projected
/// to a single symbol.
#[derive(Debug, Clone, Default)]
pub struct RawFrame {
    pub candles: Vec<Candle>,
}

impl RawFrame {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.candles.len()
    }
}

/// One search result row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub symbol: String,
    pub name: String,
    pub exchange: String,
    #[serde(rename = "type")]
    pub kind: String,
}
