use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
const DEFAULT_SYMBOLS: [&str; 7] = [
    "BTCUSDT", "ETHUSDT", "BNBUSDT", "SOLUSDT", "XRPUSDT", "DOGEUSDT", "ADAUSDT",
];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub binance: BinanceConfig,
    pub indicator: IndicatorConfig,
    pub feed: FeedConfig,
    pub telegram: TelegramConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BinanceConfig {
    pub ws_base_url: String,
    pub symbols: Vec<String>,
    pub kline_interval: String,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            ws_base_url: "wss://stream.binance.com:9443".to_string(),
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            kline_interval: "1m".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub sma_len: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self { sma_len: 14 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub reconnect_delay_secs: u64,
    pub reconnect_backoff_factor: f64,
    pub reconnect_max_delay_secs: u64,
    pub ping_interval_secs: u64,
    pub ping_timeout_secs: u64,
    pub channel_capacity: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_secs: 5,
            reconnect_backoff_factor: 1.0,
            reconnect_max_delay_secs: 60,
            ping_interval_secs: 30,
            ping_timeout_secs: 10,
            channel_capacity: 1024,
        }
    }
}

impl FeedConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn reconnect_max_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_max_delay_secs)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub api_base_url: String,
    pub timeout_secs: u64,
    #[serde(skip)]
    pub bot_token: Option<String>,
    #[serde(skip)]
    pub chat_id: Option<String>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.telegram.org".to_string(),
            timeout_secs: 10,
            bot_token: None,
            chat_id: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Parse a Binance kline interval string (e.g. "1s", "1m", "1h", "1d", "1w", "1M") into milliseconds.
pub fn parse_interval_ms(s: &str) -> Result<u64> {
    if s.len() < 2 {
        bail!("invalid interval '{}': expected format like '1m'", s);
    }

    let (num_str, suffix) = s.split_at(s.len() - 1);
    let n: u64 = num_str.parse().with_context(|| {
        format!(
            "invalid interval '{}': quantity must be a positive integer",
            s
        )
    })?;
    if n == 0 {
        bail!("invalid interval '{}': quantity must be > 0", s);
    }

    let unit_ms = match suffix {
        "s" => 1_000,
        "m" => 60_000,
        "h" => 3_600_000,
        "d" => 86_400_000,
        "w" => 7 * 86_400_000,
        "M" => 30 * 86_400_000,
        _ => bail!(
            "invalid interval '{}': unsupported suffix '{}', expected one of s/m/h/d/w/M",
            s,
            suffix
        ),
    };

    n.checked_mul(unit_ms)
        .with_context(|| format!("invalid interval '{}': value is too large", s))
}

/// Trim, upper-case and de-duplicate a symbol list, keeping first-seen order.
pub fn normalize_symbols<S: AsRef<str>>(symbols: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for sym in symbols {
        let s = sym.as_ref().trim().to_ascii_uppercase();
        if !s.is_empty() && !out.contains(&s) {
            out.push(s);
        }
    }
    out
}

impl BinanceConfig {
    pub fn kline_interval_ms(&self) -> Result<u64> {
        parse_interval_ms(&self.kline_interval)
    }

    pub fn watch_list(&self) -> Vec<String> {
        normalize_symbols(&self.symbols)
    }

    /// Stream names for the combined endpoint, e.g. `btcusdt@kline_1m`.
    pub fn stream_names(&self) -> Vec<String> {
        self.watch_list()
            .iter()
            .map(|s| format!("{}@kline_{}", s.to_ascii_lowercase(), self.kline_interval))
            .collect()
    }

    pub fn combined_stream_url(&self) -> String {
        format!(
            "{}/stream?streams={}",
            self.ws_base_url.trim_end_matches('/'),
            self.stream_names().join("/")
        )
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config_path = std::env::var("WAD_WATCH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut config = Self::from_file(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read the TOML file if present; a missing file means all defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&config_str).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Apply environment overrides and secrets. `lookup` is `std::env::var` outside tests.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(symbols) = lookup("SYMBOLS") {
            self.binance.symbols = symbols.split(',').map(|s| s.to_string()).collect();
        }
        if let Some(interval) = lookup("INTERVAL") {
            self.binance.kline_interval = interval.trim().to_string();
        }
        if let Some(len) = lookup("SMA_LEN") {
            self.indicator.sma_len = len
                .trim()
                .parse()
                .with_context(|| format!("SMA_LEN '{}' is not a positive integer", len))?;
        }
        self.telegram.bot_token = lookup("TELEGRAM_BOT_TOKEN").filter(|v| !v.trim().is_empty());
        self.telegram.chat_id = lookup("TELEGRAM_CHAT_ID").filter(|v| !v.trim().is_empty());
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.binance.watch_list().is_empty() {
            bail!("binance.symbols must name at least one symbol");
        }
        if self.indicator.sma_len == 0 {
            bail!("indicator.sma_len must be >= 1");
        }
        self.binance
            .kline_interval_ms()
            .context("binance.kline_interval is invalid")?;
        if self.feed.reconnect_delay_secs == 0 {
            bail!("feed.reconnect_delay_secs must be > 0");
        }
        let factor = self.feed.reconnect_backoff_factor;
        if factor.is_nan() || factor < 1.0 {
            bail!("feed.reconnect_backoff_factor must be >= 1.0");
        }
        if self.feed.ping_interval_secs == 0 {
            bail!("feed.ping_interval_secs must be > 0");
        }
        if self.feed.ping_timeout_secs == 0 {
            bail!("feed.ping_timeout_secs must be > 0");
        }
        if self.feed.channel_capacity == 0 {
            bail!("feed.channel_capacity must be > 0");
        }
        Ok(())
    }
}
