//! Reader configuration management

use anyhow::{Context, Result, anyhow};
use common::ControlRead;
use common::types::{MCU_PRODUCT_ID, MCU_VENDOR_ID, RQ_READ, RQ_READ_LENGTH};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Longest accepted poll interval (one day)
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReaderConfig {
    #[serde(default)]
    pub reader: ReaderSettings,
    /// Which boards to look for and how to talk to them
    #[serde(default)]
    pub board: BoardSettings,
    /// The polling loop
    #[serde(default)]
    pub poll: PollSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderSettings {
    #[serde(default = "ReaderSettings::default_log_level")]
    pub log_level: String,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
        }
    }
}

impl ReaderSettings {
    fn default_log_level() -> String {
        "info".to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSettings {
    /// USB Vendor ID, written as "0x16c0"
    #[serde(default = "BoardSettings::default_vendor_id", with = "hex_id")]
    pub vendor_id: u16,
    /// USB Product ID, written as "0x05dc"
    #[serde(default = "BoardSettings::default_product_id", with = "hex_id")]
    pub product_id: u16,
    /// Control transfer timeout in milliseconds
    #[serde(default = "BoardSettings::default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            vendor_id: Self::default_vendor_id(),
            product_id: Self::default_product_id(),
            timeout_ms: Self::default_timeout_ms(),
        }
    }
}

impl BoardSettings {
    fn default_vendor_id() -> u16 {
        MCU_VENDOR_ID
    }

    fn default_product_id() -> u16 {
        MCU_PRODUCT_ID
    }

    fn default_timeout_ms() -> u64 {
        100
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollSettings {
    /// Delay before each read (e.g. "1s", "500ms", "1m30s")
    #[serde(default = "PollSettings::default_interval", with = "duration_serde")]
    pub interval: Duration,
    /// Vendor request code (bRequest)
    #[serde(default = "PollSettings::default_request")]
    pub request: u8,
    /// Bytes to read per poll (wLength)
    #[serde(default = "PollSettings::default_length")]
    pub length: u16,
    #[serde(default)]
    pub value: u16,
    #[serde(default)]
    pub index: u16,
    /// Stop after this many reads; poll forever when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Self::default_interval(),
            request: Self::default_request(),
            length: Self::default_length(),
            value: 0,
            index: 0,
            count: None,
        }
    }
}

impl PollSettings {
    fn default_interval() -> Duration {
        Duration::from_secs(1)
    }

    fn default_request() -> u8 {
        RQ_READ
    }

    fn default_length() -> u16 {
        RQ_READ_LENGTH
    }

    /// The control read issued on every poll
    pub fn control_read(&self) -> ControlRead {
        ControlRead {
            request: self.request,
            value: self.value,
            index: self.index,
            length: self.length,
        }
    }
}

/// Serde module for VID/PID values as "0x" hex strings
mod hex_id {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(id: &u16, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{:#06x}", id))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u16, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_hex_id(&s).map_err(serde::de::Error::custom)
    }

    /// Parse a hex ID like "0x16c0"
    pub fn parse_hex_id(id: &str) -> Result<u16, String> {
        let hex_part = id
            .strip_prefix("0x")
            .or_else(|| id.strip_prefix("0X"))
            .ok_or_else(|| format!("Invalid ID '{}', must start with '0x' (e.g., '0x16c0')", id))?;

        if hex_part.is_empty() || hex_part.len() > 4 {
            return Err(format!("Invalid ID '{}', hex part must be 1-4 digits", id));
        }

        u16::from_str_radix(hex_part, 16)
            .map_err(|_| format!("Invalid ID '{}', not a valid hex number", id))
    }
}

/// Serde module for Duration values written as "1s", "500ms", "1m30s"
pub mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        format_duration(*duration).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    /// Parse a duration string like "1s", "250ms", "2m", "1h30m"
    ///
    /// A trailing bare number is taken as seconds.
    pub fn parse_duration(s: &str) -> Result<Duration, String> {
        let s = s.trim().to_lowercase();
        let mut total_ms: u64 = 0;
        let mut current_num = String::new();
        let mut current_unit = String::new();

        let mut flush = |num: &mut String, unit: &mut String| -> Result<(), String> {
            if num.is_empty() {
                return Err(format!("Invalid duration format: {}", s));
            }
            let n: u64 = num
                .parse()
                .map_err(|_| format!("Invalid number in duration: {}", num))?;
            let scale = match unit.as_str() {
                "ms" => 1,
                "" | "s" => 1_000,
                "m" => 60_000,
                "h" => 3_600_000,
                other => return Err(format!("Invalid duration unit: {}", other)),
            };
            total_ms = n
                .checked_mul(scale)
                .and_then(|ms| total_ms.checked_add(ms))
                .ok_or_else(|| format!("Duration too large: {}", s))?;
            num.clear();
            unit.clear();
            Ok(())
        };

        for c in s.chars() {
            if c.is_ascii_digit() {
                if !current_unit.is_empty() {
                    flush(&mut current_num, &mut current_unit)?;
                }
                current_num.push(c);
            } else {
                current_unit.push(c);
            }
        }

        if !current_num.is_empty() || !current_unit.is_empty() {
            flush(&mut current_num, &mut current_unit)?;
        }

        if total_ms == 0 {
            return Err("Duration must be greater than 0".to_string());
        }

        Ok(Duration::from_millis(total_ms))
    }

    pub fn format_duration(d: Duration) -> String {
        let total_ms = d.as_millis() as u64;
        if total_ms % 1000 != 0 {
            return format!("{}ms", total_ms);
        }

        let secs = total_ms / 1000;
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        let secs = secs % 60;

        let mut result = String::new();
        if hours > 0 {
            result.push_str(&format!("{}h", hours));
        }
        if mins > 0 {
            result.push_str(&format!("{}m", mins));
        }
        if secs > 0 || result.is_empty() {
            result.push_str(&format!("{}s", secs));
        }
        result
    }
}

pub use duration_serde::parse_duration;

impl ReaderConfig {
    /// Load configuration from the specified path
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            PathBuf::from(shellexpand::tilde(&p.to_string_lossy()).into_owned())
        } else {
            let candidates = vec![
                Self::default_path(),
                PathBuf::from("/etc/mcu-rfid/reader.toml"),
            ];

            candidates
                .into_iter()
                .find(|p| p.exists())
                .ok_or_else(|| anyhow!("No configuration file found, using defaults"))?
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: ReaderConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("Failed to load config: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("mcu-rfid").join("reader.toml")
        } else {
            PathBuf::from(".config/mcu-rfid/reader.toml")
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.reader.log_level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.reader.log_level,
                valid_levels.join(", ")
            ));
        }

        if self.board.timeout_ms == 0 {
            return Err(anyhow!("board.timeout_ms must be greater than 0"));
        }

        if self.poll.length == 0 {
            return Err(anyhow!("poll.length must be greater than 0"));
        }

        if self.poll.interval.is_zero() {
            return Err(anyhow!("poll.interval must be greater than 0"));
        }

        if self.poll.interval > MAX_POLL_INTERVAL {
            return Err(anyhow!(
                "poll.interval must be at most {}",
                duration_serde::format_duration(MAX_POLL_INTERVAL)
            ));
        }

        if self.poll.count == Some(0) {
            return Err(anyhow!("poll.count must be greater than 0 when set"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::hex_id::parse_hex_id;
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReaderConfig::default();
        assert_eq!(config.reader.log_level, "info");
        assert_eq!(config.board.vendor_id, 0x16c0);
        assert_eq!(config.board.product_id, 0x05dc);
        assert_eq!(config.poll.interval, Duration::from_secs(1));
        assert_eq!(config.poll.control_read(), ControlRead::default());
        assert!(config.poll.count.is_none());
    }

    #[test]
    fn test_parse_hex_id() {
        assert_eq!(parse_hex_id("0x16c0"), Ok(0x16c0));
        assert_eq!(parse_hex_id("0X05DC"), Ok(0x05dc));
        assert!(parse_hex_id("16c0").is_err());
        assert!(parse_hex_id("0x").is_err());
        assert!(parse_hex_id("0x12345").is_err());
        assert!(parse_hex_id("0xGHIJ").is_err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("1s"), Ok(Duration::from_secs(1)));
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
        assert_eq!(parse_duration("1h30m"), Ok(Duration::from_secs(5400)));
        assert_eq!(parse_duration("1s500ms"), Ok(Duration::from_millis(1500)));
        assert_eq!(parse_duration("3"), Ok(Duration::from_secs(3)));
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("1d").is_err());
        assert!(parse_duration("s").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn test_parse_duration_too_large() {
        let err = parse_duration("18446744073709551h").unwrap_err();
        assert!(err.contains("too large"));
        assert!(parse_duration("18446744073709551615s").is_err());
        assert!(parse_duration("18446744073709551615ms1ms").is_err());
        assert_eq!(
            parse_duration("18446744073709551615ms"),
            Ok(Duration::from_millis(u64::MAX))
        );
    }

    #[test]
    fn test_format_duration() {
        use super::duration_serde::format_duration;
        assert_eq!(format_duration(Duration::from_secs(1)), "1s");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1500ms");
        assert_eq!(format_duration(Duration::from_secs(5400)), "1h30m");
    }

    #[test]
    fn test_config_serialization() {
        let config = ReaderConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("vendor_id = \"0x16c0\""));

        let parsed = ReaderConfig::from_toml(&toml_str).unwrap();
        assert_eq!(parsed.board.vendor_id, config.board.vendor_id);
        assert_eq!(parsed.poll.interval, config.poll.interval);
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = ReaderConfig::default();
        assert!(config.validate().is_ok());

        config.reader.log_level = "invalid".to_string();
        assert!(config.validate().is_err());

        config.reader.log_level = "debug".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_poll_settings() {
        let mut config = ReaderConfig::default();
        config.poll.length = 0;
        assert!(config.validate().is_err());

        let mut config = ReaderConfig::default();
        config.poll.count = Some(0);
        assert!(config.validate().is_err());

        let mut config = ReaderConfig::default();
        config.board.timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = ReaderConfig::default();
        config.poll.interval = MAX_POLL_INTERVAL;
        assert!(config.validate().is_ok());
        config.poll.interval = parse_duration("18446744073709551615ms").unwrap();
        assert!(config.validate().is_err());
    }
}
