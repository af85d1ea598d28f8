use std::path::PathBuf;
use std::time::Duration;

use bks_providers::WireFormat;
use bks_reconcile::ConflictStrategy;
use serde_json::Value;

pub const DEFAULT_INTERVAL_MINUTES: u64 = 15;
pub const DEFAULT_SNAPSHOT_PATH: &str = "inventory_state.json";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("config missing {0}")]
    MissingKey(&'static str),

    #[error("config {pointer}: {reason}")]
    InvalidValue { pointer: &'static str, reason: String },

    #[error("config /sync/strategy: unknown strategy '{0}'; expected one of: higher | lower")]
    InvalidStrategy(String),

    #[error("config /sync/interval_minutes must be a positive integer that fits in seconds, got {0}")]
    InvalidInterval(String),
}

/// One provider's offline source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// Name used in logs and status output.
    pub name: String,
    pub format: WireFormat,
    pub file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalConfig {
    pub path: PathBuf,
    pub hash_chain: bool,
}

/// Typed sync configuration. Built once at startup, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub strategy: ConflictStrategy,
    pub interval_minutes: u64,
    pub snapshot_path: PathBuf,
    pub journal: Option<JournalConfig>,
    pub side_a: SourceConfig,
    pub side_b: SourceConfig,
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.saturating_mul(60))
    }

    /// Read the typed config out of a merged config document.
    ///
    /// `/sync/strategy` defaults to `higher`, `/sync/interval_minutes` to 15
    /// and `/snapshot/path` to `inventory_state.json`. Both sides are
    /// required. The journal is enabled only when `/journal/path` is set.
    pub fn from_config_json(cfg: &Value) -> Result<Self, ConfigError> {
        let strategy = match cfg.pointer("/sync/strategy") {
            None | Some(Value::Null) => ConflictStrategy::default(),
            Some(Value::String(s)) => s
                .parse()
                .map_err(|_| ConfigError::InvalidStrategy(s.clone()))?,
            Some(other) => return Err(ConfigError::InvalidStrategy(other.to_string())),
        };

        let interval_minutes = match cfg.pointer("/sync/interval_minutes") {
            None | Some(Value::Null) => DEFAULT_INTERVAL_MINUTES,
            Some(v) => match v.as_u64() {
                Some(n) if n > 0 && n.checked_mul(60).is_some() => n,
                _ => return Err(ConfigError::InvalidInterval(v.to_string())),
            },
        };

        let snapshot_path = match cfg.pointer("/snapshot/path") {
            None | Some(Value::Null) => PathBuf::from(DEFAULT_SNAPSHOT_PATH),
            Some(_) => PathBuf::from(non_empty_str(cfg, "/snapshot/path")?),
        };

        let journal = match cfg.pointer("/journal/path") {
            None | Some(Value::Null) => None,
            Some(_) => Some(JournalConfig {
                path: PathBuf::from(non_empty_str(cfg, "/journal/path")?),
                hash_chain: match cfg.pointer("/journal/hash_chain") {
                    None | Some(Value::Null) => true,
                    Some(Value::Bool(b)) => *b,
                    Some(other) => {
                        return Err(ConfigError::InvalidValue {
                            pointer: "/journal/hash_chain",
                            reason: format!("expected a boolean, got {other}"),
                        })
                    }
                },
            }),
        };

        Ok(Self {
            strategy,
            interval_minutes,
            snapshot_path,
            journal,
            side_a: source(cfg, SIDE_A)?,
            side_b: source(cfg, SIDE_B)?,
        })
    }
}

struct SidePointers {
    root: &'static str,
    name: &'static str,
    format: &'static str,
    file: &'static str,
    default_name: &'static str,
}

const SIDE_A: SidePointers = SidePointers {
    root: "side_a",
    name: "/side_a/name",
    format: "/side_a/format",
    file: "/side_a/file",
    default_name: "side_a",
};

const SIDE_B: SidePointers = SidePointers {
    root: "side_b",
    name: "/side_b/name",
    format: "/side_b/format",
    file: "/side_b/file",
    default_name: "side_b",
};

fn source(cfg: &Value, p: SidePointers) -> Result<SourceConfig, ConfigError> {
    if cfg.get(p.root).map_or(true, Value::is_null) {
        return Err(ConfigError::MissingKey(p.root));
    }

    let name = match cfg.pointer(p.name) {
        None | Some(Value::Null) => p.default_name.to_string(),
        Some(_) => non_empty_str(cfg, p.name)?.to_string(),
    };

    let format_raw = non_empty_str(cfg, p.format)?;
    let format = format_raw
        .parse::<WireFormat>()
        .map_err(|reason| ConfigError::InvalidValue {
            pointer: p.format,
            reason,
        })?;

    Ok(SourceConfig {
        name,
        format,
        file: PathBuf::from(non_empty_str(cfg, p.file)?),
    })
}

fn non_empty_str<'a>(cfg: &'a Value, pointer: &'static str) -> Result<&'a str, ConfigError> {
    match cfg.pointer(pointer) {
        None | Some(Value::Null) => Err(ConfigError::MissingKey(pointer)),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim()),
        Some(other) => Err(ConfigError::InvalidValue {
            pointer,
            reason: format!("expected a non-empty string, got {other}"),
        }),
    }
}
