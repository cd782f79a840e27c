//! # Stockroom Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     STOCKROOM_DB_PATH=/srv/shop/stockroom.db                           │
//! │     STOCKROOM_FUZZY=off                                                │
//! │     STOCKROOM_CHECKOUT_POLICY=atomic                                   │
//! │     STOCKROOM_OPERATOR=alice                                           │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/stockroom/stockroom.toml (Linux)                         │
//! │     ~/Library/Application Support/com.stockroom.stockroom/... (macOS)  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [store]
//! path = "/var/lib/stockroom/stockroom.db"
//! seed_if_created = true
//!
//! [lookup]
//! fuzzy = true
//! name_limit = 5
//! fuzzy_cutoff = 0
//!
//! [checkout]
//! policy = "best_effort"   # best_effort | atomic
//! operator = "cashier"
//! note = "POS checkout"
//!
//! [warehouse]
//! operator = "warehouse"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use stockroom_core::{NameMatcher, SubstringMatcher, DEFAULT_NAME_LIMIT};
use stockroom_db::DbConfig;
use tracing::{debug, info, warn};

use crate::error::{PosError, PosResult};

// =============================================================================
// Checkout Policy
// =============================================================================

/// How checkout treats a cart in which some lines fail.
///
/// ```text
///  BEST_EFFORT (default)                 ATOMIC
///  ─────────────────────                 ──────
///  each line is its own write            one write for the whole cart
///  failed lines are collected            first failure aborts everything
///  successful decrements stay applied    nothing is applied
///  no transaction on any failure         no transaction on any failure
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutPolicy {
    #[default]
    BestEffort,
    Atomic,
}

impl std::fmt::Display for CheckoutPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckoutPolicy::BestEffort => write!(f, "best_effort"),
            CheckoutPolicy::Atomic => write!(f, "atomic"),
        }
    }
}

impl std::str::FromStr for CheckoutPolicy {
    type Err = PosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "best_effort" | "best-effort" => Ok(CheckoutPolicy::BestEffort),
            "atomic" => Ok(CheckoutPolicy::Atomic),
            other => Err(PosError::Config(format!(
                "Unknown checkout policy: '{}'. Valid options: best_effort, atomic",
                other
            ))),
        }
    }
}

// =============================================================================
// Sections
// =============================================================================

/// Where the store lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Database file. Default: platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Seed two sample products when the file is created.
    #[serde(default = "default_true")]
    pub seed_if_created: bool,
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            path: None,
            seed_if_created: true,
        }
    }
}

/// Name lookup behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupSettings {
    /// Use weighted-ratio ranking when substring search finds nothing.
    #[serde(default = "default_true")]
    pub fuzzy: bool,

    /// Maximum results of a name search.
    #[serde(default = "default_name_limit")]
    pub name_limit: usize,

    /// Minimum similarity (0-100) for a fuzzy result.
    #[serde(default)]
    pub fuzzy_cutoff: f64,
}

impl Default for LookupSettings {
    fn default() -> Self {
        LookupSettings {
            fuzzy: true,
            name_limit: default_name_limit(),
            fuzzy_cutoff: 0.0,
        }
    }
}

/// Checkout behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSettings {
    #[serde(default)]
    pub policy: CheckoutPolicy,

    /// Operator recorded when the caller supplies none.
    #[serde(default = "default_cashier")]
    pub operator: String,

    /// Note attached to sale stock-log entries.
    #[serde(default = "default_checkout_note")]
    pub note: String,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        CheckoutSettings {
            policy: CheckoutPolicy::default(),
            operator: default_cashier(),
            note: default_checkout_note(),
        }
    }
}

/// Stock-in / stock-out form defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseSettings {
    #[serde(default = "default_warehouse_operator")]
    pub operator: String,
}

impl Default for WarehouseSettings {
    fn default() -> Self {
        WarehouseSettings {
            operator: default_warehouse_operator(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_name_limit() -> usize {
    DEFAULT_NAME_LIMIT
}

fn default_cashier() -> String {
    "cashier".to_string()
}

fn default_checkout_note() -> String {
    "POS checkout".to_string()
}

fn default_warehouse_operator() -> String {
    "warehouse".to_string()
}

// =============================================================================
// Root Configuration
// =============================================================================

/// Complete stockroom configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PosConfig {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub lookup: LookupSettings,

    #[serde(default)]
    pub checkout: CheckoutSettings,

    #[serde(default)]
    pub warehouse: WarehouseSettings,
}

impl PosConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (stockroom.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> PosResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading stockroom config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns defaults if loading fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load stockroom config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Writes the configuration as TOML.
    pub fn save(&self, config_path: Option<PathBuf>) -> PosResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| PosError::Config("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Stockroom config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> PosResult<()> {
        if self.lookup.name_limit == 0 {
            return Err(PosError::Config(
                "lookup.name_limit must be greater than 0".into(),
            ));
        }

        if !(0.0..=100.0).contains(&self.lookup.fuzzy_cutoff) {
            return Err(PosError::Config(format!(
                "lookup.fuzzy_cutoff must be between 0 and 100, got {}",
                self.lookup.fuzzy_cutoff
            )));
        }

        Ok(())
    }

    /// Applies `STOCKROOM_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(path) = var("STOCKROOM_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.store.path = Some(PathBuf::from(path));
        }

        if let Some(fuzzy) = var("STOCKROOM_FUZZY") {
            match fuzzy.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.lookup.fuzzy = true,
                "0" | "false" | "no" | "off" => self.lookup.fuzzy = false,
                _ => warn!(value = %fuzzy, "Unknown STOCKROOM_FUZZY value in environment"),
            }
        }

        if let Some(policy) = var("STOCKROOM_CHECKOUT_POLICY") {
            match policy.parse() {
                Ok(parsed) => {
                    debug!(policy = %policy, "Overriding checkout policy from environment");
                    self.checkout.policy = parsed;
                }
                Err(e) => warn!(error = %e, "Ignoring checkout policy from environment"),
            }
        }

        if let Some(operator) = var("STOCKROOM_OPERATOR") {
            self.checkout.operator = operator.clone();
            self.warehouse.operator = operator;
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "stockroom", "stockroom")
            .map(|dirs| dirs.config_dir().join("stockroom.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Database file to open.
    pub fn database_path(&self) -> PathBuf {
        self.store.path.clone().unwrap_or_else(|| {
            directories::ProjectDirs::from("com", "stockroom", "stockroom")
                .map(|dirs| dirs.data_dir().join("stockroom.db"))
                .unwrap_or_else(|| PathBuf::from("stockroom.db"))
        })
    }

    /// Database settings derived from `[store]`.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path()).seed_if_created(self.store.seed_if_created)
    }

    /// The name matcher selected by `[lookup] fuzzy`.
    ///
    /// Falls back to substring-only when fuzzy matching is not compiled in.
    pub fn matcher(&self) -> Arc<dyn NameMatcher> {
        if self.lookup.fuzzy {
            #[cfg(feature = "fuzzy")]
            return Arc::new(stockroom_core::FuzzyMatcher);

            #[cfg(not(feature = "fuzzy"))]
            warn!("Fuzzy lookup requested but not compiled in; using substring matching");
        }
        Arc::new(SubstringMatcher)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = PosConfig::default();
        assert!(config.store.seed_if_created);
        assert!(config.lookup.fuzzy);
        assert_eq!(config.lookup.name_limit, 5);
        assert_eq!(config.checkout.policy, CheckoutPolicy::BestEffort);
        assert_eq!(config.checkout.operator, "cashier");
        assert_eq!(config.warehouse.operator, "warehouse");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_file() {
        let config: PosConfig = toml::from_str(
            r#"
            [store]
            path = "/tmp/shop.db"

            [lookup]
            name_limit = 3
            fuzzy_cutoff = 60

            [checkout]
            policy = "atomic"
            "#,
        )
        .unwrap();

        assert_eq!(config.database_path(), PathBuf::from("/tmp/shop.db"));
        assert!(config.store.seed_if_created);
        assert_eq!(config.lookup.name_limit, 3);
        assert_eq!(config.lookup.fuzzy_cutoff, 60.0);
        assert_eq!(config.checkout.policy, CheckoutPolicy::Atomic);
        assert_eq!(config.checkout.note, "POS checkout");
    }

    #[test]
    fn test_validate_rejects_bad_lookup_settings() {
        let mut config = PosConfig::default();
        config.lookup.name_limit = 0;
        assert!(config.validate().is_err());

        let mut config = PosConfig::default();
        config.lookup.fuzzy_cutoff = 101.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("STOCKROOM_DB_PATH", "/srv/shop.db"),
            ("STOCKROOM_FUZZY", "off"),
            ("STOCKROOM_CHECKOUT_POLICY", "atomic"),
            ("STOCKROOM_OPERATOR", "alice"),
        ]
        .into_iter()
        .collect();

        let mut config = PosConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.store.path, Some(PathBuf::from("/srv/shop.db")));
        assert!(!config.lookup.fuzzy);
        assert_eq!(config.checkout.policy, CheckoutPolicy::Atomic);
        assert_eq!(config.checkout.operator, "alice");
        assert_eq!(config.warehouse.operator, "alice");
        assert_eq!(config.matcher().name(), "substring");
    }

    #[test]
    fn test_bad_override_is_ignored() {
        let mut config = PosConfig::default();
        config.apply_overrides(|key| {
            (key == "STOCKROOM_CHECKOUT_POLICY").then(|| "sometimes".to_string())
        });
        assert_eq!(config.checkout.policy, CheckoutPolicy::BestEffort);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("stockroom.toml");

        let mut config = PosConfig::default();
        config.lookup.name_limit = 7;
        config.checkout.policy = CheckoutPolicy::Atomic;
        config.save(Some(path.clone())).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let loaded: PosConfig = toml::from_str(&text).unwrap();
        assert_eq!(loaded.lookup.name_limit, 7);
        assert_eq!(loaded.checkout.policy, CheckoutPolicy::Atomic);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stockroom.toml");
        std::fs::write(&path, "[lookup]\nname_limit = 0\n").unwrap();

        assert!(matches!(
            PosConfig::load(Some(path.clone())),
            Err(PosError::Config(_))
        ));
        assert_eq!(PosConfig::load_or_default(Some(path)).lookup.name_limit, 5);
    }

    #[cfg(feature = "fuzzy")]
    #[test]
    fn test_fuzzy_matcher_selected_by_default() {
        assert_eq!(PosConfig::default().matcher().name(), "fuzzy");
    }
}
