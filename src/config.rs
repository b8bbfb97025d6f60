// src/config.rs - Environment-driven configuration for the store, engine and collaborator
use log::info;
use std::env;
use std::fmt;

use crate::collaborator::claude::{ClaudeConfig, API_KEY_PREFIX, DEFAULT_API_URL, DEFAULT_MODEL};
use crate::consolidation::UpdateColumns;
use crate::error::EngineError;
use crate::matching::{FuzzyMatchEngine, GoldenColumns, MIN_SIMILARITY_FLOOR};
use crate::store::TableRef;

pub const SUPPORTED_DB_TYPE: &str = "postgresql";

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Set and non-blank, trimmed.
fn var_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn require(key: &str) -> Result<String, EngineError> {
    var_opt(key).ok_or_else(|| EngineError::Config(format!("{} is not set", key)))
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub db_type: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("db_type", &self.db_type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, EngineError> {
        let db_type = var_or("GOLDEN_SOURCE_DB_TYPE", SUPPORTED_DB_TYPE)
            .trim()
            .to_lowercase();
        if db_type != SUPPORTED_DB_TYPE && db_type != "postgres" {
            return Err(EngineError::Config(format!(
                "Unsupported database type: {}",
                db_type
            )));
        }

        let port_raw = var_or("GOLDEN_SOURCE_PORT", "5432");
        let port = port_raw.trim().parse::<u16>().map_err(|_| {
            EngineError::Config(format!("GOLDEN_SOURCE_PORT is not a valid port: {}", port_raw))
        })?;

        Ok(Self {
            db_type: SUPPORTED_DB_TYPE.to_string(),
            host: require("GOLDEN_SOURCE_HOST")?,
            port,
            database: require("GOLDEN_SOURCE_DATABASE")?,
            user: require("GOLDEN_SOURCE_USER")?,
            password: env::var("GOLDEN_SOURCE_PASSWORD").unwrap_or_default(),
        })
    }
}

/// Tables, thresholds and column names the engine works with.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub golden_table: TableRef,
    pub internal_tables: Vec<TableRef>,
    pub updates_table: TableRef,
    /// Collaborator confidence below this marks a business-rule exception.
    pub confidence_threshold: f64,
    pub default_match_threshold: f64,
    pub threshold_floor: f64,
    pub candidate_limit: usize,
    pub golden_columns: GoldenColumns,
    pub update_columns: UpdateColumns,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            golden_table: TableRef::parse("addresses"),
            internal_tables: vec![TableRef::parse("internal_addresses")],
            updates_table: TableRef::parse("internal_updates"),
            confidence_threshold: 90.0,
            default_match_threshold: 90.0,
            threshold_floor: MIN_SIMILARITY_FLOOR,
            candidate_limit: 50,
            golden_columns: GoldenColumns::default(),
            update_columns: UpdateColumns::default(),
        }
    }
}

impl EngineSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let internal_tables: Vec<TableRef> = var_or("INTERNAL_TABLES", "internal_addresses")
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(TableRef::parse)
            .collect();

        Self {
            golden_table: TableRef::parse(&var_or("GOLDEN_SOURCE_TABLE", "addresses")),
            internal_tables: if internal_tables.is_empty() {
                defaults.internal_tables
            } else {
                internal_tables
            },
            updates_table: TableRef::parse(&var_or("INTERNAL_UPDATES_TABLE", "internal_updates")),
            confidence_threshold: env::var("CONFIDENCE_THRESHOLD")
                .unwrap_or_else(|_| "90.0".to_string())
                .parse()
                .unwrap_or(90.0),
            default_match_threshold: env::var("DEFAULT_MATCH_THRESHOLD")
                .unwrap_or_else(|_| "90.0".to_string())
                .parse()
                .unwrap_or(90.0),
            threshold_floor: env::var("FUZZY_THRESHOLD_FLOOR")
                .unwrap_or_else(|_| MIN_SIMILARITY_FLOOR.to_string())
                .parse::<f64>()
                .unwrap_or(MIN_SIMILARITY_FLOOR),
            candidate_limit: env::var("CANDIDATE_LIMIT")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .unwrap_or(50),
            golden_columns: GoldenColumns {
                address1: var_or("GOLDEN_COL_ADDRESS1", &defaults.golden_columns.address1),
                address2: var_or("GOLDEN_COL_ADDRESS2", &defaults.golden_columns.address2),
                city: var_or("GOLDEN_COL_CITY", &defaults.golden_columns.city),
                state: var_or("GOLDEN_COL_STATE", &defaults.golden_columns.state),
                zip: var_or("GOLDEN_COL_ZIP", &defaults.golden_columns.zip),
            },
            update_columns: UpdateColumns {
                action: var_or("UPDATE_COL_ACTION", &defaults.update_columns.action),
                weight: var_or("UPDATE_COL_WEIGHT", &defaults.update_columns.weight),
                timestamp: var_or("UPDATE_COL_TIMESTAMP", &defaults.update_columns.timestamp),
            },
        }
    }

    /// The configured floor can only raise the built-in minimum.
    pub fn fuzzy_engine(&self) -> FuzzyMatchEngine {
        FuzzyMatchEngine::new(self.threshold_floor)
    }
}

/// `None` when no key is configured; a malformed key is a startup error.
pub fn claude_config_from_env() -> Result<Option<ClaudeConfig>, EngineError> {
    let api_key = match var_opt("CLAUDE_API_KEY") {
        Some(key) => key,
        None => return Ok(None),
    };
    if !api_key.starts_with(API_KEY_PREFIX) {
        let shown: String = api_key.chars().take(15).collect();
        return Err(EngineError::Config(format!(
            "Invalid API key format. Claude API keys should start with '{}'. Your key starts with: {}...",
            API_KEY_PREFIX, shown
        )));
    }
    Ok(Some(ClaudeConfig {
        api_key,
        model: var_or("CLAUDE_MODEL", DEFAULT_MODEL),
        api_url: var_or("CLAUDE_API_URL", DEFAULT_API_URL),
        timeout_secs: env::var("CLAUDE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .unwrap_or(60),
    }))
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub engine: EngineSettings,
    pub claude: Option<ClaudeConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, EngineError> {
        let config = Self {
            database: DatabaseConfig::from_env()?,
            engine: EngineSettings::from_env(),
            claude: claude_config_from_env()?,
        };
        info!(
            "Config: golden={}, internal=[{}], updates={}, confidence>={}, floor={}, collaborator={}",
            config.engine.golden_table,
            config
                .engine
                .internal_tables
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
            config.engine.updates_table,
            config.engine.confidence_threshold,
            config.engine.threshold_floor,
            if config.claude.is_some() { "claude" } else { "none" }
        );
        Ok(config)
    }
}
