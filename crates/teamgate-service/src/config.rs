use serde::Deserialize;
use std::path::Path;

use teamgate_core::role::RoleLimits;
use teamgate_storage::StoreOptions;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub log: LogConfig,
    pub audit: AuditConfig,
    pub roles: RolesConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub activity_log: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RolesConfig {
    pub protect_built_in: bool,
    pub max_permissions: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            level: "info".to_string(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self { activity_log: true }
    }
}

impl Default for RolesConfig {
    fn default() -> Self {
        Self {
            protect_built_in: true,
            max_permissions: 512,
        }
    }
}

impl AppConfig {
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e.to_string()))?;
            toml::from_str::<AppConfig>(&contents)
                .map_err(|e| ConfigError::ParseToml(e.to_string()))?
        } else {
            AppConfig::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("TEAMGATE_LOG_LEVEL") {
            self.log.level = v;
        }
        if let Some(v) = var("TEAMGATE_LOG_FORMAT") {
            match v.as_str() {
                "json" => self.log.format = LogFormat::Json,
                "pretty" => self.log.format = LogFormat::Pretty,
                _ => {}
            }
        }
        if let Some(v) = var("TEAMGATE_AUDIT_ACTIVITY_LOG")
            && let Ok(enabled) = v.parse()
        {
            self.audit.activity_log = enabled;
        }
        if let Some(v) = var("TEAMGATE_ROLES_PROTECT_BUILT_IN")
            && let Ok(protect) = v.parse()
        {
            self.roles.protect_built_in = protect;
        }
        if let Some(v) = var("TEAMGATE_ROLES_MAX_PERMISSIONS")
            && let Ok(n) = v.parse()
        {
            self.roles.max_permissions = n;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.log.level.trim().is_empty() {
            return Err(ConfigError::Validation(
                "log.level must not be empty".to_string(),
            ));
        }
        if self.roles.max_permissions == 0 {
            return Err(ConfigError::Validation(
                "roles.max_permissions must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_role_limits(&self) -> RoleLimits {
        RoleLimits {
            max_permissions: self.roles.max_permissions,
        }
    }

    pub fn to_store_options(&self) -> StoreOptions {
        StoreOptions {
            protect_built_in_roles: self.roles.protect_built_in,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{0}': {1}")]
    ReadFile(String, String),

    #[error("failed to parse TOML config: {0}")]
    ParseToml(String),

    #[error("config validation failed: {0}")]
    Validation(String),
}
