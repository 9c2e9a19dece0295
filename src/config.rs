use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML from config file at {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("Failed to load config from environment: {0}")]
    Env(#[from] envy::Error),
    #[error("{0} is required")]
    Missing(&'static str),
}

/// Input bounds enforced on question and tag submissions.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct QuestionLimits {
    pub title_min_len: usize,
    pub title_max_len: usize,
    pub content_min_len: usize,
    pub content_max_len: usize,
    pub max_tags: usize,
    pub tag_max_len: usize,
}

impl Default for QuestionLimits {
    fn default() -> Self {
        Self {
            title_min_len: 5,
            title_max_len: 100,
            content_min_len: 1,
            content_max_len: 20_000,
            max_tags: 3,
            tag_max_len: 15,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ForumConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub log_dir: String,
    pub max_connections: u32,
    pub token_ttl_hours: i64,
    pub limits: QuestionLimits,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialForumConfig {
    database_url: Option<String>,
    jwt_secret: Option<String>,
    log_dir: Option<String>,
    max_connections: Option<u32>,
    token_ttl_hours: Option<i64>,
    // Only the file carries the limits table; envy reads flat variables.
    #[serde(default)]
    limits: Option<QuestionLimits>,
}

fn default_log_dir() -> String {
    "logs".to_string()
}

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_TOKEN_TTL_HOURS: i64 = 24 * 7;

impl ForumConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let file_config = Self::read_file(config_path)?;
        let env_config: PartialForumConfig = envy::from_env::<PartialForumConfig>()?;

        Self::merge(env_config, file_config)
    }

    fn read_file(config_path: Option<&str>) -> Result<PartialForumConfig, ConfigError> {
        let Some(path_str) = config_path else {
            return Ok(PartialForumConfig::default());
        };
        let path = Path::new(path_str);
        if !path.exists() {
            return Ok(PartialForumConfig::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path_str.to_string(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path_str.to_string(),
            source,
        })
    }

    // Environment overrides file.
    fn merge(env: PartialForumConfig, file: PartialForumConfig) -> Result<Self, ConfigError> {
        Ok(ForumConfig {
            database_url: env
                .database_url
                .or(file.database_url)
                .ok_or(ConfigError::Missing("DATABASE_URL"))?,
            jwt_secret: env
                .jwt_secret
                .or(file.jwt_secret)
                .ok_or(ConfigError::Missing("JWT_SECRET"))?,
            log_dir: env.log_dir.or(file.log_dir).unwrap_or_else(default_log_dir),
            max_connections: env
                .max_connections
                .or(file.max_connections)
                .unwrap_or(DEFAULT_MAX_CONNECTIONS),
            token_ttl_hours: env
                .token_ttl_hours
                .or(file.token_ttl_hours)
                .unwrap_or(DEFAULT_TOKEN_TTL_HOURS),
            limits: file.limits.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_config_with_partial_limits() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
database_url = "postgres://forum@localhost/forum"
jwt_secret = "file-secret"

[limits]
max_tags = 5
"#
        )
        .unwrap();

        let parsed = ForumConfig::read_file(file.path().to_str()).unwrap();
        let config = ForumConfig::merge(PartialForumConfig::default(), parsed).unwrap();

        assert_eq!(config.database_url, "postgres://forum@localhost/forum");
        assert_eq!(config.jwt_secret, "file-secret");
        assert_eq!(config.log_dir, "logs");
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.limits.max_tags, 5);
        assert_eq!(config.limits.title_max_len, 100);
    }

    #[test]
    fn test_env_overrides_file() {
        let file = PartialForumConfig {
            database_url: Some("postgres://file".to_string()),
            jwt_secret: Some("file-secret".to_string()),
            log_dir: Some("file-logs".to_string()),
            ..Default::default()
        };
        let env = PartialForumConfig {
            jwt_secret: Some("env-secret".to_string()),
            max_connections: Some(2),
            ..Default::default()
        };

        let config = ForumConfig::merge(env, file).unwrap();
        assert_eq!(config.database_url, "postgres://file");
        assert_eq!(config.jwt_secret, "env-secret");
        assert_eq!(config.log_dir, "file-logs");
        assert_eq!(config.max_connections, 2);
    }

    #[test]
    fn test_missing_secret_is_reported() {
        let env = PartialForumConfig {
            database_url: Some("sqlite::memory:".to_string()),
            ..Default::default()
        };
        let err = ForumConfig::merge(env, PartialForumConfig::default()).unwrap_err();
        assert_eq!(err.to_string(), "JWT_SECRET is required");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let parsed = ForumConfig::read_file(Some("/nonexistent/forum.toml")).unwrap();
        assert!(parsed.database_url.is_none());
        assert!(parsed.limits.is_none());
    }

    #[test]
    fn test_invalid_toml_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "database_url = ").unwrap();
        let err = ForumConfig::read_file(file.path().to_str()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
