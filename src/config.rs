// ==================== CONFIGURATION ====================
// Lê variáveis de ambiente (já carregadas do .env pelo dotenv em main).

use std::env;
use std::time::Duration;

use crate::middleware::auth::JwtSettings;
use crate::models::TierLimits;
use crate::utils::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_output_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub timeout: Duration,
    pub retry_on_malformed: bool,
    pub max_source_chars: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            retry_on_malformed: true,
            max_source_chars: 10_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub jwt: JwtSettings,
    pub completion: CompletionConfig,
    pub generation: GenerationSettings,
    pub tier_limits: TierLimits,
    pub upgrade_link: String,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store_backend = match get("STORE_BACKEND").as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("mongo") | Some("mongodb") => StoreBackend::Mongo,
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(AppError::Config(format!("STORE_BACKEND '{}' is not supported", other)))
            }
        };

        let database_url = get("DATABASE_URL");
        if store_backend == StoreBackend::Mongo && database_url.is_none() {
            return Err(AppError::Config("DATABASE_URL must be set".to_string()));
        }

        let defaults = GenerationSettings::default();
        let generation = GenerationSettings {
            timeout: Duration::from_secs(parse_or(&get, "COMPLETION_TIMEOUT_SECS", defaults.timeout.as_secs())?),
            retry_on_malformed: parse_or(&get, "COMPLETION_RETRY_ON_MALFORMED", defaults.retry_on_malformed)?,
            max_source_chars: parse_or(&get, "MAX_SOURCE_CHARS", defaults.max_source_chars)?,
        };

        let default_limits = TierLimits::default();
        let tier_limits = TierLimits {
            free: parse_limit(&get, "FREE_CARD_LIMIT", default_limits.free)?,
            basic: parse_limit(&get, "BASIC_CARD_LIMIT", default_limits.basic)?,
            pro: parse_limit(&get, "PRO_CARD_LIMIT", default_limits.pro)?,
        };

        let cors_origins = get("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&get, "PORT", 3002)?,
            store_backend,
            database_url,
            jwt: JwtSettings {
                secret: required(&get, "JWT_SECRET")?,
                issuer: get("JWT_ISSUER").unwrap_or_else(|| "flashcard-service".to_string()),
                audience: get("JWT_AUDIENCE").unwrap_or_else(|| "flashcard-api".to_string()),
            },
            completion: CompletionConfig::from_lookup(&get)?,
            generation,
            tier_limits,
            upgrade_link: required(&get, "UPGRADE_LINK")?,
            cors_origins,
        })
    }
}

impl CompletionConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(&|key: &str| env::var(key).ok())
    }

    fn from_lookup<F>(get: &F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            api_key: required(get, "OPENAI_API_KEY")?,
            base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            model: get("OPENAI_MODEL").unwrap_or_else(|| "gpt-3.5-turbo".to_string()),
            max_output_tokens: parse_or(get, "COMPLETION_MAX_TOKENS", 500)?,
        })
    }
}

fn required<F>(get: &F, key: &str) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    get(key)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AppError::Config(format!("{} must be set", key)))
}

fn parse_or<F, T>(get: &F, key: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} has an invalid value '{}'", key, raw))),
        None => Ok(default),
    }
}

/// Limite de cards por plano: número ou "unlimited"
fn parse_limit<F>(get: &F, key: &str, default: Option<usize>) -> Result<Option<usize>, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) if raw.trim().eq_ignore_ascii_case("unlimited") => Ok(None),
        Some(_) => parse_or(get, key, 0).map(Some),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const BASE: [(&str, &str); 4] = [
        ("DATABASE_URL", "mongodb://localhost:27017/flashcards"),
        ("JWT_SECRET", "secret"),
        ("OPENAI_API_KEY", "sk-test"),
        ("UPGRADE_LINK", "https://billing.example/upgrade"),
    ];

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&BASE)).unwrap();
        assert_eq!(config.port, 3002);
        assert_eq!(config.store_backend, StoreBackend::Mongo);
        assert_eq!(config.tier_limits, TierLimits::default());
        assert_eq!(config.completion.max_output_tokens, 500);
        assert_eq!(config.completion.model, "gpt-3.5-turbo");
        assert_eq!(config.generation.timeout, Duration::from_secs(30));
        assert!(config.generation.retry_on_malformed);
        assert_eq!(config.cors_origins, vec!["http://localhost:3000".to_string()]);
        assert_eq!(config.jwt.issuer, "flashcard-service");
    }

    #[test]
    fn test_tier_limits_override() {
        let mut pairs = BASE.to_vec();
        pairs.push(("FREE_CARD_LIMIT", "3"));
        pairs.push(("BASIC_CARD_LIMIT", "6"));
        pairs.push(("PRO_CARD_LIMIT", "unlimited"));
        let config = AppConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(
            config.tier_limits,
            TierLimits {
                free: Some(3),
                basic: Some(6),
                pro: None
            }
        );
    }

    #[test]
    fn test_memory_backend_needs_no_database() {
        let pairs = [
            ("STORE_BACKEND", "memory"),
            ("JWT_SECRET", "secret"),
            ("OPENAI_API_KEY", "sk-test"),
            ("UPGRADE_LINK", "https://billing.example/upgrade"),
        ];
        let config = AppConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_missing_upgrade_link_fails() {
        let pairs: Vec<_> = BASE.iter().copied().filter(|(k, _)| *k != "UPGRADE_LINK").collect();
        assert!(matches!(AppConfig::from_lookup(lookup(&pairs)), Err(AppError::Config(_))));
    }

    #[test]
    fn test_invalid_number_fails() {
        let mut pairs = BASE.to_vec();
        pairs.push(("COMPLETION_TIMEOUT_SECS", "soon"));
        assert!(matches!(AppConfig::from_lookup(lookup(&pairs)), Err(AppError::Config(_))));
    }
}
