// src/config/mod.rs

use std::str::FromStr;

/// Runtime configuration, loaded once at startup.
///
/// Every value has a working default so a bare `juno` binary comes up in
/// demo mode: in-memory continuity, degraded LLM responses when no API key
/// is present. `DATABASE_URL` is deliberately optional; its absence selects
/// the in-memory continuity backend for the whole process lifetime.
#[derive(Debug, Clone)]
pub struct JunoConfig {
    // ── LLM Provider Configuration
    pub openai_base_url: String,
    pub openai_api_key: String,
    pub model: String,
    pub intent_model: String,
    pub llm_timeout_secs: u64,

    // ── Database Configuration
    pub database_url: Option<String>,
    pub sqlite_max_connections: u32,

    // ── Session & Continuity Configuration
    pub session_ttl_secs: u64,
    pub continuity_ttl_secs: u64,
    pub sweep_interval_secs: u64,
    pub history_cap: usize,

    // ── Knowledge Base Configuration
    pub knowledge_path: String,

    // ── Server Configuration
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
    pub request_timeout_secs: u64,

    // ── Support Contact (used in degraded responses)
    pub support_email: String,

    // ── Logging Configuration
    pub log_level: String,
}

/// Parse an environment variable, falling back to a default.
///
/// Values may carry trailing comments (`PORT=3000 # local`), so everything
/// after a `#` is stripped before parsing.
fn env_var_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    match std::env::var(key) {
        Ok(val) => {
            let clean_val = val.split('#').next().unwrap_or("").trim();
            match clean_val.parse::<T>() {
                Ok(parsed) => parsed,
                Err(_) => {
                    eprintln!("Config: {} = '{}' (parse failed, using default)", key, val);
                    default
                }
            }
        }
        Err(_) => default,
    }
}

impl JunoConfig {
    pub fn from_env() -> Self {
        if dotenvy::dotenv().is_err() {
            eprintln!("No .env file found. Using environment variables and defaults.");
        }

        Self {
            openai_base_url: env_var_or("OPENAI_BASE_URL", "https://api.openai.com".to_string()),
            openai_api_key: env_var_or("OPENAI_API_KEY", String::new()),
            model: env_var_or("JUNO_MODEL", "gpt-4o-mini".to_string()),
            intent_model: env_var_or("JUNO_INTENT_MODEL", "gpt-4o-mini".to_string()),
            llm_timeout_secs: env_var_or("JUNO_LLM_TIMEOUT", 30),
            database_url: std::env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty()),
            sqlite_max_connections: env_var_or("JUNO_SQLITE_MAX_CONNECTIONS", 5),
            session_ttl_secs: env_var_or("JUNO_SESSION_TTL", 86_400),
            continuity_ttl_secs: env_var_or("JUNO_CONTINUITY_TTL", 2_592_000),
            sweep_interval_secs: env_var_or("JUNO_SWEEP_INTERVAL", 3_600),
            history_cap: env_var_or("JUNO_HISTORY_CAP", 20),
            knowledge_path: env_var_or("JUNO_KNOWLEDGE_PATH", "./data/knowledge.json".to_string()),
            host: env_var_or("JUNO_HOST", "0.0.0.0".to_string()),
            port: env_var_or("JUNO_PORT", 3000),
            cors_origin: env_var_or("JUNO_CORS_ORIGIN", "*".to_string()),
            request_timeout_secs: env_var_or("JUNO_REQUEST_TIMEOUT", 30),
            support_email: env_var_or("JUNO_SUPPORT_EMAIL", "remotesupport@northfield.edu".to_string()),
            log_level: env_var_or("JUNO_LOG_LEVEL", "info".to_string()),
        }
    }

    /// Server bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether an LLM API key is configured. Without one every model call
    /// fails fast and the rule-based / canned paths take over.
    pub fn has_llm_key(&self) -> bool {
        !self.openai_api_key.trim().is_empty()
    }
}

impl Default for JunoConfig {
    /// Defaults without touching the process environment. Used by tests.
    fn default() -> Self {
        Self {
            openai_base_url: "https://api.openai.com".to_string(),
            openai_api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            intent_model: "gpt-4o-mini".to_string(),
            llm_timeout_secs: 30,
            database_url: None,
            sqlite_max_connections: 5,
            session_ttl_secs: 86_400,
            continuity_ttl_secs: 2_592_000,
            sweep_interval_secs: 3_600,
            history_cap: 20,
            knowledge_path: "./data/knowledge.json".to_string(),
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origin: "*".to_string(),
            request_timeout_secs: 30,
            support_email: "remotesupport@northfield.edu".to_string(),
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_address_joins_host_and_port() {
        let config = JunoConfig {
            host: "127.0.0.1".to_string(),
            port: 4010,
            ..JunoConfig::default()
        };
        assert_eq!(config.bind_address(), "127.0.0.1:4010");
    }

    #[test]
    fn blank_api_key_means_no_llm() {
        let mut config = JunoConfig::default();
        assert!(!config.has_llm_key());
        config.openai_api_key = "  ".to_string();
        assert!(!config.has_llm_key());
        config.openai_api_key = "sk-test".to_string();
        assert!(config.has_llm_key());
    }
}
