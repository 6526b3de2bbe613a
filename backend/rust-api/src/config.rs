use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mongo_uri: String,
    pub redis_uri: String,
    pub mongo_database: String,
    pub jwt_secret: String,
    /// Absent key means online question generation is unavailable; the
    /// generation endpoint reports 503 rather than silently degrading.
    pub gemini_api_key: Option<String>,
    pub gemini_api_url: String,
    pub gemini_model: String,
    pub gemini_timeout_secs: u64,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let config_builder = config::Config::builder()
            .add_source(
                config::File::with_name(&format!("config/{}", env)).required(false), // Allow missing config file, fallback to ENV
            )
            // Override with environment variables (prefix: APP_)
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        let settings = config_builder.build()?;

        let mongo_uri = settings
            .get_string("database.mongo_uri")
            .or_else(|_| env::var("MONGO_URI"))
            .unwrap_or_else(|_| "mongodb://localhost:27017/cybered".to_string());

        let redis_uri = settings
            .get_string("redis.uri")
            .or_else(|_| env::var("REDIS_URI"))
            .unwrap_or_else(|_| "redis://127.0.0.1:6379/0".to_string());

        let mongo_database = settings
            .get_string("database.mongo_database")
            .or_else(|_| env::var("MONGO_DATABASE"))
            .unwrap_or_else(|_| "cybered".to_string());

        let jwt_secret = settings
            .get_string("auth.jwt_secret")
            .or_else(|_| env::var("JWT_SECRET"))
            .unwrap_or_else(|_| {
                if env == "prod" {
                    panic!("FATAL: JWT_SECRET must be set in production!");
                }
                eprintln!("WARNING: Using default JWT_SECRET (dev mode only!)");
                "dev-secret-only-for-local-testing".to_string()
            });

        let gemini_api_key = settings
            .get_string("gemini.api_key")
            .ok()
            .or_else(|| env::var("GEMINI_API_KEY").ok())
            .filter(|key| !key.is_empty());

        let gemini_api_url = settings
            .get_string("gemini.api_url")
            .or_else(|_| env::var("GEMINI_API_URL"))
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string());

        let gemini_model = settings
            .get_string("gemini.model")
            .or_else(|_| env::var("GEMINI_MODEL"))
            .unwrap_or_else(|_| "gemini-2.0-flash-exp".to_string());

        let gemini_timeout_secs = settings
            .get_int("gemini.timeout_secs")
            .ok()
            .or_else(|| {
                env::var("GEMINI_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
            })
            .filter(|v| *v > 0)
            .unwrap_or(10) as u64;

        Ok(Config {
            mongo_uri,
            redis_uri,
            mongo_database,
            jwt_secret,
            gemini_api_key,
            gemini_api_url,
            gemini_model,
            gemini_timeout_secs,
        })
    }
}
