use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub execution_service_url: String,
    pub execution_timeout_secs: u64,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub grading_model: String,
    pub public_rps: u32,
    pub submission_window_secs: u64,
    pub submissions_per_window: u32,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            execution_service_url: get_env("EXECUTION_SERVICE_URL")?,
            execution_timeout_secs: get_env_or_parse("EXECUTION_TIMEOUT_SECS", 30)?,
            openai_api_key: get_env("OPENAI_API_KEY")?,
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            grading_model: env::var("GRADING_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            public_rps: get_env_parse("PUBLIC_RPS")?,
            submission_window_secs: get_env_or_parse("SUBMISSION_WINDOW_SECS", 60)?,
            submissions_per_window: get_env_or_parse("SUBMISSIONS_PER_WINDOW", 10)?,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse<T>(name: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get_env(name)?;
    raw.parse()
        .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
}

fn get_env_or_parse<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
