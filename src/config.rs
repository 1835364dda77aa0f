use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the tender ingestion and matching service.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Persistence backend holding tenders, companies and attachments.
    pub store_backend: StoreBackend,
    /// Base URL of the Qdrant instance (required for the `qdrant` backend).
    pub qdrant_url: Option<String>,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Collection holding canonical tender records.
    pub tender_collection_name: String,
    /// Collection holding company profiles.
    pub company_collection_name: String,
    /// Collection holding tender attachments.
    pub attachment_collection_name: String,
    /// Embedding provider used to generate vector representations.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Base URL of the OpenAI-compatible embeddings endpoint.
    pub embedding_base_url: String,
    /// Bearer token for the embeddings endpoint.
    pub embedding_api_key: Option<String>,
    /// Application name sent as `X-Title` to OpenRouter-style gateways.
    pub openrouter_app_name: Option<String>,
    /// Application URL sent as `HTTP-Referer` to OpenRouter-style gateways.
    pub openrouter_app_url: Option<String>,
    /// Base URL of the vision model used for OCR.
    pub ocr_base_url: String,
    /// Bearer token for the OCR endpoint.
    pub ocr_api_key: Option<String>,
    /// Vision model identifier.
    pub ocr_model: String,
    /// Per-page OCR call timeout in seconds.
    pub ocr_timeout_secs: u64,
    /// Raster resolution used when rendering PDF pages.
    pub ocr_render_dpi: u32,
    /// Concurrent background OCR jobs.
    pub ocr_workers: usize,
    /// Pending background OCR jobs accepted before submissions are refused.
    pub ocr_queue_capacity: usize,
    /// Whether locations are geocoded during ingestion.
    pub geocoding_enabled: bool,
    /// Base URL of the Nominatim-compatible geocoder.
    pub geocoding_url: String,
    /// Geocoding call timeout in seconds.
    pub geocoding_timeout_secs: u64,
    /// Value of the Nominatim `countrycodes` parameter.
    pub geocoding_country_codes: String,
    /// Chat model used by the compliance agent.
    pub compliance_model: String,
    /// Base URL of the compliance agent endpoint.
    pub compliance_base_url: String,
    /// Bearer token for the compliance agent endpoint.
    pub compliance_api_key: Option<String>,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported persistence backends.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Qdrant collections with named vectors.
    Qdrant,
    /// Process-local store, lost on restart.
    Memory,
}

/// Supported embedding backends for the ingestion pipeline.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Any OpenAI-compatible `/embeddings` endpoint (OpenAI, OpenRouter, ...).
    OpenAI,
    /// Deterministic offline hashing embedder.
    Hashing,
}

const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_EMBEDDING_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_OCR_BASE_URL: &str = "https://api.novita.ai/v3/openai";
const DEFAULT_OCR_MODEL: &str = "deepseek/deepseek-ai/DeepSeek-OCR";
const DEFAULT_GEOCODING_URL: &str = "https://nominatim.openstreetmap.org";

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let store_backend = load_env_parsed("STORE_BACKEND", StoreBackend::Qdrant)?;
        let qdrant_url = load_env_optional("QDRANT_URL");
        if store_backend == StoreBackend::Qdrant && qdrant_url.is_none() {
            return Err(ConfigError::MissingVariable("QDRANT_URL".into()));
        }

        let embedding_provider = load_env_parsed("EMBEDDING_PROVIDER", EmbeddingProvider::OpenAI)?;
        let embedding_api_key = load_env_optional("EMBEDDING_API_KEY");
        if embedding_provider == EmbeddingProvider::OpenAI && embedding_api_key.is_none() {
            return Err(ConfigError::MissingVariable("EMBEDDING_API_KEY".into()));
        }
        let embedding_base_url = load_env_optional("EMBEDDING_BASE_URL")
            .unwrap_or_else(|| DEFAULT_EMBEDDING_BASE_URL.to_string());

        let embedding_dimension: usize = load_env_parsed("EMBEDDING_DIMENSION", 1536)?;
        if embedding_dimension == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_DIMENSION".into()));
        }

        Ok(Self {
            store_backend,
            qdrant_url,
            qdrant_api_key: load_env_optional("QDRANT_API_KEY"),
            tender_collection_name: load_env_or("TENDER_COLLECTION_NAME", "tenders"),
            company_collection_name: load_env_or("COMPANY_COLLECTION_NAME", "companies"),
            attachment_collection_name: load_env_or(
                "ATTACHMENT_COLLECTION_NAME",
                "tender_attachments",
            ),
            embedding_provider,
            embedding_model: load_env_or("EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
            embedding_dimension,
            compliance_base_url: load_env_optional("COMPLIANCE_BASE_URL")
                .unwrap_or_else(|| embedding_base_url.clone()),
            compliance_api_key: load_env_optional("COMPLIANCE_API_KEY")
                .or_else(|| embedding_api_key.clone()),
            embedding_base_url,
            embedding_api_key,
            openrouter_app_name: load_env_optional("OPENROUTER_APP_NAME"),
            openrouter_app_url: load_env_optional("OPENROUTER_APP_URL"),
            ocr_base_url: load_env_or("OCR_BASE_URL", DEFAULT_OCR_BASE_URL),
            ocr_api_key: load_env_optional("OCR_API_KEY"),
            ocr_model: load_env_or("OCR_MODEL", DEFAULT_OCR_MODEL),
            ocr_timeout_secs: load_env_parsed("OCR_TIMEOUT_SECS", 120)?,
            ocr_render_dpi: load_env_parsed("OCR_RENDER_DPI", 150)?,
            ocr_workers: load_env_parsed::<usize>("OCR_WORKERS", 2)?.max(1),
            ocr_queue_capacity: load_env_parsed::<usize>("OCR_QUEUE_CAPACITY", 32)?.max(1),
            geocoding_enabled: load_env_parsed("GEOCODING_ENABLED", true)?,
            geocoding_url: load_env_or("GEOCODING_URL", DEFAULT_GEOCODING_URL),
            geocoding_timeout_secs: load_env_parsed("GEOCODING_TIMEOUT_SECS", 5)?,
            geocoding_country_codes: load_env_or("GEOCODING_COUNTRY_CODES", "de"),
            compliance_model: load_env_or("COMPLIANCE_MODEL", "gpt-4o"),
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_env_or(key: &str, default: &str) -> String {
    load_env_optional(key).unwrap_or_else(|| default.to_string())
}

fn load_env_parsed<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match load_env_optional(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

impl FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" | "openrouter" => Ok(Self::OpenAI),
            "hashing" => Ok(Self::Hashing),
            _ => Err(()),
        }
    }
}

impl FromStr for StoreBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "qdrant" => Ok(Self::Qdrant),
            "memory" => Ok(Self::Memory),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        store_backend = ?config.store_backend,
        qdrant_url = ?config.qdrant_url,
        tenders = %config.tender_collection_name,
        companies = %config.company_collection_name,
        server_port = ?config.server_port,
        embedding_provider = ?config.embedding_provider,
        embedding_dimension = config.embedding_dimension,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        store_backend: StoreBackend::Memory,
        qdrant_url: None,
        qdrant_api_key: None,
        tender_collection_name: "tenders".into(),
        company_collection_name: "companies".into(),
        attachment_collection_name: "tender_attachments".into(),
        embedding_provider: EmbeddingProvider::Hashing,
        embedding_model: "test-model".into(),
        embedding_dimension: 8,
        embedding_base_url: "http://127.0.0.1:9".into(),
        embedding_api_key: None,
        openrouter_app_name: None,
        openrouter_app_url: None,
        ocr_base_url: "http://127.0.0.1:9".into(),
        ocr_api_key: None,
        ocr_model: "test-ocr".into(),
        ocr_timeout_secs: 5,
        ocr_render_dpi: 150,
        ocr_workers: 1,
        ocr_queue_capacity: 4,
        geocoding_enabled: false,
        geocoding_url: "http://127.0.0.1:9".into(),
        geocoding_timeout_secs: 1,
        geocoding_country_codes: "de".into(),
        compliance_model: "test-agent".into(),
        compliance_base_url: "http://127.0.0.1:9".into(),
        compliance_api_key: None,
        server_port: None,
    }
}
