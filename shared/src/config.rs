use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BUCKET: &str = "cakewalkbucket2";
pub const DEFAULT_REGION: &str = "ap-south-1";
const MIN_SECRET_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    S3,
    /// In-process store for running without AWS credentials.
    Memory,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::S3 => "s3",
            StoreBackend::Memory => "memory",
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub bucket: String,
    pub region: String,
    pub backend: StoreBackend,
    pub auth_secret: String,
    pub presign_expiry: Duration,
    pub store_call_timeout: Duration,
    pub sweep_concurrency: usize,
    pub cors_allow_origin: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("backend", &self.backend)
            .field("auth_secret", &"<redacted>")
            .field("presign_expiry", &self.presign_expiry)
            .field("store_call_timeout", &self.store_call_timeout)
            .field("sweep_concurrency", &self.sweep_concurrency)
            .field("cors_allow_origin", &self.cors_allow_origin)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let backend = match get("STORE_BACKEND").as_deref().map(str::to_ascii_lowercase) {
            None => StoreBackend::S3,
            Some(v) if v == "s3" => StoreBackend::S3,
            Some(v) if v == "memory" => StoreBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "STORE_BACKEND",
                    reason: format!("expected `s3` or `memory`, got `{other}`"),
                })
            }
        };

        let auth_secret = get("AUTH_TOKEN_SECRET").ok_or(ConfigError::Missing("AUTH_TOKEN_SECRET"))?;
        if auth_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid {
                name: "AUTH_TOKEN_SECRET",
                reason: format!("must be at least {MIN_SECRET_LEN} bytes"),
            });
        }

        let presign_secs = parse_u64(&get, "PRESIGN_EXPIRY_SECS", 3600)?;
        // S3 caps SigV4 presigned URLs at seven days.
        if presign_secs == 0 || presign_secs > 7 * 24 * 3600 {
            return Err(ConfigError::Invalid {
                name: "PRESIGN_EXPIRY_SECS",
                reason: "must be between 1 and 604800".to_string(),
            });
        }

        let timeout_ms = parse_u64(&get, "STORE_CALL_TIMEOUT_MS", 5000)?;
        if timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                name: "STORE_CALL_TIMEOUT_MS",
                reason: "must be greater than zero".to_string(),
            });
        }

        let sweep_concurrency = parse_u64(&get, "SWEEP_CONCURRENCY", 16)? as usize;
        if sweep_concurrency == 0 {
            return Err(ConfigError::Invalid {
                name: "SWEEP_CONCURRENCY",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            bucket: get("S3_BUCKET_NAME").unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
            region: get("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            backend,
            auth_secret,
            presign_expiry: Duration::from_secs(presign_secs),
            store_call_timeout: Duration::from_millis(timeout_ms),
            sweep_concurrency,
            cors_allow_origin: get("CORS_ALLOW_ORIGIN").unwrap_or_else(|| "*".to_string()),
        })
    }
}

fn parse_u64<G>(get: &G, name: &'static str, default: u64) -> Result<u64, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e| ConfigError::Invalid {
            name,
            reason: format!("{e}"),
        }),
    }
}
