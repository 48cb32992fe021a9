use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_AUDIO_MAX_BYTES: usize = 5 << 20;
const DEFAULT_MEDIA_MAX_BYTES: usize = 20 << 20;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub request_timeout: Duration,
    pub auth: AuthConfig,
    pub ml: MlConfig,
    pub media: MediaConfig,
    pub audio_max_bytes: usize,
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(8080);

        let host = std::env::var("HOST")
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            host,
            port,
            log_level,
            request_timeout: Duration::from_millis(env_u64("REQUEST_TIMEOUT_MS", 10_000)),
            auth: AuthConfig::from_env(),
            ml: MlConfig::from_env(),
            media: MediaConfig::from_env(),
            audio_max_bytes: env_u64("AUDIO_MAX_BYTES", DEFAULT_AUDIO_MAX_BYTES as u64) as usize,
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    pub jwt_expires_in: String,
    pub bcrypt_cost: u32,
}

impl AuthConfig {
    fn from_env() -> Self {
        Self {
            jwt_secret: env_string("JWT_SECRET"),
            jwt_expires_in: env_string("JWT_EXPIRES_IN").unwrap_or_else(|| "24h".to_string()),
            bcrypt_cost: env_u32("BCRYPT_COST", 10).clamp(4, 31),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MlConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl MlConfig {
    fn from_env() -> Self {
        let base_url = env_string("ML_URL").unwrap_or_else(|| "http://127.0.0.1:5000".to_string());
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(env_u64("ML_TIMEOUT_MS", 10_000)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub dir: PathBuf,
    pub public_url: String,
    pub url_ttl: Duration,
    /// Key for signing media URLs. A random per-process key is used when unset.
    pub signing_secret: Option<String>,
    pub max_bytes: usize,
}

impl MediaConfig {
    fn from_env() -> Self {
        let public_url =
            env_string("MEDIA_PUBLIC_URL").unwrap_or_else(|| "http://localhost:8080".to_string());
        Self {
            dir: PathBuf::from(env_string("MEDIA_DIR").unwrap_or_else(|| "./data/media".to_string())),
            public_url: public_url.trim_end_matches('/').to_string(),
            url_ttl: Duration::from_secs(env_u64("MEDIA_URL_TTL_SECS", 24 * 60 * 60)),
            signing_secret: env_string("MEDIA_SIGNING_SECRET"),
            max_bytes: env_u64("MEDIA_MAX_BYTES", DEFAULT_MEDIA_MAX_BYTES as u64) as usize,
        }
    }
}

pub(crate) fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

pub(crate) fn env_u64(key: &str, default: u64) -> u64 {
    env_string(key)
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

pub(crate) fn env_u32(key: &str, default: u32) -> u32 {
    env_string(key)
        .and_then(|value| value.trim().parse::<u32>().ok())
        .unwrap_or(default)
}
