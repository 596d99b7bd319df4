use crate::services::{
    call_policy::RetryPolicy, object_lister::MAX_KEYS_LIMIT, s3_backend::S3Settings,
    storage_service::ServiceSettings, url_signer::MAX_PRESIGN_SECS,
};
use anyhow::{Context, Result, bail};
use clap::Parser;
use std::{env, fmt, str::FromStr, time::Duration};

/// Centralized application configuration.
/// Combines `.env`, environment variables and CLI arguments (highest wins).
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub region: String,
    pub bucket: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub endpoint: Option<String>,
    pub force_path_style: bool,
    pub signed_url_ttl_secs: u64,
    pub clock_skew_secs: u64,
    pub default_max_keys: usize,
    pub signing_concurrency: usize,
    pub backend_timeout_secs: u64,
    pub max_upload_bytes: u64,
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
}

/// Command-line configuration. Every flag overrides its environment variable.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "HTTP gateway for S3-compatible object storage")]
pub struct Args {
    /// Host to bind to (overrides HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Bucket holding all objects (overrides AWS_BUCKET_NAME)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Bucket region (overrides AWS_REGION)
    #[arg(long)]
    pub region: Option<String>,

    /// Custom endpoint for S3-compatible services (overrides S3_ENDPOINT)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Signed URL lifetime in seconds (overrides SIGNED_URL_TTL_SECS)
    #[arg(long)]
    pub signed_url_ttl_secs: Option<u64>,

    /// Per-call backend timeout in seconds (overrides BACKEND_TIMEOUT_SECS)
    #[arg(long)]
    pub backend_timeout_secs: Option<u64>,

    /// Upload size limit in bytes (overrides MAX_UPLOAD_BYTES)
    #[arg(long)]
    pub max_upload_bytes: Option<u64>,
}

impl AppConfig {
    /// Load `.env` if present, then parse CLI args and the process environment.
    pub fn from_env_and_args() -> Result<Self> {
        match dotenvy::dotenv() {
            Err(err) if !err.not_found() => return Err(err).context("loading .env"),
            _ => {}
        }

        let args = Args::parse();
        let cfg = Self::from_sources(args, |name| env::var(name).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Merge `args` over the variables returned by `lookup`.
    pub fn from_sources(args: Args, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let cfg = Self {
            host: args
                .host
                .or_else(|| lookup("HOST"))
                .unwrap_or_else(|| "0.0.0.0".into()),
            port: pick(args.port, &lookup, "PORT", 3000)?,
            region: args
                .region
                .or_else(|| lookup("AWS_REGION"))
                .unwrap_or_else(|| "us-east-1".into()),
            bucket: args
                .bucket
                .or_else(|| lookup("AWS_BUCKET_NAME"))
                .unwrap_or_default(),
            access_key_id: lookup("AWS_ACCESS_KEY_ID"),
            secret_access_key: lookup("AWS_SECRET_ACCESS_KEY"),
            endpoint: args.endpoint.or_else(|| lookup("S3_ENDPOINT")),
            force_path_style: pick(None, &lookup, "S3_FORCE_PATH_STYLE", false)?,
            signed_url_ttl_secs: pick(
                args.signed_url_ttl_secs,
                &lookup,
                "SIGNED_URL_TTL_SECS",
                3600,
            )?,
            clock_skew_secs: pick(None, &lookup, "SIGNED_URL_CLOCK_SKEW_SECS", 30)?,
            default_max_keys: pick(None, &lookup, "LIST_DEFAULT_MAX_KEYS", 100)?,
            signing_concurrency: pick(None, &lookup, "SIGNING_CONCURRENCY", 16)?,
            backend_timeout_secs: pick(
                args.backend_timeout_secs,
                &lookup,
                "BACKEND_TIMEOUT_SECS",
                10,
            )?,
            max_upload_bytes: pick(
                args.max_upload_bytes,
                &lookup,
                "MAX_UPLOAD_BYTES",
                50 * 1024 * 1024,
            )?,
            retry_max_attempts: pick(None, &lookup, "RETRY_MAX_ATTEMPTS", 1)?,
            retry_base_delay_ms: pick(None, &lookup, "RETRY_BASE_DELAY_MS", 100)?,
            retry_max_delay_ms: pick(None, &lookup, "RETRY_MAX_DELAY_MS", 5000)?,
        };

        Ok(cfg)
    }

    /// Reject settings the gateway cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.bucket.trim().is_empty() {
            bail!("AWS_BUCKET_NAME must be set");
        }
        if self.access_key_id.is_some() != self.secret_access_key.is_some() {
            bail!("AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY must be set together");
        }
        if self.signed_url_ttl_secs == 0 {
            bail!("SIGNED_URL_TTL_SECS must be positive");
        }
        if self.signed_url_ttl_secs.saturating_add(self.clock_skew_secs) > MAX_PRESIGN_SECS {
            bail!(
                "SIGNED_URL_TTL_SECS plus SIGNED_URL_CLOCK_SKEW_SECS must not exceed {} seconds",
                MAX_PRESIGN_SECS
            );
        }
        if self.backend_timeout_secs == 0 {
            bail!("BACKEND_TIMEOUT_SECS must be positive");
        }
        if self.signing_concurrency == 0 {
            bail!("SIGNING_CONCURRENCY must be positive");
        }
        if self.default_max_keys == 0 || self.default_max_keys > MAX_KEYS_LIMIT {
            bail!("LIST_DEFAULT_MAX_KEYS must be between 1 and {}", MAX_KEYS_LIMIT);
        }
        if self.max_upload_bytes == 0 {
            bail!("MAX_UPLOAD_BYTES must be positive");
        }
        if self.retry_max_attempts == 0 {
            bail!("RETRY_MAX_ATTEMPTS must be at least 1");
        }
        Ok(())
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn s3_settings(&self) -> S3Settings {
        S3Settings {
            bucket: self.bucket.clone(),
            region: self.region.clone(),
            endpoint: self.endpoint.clone(),
            force_path_style: self.force_path_style,
            access_key_id: self.access_key_id.clone(),
            secret_access_key: self.secret_access_key.clone(),
        }
    }

    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            signed_url_ttl: Duration::from_secs(self.signed_url_ttl_secs),
            clock_skew: Duration::from_secs(self.clock_skew_secs),
            default_max_keys: self.default_max_keys,
            signing_concurrency: self.signing_concurrency,
            max_upload_bytes: self.max_upload_bytes,
            backend_timeout: Duration::from_secs(self.backend_timeout_secs),
            retry: RetryPolicy {
                max_attempts: self.retry_max_attempts,
                base_delay: Duration::from_millis(self.retry_base_delay_ms),
                max_delay: Duration::from_millis(self.retry_max_delay_ms),
            },
        }
    }

    /// Body limit for the upload route: the object limit plus room for
    /// multipart framing, so oversize files still reach the size check.
    pub fn upload_body_limit(&self) -> usize {
        usize::try_from(self.max_upload_bytes.saturating_add(64 * 1024)).unwrap_or(usize::MAX)
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field("endpoint", &self.endpoint)
            .field("force_path_style", &self.force_path_style)
            .field("signed_url_ttl_secs", &self.signed_url_ttl_secs)
            .field("clock_skew_secs", &self.clock_skew_secs)
            .field("default_max_keys", &self.default_max_keys)
            .field("signing_concurrency", &self.signing_concurrency)
            .field("backend_timeout_secs", &self.backend_timeout_secs)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("retry_max_attempts", &self.retry_max_attempts)
            .finish_non_exhaustive()
    }
}

/// CLI value if given, else the parsed environment value, else `default`.
fn pick<T>(
    cli: Option<T>,
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    if let Some(value) = cli {
        return Ok(value);
    }
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        None => Ok(default),
    }
}
