use std::net::IpAddr;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: IpAddr,
    pub port: u16,
    pub base_url: String,
    pub log_level: String,
    pub cleanup_interval_secs: u64,
    pub s3: S3Config,
    pub identity: IdentityConfig,
    pub rejection_queue_url: Option<String>,
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
}

#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub base_url: String,
    pub realm: String,
    pub client_id: String,
    pub admin_token: String,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;
        let jwt_secret = env_required("JWT_SECRET")?;

        let host: IpAddr = env_or("ATELIER_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid ATELIER_HOST: {e}"))?;

        let port: u16 = env_or("ATELIER_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid ATELIER_PORT: {e}"))?;

        let base_url = env_or("ATELIER_BASE_URL", &format!("http://{host}:{port}"));

        let log_level = env_or("ATELIER_LOG_LEVEL", "info");

        let cleanup_interval_secs: u64 = env_or("ATELIER_CLEANUP_INTERVAL", "60")
            .parse()
            .map_err(|e| format!("Invalid ATELIER_CLEANUP_INTERVAL: {e}"))?;

        let s3 = S3Config {
            endpoint: env_required("ATELIER_S3_URL")?,
            access_key: env_required("ATELIER_S3_ACCESS_KEY")?,
            secret_key: env_required("ATELIER_S3_SECRET_KEY")?,
            bucket: env_required("ATELIER_S3_BUCKET")?,
        };

        let identity = IdentityConfig {
            base_url: env_required("ATELIER_IDP_URL")?,
            realm: env_or("ATELIER_IDP_REALM", "atelier"),
            client_id: env_or("ATELIER_IDP_CLIENT_ID", "atelier-backend"),
            admin_token: env_required("ATELIER_IDP_ADMIN_TOKEN")?,
        };

        let rejection_queue_url = std::env::var("ATELIER_REJECTION_QUEUE_URL").ok();

        let smtp = match (
            std::env::var("ATELIER_SMTP_HOST").ok(),
            std::env::var("ATELIER_SMTP_PORT").ok(),
            std::env::var("ATELIER_SMTP_USER").ok(),
            std::env::var("ATELIER_SMTP_PASS").ok(),
            std::env::var("ATELIER_SMTP_FROM").ok(),
        ) {
            (Some(host), Some(port), Some(user), Some(pass), Some(from)) => Some(SmtpConfig {
                host,
                port: port
                    .parse()
                    .map_err(|e| format!("Invalid ATELIER_SMTP_PORT: {e}"))?,
                user,
                pass,
                from,
            }),
            _ => None,
        };

        Ok(Config {
            database_url,
            jwt_secret,
            host,
            port,
            base_url,
            log_level,
            cleanup_interval_secs,
            s3,
            identity,
            rejection_queue_url,
            smtp,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
