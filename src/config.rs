use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Single operator account, checked outside the users table.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectionConfig {
    /// Run a detection pass after every accepted prediction.
    pub background_enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub admin: AdminConfig,
    pub detection: DetectionConfig,
    pub signup_ip_daily_limit: i64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "pitchside".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "pitchside-players".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
            refresh_ttl_minutes: std::env::var("JWT_REFRESH_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 14),
        };
        let admin = AdminConfig {
            email: std::env::var("ADMIN_EMAIL")?.trim().to_lowercase(),
            password_hash: std::env::var("ADMIN_PASSWORD_HASH")?,
        };
        let detection = DetectionConfig {
            background_enabled: std::env::var("BACKGROUND_DETECTION")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),
        };
        let signup_ip_daily_limit = std::env::var("SIGNUP_IP_DAILY_LIMIT")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(3);
        Ok(Self {
            database_url,
            jwt,
            admin,
            detection,
            signup_ip_daily_limit,
        })
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}
