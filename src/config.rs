use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    /// Publishable key id for the payment gateway.
    pub gateway_key_id: String,
    /// Shared secret used for gateway auth and callback signatures.
    pub gateway_key_secret: String,
    pub gateway_currency: String,
    /// When set, gateway orders are fabricated locally instead of calling out.
    pub gateway_sandbox: bool,
    /// Echo OTP codes in API responses (development only).
    pub expose_dev_otp: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let jwt_secret = env::var("JWT_SECRET")?;
        let gateway_key_id =
            env::var("GATEWAY_KEY_ID").unwrap_or_else(|_| "rzp_test_sandbox".to_string());
        let gateway_key_secret =
            env::var("GATEWAY_KEY_SECRET").unwrap_or_else(|_| "sandbox_secret".to_string());
        let gateway_currency = env::var("GATEWAY_CURRENCY").unwrap_or_else(|_| "INR".to_string());
        let gateway_sandbox = env_flag("GATEWAY_SANDBOX", true);
        let expose_dev_otp = env_flag("EXPOSE_DEV_OTP", false);

        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            gateway_key_id,
            gateway_key_secret,
            gateway_currency,
            gateway_sandbox,
            expose_dev_otp,
        })
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}
