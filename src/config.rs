use std::env;

/// Process configuration read from the environment (after `.env` is loaded)
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub mongo_uri: String,
    pub frontend_url: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mongo_uri = get("MONGO_URI").ok_or_else(|| "MONGO_URI must be set".to_string())?;

        let port = match get("PORT") {
            Some(p) => p.parse::<u16>().map_err(|_| format!("Invalid PORT: {}", p))?,
            None => 5000,
        };

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            mongo_uri,
            frontend_url: get("FRONTEND_URL").unwrap_or_else(|| "http://localhost:3000".to_string()),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
