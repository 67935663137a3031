use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    #[serde(default = "default_access_token_ttl_secs")]
    pub access_token_ttl_secs: i64,
    #[serde(default = "default_refresh_token_ttl_secs")]
    pub refresh_token_ttl_secs: i64,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_media_root")]
    pub media_root: String,
    #[serde(default = "default_media_base_url")]
    pub media_base_url: String,
}

fn default_access_token_ttl_secs() -> i64 {
    60 * 60 // 1 hour
}

fn default_refresh_token_ttl_secs() -> i64 {
    30 * 24 * 60 * 60 // 30 days
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_media_root() -> String {
    "media".to_string()
}

fn default_media_base_url() -> String {
    "http://127.0.0.1:8080/media".to_string()
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_knobs_have_defaults() {
        let config: Config = envy::from_iter([
            (
                "DATABASE_URL".to_string(),
                "postgres://localhost/vidstream".to_string(),
            ),
            ("ACCESS_TOKEN_SECRET".to_string(), "access-secret".to_string()),
            ("REFRESH_TOKEN_SECRET".to_string(), "refresh-secret".to_string()),
        ])
        .unwrap();
        assert_eq!(config.access_token_ttl_secs, 3600);
        assert_eq!(config.refresh_token_ttl_secs, 30 * 24 * 3600);
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.media_root, "media");
    }

    #[test]
    fn missing_required_field_is_an_error() {
        let result: Result<Config, _> = envy::from_iter([(
            "DATABASE_URL".to_string(),
            "postgres://localhost/vidstream".to_string(),
        )]);
        assert!(result.is_err());
    }
}
