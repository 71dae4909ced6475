pub mod config;

pub use config::{AppConfig, ConfigError, Environment};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://employees.db";

/// Loads environment variables from `.env` when available.
///
/// Missing files are ignored so the function is safe in production builds
/// where dotenv files are not deployed.
pub fn load_env_file() {
    let _ = dotenvy::dotenv();
}

/// Normalizes a `DATABASE_URL` value.
///
/// Unset or blank values fall back to [`DEFAULT_DATABASE_URL`]. Only SQLite
/// connection strings are accepted.
pub fn resolve_database_url(value: Option<&str>) -> Result<String, ConfigError> {
    let value = value.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Ok(DEFAULT_DATABASE_URL.to_string());
    }
    if !value.starts_with("sqlite:") {
        return Err(ConfigError::DatabaseUrl(value.to_string()));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_blank_url_uses_default() {
        assert_eq!(
            resolve_database_url(None).expect("default"),
            DEFAULT_DATABASE_URL
        );
        assert_eq!(
            resolve_database_url(Some("   ")).expect("default"),
            DEFAULT_DATABASE_URL
        );
    }

    #[test]
    fn custom_sqlite_url_is_trimmed() {
        let url = resolve_database_url(Some(" sqlite:///var/lib/staff/staff.db\n"))
            .expect("custom url should be accepted");
        assert_eq!(url, "sqlite:///var/lib/staff/staff.db");
    }

    #[test]
    fn rejects_non_sqlite_url() {
        let err = resolve_database_url(Some("postgres://localhost/staff"))
            .expect_err("postgres is not supported");
        assert!(matches!(err, ConfigError::DatabaseUrl(value) if value.starts_with("postgres")));
    }
}
