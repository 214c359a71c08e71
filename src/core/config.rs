mod parsing;
mod secret;
mod settings;
mod types;

pub(crate) use types::{
    ApiSettings, AttemptSettings, CertificateSettings, CorsSettings, DatabaseSettings,
    RedisSettings, RuntimeSettings, SecuritySettings, Settings, TelemetrySettings,
};

impl Settings {
    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn attempts(&self) -> &AttemptSettings {
        &self.attempts
    }

    pub(crate) fn certificates(&self) -> &CertificateSettings {
        &self.certificates
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }
}

#[cfg(test)]
mod tests {
    use super::types::{ConfigError, Environment};
    use super::*;
    use crate::test_support;

    #[tokio::test]
    async fn load_uses_attempt_defaults() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::remove_var("ATTEMPT_DURATION_SECONDS");
        std::env::remove_var("EXPIRY_SWEEP_BATCH_SIZE");

        let settings = Settings::load().expect("settings");

        assert_eq!(settings.attempts().duration_seconds, 50);
        assert_eq!(settings.attempts().duration(), time::Duration::seconds(50));
        assert_eq!(settings.attempts().expiry_sweep_batch_size, 200);
        assert_eq!(settings.runtime().environment, Environment::Test);
    }

    #[tokio::test]
    async fn load_rejects_zero_attempt_duration() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("ATTEMPT_DURATION_SECONDS", "0");

        let result = Settings::load();
        std::env::remove_var("ATTEMPT_DURATION_SECONDS");

        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { field: "ATTEMPT_DURATION_SECONDS", .. })
        ));
    }

    #[tokio::test]
    async fn strict_mode_requires_database_password() {
        let _guard = test_support::env_lock().await;
        test_support::set_test_env();
        std::env::set_var("COURSECERT_STRICT_CONFIG", "1");
        std::env::remove_var("DATABASE_URL");
        std::env::remove_var("POSTGRES_PASSWORD");

        let result = Settings::load();
        test_support::set_test_env();

        assert!(matches!(result, Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"))));
    }
}
