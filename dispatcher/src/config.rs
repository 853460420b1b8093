use extractor::config::Config as ExtractorConfig;
use notification_sink::config::Config as NotificationSinkConfig;
use serde::Deserialize;
use std::fs::File;

#[derive(Deserialize, Debug)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

#[derive(Deserialize, Debug)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_level")]
    pub level: String,
    pub sentry_dsn: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_level(),
            sentry_dsn: None,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct CommonConfig {
    pub metrics: Option<MetricsConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Deserialize, Debug)]
pub struct Config {
    #[serde(flatten)]
    pub common: CommonConfig,
    pub extractor: Option<ExtractorConfig>,
    pub notification_sink: Option<NotificationSinkConfig>,
}

impl Config {
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let data = serde_yaml::from_reader(file)?;

        Ok(data)
    }
}

fn default_prefix() -> String {
    "extractor".into()
}

fn default_level() -> String {
    "info".into()
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use extractor::config::{ArchiveBackend, QueueBackend};
    use std::io::Write;

    fn write_tmp_file(s: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(tmp, "{}", s).expect("write yaml");

        tmp
    }

    #[test]
    fn extractor_config() {
        let yaml = r#"
            logging:
                level: debug
                sentry_dsn: "https://public@sentry.example.com/1"
            metrics:
                statsd_host: 127.0.0.1
                statsd_port: 8125
            extractor:
                listener:
                    host: 0.0.0.0
                    port: 8080
                admin_listener:
                    host: 127.0.0.1
                    port: 8081
                queue:
                    type: azure
                    connection_string: "UseDevelopmentStorage=true"
                archive:
                    type: filesystem
                    base_dir: /var/lib/extractor
                notification:
                    url: http://localhost:7071/api/notifications
                    download_location: https://files.example.com/outbound
            "#;
        let tmp = write_tmp_file(yaml);
        let config = Config::from_file(tmp.path()).expect("load config");

        assert_eq!(config.common.logging.level, "debug");
        let metrics = config.common.metrics.expect("metrics config");
        assert_eq!(metrics.statsd_port, 8125);
        assert_eq!(metrics.prefix, "extractor");
        assert!(config.notification_sink.is_none());

        let extractor = config.extractor.expect("extractor config");
        assert_eq!(
            extractor.queue.backend,
            QueueBackend::Azure {
                connection_string: "UseDevelopmentStorage=true".into()
            }
        );
        assert_eq!(extractor.queue.page_size, 32);
        assert_eq!(
            extractor.archive.backend,
            ArchiveBackend::Filesystem {
                base_dir: "/var/lib/extractor".into()
            }
        );
        assert!(extractor.validate().is_ok());
    }

    #[test]
    fn notification_sink_config() {
        let yaml = r#"
            notification_sink:
                listener:
                    host: 0.0.0.0
                    port: 7071
                admin_listener:
                    host: 127.0.0.1
                    port: 7072
            "#;
        let tmp = write_tmp_file(yaml);
        let config = Config::from_file(tmp.path()).expect("load config");

        assert_eq!(config.common.logging.level, "info");
        assert!(config.common.logging.sentry_dsn.is_none());
        assert!(config.common.metrics.is_none());
        let sink = config.notification_sink.expect("notification sink config");
        assert_eq!(sink.listener.port, 7071);
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            Config::from_file(std::path::Path::new("/nonexistent/config.yaml")),
            Err(ConfigError::LoadError(_))
        ));
    }
}
