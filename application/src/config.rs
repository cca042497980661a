//! [`Config`]-related definitions.

use std::time;

use common::Percent;
use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use derive_more::{Display, Error};
use rust_decimal::Decimal;
use serde::Deserialize;
use smart_default::SmartDefault;

/// Application configuration.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    /// Service configuration.
    pub service: Service,

    /// Postgres configuration.
    pub postgres: Postgres,

    /// Log configuration.
    pub log: Log,
}

impl Config {
    /// Creates a new [`Config`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CONF").separator("."))
            .build()?
            .try_deserialize()
    }
}

/// Service configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Service {
    /// Commission of the platform taken from line item wagers, in percents.
    #[default(Decimal::TEN)]
    pub fee_percent: Decimal,

    /// Time before a line item starts when applications to it are closed.
    #[default(time::Duration::from_secs(2 * 60 * 60))]
    #[serde(with = "humantime_serde")]
    pub reply_deadline: time::Duration,
}

impl TryFrom<Service> for service::Config {
    type Error = InvalidFeePercent;

    fn try_from(value: Service) -> Result<Self, Self::Error> {
        let Service {
            fee_percent,
            reply_deadline,
        } = value;
        Ok(Self {
            fee: Percent::new(fee_percent).ok_or(InvalidFeePercent(fee_percent))?,
            reply_deadline,
        })
    }
}

/// Error of a commission being out of the `0..=100` range.
#[derive(Clone, Copy, Debug, Display, Error)]
#[display("`{_0}` is not a valid fee percent")]
pub struct InvalidFeePercent(#[error(not(source))] pub Decimal);

/// Postgres configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Postgres {
    /// Host to connect to.
    #[default("127.0.0.1".to_owned())]
    pub host: String,

    /// Port to connect to.
    #[default(5432)]
    pub port: u16,

    /// User to connect as.
    #[default("postgres".to_owned())]
    pub user: String,

    /// Password to connect with.
    #[default("postgres".to_owned())]
    pub password: String,

    /// Database name to connect to.
    #[default("postgres".to_owned())]
    pub dbname: String,
}

impl From<Postgres> for service::infra::postgres::Config {
    fn from(value: Postgres) -> Self {
        let Postgres {
            host,
            port,
            user,
            password,
            dbname,
        } = value;

        Self {
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password),
            dbname: Some(dbname),
            ..Self::default()
        }
    }
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    #[default]
    Info,

    /// Designates hazardous situations.
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use config::{Config as Source, File, FileFormat};
    use rust_decimal::Decimal;

    use super::{Config, Service};

    fn parse(toml: &str) -> Config {
        Source::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn uses_defaults() {
        let conf = parse("");

        assert_eq!(conf.service.fee_percent, Decimal::TEN);
        assert_eq!(conf.service.reply_deadline, Duration::from_secs(7200));
        assert_eq!(conf.postgres.port, 5432);
        assert!(matches!(conf.log.level, super::LogLevel::Info));
    }

    #[test]
    fn parses_service_section() {
        let conf = parse(
            r#"
            [service]
            fee_percent = 15
            reply_deadline = "30m"

            [log]
            level = "DEBUG"
            "#,
        );

        assert_eq!(conf.service.fee_percent, Decimal::from(15));
        assert_eq!(conf.service.reply_deadline, Duration::from_secs(30 * 60));
        assert!(matches!(conf.log.level, super::LogLevel::Debug));

        let service = service::Config::try_from(conf.service).unwrap();
        assert_eq!(service.pay(Decimal::from(100)), Decimal::from(85));
    }

    #[test]
    fn rejects_invalid_fee() {
        let invalid = Service {
            fee_percent: Decimal::from(150),
            ..Service::default()
        };

        assert!(service::Config::try_from(invalid).is_err());
    }
}
