//! Configuración del host desde variables de entorno.
//!
//! `.env` se carga una sola vez y de forma perezosa. Los valores ausentes
//! toman su default; los malformados son `ConfigError`, nunca un panic.

use std::env;
use std::time::Duration;

use dotenvy::dotenv;
use once_cell::sync::Lazy;
use reco_core::{EngineSettings, SchemaPolicy};
use thiserror::Error;

use crate::runner::WaitPolicy;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

pub const ENV_ROLE_ARN: &str = "RECOFLOW_ROLE_ARN";
pub const ENV_POLL_SECONDS: &str = "RECOFLOW_POLL_SECONDS";
pub const ENV_TEARDOWN_POLL_SECONDS: &str = "RECOFLOW_TEARDOWN_POLL_SECONDS";
pub const ENV_BACKOFF: &str = "RECOFLOW_BACKOFF";
pub const ENV_MAX_WAIT_SECONDS: &str = "RECOFLOW_MAX_WAIT_SECONDS";
pub const ENV_MAX_POLLS: &str = "RECOFLOW_MAX_POLLS";
pub const ENV_SCHEMA_POLICY: &str = "RECOFLOW_SCHEMA_POLICY";
pub const ENV_MIN_TPS: &str = "RECOFLOW_MIN_TPS";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("valor inválido para {key}: `{value}` ({reason})")]
    Invalid { key: String, value: String, reason: String },
}

impl ConfigError {
    fn invalid(key: &str, value: &str, reason: &str) -> Self {
        ConfigError::Invalid { key: key.to_string(),
                               value: value.to_string(),
                               reason: reason.to_string() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed,
    Exponential,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub role_arn: String,
    pub poll_interval: Duration,
    pub teardown_poll_interval: Duration,
    pub backoff: Backoff,
    pub max_wait: Duration,
    pub max_polls: u32,
    pub schema_policy: SchemaPolicy,
    pub min_provisioned_tps: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { role_arn: String::new(),
               poll_interval: Duration::from_secs(60),
               teardown_poll_interval: Duration::from_secs(30),
               backoff: Backoff::Fixed,
               max_wait: Duration::from_secs(600),
               max_polls: 1440,
               schema_policy: SchemaPolicy::Retain,
               min_provisioned_tps: 1 }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        // asegura que .env se haya cargado
        Lazy::force(&DOTENV_LOADED);
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Igual que `from_env` pero con una fuente arbitraria (tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
        where F: Fn(&str) -> Option<String>
    {
        let d = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let backoff = match get(ENV_BACKOFF) {
            None => d.backoff,
            Some(v) => match v.to_ascii_lowercase().as_str() {
                "fixed" => Backoff::Fixed,
                "exponential" => Backoff::Exponential,
                _ => return Err(ConfigError::invalid(ENV_BACKOFF, &v, "esperado fixed | exponential")),
            },
        };
        let schema_policy = match get(ENV_SCHEMA_POLICY) {
            None => d.schema_policy,
            Some(v) => SchemaPolicy::parse(&v).ok_or_else(|| ConfigError::invalid(ENV_SCHEMA_POLICY, &v, "esperado retain | delete"))?,
        };

        Ok(Self { role_arn: get(ENV_ROLE_ARN).unwrap_or(d.role_arn),
                  poll_interval: seconds(get(ENV_POLL_SECONDS), ENV_POLL_SECONDS, d.poll_interval)?,
                  teardown_poll_interval: seconds(get(ENV_TEARDOWN_POLL_SECONDS), ENV_TEARDOWN_POLL_SECONDS, d.teardown_poll_interval)?,
                  backoff,
                  max_wait: seconds(get(ENV_MAX_WAIT_SECONDS), ENV_MAX_WAIT_SECONDS, d.max_wait)?,
                  max_polls: number(get(ENV_MAX_POLLS), ENV_MAX_POLLS, d.max_polls)?,
                  schema_policy,
                  min_provisioned_tps: number(get(ENV_MIN_TPS), ENV_MIN_TPS, d.min_provisioned_tps)? })
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings { role_arn: self.role_arn.clone(),
                         min_provisioned_tps: self.min_provisioned_tps,
                         schema_policy: self.schema_policy }
    }

    pub fn provision_wait(&self) -> WaitPolicy {
        self.wait_from(self.poll_interval)
    }

    pub fn teardown_wait(&self) -> WaitPolicy {
        self.wait_from(self.teardown_poll_interval)
    }

    fn wait_from(&self, interval: Duration) -> WaitPolicy {
        match self.backoff {
            Backoff::Fixed => WaitPolicy::Fixed(interval),
            Backoff::Exponential => WaitPolicy::Exponential { initial: interval,
                                                              max: self.max_wait.max(interval) },
        }
    }
}

fn number<T: std::str::FromStr>(raw: Option<String>, key: &str, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(v) => v.parse().map_err(|_| ConfigError::invalid(key, &v, "no es un entero no negativo")),
    }
}

fn seconds(raw: Option<String>, key: &str, default: Duration) -> Result<Duration, ConfigError> {
    number(raw, key, default.as_secs()).map(Duration::from_secs)
}

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let cfg = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.provision_wait(), WaitPolicy::Fixed(Duration::from_secs(60)));
        assert_eq!(cfg.teardown_wait(), WaitPolicy::Fixed(Duration::from_secs(30)));
    }

    #[test]
    fn reads_every_key() {
        let cfg = AppConfig::from_lookup(lookup(&[(ENV_ROLE_ARN, "arn:aws:iam::1:role/r"),
                                                  (ENV_POLL_SECONDS, "5"),
                                                  (ENV_TEARDOWN_POLL_SECONDS, "2"),
                                                  (ENV_BACKOFF, "Exponential"),
                                                  (ENV_MAX_WAIT_SECONDS, "40"),
                                                  (ENV_MAX_POLLS, "10"),
                                                  (ENV_SCHEMA_POLICY, "delete"),
                                                  (ENV_MIN_TPS, "3")])).unwrap();
        assert_eq!(cfg.role_arn, "arn:aws:iam::1:role/r");
        assert_eq!(cfg.max_polls, 10);
        assert_eq!(cfg.schema_policy, SchemaPolicy::Delete);
        assert_eq!(cfg.provision_wait(),
                   WaitPolicy::Exponential { initial: Duration::from_secs(5),
                                             max: Duration::from_secs(40) });
        let settings = cfg.engine_settings();
        assert_eq!(settings.min_provisioned_tps, 3);
        assert_eq!(settings.role_arn, "arn:aws:iam::1:role/r");
    }

    #[test]
    fn malformed_values_are_errors() {
        let err = AppConfig::from_lookup(lookup(&[(ENV_POLL_SECONDS, "soon")])).unwrap_err();
        assert!(err.to_string().contains(ENV_POLL_SECONDS));
        assert!(AppConfig::from_lookup(lookup(&[(ENV_BACKOFF, "random")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[(ENV_SCHEMA_POLICY, "purge")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[(ENV_MAX_POLLS, "-1")])).is_err());
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let cfg = AppConfig::from_lookup(lookup(&[(ENV_MIN_TPS, "  ")])).unwrap();
        assert_eq!(cfg.min_provisioned_tps, 1);
    }
}
