use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Server settings, read once from `SOIREE_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub password: String,
    pub max_connections: usize,
    /// WAL appends before the compactor rewrites the log.
    pub compact_threshold: u64,
    /// Period of the background reconciliation pass; `None` disables it.
    pub reconcile_interval: Option<Duration>,
    pub metrics_port: Option<u16>,
    pub tls: Option<TlsPaths>,
    pub log: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: cannot parse {value:?}")]
    Invalid { var: &'static str, value: String },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("both SOIREE_TLS_CERT and SOIREE_TLS_KEY must be set, or neither")]
    TlsPair,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 5433,
            data_dir: PathBuf::from("./data"),
            password: "soiree".into(),
            max_connections: 256,
            compact_threshold: 1000,
            reconcile_interval: Some(Duration::from_secs(60)),
            metrics_port: None,
            tls: None,
            log: "info".into(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source; unset variables keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let max_connections = parse_or(&get, "SOIREE_MAX_CONNECTIONS", defaults.max_connections)?;
        if max_connections == 0 {
            return Err(ConfigError::Zero("SOIREE_MAX_CONNECTIONS"));
        }
        let compact_threshold = parse_or(&get, "SOIREE_COMPACT_THRESHOLD", defaults.compact_threshold)?;
        if compact_threshold == 0 {
            return Err(ConfigError::Zero("SOIREE_COMPACT_THRESHOLD"));
        }

        // 0 turns the reconciler off.
        let reconcile_interval = match parse::<u64>(&get, "SOIREE_RECONCILE_SECS")? {
            None => defaults.reconcile_interval,
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
        };

        let tls = match (get("SOIREE_TLS_CERT"), get("SOIREE_TLS_KEY")) {
            (None, None) => None,
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            _ => return Err(ConfigError::TlsPair),
        };

        Ok(Self {
            bind: get("SOIREE_BIND").unwrap_or(defaults.bind),
            port: parse_or(&get, "SOIREE_PORT", defaults.port)?,
            data_dir: get("SOIREE_DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            password: get("SOIREE_PASSWORD").unwrap_or(defaults.password),
            max_connections,
            compact_threshold,
            reconcile_interval,
            metrics_port: parse(&get, "SOIREE_METRICS_PORT")?,
            tls,
            log: get("SOIREE_LOG").unwrap_or(defaults.log),
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

fn parse<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    get(var)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { var, value })
        })
        .transpose()
}

fn parse_or<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    Ok(parse(get, var)?.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.listen_addr(), "0.0.0.0:5433");
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = config(&[
            ("SOIREE_PORT", "6543"),
            ("SOIREE_DATA_DIR", "/var/lib/soiree"),
            ("SOIREE_MAX_CONNECTIONS", "8"),
            ("SOIREE_RECONCILE_SECS", "30"),
            ("SOIREE_METRICS_PORT", "9100"),
            ("SOIREE_LOG", "soiree=debug"),
        ])
        .unwrap();
        assert_eq!(cfg.port, 6543);
        assert_eq!(cfg.data_dir, PathBuf::from("/var/lib/soiree"));
        assert_eq!(cfg.max_connections, 8);
        assert_eq!(cfg.reconcile_interval, Some(Duration::from_secs(30)));
        assert_eq!(cfg.metrics_port, Some(9100));
        assert_eq!(cfg.log, "soiree=debug");
    }

    #[test]
    fn zero_reconcile_disables_it() {
        let cfg = config(&[("SOIREE_RECONCILE_SECS", "0")]).unwrap();
        assert_eq!(cfg.reconcile_interval, None);
    }

    #[test]
    fn invalid_values_are_errors() {
        assert_eq!(
            config(&[("SOIREE_PORT", "http")]),
            Err(ConfigError::Invalid {
                var: "SOIREE_PORT",
                value: "http".into()
            })
        );
        assert_eq!(
            config(&[("SOIREE_MAX_CONNECTIONS", "0")]),
            Err(ConfigError::Zero("SOIREE_MAX_CONNECTIONS"))
        );
    }

    #[test]
    fn tls_needs_both_paths() {
        assert_eq!(config(&[("SOIREE_TLS_CERT", "cert.pem")]), Err(ConfigError::TlsPair));
        let cfg = config(&[("SOIREE_TLS_CERT", "cert.pem"), ("SOIREE_TLS_KEY", "key.pem")]).unwrap();
        assert_eq!(
            cfg.tls,
            Some(TlsPaths {
                cert: "cert.pem".into(),
                key: "key.pem".into()
            })
        );
    }
}
