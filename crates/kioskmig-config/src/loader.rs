use std::env;

use kioskmig_common::{Error, Result};
use tracing::debug;

use crate::model::{DbConfig, TlsMode};

pub const ENV_HOST: &str = "KIOSKMIG_DB_HOST";
pub const ENV_USER: &str = "KIOSKMIG_DB_USER";
pub const ENV_PASSWORD: &str = "KIOSKMIG_DB_PASSWORD";
pub const ENV_DATABASE: &str = "KIOSKMIG_DB_NAME";
pub const ENV_PORT: &str = "KIOSKMIG_DB_PORT";
pub const ENV_TLS_MODE: &str = "KIOSKMIG_DB_TLS_MODE";

/// Build a [`DbConfig`] from the process environment, falling back to the
/// documented defaults for unset variables. A malformed value is a
/// configuration error naming the offending variable, never a silent
/// fallback.
pub fn from_env() -> Result<DbConfig> {
    let cfg = from_lookup(|key| env::var(key).ok())?;
    debug!("loaded config from environment: {cfg:?}");
    Ok(cfg)
}

fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<DbConfig> {
    let defaults = DbConfig::default();

    let port = match get(ENV_PORT) {
        Some(raw) => raw.parse::<u16>().map_err(|e| {
            Error::Config(format!("{ENV_PORT}: invalid port `{raw}`: {e}"))
        })?,
        None => defaults.port,
    };

    let tls_mode = match get(ENV_TLS_MODE) {
        Some(raw) => raw
            .parse::<TlsMode>()
            .map_err(|e| Error::Config(format!("{ENV_TLS_MODE}: {e}")))?,
        None => defaults.tls_mode,
    };

    Ok(DbConfig {
        host: get(ENV_HOST).unwrap_or(defaults.host),
        user: get(ENV_USER).unwrap_or(defaults.user),
        password: get(ENV_PASSWORD).unwrap_or(defaults.password),
        database: get(ENV_DATABASE).unwrap_or(defaults.database),
        port,
        tls_mode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_pairs(vars: &[(&str, &str)]) -> Result<DbConfig> {
        from_lookup(|key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        })
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let cfg = from_pairs(&[]).unwrap();
        assert_eq!(cfg, DbConfig::default());
    }

    #[test]
    fn set_variables_override_defaults() {
        let cfg = from_pairs(&[
            (ENV_HOST, "db.ngo.example"),
            (ENV_DATABASE, "/var/lib/kiosk/registrations.db"),
            (ENV_PORT, "5432"),
            (ENV_TLS_MODE, "require"),
        ])
        .unwrap();

        assert_eq!(cfg.host, "db.ngo.example");
        assert_eq!(cfg.database, "/var/lib/kiosk/registrations.db");
        assert_eq!(cfg.port, 5432);
        assert_eq!(cfg.tls_mode, TlsMode::Require);
        // Untouched options keep their defaults.
        assert_eq!(cfg.user, "kiosk");
    }

    #[test]
    fn malformed_port_is_a_config_error() {
        let err = from_pairs(&[(ENV_PORT, "not-a-port")]).unwrap_err();
        let msg = err.to_string();
        assert!(
            msg.contains(ENV_PORT),
            "message should name the variable: {msg}"
        );
    }

    #[test]
    fn unknown_tls_mode_is_a_config_error() {
        let err = from_pairs(&[(ENV_TLS_MODE, "mutual")]).unwrap_err();
        assert!(err.to_string().contains(ENV_TLS_MODE));
    }
}
