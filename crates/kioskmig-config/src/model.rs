use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Connection settings for the kiosk database.
///
/// Recognized options, their environment variables, and defaults:
///
/// | option   | variable               | default     |
/// |----------|------------------------|-------------|
/// | host     | `KIOSKMIG_DB_HOST`     | `localhost` |
/// | user     | `KIOSKMIG_DB_USER`     | `kiosk`     |
/// | password | `KIOSKMIG_DB_PASSWORD` | empty       |
/// | database | `KIOSKMIG_DB_NAME`     | `kiosk.db`  |
/// | port     | `KIOSKMIG_DB_PORT`     | `3306`      |
/// | tls_mode | `KIOSKMIG_DB_TLS_MODE` | `disable`   |
///
/// The embedded store consumes `database` as a file path. The remaining
/// options carry over from the retired networked deployment; they are
/// recognized and validated but have no effect on the embedded store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbConfig {
    pub host: String,
    pub user: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub database: String,
    pub port: u16,
    pub tls_mode: TlsMode,
}

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_USER: &str = "kiosk";
pub const DEFAULT_DATABASE: &str = "kiosk.db";
pub const DEFAULT_PORT: u16 = 3306;

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            user: DEFAULT_USER.to_string(),
            password: String::new(),
            database: DEFAULT_DATABASE.to_string(),
            port: DEFAULT_PORT,
            tls_mode: TlsMode::Disable,
        }
    }
}

impl DbConfig {
    /// Names of networked-only options set away from their defaults.
    /// The connector warns about these once; the embedded store ignores
    /// them.
    pub fn networked_overrides(&self) -> Vec<&'static str> {
        let mut overridden = Vec::new();
        if self.host != DEFAULT_HOST {
            overridden.push("host");
        }
        if self.user != DEFAULT_USER {
            overridden.push("user");
        }
        if !self.password.is_empty() {
            overridden.push("password");
        }
        if self.port != DEFAULT_PORT {
            overridden.push("port");
        }
        if self.tls_mode != TlsMode::Disable {
            overridden.push("tls_mode");
        }
        overridden
    }
}

// Manual impl so the password never reaches logs or panics.
impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field(
                "password",
                &if self.password.is_empty() {
                    "<unset>"
                } else {
                    "<redacted>"
                },
            )
            .field("database", &self.database)
            .field("port", &self.port)
            .field("tls_mode", &self.tls_mode)
            .finish()
    }
}

/// TLS behavior requested for networked engines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    #[default]
    Disable,
    Prefer,
    Require,
}

impl FromStr for TlsMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "disable" | "disabled" => Ok(TlsMode::Disable),
            "prefer" | "preferred" => Ok(TlsMode::Prefer),
            "require" | "required" => Ok(TlsMode::Require),
            other => Err(format!(
                "unrecognized TLS mode `{other}` (expected disable, prefer, or require)"
            )),
        }
    }
}

impl fmt::Display for TlsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TlsMode::Disable => "disable",
            TlsMode::Prefer => "prefer",
            TlsMode::Require => "require",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = DbConfig::default();
        assert_eq!(cfg.host, "localhost");
        assert_eq!(cfg.user, "kiosk");
        assert!(cfg.password.is_empty());
        assert_eq!(cfg.database, "kiosk.db");
        assert_eq!(cfg.port, 3306);
        assert_eq!(cfg.tls_mode, TlsMode::Disable);
    }

    #[test]
    fn debug_redacts_password() {
        let cfg = DbConfig {
            password: "hunter2".into(),
            ..Default::default()
        };
        let dump = format!("{cfg:?}");
        assert!(!dump.contains("hunter2"));
        assert!(dump.contains("<redacted>"));
    }

    #[test]
    fn serialize_omits_password() {
        let cfg = DbConfig {
            password: "hunter2".into(),
            ..Default::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(!json.contains("password"));
    }

    #[test]
    fn tls_mode_parses_case_insensitively() {
        assert_eq!("DISABLE".parse::<TlsMode>().unwrap(), TlsMode::Disable);
        assert_eq!("Prefer".parse::<TlsMode>().unwrap(), TlsMode::Prefer);
        assert_eq!("required".parse::<TlsMode>().unwrap(), TlsMode::Require);
        assert!("mutual".parse::<TlsMode>().is_err());
    }

    #[test]
    fn networked_overrides_lists_changed_options() {
        assert!(DbConfig::default().networked_overrides().is_empty());

        let cfg = DbConfig {
            host: "db.internal".into(),
            port: 5432,
            ..Default::default()
        };
        assert_eq!(cfg.networked_overrides(), vec!["host", "port"]);
    }
}
