use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("check failed for step `{step}`: {cause}")]
    Check { step: String, cause: String },

    #[error("apply failed for step `{step}`: {cause}")]
    Apply { step: String, cause: String },

    #[error("backfill failed for step `{step}`: {cause}")]
    Backfill { step: String, cause: String },

    #[error("tracking table error: {0}")]
    Tracking(String),

    #[error("migration lock held: {0}")]
    Locked(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// The step this error is attributed to, when it concerns one.
    pub fn step(&self) -> Option<&str> {
        match self {
            Error::Check { step, .. }
            | Error::Apply { step, .. }
            | Error::Backfill { step, .. } => Some(step),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn error_display_includes_context() {
        let e = Error::Connection("no such file".into());
        assert_eq!(e.to_string(), "connection error: no such file");

        let e = Error::Apply {
            step: "add_event_id_column".into(),
            cause: "duplicate column name".into(),
        };
        assert_eq!(
            e.to_string(),
            "apply failed for step `add_event_id_column`: duplicate column name"
        );

        let e = Error::Locked("kiosk.db.lock".into());
        assert_eq!(e.to_string(), "migration lock held: kiosk.db.lock");

        let e = Error::Other("misc".into());
        assert_eq!(e.to_string(), "misc");
    }

    #[test]
    fn step_attribution() {
        let e = Error::Backfill {
            step: "denormalize_event_details".into(),
            cause: "no such table".into(),
        };
        assert_eq!(e.step(), Some("denormalize_event_details"));

        let e = Error::Connection("refused".into());
        assert_eq!(e.step(), None);
    }
}
