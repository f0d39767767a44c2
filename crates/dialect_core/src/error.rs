use thiserror::Error;

#[derive(Debug, Error)]
pub enum DialectError {
    #[error("config: {0}")]
    Config(String),

    #[error("invalid dialect descriptor #{index}: {reason}")]
    InvalidDescriptor { index: usize, reason: String },

    #[error("store: {0}")]
    Store(#[from] anyhow::Error),

    #[error("not leader: this instance may not mutate the dialect store")]
    NotLeader,

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl DialectError {
    /// Config-time errors are fatal at startup; everything else is operational.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::InvalidDescriptor { .. })
    }
}

pub type Result<T> = std::result::Result<T, DialectError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_descriptor() {
        let e = DialectError::InvalidDescriptor {
            index: 2,
            reason: "missing name".into(),
        };
        assert_eq!(e.to_string(), "invalid dialect descriptor #2: missing name");
    }

    #[test]
    fn display_store() {
        let e = DialectError::Store(anyhow::anyhow!("connection reset"));
        assert_eq!(e.to_string(), "store: connection reset");
    }

    #[test]
    fn config_classification() {
        assert!(DialectError::Config("bad yaml".into()).is_config());
        assert!(DialectError::InvalidDescriptor {
            index: 0,
            reason: "x".into()
        }
        .is_config());
        assert!(!DialectError::NotLeader.is_config());
        assert!(!DialectError::Store(anyhow::anyhow!("boom")).is_config());
    }
}
