use async_trait::async_trait;

use crate::ports::{LeaderGate, Result};

/// Leader gate with a fixed answer, for single-instance deployments and tests.
#[derive(Debug, Clone, Copy)]
pub struct StaticLeaderGate {
    eligible: bool,
}

impl StaticLeaderGate {
    pub fn leader() -> Self {
        Self { eligible: true }
    }

    pub fn follower() -> Self {
        Self { eligible: false }
    }
}

impl From<bool> for StaticLeaderGate {
    fn from(eligible: bool) -> Self {
        Self { eligible }
    }
}

#[async_trait]
impl LeaderGate for StaticLeaderGate {
    async fn is_write_eligible(&self) -> Result<bool> {
        Ok(self.eligible)
    }
}
