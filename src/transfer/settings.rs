//! Knobs shared by every transfer component

use tokio_util::sync::CancellationToken;

use crate::config::{TransferConfig, WritePolicy};

/// Batch size, write policy, progress display and cancellation
///
/// Built once from [`TransferConfig`] and handed to each component.
#[derive(Debug, Clone)]
pub struct TransferSettings {
    pub batch_size: usize,
    pub write_policy: WritePolicy,
    pub progress_bar: bool,
    pub cancel_token: Option<CancellationToken>,
}

impl TransferSettings {
    /// # Panics
    /// Panics if `batch_size` is zero.
    pub fn new(batch_size: usize) -> Self {
        assert!(batch_size > 0, "batch size must be positive");
        Self {
            batch_size,
            write_policy: WritePolicy::default(),
            progress_bar: false,
            cancel_token: None,
        }
    }

    pub fn from_config(config: &TransferConfig) -> Self {
        Self {
            write_policy: config.write_policy,
            progress_bar: config.progress_bar,
            ..Self::new(config.batch_size)
        }
    }

    pub fn with_write_policy(mut self, policy: WritePolicy) -> Self {
        self.write_policy = policy;
        self
    }

    /// Stop between batches once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let config = TransferConfig {
            batch_size: 100,
            write_policy: WritePolicy::Truncate,
            progress_bar: false,
        };
        let settings = TransferSettings::from_config(&config);
        assert_eq!(settings.batch_size, 100);
        assert_eq!(settings.write_policy, WritePolicy::Truncate);
        assert!(!settings.is_cancelled());
    }

    #[test]
    fn test_cancellation() {
        let token = CancellationToken::new();
        let settings = TransferSettings::new(10).with_cancellation(token.clone());
        assert!(!settings.is_cancelled());
        token.cancel();
        assert!(settings.is_cancelled());
    }
}
