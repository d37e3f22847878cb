//! Single-slot memory of the last transmitted command.
//!
//! The field device answers `IGNORADO:` when it drops a command. The bridge
//! then resends whatever was transmitted last, once per notice. Only the most
//! recent command is kept.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::protocol::WireCommand;

/// Shared handle to the last transmitted command.
#[derive(Debug, Clone, Default)]
pub struct RetryState {
    last: Arc<RwLock<Option<WireCommand>>>,
}

impl RetryState {
    /// Creates an empty retry state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a transmitted command, replacing any previous one.
    pub async fn remember(&self, command: WireCommand) {
        *self.last.write().await = Some(command);
    }

    /// Returns the last transmitted command.
    pub async fn last(&self) -> Option<WireCommand> {
        self.last.read().await.clone()
    }

    /// Forgets the last transmitted command.
    pub async fn clear(&self) {
        *self.last.write().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Target;

    #[tokio::test]
    async fn test_empty_by_default() {
        let state = RetryState::new();
        assert!(state.last().await.is_none());
    }

    #[tokio::test]
    async fn test_last_command_wins() {
        let state = RetryState::new();
        state.remember(WireCommand::new(Target::Bomba, 1)).await;
        state.remember(WireCommand::new(Target::Servo, 90)).await;

        let last = state.last().await.unwrap();
        assert_eq!(last.text(), "S:90");
        assert_eq!(last.hex(), "533a3930");
    }

    #[tokio::test]
    async fn test_clones_share_slot() {
        let state = RetryState::new();
        let reader = state.clone();

        state.remember(WireCommand::new(Target::Motor, 0)).await;
        assert_eq!(reader.last().await, Some(WireCommand::new(Target::Motor, 0)));

        reader.clear().await;
        assert!(state.last().await.is_none());
    }
}
