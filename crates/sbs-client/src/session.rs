//! Long-poll listen session.

use sbs_config::ListenConfig;
use sbs_core::listen::{ListenBatch, ResumeState};

use crate::{ApiClient, ClientError};

/// One listen loop against the API.
///
/// Polls take `&mut self`, so a session never has two requests in flight.
/// The resume state only changes after a response has been received and
/// decoded; dropping a pending [`poll`](Self::poll) leaves it untouched.
#[derive(Debug)]
pub struct ListenSession {
    client: ApiClient,
    state: ResumeState,
}

impl ListenSession {
    #[must_use]
    pub const fn new(client: ApiClient, state: ResumeState) -> Self {
        Self { client, state }
    }

    /// Start a fresh session on the configured chains.
    #[must_use]
    pub fn from_config(client: ApiClient, config: &ListenConfig) -> Self {
        Self::new(client, ResumeState::new(config.chains.clone()))
    }

    #[must_use]
    pub const fn state(&self) -> &ResumeState {
        &self.state
    }

    /// Mutable access for setting per-chain statuses before the next poll.
    pub const fn state_mut(&mut self) -> &mut ResumeState {
        &mut self.state
    }

    #[must_use]
    pub fn into_state(self) -> ResumeState {
        self.state
    }

    /// Issue one poll and fold its response into the resume state.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] from the request; the state is unchanged in
    /// that case. [`ClientError::PollTimeout`] means "nothing yet, poll
    /// again".
    pub async fn poll(&mut self) -> Result<ListenBatch, ClientError> {
        let actions = self.state.action_query();
        let listeners = self.state.listener_query();
        let response = self.client.listen(&actions, &listeners).await?;
        Ok(self.state.apply(response))
    }
}
