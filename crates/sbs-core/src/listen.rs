//! Long-poll listen protocol: queries, responses, and resume state.
//!
//! A listen poll sends two queries. The action query asks for activity newer
//! than `lastId` on a set of chains. The listener query sends the presence
//! snapshot the client already has, so the server can answer as soon as it
//! changes. The response carries new records per kind, the current presence
//! per chain, the new `lastId`, and free-text warnings.
//!
//! [`ResumeState`] owns everything a client must carry between polls and
//! applies responses so that replays and out-of-order answers are harmless:
//! events at or below the held `lastId` are dropped as duplicates, and the
//! token never moves backwards.

use std::collections::{BTreeMap, BTreeSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::bundle::{Bundle, RawBundle};
use crate::contract::ValidationContext;
use crate::decode::DecodeError;
use crate::entities::Event;
use crate::errors::CoreError;
use crate::ids::{ChainId, Id};

/// Per-chain presence: field name to value (typically user id to status).
pub type Presence = BTreeMap<String, Value>;

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActionQuery {
    pub last_id: Id,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub statuses: BTreeMap<ChainId, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chains: Vec<ChainId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ListenerQuery {
    #[serde(default)]
    pub last_listeners: BTreeMap<ChainId, Presence>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chains: Vec<ChainId>,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// A listen response before its records are decoded.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawListenResponse {
    #[serde(default, deserialize_with = "crate::wire_serde::null_default::deserialize")]
    pub listeners: BTreeMap<ChainId, Presence>,
    #[serde(default, deserialize_with = "crate::wire_serde::null_default::deserialize")]
    pub chains: RawBundle,
    #[serde(default)]
    pub last_id: Id,
    #[serde(default, deserialize_with = "crate::wire_serde::null_default::deserialize")]
    pub warnings: Vec<String>,
}

/// A listen response with its records decoded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListenResponse {
    pub listeners: BTreeMap<ChainId, Presence>,
    pub chains: Bundle,
    pub last_id: Id,
    pub warnings: Vec<String>,
}

impl ListenResponse {
    #[must_use]
    pub fn decode(raw: RawListenResponse, ctx: &ValidationContext) -> Self {
        Self {
            listeners: raw.listeners,
            chains: Bundle::decode(raw.chains, ctx),
            last_id: raw.last_id,
            warnings: raw.warnings,
        }
    }

    /// Decode a response from JSON text.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] when the envelope itself is malformed.
    /// Problems inside `chains` are reported per record instead.
    pub fn from_json(text: &str, ctx: &ValidationContext) -> Result<Self, DecodeError> {
        let raw: RawListenResponse = serde_json::from_str(text)?;
        Ok(Self::decode(raw, ctx))
    }
}

// ---------------------------------------------------------------------------
// Resume state
// ---------------------------------------------------------------------------

/// A response whose `lastId` was behind the one already held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaleToken {
    pub held: Id,
    pub received: Id,
}

impl From<StaleToken> for CoreError {
    fn from(token: StaleToken) -> Self {
        Self::StaleResumeToken {
            held: token.held,
            received: token.received,
        }
    }
}

/// One presence difference on one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum PresenceChange {
    Joined {
        chain: ChainId,
        key: String,
        value: Value,
    },
    Left {
        chain: ChainId,
        key: String,
    },
    Changed {
        chain: ChainId,
        key: String,
        from: Value,
        to: Value,
    },
}

/// What applying one response produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListenBatch {
    /// New events, ascending by id, each exactly once.
    pub fresh_events: Vec<Event>,
    /// Events dropped because they were already seen.
    pub duplicates: usize,
    pub presence: Vec<PresenceChange>,
    pub warnings: Vec<String>,
    /// Every record the response carried, events included.
    pub bundle: Bundle,
    pub stale: Option<StaleToken>,
    pub previous_last_id: Id,
    pub last_id: Id,
}

impl ListenBatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fresh_events.is_empty() && self.presence.is_empty() && self.bundle.is_empty()
    }
}

/// State a listen session carries between polls.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResumeState {
    last_id: Id,
    #[serde(default)]
    statuses: BTreeMap<ChainId, String>,
    #[serde(default)]
    chains: Vec<ChainId>,
    #[serde(default)]
    presence: BTreeMap<ChainId, Presence>,
}

impl ResumeState {
    /// Fresh state listening on `chains` (empty for all activity).
    #[must_use]
    pub fn new(chains: Vec<ChainId>) -> Self {
        Self {
            chains,
            ..Self::default()
        }
    }

    /// Start from a known resume token instead of `0`.
    #[must_use]
    pub const fn with_last_id(mut self, last_id: Id) -> Self {
        self.last_id = last_id;
        self
    }

    #[must_use]
    pub const fn last_id(&self) -> Id {
        self.last_id
    }

    #[must_use]
    pub fn chains(&self) -> &[ChainId] {
        &self.chains
    }

    /// Set this client's status on a chain, sent with the next poll.
    pub fn set_status(&mut self, chain: impl Into<ChainId>, status: impl Into<String>) {
        self.statuses.insert(chain.into(), status.into());
    }

    #[must_use]
    pub fn presence(&self, chain: &str) -> Option<&Presence> {
        self.presence.get(chain)
    }

    #[must_use]
    pub fn action_query(&self) -> ActionQuery {
        ActionQuery {
            last_id: self.last_id,
            statuses: self.statuses.clone(),
            chains: self.chains.clone(),
        }
    }

    #[must_use]
    pub fn listener_query(&self) -> ListenerQuery {
        ListenerQuery {
            last_listeners: self.presence.clone(),
            chains: self.chains.clone(),
        }
    }

    /// Reject a token older than the one held.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::StaleResumeToken`] when `received` is behind.
    pub fn check_token(&self, received: Id) -> Result<(), CoreError> {
        if received < self.last_id {
            Err(CoreError::StaleResumeToken {
                held: self.last_id,
                received,
            })
        } else {
            Ok(())
        }
    }

    /// Fold one decoded response into the state.
    ///
    /// Never fails: warnings and a stale token are logged and reported in
    /// the returned batch.
    pub fn apply(&mut self, response: ListenResponse) -> ListenBatch {
        let previous = self.last_id;
        for warning in &response.warnings {
            tracing::warn!(%warning, "listen response warning");
        }

        let stale = (response.last_id < previous).then(|| {
            tracing::warn!(
                held = previous,
                received = response.last_id,
                "listen response carried a stale resume token, keeping the newer one"
            );
            StaleToken {
                held: previous,
                received: response.last_id,
            }
        });

        let (fresh_events, duplicates) =
            collect_fresh(response.chains.events().map(|batch| batch.iter()), previous);
        let newest_event = fresh_events.last().map_or(previous, |event| event.id);
        self.last_id = previous.max(response.last_id).max(newest_event);

        let mut presence = Vec::new();
        for (chain, current) in response.listeners {
            let before = self.presence.get(&chain);
            presence.extend(presence_diff(&chain, before, &current));
            self.presence.insert(chain, current);
        }

        tracing::debug!(
            previous_last_id = previous,
            last_id = self.last_id,
            fresh = fresh_events.len(),
            duplicates,
            "applied listen response"
        );

        ListenBatch {
            fresh_events,
            duplicates,
            presence,
            warnings: response.warnings,
            bundle: response.chains,
            stale,
            previous_last_id: previous,
            last_id: self.last_id,
        }
    }
}

fn collect_fresh<'a>(
    events: Option<impl Iterator<Item = &'a Event>>,
    previous: Id,
) -> (Vec<Event>, usize) {
    let mut seen = BTreeSet::new();
    let mut duplicates = 0;
    let mut fresh = Vec::new();
    for event in events.into_iter().flatten() {
        if event.id <= previous || !seen.insert(event.id) {
            duplicates += 1;
        } else {
            fresh.push(event.clone());
        }
    }
    fresh.sort_by_key(|event| event.id);
    (fresh, duplicates)
}

fn presence_diff(chain: &str, before: Option<&Presence>, after: &Presence) -> Vec<PresenceChange> {
    let empty = Presence::new();
    let before = before.unwrap_or(&empty);
    let mut changes = Vec::new();
    for (key, value) in after {
        match before.get(key) {
            None => changes.push(PresenceChange::Joined {
                chain: chain.to_string(),
                key: key.clone(),
                value: value.clone(),
            }),
            Some(old) if old != value => changes.push(PresenceChange::Changed {
                chain: chain.to_string(),
                key: key.clone(),
                from: old.clone(),
                to: value.clone(),
            }),
            Some(_) => {}
        }
    }
    for key in before.keys().filter(|key| !after.contains_key(*key)) {
        changes.push(PresenceChange::Left {
            chain: chain.to_string(),
            key: key.clone(),
        });
    }
    changes
}
