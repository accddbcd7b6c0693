use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::Error;
use crate::model::Model;
use crate::work::{WalletAddress, WorkId};

/// Status of an outbox event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Payload of a `MintRequested` event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintRequested {
    pub work_id: WorkId,
    pub owner_wallet: WalletAddress,
    pub metadata_uri: String,
    pub title: String,
}

impl MintRequested {
    fn validate(&self) -> Result<(), String> {
        if self.metadata_uri.trim().is_empty() {
            return Err("metadata_uri is empty".into());
        }
        if self.owner_wallet.as_str().is_empty() {
            return Err("owner_wallet is empty".into());
        }
        Ok(())
    }
}

/// Domain events carried by the outbox, keyed by event type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", content = "payload")]
pub enum EventPayload {
    MintRequested(MintRequested),
}

impl EventPayload {
    pub const MINT_REQUESTED: &'static str = "MintRequested";

    /// Event types this crate knows how to decode.
    pub const KNOWN_TYPES: &'static [&'static str] = &[Self::MINT_REQUESTED];

    pub fn event_type(&self) -> &'static str {
        match self {
            EventPayload::MintRequested(_) => Self::MINT_REQUESTED,
        }
    }

    /// Id of the aggregate the event is about.
    pub fn aggregate_id(&self) -> &str {
        match self {
            EventPayload::MintRequested(mint) => mint.work_id.as_str(),
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            EventPayload::MintRequested(mint) => mint.validate(),
        }
    }
}

/// Durable record of an intent to act, written in the same atomic unit as
/// the state change that requires it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutboxEvent {
    pub id: String,
    pub event_type: String,
    pub aggregate_id: String,
    pub payload: Value,
    pub status: OutboxStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: SystemTime,
    pub processed_at: Option<SystemTime>,
}

impl Model for OutboxEvent {
    const COLLECTION: &'static str = "outbox_events";

    fn id(&self) -> &str {
        &self.id
    }
}

impl OutboxEvent {
    /// A new pending event for `payload`.
    pub fn new(payload: &EventPayload, created_at: SystemTime) -> Result<Self, Error> {
        let body = match serde_json::to_value(payload) {
            Ok(Value::Object(mut tagged)) => tagged.remove("payload").unwrap_or(Value::Null),
            Ok(_) => Value::Null,
            Err(e) => {
                return Err(Error::Payload {
                    event_type: payload.event_type().to_string(),
                    reason: e.to_string(),
                })
            }
        };

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            event_type: payload.event_type().to_string(),
            aggregate_id: payload.aggregate_id().to_string(),
            payload: body,
            status: OutboxStatus::Pending,
            attempts: 0,
            last_error: None,
            created_at,
            processed_at: None,
        })
    }

    /// Decode the typed payload.
    ///
    /// Returns `Ok(None)` for event types this crate does not know, and a
    /// payload error when a known type carries an invalid body.
    pub fn decode(&self) -> Result<Option<EventPayload>, Error> {
        if !EventPayload::KNOWN_TYPES.contains(&self.event_type.as_str()) {
            return Ok(None);
        }

        let invalid = |reason: String| Error::Payload {
            event_type: self.event_type.clone(),
            reason,
        };

        let tagged = json!({ "event_type": self.event_type, "payload": self.payload });
        let payload: EventPayload =
            serde_json::from_value(tagged).map_err(|e| invalid(e.to_string()))?;
        payload.validate().map_err(invalid)?;
        Ok(Some(payload))
    }

    pub fn is_pending(&self) -> bool {
        self.status == OutboxStatus::Pending
    }

    pub fn is_processing(&self) -> bool {
        self.status == OutboxStatus::Processing
    }

    pub fn is_completed(&self) -> bool {
        self.status == OutboxStatus::Completed
    }

    pub fn is_failed(&self) -> bool {
        self.status == OutboxStatus::Failed
    }
}
