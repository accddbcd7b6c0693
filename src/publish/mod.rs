//! Publish transaction - flips a draft work to `publishing` and records the
//! `MintRequested` event in one atomic unit.

use std::time::SystemTime;

use tracing::info;

use crate::clock::{Clock, SystemClock};
use crate::error::Error;
use crate::model::{ModelStore, ModelTx};
use crate::outbox::{EventPayload, MintRequested, OutboxEvent};
use crate::work::{WalletAddress, Work, WorkId, WorkStatus, WorkStore};

/// Identity of the caller, as established by the authentication layer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Option<String>,
    pub wallet: Option<WalletAddress>,
}

impl Caller {
    /// No identity at all.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// An authenticated user, without a linked wallet yet.
    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            wallet: None,
        }
    }

    pub fn with_wallet(mut self, wallet: impl AsRef<str>) -> Self {
        self.wallet = Some(WalletAddress::new(wallet));
        self
    }

    /// Blank user ids and blank wallets count as missing.
    fn authenticated_wallet(&self) -> Option<&WalletAddress> {
        self.user_id.as_ref().filter(|id| !id.trim().is_empty())?;
        self.wallet.as_ref().filter(|wallet| !wallet.as_str().is_empty())
    }
}

/// Result of a successful publish.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishReceipt {
    pub work_id: WorkId,
    pub event_id: String,
}

/// Producer side of the mint pipeline.
pub struct PublishService<S, C = SystemClock> {
    store: S,
    works: WorkStore<S>,
    clock: C,
}

impl<S: ModelStore + Clone> PublishService<S, SystemClock> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: ModelStore + Clone, C: Clock> PublishService<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        Self {
            works: WorkStore::new(store.clone()),
            store,
            clock,
        }
    }

    /// Publish `work_id` on behalf of `caller`.
    ///
    /// Checks run in order: authentication, id format, existence, ownership,
    /// draft status. The status flip and the event insert then commit as one
    /// unit; a work without a metadata URI rolls the flip back.
    pub fn publish(&self, work_id: &str, caller: &Caller) -> Result<PublishReceipt, Error> {
        let wallet = caller
            .authenticated_wallet()
            .ok_or_else(|| Error::Unauthorized("caller has no linked wallet".into()))?;
        let work_id = WorkId::parse(work_id)?;

        let work = self
            .works
            .get(&work_id)?
            .ok_or_else(|| Error::NotFound(format!("work {}", work_id)))?;
        if !work.is_owned_by(wallet) {
            return Err(Error::Forbidden(format!(
                "work {} is not owned by {}",
                work_id, wallet
            )));
        }
        if work.status != WorkStatus::Draft {
            return Err(already_published(&work_id));
        }

        let now = self.clock.now();
        let event = self
            .store
            .transaction(|tx| enqueue_mint(tx, &work_id, wallet, now))?;

        info!(
            work_id = %work_id,
            event_id = %event.id,
            "work publishing, mint requested"
        );
        Ok(PublishReceipt {
            work_id,
            event_id: event.id,
        })
    }
}

fn enqueue_mint<T: ModelTx>(
    tx: &mut T,
    work_id: &WorkId,
    owner: &WalletAddress,
    now: SystemTime,
) -> Result<OutboxEvent, Error> {
    let flipped = tx
        .update_where::<Work>(
            work_id.as_str(),
            &|work| work.status == WorkStatus::Draft && work.is_owned_by(owner),
            &mut |work| work.status = WorkStatus::Publishing,
        )?
        .ok_or_else(|| already_published(work_id))?;
    let work = flipped.data;

    let metadata_uri = work
        .metadata()
        .ok_or_else(|| Error::Validation(format!("work {} has no metadata uri", work_id)))?
        .to_string();

    let event = OutboxEvent::new(
        &EventPayload::MintRequested(MintRequested {
            work_id: work.id.clone(),
            owner_wallet: work.owner_wallet.clone(),
            metadata_uri,
            title: work.title.clone(),
        }),
        now,
    )?;
    tx.insert_model(&event)?;
    Ok(event)
}

fn already_published(work_id: &WorkId) -> Error {
    Error::Conflict(format!("work {} is not a draft", work_id))
}
