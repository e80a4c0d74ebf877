//! Admission decisions and post-response counter updates.

use std::time::Duration;

use attempt_store::AttemptStore;
use futures::future::BoxFuture;
use http::StatusCode;
use tracing::{debug, info};

use crate::client::ClientAddr;
use crate::config::{BlockerConfig, BlockerSettings};
use crate::errors::GateError;
use crate::notify::{BlockNotice, Notifier};
use crate::observer::{ResponseWriter, StatusRecorder};
use crate::policy::{BlockPolicy, FailureStatuses};

/// Outcome of the pre-forward check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    Admit { attempts: u32 },
    Reject { attempts: u32 },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admit { .. })
    }
}

/// Terminal state of a request that went through [`Gate::serve`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Short-circuited with 401; downstream never ran.
    Rejected,
    /// Downstream answered with a failure status and the counter moved.
    Updated { status: StatusCode, attempts: u32 },
    /// Downstream answered with any other status.
    Skipped { status: StatusCode },
}

/// Per-client authorization failure gate.
///
/// Owns its attempt store; share it between requests behind an `Arc`.
pub struct Gate {
    store: AttemptStore,
    policy: BlockPolicy,
    failure_statuses: FailureStatuses,
    notifier: Notifier,
}

impl Gate {
    pub fn new(config: BlockerConfig, notifier: Notifier) -> Result<Self, GateError> {
        let store = AttemptStore::new(config.cache_capacity, config.block_duration)?;
        info!(
            target: "unauth-gate",
            policy = config.policy.name(),
            block_duration = ?config.block_duration,
            capacity = config.cache_capacity,
            "unauthorized-attempt gate ready"
        );
        Ok(Self {
            store,
            policy: config.policy,
            failure_statuses: config.failure_statuses,
            notifier,
        })
    }

    /// Build a gate writing notices to the sink named in `config.notify`.
    pub fn from_config(config: BlockerConfig) -> Result<Self, GateError> {
        let notifier = Notifier::from_target(&config.notify).map_err(|source| GateError::Sink {
            target: config.notify.to_string(),
            source,
        })?;
        Self::new(config, notifier)
    }

    /// Validate raw settings and build a gate from them.
    pub fn from_settings(settings: &BlockerSettings) -> Result<Self, GateError> {
        Self::from_config(settings.validate()?)
    }

    pub fn policy(&self) -> BlockPolicy {
        self.policy
    }

    pub fn block_duration(&self) -> Duration {
        self.store.ttl()
    }

    pub fn attempts(&self, client: &ClientAddr) -> u32 {
        self.store.get(client.key())
    }

    pub fn admit(&self, client: &ClientAddr) -> Admission {
        let attempts = self.store.get(client.key());
        if self.policy.blocks(attempts) {
            debug!(target: "unauth-gate", client = client.key(), attempts, "request rejected");
            Admission::Reject { attempts }
        } else {
            Admission::Admit { attempts }
        }
    }

    /// Count `status` against `client` when it is a failure status.
    ///
    /// Returns the new attempt count, or `None` when the status is not tracked.
    pub fn record_outcome(&self, client: &ClientAddr, status: StatusCode) -> Option<u32> {
        if !self.failure_statuses.contains(status) {
            return None;
        }
        let attempts = self.store.increment(client.key());
        self.notifier.notify(&BlockNotice {
            status,
            client,
            attempts,
        });
        Some(attempts)
    }

    /// Run one request through the gate.
    ///
    /// A rejected client gets a bare 401 and `next` is never called. Otherwise
    /// `next` writes through a [`StatusRecorder`]; its error propagates as is and
    /// leaves the counter untouched. Dropping the returned future before `next`
    /// completes skips the update as well.
    pub async fn serve<E, F>(
        &self,
        client: &ClientAddr,
        rsp: &mut dyn ResponseWriter,
        next: F,
    ) -> Result<Verdict, E>
    where
        F: for<'a> FnOnce(&'a mut dyn ResponseWriter) -> BoxFuture<'a, Result<(), E>> + Send,
    {
        if !self.admit(client).is_admitted() {
            rsp.set_status(StatusCode::UNAUTHORIZED);
            return Ok(Verdict::Rejected);
        }

        let mut recorder = StatusRecorder::new(rsp);
        let writer: &mut dyn ResponseWriter = &mut recorder;
        next(writer).await?;
        let status = recorder.status();

        Ok(match self.record_outcome(client, status) {
            Some(attempts) => Verdict::Updated { status, attempts },
            None => Verdict::Skipped { status },
        })
    }

    pub fn purge_expired(&self) -> usize {
        self.store.purge_expired()
    }

    pub fn tracked_clients(&self) -> usize {
        self.store.len()
    }
}

const _: fn() = || {
    fn assert_send_sync<T: Send + Sync>() {}
    fn assert_writer<T: ResponseWriter + ?Sized>() {}
    assert_send_sync::<Gate>();
    assert_writer::<StatusRecorder<'static>>();
};
