//! Inline gate that throttles clients who keep failing authorization.
//!
//! A [`Gate`] checks the client's failure count before a request is forwarded,
//! short-circuits with `401 Unauthorized` while the client is blocked, and counts
//! `401`/`403` answers from downstream once the request completes. Counts live
//! in an [`attempt_store::AttemptStore`] and are forgotten after the configured
//! block duration.

pub mod client;
pub mod config;
pub mod errors;
pub mod gate;
pub mod layer;
pub mod notify;
pub mod observer;
pub mod policy;

pub use crate::client::{AddrError, ClientAddr, UNKNOWN_HOST};
pub use crate::config::{
    load_settings_from_path, parse_settings_str, BlockerConfig, BlockerSettings, ConfigError,
    NotifyTarget, RawNumber,
};
pub use crate::errors::GateError;
pub use crate::gate::{Admission, Gate, Verdict};
pub use crate::layer::{unauth_gate_middleware, GateRouterExt};
pub use crate::notify::{BlockNotice, Notifier};
pub use crate::observer::{ResponseWriter, StatusRecorder};
pub use crate::policy::{BlockPolicy, FailureStatuses};
