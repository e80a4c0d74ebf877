//! unauth-guard
//!
//! Router assembly and settings resolution for the `unauth-guard` binary.

pub mod app;
pub mod settings;
pub mod upstream;

pub use app::build_router;
pub use settings::{resolve_config, BlockerOverrides, EffectiveConfig};
pub use upstream::{extract_token, TokenPolicy};
