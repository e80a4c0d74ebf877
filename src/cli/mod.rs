pub mod check;
pub mod output;
pub mod serve;

pub use check::{cmd_check_config, CheckConfigArgs};
pub use output::OutputFormat;
pub use serve::{cmd_serve, ServeArgs};
