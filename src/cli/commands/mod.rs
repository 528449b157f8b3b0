//! One module per subcommand, each exposing an async `execute`.

pub mod code;
pub mod list;
pub mod remove;
pub mod save;
pub mod set_default;
pub mod status;
