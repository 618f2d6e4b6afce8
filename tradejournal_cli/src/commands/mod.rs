//! CLI subcommand implementations.

pub mod export;
pub mod import;
pub mod pnl;
pub mod tax;
pub mod trades;
