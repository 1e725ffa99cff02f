mod commands;
mod import;
mod init;

pub use commands::ImportArgs;
pub use import::{import_plan, run_import};
pub use init::{init_store, run_init};
