mod import;
mod server;

pub use import::ImportConfig;
pub use server::{JWT_SECRET_ENV, JWT_SECRET_FILE, ServerConfig};
