use std::fs;
use std::path::Path;

use anyhow::bail;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::store::{SqliteStore, Store};

#[cfg(unix)]
fn set_restrictive_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

/// Creates the data directory, the database and a token signing secret.
pub fn run_init(config: &ServerConfig) -> anyhow::Result<()> {
    fs::create_dir_all(&config.data_dir)?;

    let store = SqliteStore::new(&config.db_path())?;
    store.initialize()?;

    let secret_path = config.secret_path();
    if secret_path.exists() {
        bail!(
            "Server already initialized. Token secret exists at: {}",
            secret_path.display()
        );
    }

    let secret = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
    fs::write(&secret_path, &secret)?;

    #[cfg(unix)]
    set_restrictive_permissions(&secret_path);

    println!("Initialized {}", config.data_dir.display());
    println!("Database: {}", config.db_path().display());
    println!("Token secret written to: {}", secret_path.display());

    Ok(())
}

/// Opens the store for `serve`, checking `init` has run.
pub fn init_store(config: &ServerConfig) -> anyhow::Result<SqliteStore> {
    let db_path = config.db_path();
    if !db_path.exists() {
        bail!(
            "Database not found at {}. Run 'scopegate init' first.",
            db_path.display()
        );
    }

    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;
    Ok(store)
}
