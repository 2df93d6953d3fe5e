use crate::config::Config;
use crate::db::Store;

/// Print a quick health summary: config in effect and database reachability.
pub async fn cmd_status(config: &Config) -> anyhow::Result<()> {
    println!("Keyforge v{}", env!("CARGO_PKG_VERSION"));
    println!("Database: {}", config.general.database_path);
    println!("Server port: {}", config.server.port);
    println!(
        "Lockout: {} attempts / {}s",
        config.security.max_failed_attempts, config.security.lockout_seconds
    );

    match Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await
    {
        Ok(store) => match store.ping().await {
            Ok(()) => println!("Database: ok"),
            Err(e) => println!("Database: unreachable ({e})"),
        },
        Err(e) => println!("Database: failed to open ({e})"),
    }

    Ok(())
}
