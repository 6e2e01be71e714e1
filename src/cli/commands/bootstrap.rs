//! Bootstrap and init command handlers

use tracing::error;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    BootstrapError, Outcome, SeedOutcome, SuperadminSeed, ensure_privileged_account,
    seed_sample_catalog,
};

pub fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::AlreadyExists { username, email } => {
            println!("✅ Superadmin already exists!");
            println!("Username: {username}");
            println!("Email: {email}");
        }
        Outcome::Created {
            id,
            username,
            email,
            default_password,
        } => {
            println!("✅ Superadmin created successfully!");
            println!("User ID: {id}");
            println!("Username: {username}");
            println!("Email: {email}");
            if let Some(password) = default_password {
                println!("Password: {password}");
                println!("⚠️  Please change the default password in production!");
            }
        }
    }
}

/// Prints the bootstrap result. Failures only become errors in strict mode.
fn report(
    result: Result<Outcome, BootstrapError>,
    strict: bool,
) -> anyhow::Result<Option<Outcome>> {
    match result {
        Ok(outcome) => {
            print_outcome(&outcome);
            Ok(Some(outcome))
        }
        Err(e) => {
            error!("Error ensuring superuser: {}", e);
            println!("❌ Error ensuring superuser: {e}");
            if strict {
                Err(anyhow::Error::new(e).context("Bootstrap failed"))
            } else {
                Ok(None)
            }
        }
    }
}

async fn ensure(store: &Store, config: &Config) -> Result<Outcome, BootstrapError> {
    let seed = SuperadminSeed::from_config(&config.bootstrap);
    ensure_privileged_account(store, &seed, &config.security).await
}

pub async fn cmd_bootstrap(config: &Config, strict: bool) -> anyhow::Result<()> {
    let result = match Store::connect(&config.database).await {
        Ok(store) => {
            let result = ensure(&store, config).await;
            store.close().await;
            result
        }
        Err(e) => Err(BootstrapError::StoreUnreachable(e.to_string())),
    };

    report(result, strict).map(|_| ())
}

pub async fn cmd_init(config: &Config, skip_sample_data: bool, strict: bool) -> anyhow::Result<()> {
    println!("🚀 Initializing ValidS database...");

    let store = match Store::connect(&config.database).await {
        Ok(store) => store,
        Err(e) => {
            report(Err(BootstrapError::StoreUnreachable(e.to_string())), strict)?;
            println!("❌ Database initialization failed!");
            return Ok(());
        }
    };

    let result = match report(ensure(&store, config).await, strict) {
        Ok(Some(_)) if skip_sample_data => {
            println!("✅ Database initialization completed!");
            Ok(())
        }
        Ok(Some(_)) => seed(&store, strict).await,
        Ok(None) => {
            println!("❌ Database initialization failed!");
            Ok(())
        }
        Err(e) => Err(e),
    };

    store.close().await;
    result
}

async fn seed(store: &Store, strict: bool) -> anyhow::Result<()> {
    match seed_sample_catalog(store).await {
        Ok(SeedOutcome::Seeded { iso_id, .. }) => {
            println!("✅ Sample data created (ISO standard id {iso_id})");
            println!("✅ Database initialization completed!");
            Ok(())
        }
        Ok(SeedOutcome::AlreadyPresent) => {
            println!("Sample data already exists, skipping...");
            println!("✅ Database initialization completed!");
            Ok(())
        }
        Err(e) => {
            error!("Error creating sample data: {}", e);
            println!("❌ Error creating sample data: {e}");
            if strict {
                Err(anyhow::Error::new(e).context("Sample data seed failed"))
            } else {
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{AccountStore, CatalogStore};
    use crate::services::bootstrap::DEFAULT_USERNAME;
    use crate::services::catalog::SAMPLE_ISO_NAME;

    fn sqlite_config() -> Config {
        let db_path =
            std::env::temp_dir().join(format!("valids-cli-test-{}.db", uuid::Uuid::new_v4()));

        let mut config = Config::default();
        config.database.url = format!("sqlite:{}", db_path.display());
        config.security.argon2_memory_cost_kib = 1024;
        config.security.argon2_time_cost = 1;
        config
    }

    fn unreachable() -> Result<Outcome, BootstrapError> {
        Err(BootstrapError::StoreUnreachable("connection refused".to_string()))
    }

    #[test]
    fn failure_is_reported_but_not_fatal() {
        assert!(matches!(report(unreachable(), false), Ok(None)));
    }

    #[test]
    fn failure_is_fatal_in_strict_mode() {
        let err = report(unreachable(), true).unwrap_err();
        assert!(format!("{err:#}").contains("Bootstrap failed"));
    }

    #[test]
    fn success_is_returned_in_both_modes() {
        for strict in [false, true] {
            let outcome = Outcome::AlreadyExists {
                username: "root".to_string(),
                email: "root@example.com".to_string(),
            };
            let reported = report(Ok(outcome.clone()), strict).unwrap();
            assert_eq!(reported, Some(outcome));
        }
    }

    #[tokio::test]
    async fn commands_tolerate_unsupported_store_unless_strict() {
        let mut config = Config::default();
        config.database.url = "redis://localhost:6379".to_string();

        assert!(cmd_bootstrap(&config, false).await.is_ok());
        assert!(cmd_bootstrap(&config, true).await.is_err());
        assert!(cmd_init(&config, false, false).await.is_ok());
        assert!(cmd_init(&config, false, true).await.is_err());
    }

    #[tokio::test]
    async fn init_seeds_catalog_after_bootstrap() {
        let config = sqlite_config();

        cmd_init(&config, false, true).await.unwrap();

        let store = Store::connect(&config.database).await.unwrap();
        let superadmin = store.find_by_role(crate::models::Role::Superadmin).await.unwrap();
        assert_eq!(superadmin.unwrap().username, DEFAULT_USERNAME);
        assert!(store.find_iso_by_name(SAMPLE_ISO_NAME).await.unwrap().is_some());
        store.close().await;
    }

    #[tokio::test]
    async fn init_skips_catalog_when_bootstrap_fails() {
        let mut config = sqlite_config();
        config.bootstrap.require_explicit_password = true;

        cmd_init(&config, false, false).await.unwrap();

        let store = Store::connect(&config.database).await.unwrap();
        assert!(store.list_accounts().await.unwrap().is_empty());
        assert!(store.find_iso_by_name(SAMPLE_ISO_NAME).await.unwrap().is_none());
        store.close().await;
    }
}
