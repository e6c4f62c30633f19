//! Applies the embedded `chat_messages` migrations.
//!
//!   telehealth-migrate            apply pending migrations
//!   telehealth-migrate --pending  list pending migrations and exit
//!   telehealth-migrate --test     target `<db>_test` instead of `<db>`

use diesel::pg::PgConnection;
use diesel::Connection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let flag = |name: &str| args.iter().any(|arg| arg == name);

    let mut url = telehealth_api::config::Config::from_env()
        .database_url
        .expect("DATABASE_URL must be set to run migrations");
    if flag("--test") {
        url = test_database_url(&url);
    }

    let mut conn = PgConnection::establish(&url).expect("failed to connect to database");

    if flag("--pending") {
        let pending = conn
            .pending_migrations(MIGRATIONS)
            .expect("failed to read migration state");
        for migration in &pending {
            tracing::info!(version = %migration.name(), "pending");
        }
        tracing::info!(count = pending.len(), "pending migrations");
        return;
    }

    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .expect("failed to run migrations");
    for version in &applied {
        tracing::info!(%version, "applied");
    }
    tracing::info!(count = applied.len(), "migrations complete");
}

/// Point the URL at the sibling `_test` database, keeping any query string.
fn test_database_url(url: &str) -> String {
    let (path, query) = url.split_once('?').unwrap_or((url, ""));
    match path.rsplit_once('/') {
        Some((_, db)) if db.is_empty() || db.ends_with("_test") => url.to_string(),
        Some((base, db)) if query.is_empty() => format!("{base}/{db}_test"),
        Some((base, db)) => format!("{base}/{db}_test?{query}"),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::test_database_url;

    #[test]
    fn appends_test_suffix() {
        assert_eq!(
            test_database_url("postgres://u:p@localhost/telehealth"),
            "postgres://u:p@localhost/telehealth_test"
        );
        assert_eq!(
            test_database_url("postgres://localhost/telehealth?sslmode=disable"),
            "postgres://localhost/telehealth_test?sslmode=disable"
        );
        assert_eq!(
            test_database_url("postgres://localhost/telehealth_test"),
            "postgres://localhost/telehealth_test"
        );
    }
}
