use diesel::pg::PgConnection;
use diesel::r2d2::{self, ConnectionManager};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

pub type DbPool = r2d2::Pool<ConnectionManager<PgConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type InitError = Box<dyn std::error::Error + Send + Sync>;

pub fn init_pool(database_url: &str) -> Result<DbPool, InitError> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder().build(manager)?;

    // Run pending migrations automatically
    let mut conn = pool.get()?;
    let applied = conn.run_pending_migrations(MIGRATIONS)?;

    log::info!(
        "Database migrations completed successfully ({} applied)",
        applied.len()
    );

    Ok(pool)
}
