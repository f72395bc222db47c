use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::MigratorTrait;
use utils::assets::asset_dir;

pub mod entities;
pub mod models;
pub mod types;

pub use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, TransactionTrait};

#[derive(Clone)]
pub struct DBService {
    pub pool: DatabaseConnection,
}

impl DBService {
    /// Connects to `DATABASE_URL` or a sqlite file under the asset directory,
    /// running pending migrations.
    pub async fn new() -> Result<DBService, DbErr> {
        let database_url = match std::env::var("DATABASE_URL") {
            Ok(url) if !url.trim().is_empty() => url,
            _ => format!(
                "sqlite://{}?mode=rwc",
                asset_dir().join("db.sqlite").to_string_lossy()
            ),
        };
        Self::connect(&database_url).await
    }

    pub async fn connect(database_url: &str) -> Result<DBService, DbErr> {
        let mut options = ConnectOptions::new(database_url.to_string());
        options
            .max_connections(5)
            .connect_timeout(std::time::Duration::from_secs(30))
            .sqlx_logging(false);

        let pool = Database::connect(options).await?;
        db_migration::Migrator::up(&pool, None).await?;
        Ok(DBService { pool })
    }
}
