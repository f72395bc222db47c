use db::{ConnectionTrait, DbErr, models::system_setting::SystemSetting};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Canonical instance-setting keys. Snake_case only; older deployments that
/// wrote camelCase variants were reading and writing two copies of the same
/// logical setting.
pub const LOGO_TEXT: &str = "logo_text";
pub const ADMIN_ROLE_NAME: &str = "admin_role_name";
pub const ALLOW_USER_BOARD_CREATION: &str = "allow_user_board_creation";

const DEFAULT_LOGO_TEXT: &str = "Flowt";
const DEFAULT_ADMIN_ROLE_NAME: &str = "Administrator";

/// What the application shell needs to render itself.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Branding {
    pub logo_text: String,
    pub admin_role_name: String,
    pub allow_user_board_creation: bool,
}

pub async fn logo_text<C: ConnectionTrait>(db: &C) -> Result<String, DbErr> {
    Ok(SystemSetting::get(db, LOGO_TEXT)
        .await?
        .unwrap_or_else(|| DEFAULT_LOGO_TEXT.to_string()))
}

pub async fn admin_role_name<C: ConnectionTrait>(db: &C) -> Result<String, DbErr> {
    Ok(SystemSetting::get(db, ADMIN_ROLE_NAME)
        .await?
        .unwrap_or_else(|| DEFAULT_ADMIN_ROLE_NAME.to_string()))
}

/// Unset means allowed; once set, only the literal "true" enables it.
pub async fn allow_user_board_creation<C: ConnectionTrait>(db: &C) -> Result<bool, DbErr> {
    Ok(match SystemSetting::get(db, ALLOW_USER_BOARD_CREATION).await? {
        Some(value) => value == "true",
        None => true,
    })
}

pub async fn branding<C: ConnectionTrait>(db: &C) -> Result<Branding, DbErr> {
    Ok(Branding {
        logo_text: logo_text(db).await?,
        admin_role_name: admin_role_name(db).await?,
        allow_user_board_creation: allow_user_board_creation(db).await?,
    })
}

#[cfg(test)]
mod tests {
    use sea_orm::{ConnectOptions, Database, DatabaseConnection};
    use sea_orm_migration::MigratorTrait;

    use super::*;

    async fn memory_db() -> DatabaseConnection {
        let mut options = ConnectOptions::new("sqlite::memory:".to_string());
        options.max_connections(1).sqlx_logging(false);
        let db = Database::connect(options).await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    #[tokio::test]
    async fn branding_falls_back_to_defaults() {
        let db = memory_db().await;
        let branding = branding(&db).await.unwrap();
        assert_eq!(branding.logo_text, "Flowt");
        assert_eq!(branding.admin_role_name, "Administrator");
        assert!(branding.allow_user_board_creation);
    }

    #[tokio::test]
    async fn board_creation_toggle_requires_the_literal_true() {
        let db = memory_db().await;
        SystemSetting::set(&db, ALLOW_USER_BOARD_CREATION, "false")
            .await
            .unwrap();
        assert!(!allow_user_board_creation(&db).await.unwrap());

        SystemSetting::set(&db, ALLOW_USER_BOARD_CREATION, "true")
            .await
            .unwrap();
        assert!(allow_user_board_creation(&db).await.unwrap());
    }

    #[tokio::test]
    async fn canonical_keys_read_back_what_was_written() {
        let db = memory_db().await;
        SystemSetting::set(&db, LOGO_TEXT, "Acme Boards").await.unwrap();
        assert_eq!(logo_text(&db).await.unwrap(), "Acme Boards");
    }
}
