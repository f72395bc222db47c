use sea_orm::{ConnectionTrait, DbErr, EntityTrait};

use crate::entities::{
    activity_log, board, board_column, board_member, group, label, subtask, task,
    task_dependency, task_label, user,
};

/// Wipes every row, children first, so the instance lands back on the
/// first-run setup screen. Instance settings survive the reset.
pub async fn reset_all<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    activity_log::Entity::delete_many().exec(db).await?;
    task_dependency::Entity::delete_many().exec(db).await?;
    task_label::Entity::delete_many().exec(db).await?;
    subtask::Entity::delete_many().exec(db).await?;
    task::Entity::delete_many().exec(db).await?;
    label::Entity::delete_many().exec(db).await?;
    board_column::Entity::delete_many().exec(db).await?;
    board_member::Entity::delete_many().exec(db).await?;
    board::Entity::delete_many().exec(db).await?;
    group::Entity::delete_many().exec(db).await?;
    user::Entity::delete_many().exec(db).await?;

    tracing::warn!("Database reset: all boards, tasks, users and groups deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::models::user::{CreateUser, User};
    use crate::test_utils::memory_db;

    #[tokio::test]
    async fn reset_clears_users_but_keeps_settings() {
        let db = memory_db().await;
        User::create(
            &db,
            &CreateUser {
                username: "root".to_string(),
                password_hash: "hash".to_string(),
                is_admin: true,
                group_id: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        crate::models::system_setting::SystemSetting::set(&db, "logo_text", "Flowt")
            .await
            .unwrap();

        reset_all(&db).await.unwrap();

        assert_eq!(User::count(&db).await.unwrap(), 0);
        assert_eq!(
            crate::models::system_setting::SystemSetting::get(&db, "logo_text")
                .await
                .unwrap(),
            Some("Flowt".to_string())
        );
    }
}
