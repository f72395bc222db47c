use db::{
    ConnectionTrait, DbErr,
    models::{board::Board, group::Group, user::User},
    types::PermissionKey,
};

use crate::services::auth::Caller;

/// Resolution order: administrators hold every permission; everyone else is
/// checked against their group's stored permission list; users without a
/// group are denied. A plain `false` is the normal "not permitted" outcome,
/// never an error.
pub async fn has_permission<C: ConnectionTrait>(
    db: &C,
    caller: &Caller,
    key: PermissionKey,
) -> Result<bool, DbErr> {
    if caller.is_admin {
        return Ok(true);
    }

    let Some(user) = User::find_by_id(db, caller.id).await? else {
        return Ok(false);
    };
    let Some(group_id) = user.group_id else {
        return Ok(false);
    };
    let Some(group) = Group::find_by_id(db, group_id).await? else {
        return Ok(false);
    };
    Ok(group.permissions.contains(&key))
}

/// Board deletion bypasses the permission table: owner or admin only.
pub fn can_delete_board(caller: &Caller, board: &Board) -> bool {
    caller.is_admin || board.owner_id == caller.id
}

#[cfg(test)]
mod tests {
    use db::models::{
        group::{CreateGroup, Group},
        user::{CreateUser, User},
    };
    use sea_orm::{ConnectOptions, Database, DatabaseConnection};
    use sea_orm_migration::MigratorTrait;
    use uuid::Uuid;

    use super::*;

    async fn memory_db() -> DatabaseConnection {
        let mut options = ConnectOptions::new("sqlite::memory:".to_string());
        options.max_connections(1).sqlx_logging(false);
        let db = Database::connect(options).await.unwrap();
        db_migration::Migrator::up(&db, None).await.unwrap();
        db
    }

    async fn caller_for(db: &DatabaseConnection, is_admin: bool, group_id: Option<Uuid>) -> Caller {
        let user = User::create(
            db,
            &CreateUser {
                username: format!("user-{}", Uuid::new_v4()),
                password_hash: "hash".to_string(),
                is_admin,
                group_id,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        Caller {
            id: user.id,
            username: user.username,
            is_admin: user.is_admin,
        }
    }

    #[tokio::test]
    async fn admins_pass_every_check_without_a_group() {
        let db = memory_db().await;
        let admin = caller_for(&db, true, None).await;

        for key in [
            PermissionKey::CreateBoard,
            PermissionKey::EditBoard,
            PermissionKey::CreateTask,
            PermissionKey::EditTask,
            PermissionKey::DeleteTask,
        ] {
            assert!(has_permission(&db, &admin, key).await.unwrap());
        }
    }

    #[tokio::test]
    async fn group_members_hold_exactly_their_group_permissions() {
        let db = memory_db().await;
        let group = Group::create(
            &db,
            &CreateGroup {
                name: "Editors".to_string(),
                permissions: vec![PermissionKey::EditTask, PermissionKey::CreateTask],
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let member = caller_for(&db, false, Some(group.id)).await;

        assert!(has_permission(&db, &member, PermissionKey::EditTask)
            .await
            .unwrap());
        assert!(!has_permission(&db, &member, PermissionKey::CreateBoard)
            .await
            .unwrap());
    }

    #[test]
    fn board_deletion_is_owner_or_admin_only() {
        let owner_id = Uuid::new_v4();
        let board = db::models::board::Board {
            id: Uuid::new_v4(),
            title: "Board".to_string(),
            owner_id,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };

        let owner = Caller {
            id: owner_id,
            username: "owner".to_string(),
            is_admin: false,
        };
        let admin = Caller {
            id: Uuid::new_v4(),
            username: "admin".to_string(),
            is_admin: true,
        };
        let member = Caller {
            id: Uuid::new_v4(),
            username: "member".to_string(),
            is_admin: false,
        };

        assert!(can_delete_board(&owner, &board));
        assert!(can_delete_board(&admin, &board));
        assert!(!can_delete_board(&member, &board));
    }

    #[tokio::test]
    async fn users_without_a_group_are_denied() {
        let db = memory_db().await;
        let loner = caller_for(&db, false, None).await;

        assert!(!has_permission(&db, &loner, PermissionKey::CreateBoard)
            .await
            .unwrap());
    }
}
