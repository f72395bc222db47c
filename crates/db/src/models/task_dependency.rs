use std::collections::HashSet;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, Set,
};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    entities::{board_column, task, task_dependency},
    models::{ids, task::TaskRef},
};

#[derive(Debug, Error)]
pub enum DependencyError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Task not found")]
    TaskNotFound,
    #[error("Cannot depend on self")]
    SelfDependency,
    #[error("Circular dependency detected")]
    Cycle,
}

pub struct TaskDependency;

impl TaskDependency {
    /// Inserts the edge `task -> blocking_task` (the task is blocked by the
    /// blocking task). Refuses self-edges and any edge that would close a
    /// cycle; re-adding an existing edge is a no-op.
    pub async fn add<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
        blocking_task_id: Uuid,
    ) -> Result<(), DependencyError> {
        if task_id == blocking_task_id {
            return Err(DependencyError::SelfDependency);
        }

        let task_row_id = ids::task_id_by_uuid(db, task_id)
            .await?
            .ok_or(DependencyError::TaskNotFound)?;
        let blocking_row_id = ids::task_id_by_uuid(db, blocking_task_id)
            .await?
            .ok_or(DependencyError::TaskNotFound)?;

        if Self::reaches(db, blocking_row_id, task_row_id).await? {
            return Err(DependencyError::Cycle);
        }

        let existing = task_dependency::Entity::find()
            .filter(task_dependency::Column::TaskId.eq(task_row_id))
            .filter(task_dependency::Column::BlockedById.eq(blocking_row_id))
            .count(db)
            .await?;
        if existing > 0 {
            return Ok(());
        }

        let edge = task_dependency::ActiveModel {
            task_id: Set(task_row_id),
            blocked_by_id: Set(blocking_row_id),
            ..Default::default()
        };
        edge.insert(db).await?;
        Ok(())
    }

    /// Removes the edge; a missing edge is not an error.
    pub async fn remove<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
        blocking_task_id: Uuid,
    ) -> Result<(), DependencyError> {
        let task_row_id = ids::task_id_by_uuid(db, task_id)
            .await?
            .ok_or(DependencyError::TaskNotFound)?;
        let Some(blocking_row_id) = ids::task_id_by_uuid(db, blocking_task_id).await? else {
            return Ok(());
        };

        task_dependency::Entity::delete_many()
            .filter(task_dependency::Column::TaskId.eq(task_row_id))
            .filter(task_dependency::Column::BlockedById.eq(blocking_row_id))
            .exec(db)
            .await?;
        Ok(())
    }

    /// Tasks this task cannot complete before.
    pub async fn blocked_by<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
    ) -> Result<Vec<TaskRef>, DbErr> {
        let task_row_id = ids::task_id_by_uuid(db, task_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;
        let edges = task_dependency::Entity::find()
            .filter(task_dependency::Column::TaskId.eq(task_row_id))
            .all(db)
            .await?;
        let mut refs = Vec::with_capacity(edges.len());
        for edge in edges {
            if let Some(task_ref) = Self::task_ref(db, edge.blocked_by_id).await? {
                refs.push(task_ref);
            }
        }
        Ok(refs)
    }

    /// Tasks waiting on this one.
    pub async fn blocking<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
    ) -> Result<Vec<TaskRef>, DbErr> {
        let task_row_id = ids::task_id_by_uuid(db, task_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;
        let edges = task_dependency::Entity::find()
            .filter(task_dependency::Column::BlockedById.eq(task_row_id))
            .all(db)
            .await?;
        let mut refs = Vec::with_capacity(edges.len());
        for edge in edges {
            if let Some(task_ref) = Self::task_ref(db, edge.task_id).await? {
                refs.push(task_ref);
            }
        }
        Ok(refs)
    }

    pub async fn blocked_by_count<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
    ) -> Result<u64, DbErr> {
        let task_row_id = ids::task_id_by_uuid(db, task_id)
            .await?
            .ok_or(DbErr::RecordNotFound("Task not found".to_string()))?;
        task_dependency::Entity::find()
            .filter(task_dependency::Column::TaskId.eq(task_row_id))
            .count(db)
            .await
    }

    /// Walks `blocked_by` edges outward from `start`, reporting whether
    /// `needle` is reachable. Catches the direct reverse edge and longer
    /// chains alike.
    async fn reaches<C: ConnectionTrait>(
        db: &C,
        start: i64,
        needle: i64,
    ) -> Result<bool, DbErr> {
        let mut visited: HashSet<i64> = HashSet::new();
        let mut frontier = vec![start];

        while !frontier.is_empty() {
            let edges = task_dependency::Entity::find()
                .filter(task_dependency::Column::TaskId.is_in(frontier.clone()))
                .all(db)
                .await?;
            frontier.clear();
            for edge in edges {
                if edge.blocked_by_id == needle {
                    return Ok(true);
                }
                if visited.insert(edge.blocked_by_id) {
                    frontier.push(edge.blocked_by_id);
                }
            }
        }
        Ok(false)
    }

    async fn task_ref<C: ConnectionTrait>(
        db: &C,
        task_row_id: i64,
    ) -> Result<Option<TaskRef>, DbErr> {
        let Some(model) = task::Entity::find_by_id(task_row_id).one(db).await? else {
            return Ok(None);
        };
        let column_title = board_column::Entity::find_by_id(model.column_id)
            .one(db)
            .await?
            .map(|column| column.title)
            .unwrap_or_default();
        Ok(Some(TaskRef {
            id: model.uuid,
            title: model.title,
            column_title,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        board::{Board, CreateBoard},
        board_column::BoardColumn,
        task::{CreateTask, Task},
        user::{CreateUser, User},
    };
    use crate::test_utils::memory_db;

    async fn seed_tasks(db: &sea_orm::DatabaseConnection, count: usize) -> Vec<Task> {
        let owner = User::create(
            db,
            &CreateUser {
                username: "owner".to_string(),
                password_hash: "hash".to_string(),
                is_admin: false,
                group_id: None,
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let board = Board::create(
            db,
            &CreateBoard {
                title: "Board".to_string(),
            },
            Uuid::new_v4(),
            owner.id,
        )
        .await
        .unwrap();
        let columns = BoardColumn::find_by_board(db, board.id).await.unwrap();

        let mut tasks = Vec::with_capacity(count);
        for index in 0..count {
            tasks.push(
                Task::create(
                    db,
                    &CreateTask {
                        column_id: columns[0].id,
                        title: format!("task-{index}"),
                        position: index as i32,
                    },
                    Uuid::new_v4(),
                )
                .await
                .unwrap(),
            );
        }
        tasks
    }

    #[tokio::test]
    async fn self_dependency_is_rejected() {
        let db = memory_db().await;
        let tasks = seed_tasks(&db, 1).await;

        let err = TaskDependency::add(&db, tasks[0].id, tasks[0].id)
            .await
            .unwrap_err();
        assert!(matches!(err, DependencyError::SelfDependency));
        assert_eq!(err.to_string(), "Cannot depend on self");
    }

    #[tokio::test]
    async fn reverse_edge_is_rejected_as_circular() {
        let db = memory_db().await;
        let tasks = seed_tasks(&db, 2).await;
        let (a, b) = (tasks[0].id, tasks[1].id);

        TaskDependency::add(&db, a, b).await.unwrap();
        let err = TaskDependency::add(&db, b, a).await.unwrap_err();
        assert!(matches!(err, DependencyError::Cycle));
        assert_eq!(err.to_string(), "Circular dependency detected");
    }

    #[tokio::test]
    async fn three_node_cycle_is_rejected() {
        let db = memory_db().await;
        let tasks = seed_tasks(&db, 3).await;
        let (a, b, c) = (tasks[0].id, tasks[1].id, tasks[2].id);

        TaskDependency::add(&db, a, b).await.unwrap();
        TaskDependency::add(&db, b, c).await.unwrap();
        let err = TaskDependency::add(&db, c, a).await.unwrap_err();
        assert!(matches!(err, DependencyError::Cycle));
    }

    #[tokio::test]
    async fn add_and_remove_maintain_both_projections() {
        let db = memory_db().await;
        let tasks = seed_tasks(&db, 2).await;
        let (a, b) = (tasks[0].id, tasks[1].id);

        TaskDependency::add(&db, a, b).await.unwrap();

        let blocked_by = TaskDependency::blocked_by(&db, a).await.unwrap();
        assert_eq!(blocked_by.len(), 1);
        assert_eq!(blocked_by[0].id, b);
        assert_eq!(blocked_by[0].column_title, "To Do");

        let blocking = TaskDependency::blocking(&db, b).await.unwrap();
        assert_eq!(blocking.len(), 1);
        assert_eq!(blocking[0].id, a);

        TaskDependency::remove(&db, a, b).await.unwrap();
        assert!(TaskDependency::blocked_by(&db, a).await.unwrap().is_empty());
        assert!(TaskDependency::blocking(&db, b).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn re_adding_an_edge_is_a_no_op() {
        let db = memory_db().await;
        let tasks = seed_tasks(&db, 2).await;
        let (a, b) = (tasks[0].id, tasks[1].id);

        TaskDependency::add(&db, a, b).await.unwrap();
        TaskDependency::add(&db, a, b).await.unwrap();
        assert_eq!(TaskDependency::blocked_by_count(&db, a).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn removing_a_missing_edge_is_not_an_error() {
        let db = memory_db().await;
        let tasks = seed_tasks(&db, 2).await;
        TaskDependency::remove(&db, tasks[0].id, tasks[1].id)
            .await
            .unwrap();
    }
}
