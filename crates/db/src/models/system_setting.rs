use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set,
};

use crate::entities::system_setting;

pub struct SystemSetting;

impl SystemSetting {
    pub async fn get<C: ConnectionTrait>(db: &C, key: &str) -> Result<Option<String>, DbErr> {
        let record = system_setting::Entity::find()
            .filter(system_setting::Column::Key.eq(key))
            .one(db)
            .await?;
        Ok(record.map(|model| model.value))
    }

    /// Upsert by key.
    pub async fn set<C: ConnectionTrait>(db: &C, key: &str, value: &str) -> Result<(), DbErr> {
        let existing = system_setting::Entity::find()
            .filter(system_setting::Column::Key.eq(key))
            .one(db)
            .await?;
        match existing {
            Some(record) => {
                let mut active: system_setting::ActiveModel = record.into();
                active.value = Set(value.to_string());
                active.updated_at = Set(Utc::now().into());
                active.update(db).await?;
            }
            None => {
                let active = system_setting::ActiveModel {
                    key: Set(key.to_string()),
                    value: Set(value.to_string()),
                    updated_at: Set(Utc::now().into()),
                    ..Default::default()
                };
                active.insert(db).await?;
            }
        }
        Ok(())
    }

    pub async fn all<C: ConnectionTrait>(db: &C) -> Result<Vec<(String, String)>, DbErr> {
        let records = system_setting::Entity::find().all(db).await?;
        Ok(records
            .into_iter()
            .map(|model| (model.key, model.value))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::memory_db;

    #[tokio::test]
    async fn set_is_an_upsert_under_one_key() {
        let db = memory_db().await;
        assert_eq!(SystemSetting::get(&db, "logo_text").await.unwrap(), None);

        SystemSetting::set(&db, "logo_text", "Flowt").await.unwrap();
        SystemSetting::set(&db, "logo_text", "Acme").await.unwrap();

        assert_eq!(
            SystemSetting::get(&db, "logo_text").await.unwrap(),
            Some("Acme".to_string())
        );
        assert_eq!(SystemSetting::all(&db).await.unwrap().len(), 1);
    }
}
