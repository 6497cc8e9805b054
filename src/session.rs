use chrono::{Duration, Utc};
use sea_orm::{
    sea_query::OnConflict, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set,
};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::entities::session::{self, Entity as SessionEntity};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("session storage failed: {0}")]
    Db(#[from] DbErr),
    #[error("failed to encode session data: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Key/value bag stored per browser session. Writes stay in memory until
/// [`Session::save`] runs, which only touches the store when something was
/// marked modified.
#[derive(Clone, Debug)]
pub struct Session {
    key: String,
    data: Map<String, Value>,
    modified: bool,
}

impl Session {
    pub fn new(key: impl Into<String>) -> Self {
        Session {
            key: key.into(),
            data: Map::new(),
            modified: false,
        }
    }

    pub async fn load<C: ConnectionTrait>(conn: &C, key: &str) -> Result<Self, SessionError> {
        let mut session = Session::new(key);

        if let Some(row) = SessionEntity::find_by_id(key.to_owned()).one(conn).await? {
            match serde_json::from_str::<Value>(&row.data) {
                Ok(Value::Object(data)) => session.data = data,
                Ok(_) | Err(_) => {
                    tracing::warn!(session = key, "Discarding unreadable session data");
                }
            }
        }

        Ok(session)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.data.insert(name.to_owned(), value);
        self.mark_modified();
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let removed = self.data.remove(name);
        if removed.is_some() {
            self.mark_modified();
        }
        removed
    }

    pub fn mark_modified(&mut self) {
        self.modified = true;
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub async fn save<C: ConnectionTrait>(&mut self, conn: &C) -> Result<(), SessionError> {
        if !self.modified {
            return Ok(());
        }

        let row = session::ActiveModel {
            key: Set(self.key.clone()),
            data: Set(serde_json::to_string(&self.data)?),
            updated_at: Set(Utc::now()),
        };

        SessionEntity::insert(row)
            .on_conflict(
                OnConflict::column(session::Column::Key)
                    .update_columns([session::Column::Data, session::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await?;

        self.modified = false;
        Ok(())
    }
}

/// Deletes sessions nobody wrote to within `max_age`. Their tokens have
/// expired, so the carts in them can no longer be reached.
pub async fn purge_stale<C: ConnectionTrait>(conn: &C, max_age: Duration) -> Result<u64, DbErr> {
    let cutoff = Utc::now() - max_age;
    let result = SessionEntity::delete_many()
        .filter(session::Column::UpdatedAt.lt(cutoff))
        .exec(conn)
        .await?;

    if result.rows_affected > 0 {
        tracing::info!(removed = result.rows_affected, "Purged stale sessions");
    }
    Ok(result.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn remove_of_missing_value_is_not_a_modification() {
        let mut session = Session::new("abc");
        assert!(session.remove("cart").is_none());
        assert!(!session.is_modified());

        session.set("cart", json!({}));
        assert!(session.is_modified());
        assert_eq!(session.get("cart"), Some(&json!({})));
    }
}
