use sqlx::SqlitePool;

use crate::entities::Category;

/// Active categories whose codes may be maintained, by sort key.
pub async fn list(db_pool: &SqlitePool) -> Result<Vec<Category>, sqlx::Error> {
    sqlx::query_as(
        "SELECT category, display_name, maintenance_flag, sort_key, remarks, \
                create_user, create_date, update_user, update_date, del_flag \
         FROM m_category \
         WHERE del_flag = 0 AND maintenance_flag = 1 \
         ORDER BY sort_key",
    )
    .fetch_all(db_pool)
    .await
}

pub async fn find_by_id(db_pool: &SqlitePool, category: &str) -> Result<Option<Category>, sqlx::Error> {
    sqlx::query_as(
        "SELECT category, display_name, maintenance_flag, sort_key, remarks, \
                create_user, create_date, update_user, update_date, del_flag \
         FROM m_category WHERE category = ?",
    )
    .bind(category)
    .fetch_optional(db_pool)
    .await
}
