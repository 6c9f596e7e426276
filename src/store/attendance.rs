use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::AppError;
use crate::model::attendance::{AttendanceEntry, AttendanceRecord, AttendanceStatus};

/// Records `user_id` as present on `date`. Marking the same day again
/// overwrites the existing row instead of adding another.
pub async fn mark_present(pool: &SqlitePool, user_id: i64, date: NaiveDate) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO attendance (user_id, date, status)
        VALUES (?, ?, ?)
        ON CONFLICT (user_id, date) DO UPDATE SET status = excluded.status
        "#,
    )
    .bind(user_id)
    .bind(date)
    .bind(AttendanceStatus::Present)
    .execute(pool)
    .await?;

    debug!(user_id, %date, "Attendance marked");
    Ok(())
}

pub async fn find_for_user_on(
    pool: &SqlitePool,
    user_id: i64,
    date: NaiveDate,
) -> Result<Option<AttendanceRecord>, AppError> {
    Ok(sqlx::query_as::<_, AttendanceRecord>(
        r#"
        SELECT id, user_id, date, status, created_at
        FROM attendance
        WHERE user_id = ? AND date = ?
        "#,
    )
    .bind(user_id)
    .bind(date)
    .fetch_optional(pool)
    .await?)
}

/// Most recent records first.
pub async fn list_for_user(
    pool: &SqlitePool,
    user_id: i64,
    limit: i64,
) -> Result<Vec<AttendanceRecord>, AppError> {
    Ok(sqlx::query_as::<_, AttendanceRecord>(
        r#"
        SELECT id, user_id, date, status, created_at
        FROM attendance
        WHERE user_id = ?
        ORDER BY date DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?)
}

pub async fn list_for_date(pool: &SqlitePool, date: NaiveDate) -> Result<Vec<AttendanceEntry>, AppError> {
    Ok(sqlx::query_as::<_, AttendanceEntry>(
        r#"
        SELECT a.user_id, u.username, u.name, u.department, a.date, a.status
        FROM attendance a
        JOIN users u ON u.id = a.user_id
        WHERE a.date = ?
        ORDER BY u.name COLLATE NOCASE
        "#,
    )
    .bind(date)
    .fetch_all(pool)
    .await?)
}

pub async fn count_present_on(pool: &SqlitePool, date: NaiveDate) -> Result<i64, AppError> {
    Ok(sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM attendance WHERE date = ? AND status = ?",
    )
    .bind(date)
    .bind(AttendanceStatus::Present)
    .fetch_one(pool)
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{insert_employee, memory_pool, test_hasher};

    #[actix_web::test]
    async fn marking_twice_keeps_one_present_record() {
        let pool = memory_pool().await;
        let hasher = test_hasher();
        let alice = insert_employee(&pool, &hasher, "alice", "pw123456", "Alice A").await;
        let day = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();

        mark_present(&pool, alice, day).await.unwrap();
        mark_present(&pool, alice, day).await.unwrap();

        let records = list_for_user(&pool, alice, 10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, day);
        assert_eq!(records[0].status, AttendanceStatus::Present);
    }

    #[actix_web::test]
    async fn re_marking_overwrites_absent() {
        let pool = memory_pool().await;
        let hasher = test_hasher();
        let alice = insert_employee(&pool, &hasher, "alice", "pw123456", "Alice A").await;
        let day = NaiveDate::from_ymd_opt(2024, 1, 11).unwrap();

        sqlx::query("INSERT INTO attendance (user_id, date, status) VALUES (?, ?, 'absent')")
            .bind(alice)
            .bind(day)
            .execute(&pool)
            .await
            .unwrap();
        mark_present(&pool, alice, day).await.unwrap();

        let record = find_for_user_on(&pool, alice, day).await.unwrap().unwrap();
        assert_eq!(record.status, AttendanceStatus::Present);
        assert_eq!(count_present_on(&pool, day).await.unwrap(), 1);
    }

    #[actix_web::test]
    async fn report_joins_owner_names() {
        let pool = memory_pool().await;
        let hasher = test_hasher();
        let alice = insert_employee(&pool, &hasher, "alice", "pw123456", "Alice A").await;
        let bob = insert_employee(&pool, &hasher, "bob", "pw123456", "Bob B").await;
        let day = NaiveDate::from_ymd_opt(2024, 1, 12).unwrap();
        let other_day = NaiveDate::from_ymd_opt(2024, 1, 13).unwrap();

        mark_present(&pool, bob, day).await.unwrap();
        mark_present(&pool, alice, day).await.unwrap();
        mark_present(&pool, alice, other_day).await.unwrap();

        let entries = list_for_date(&pool, day).await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Alice A", "Bob B"]);
    }
}
