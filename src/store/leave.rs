use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::info;

use super::PageRequest;
use crate::error::AppError;
use crate::model::leave_application::{
    LeaveApplication, LeaveDecision, LeaveStatus, LeaveWithApplicant,
};

const LEAVE_COLUMNS: &str =
    "id, user_id, start_date, end_date, reason, status, admin_comment, created_at";

pub struct NewLeave<'a> {
    pub user_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: &'a str,
}

/// Inserts a new application; status always starts as `pending`.
pub async fn create(pool: &SqlitePool, leave: &NewLeave<'_>) -> Result<i64, AppError> {
    let result = sqlx::query(
        r#"
        INSERT INTO leave_applications (user_id, start_date, end_date, reason, status)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(leave.user_id)
    .bind(leave.start_date)
    .bind(leave.end_date)
    .bind(leave.reason)
    .bind(LeaveStatus::Pending)
    .execute(pool)
    .await?;

    let id = result.last_insert_rowid();
    info!(leave_id = id, user_id = leave.user_id, "Leave application submitted");
    Ok(id)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<LeaveApplication>, AppError> {
    let sql = format!("SELECT {} FROM leave_applications WHERE id = ?", LEAVE_COLUMNS);
    Ok(sqlx::query_as::<_, LeaveApplication>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?)
}

pub async fn list_for_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<LeaveApplication>, AppError> {
    let sql = format!(
        "SELECT {} FROM leave_applications WHERE user_id = ? ORDER BY created_at DESC, id DESC",
        LEAVE_COLUMNS
    );
    Ok(sqlx::query_as::<_, LeaveApplication>(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await?)
}

/// Admin queue, newest first, optionally narrowed to one status.
pub async fn list_all(
    pool: &SqlitePool,
    status: Option<LeaveStatus>,
    page: PageRequest,
) -> Result<(Vec<LeaveWithApplicant>, i64), AppError> {
    let where_sql = if status.is_some() {
        " WHERE l.status = ?"
    } else {
        ""
    };

    let count_sql = format!("SELECT COUNT(*) FROM leave_applications l{}", where_sql);
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    if let Some(status) = status {
        count_q = count_q.bind(status);
    }
    let total = count_q.fetch_one(pool).await?;

    let data_sql = format!(
        r#"
        SELECT l.id, l.user_id, u.username, u.name, l.start_date, l.end_date,
               l.reason, l.status, l.admin_comment, l.created_at
        FROM leave_applications l
        JOIN users u ON u.id = l.user_id
        {}
        ORDER BY l.created_at DESC, l.id DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );
    let mut data_q = sqlx::query_as::<_, LeaveWithApplicant>(&data_sql);
    if let Some(status) = status {
        data_q = data_q.bind(status);
    }
    let leaves = data_q
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

    Ok((leaves, total))
}

pub async fn count_by_status(pool: &SqlitePool, status: LeaveStatus) -> Result<i64, AppError> {
    Ok(
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM leave_applications WHERE status = ?")
            .bind(status)
            .fetch_one(pool)
            .await?,
    )
}

/// Moves a pending application to the decided state. Returns `false` when
/// the application does not exist or was already decided.
pub async fn decide(
    pool: &SqlitePool,
    id: i64,
    decision: LeaveDecision,
    comment: Option<&str>,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE leave_applications
        SET status = ?, admin_comment = ?
        WHERE id = ?
        AND status = ?
        "#,
    )
    .bind(LeaveStatus::from(decision))
    .bind(comment)
    .bind(id)
    .bind(LeaveStatus::Pending)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{insert_employee, memory_pool, test_hasher};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[actix_web::test]
    async fn approve_with_comment() {
        let pool = memory_pool().await;
        let hasher = test_hasher();
        let alice = insert_employee(&pool, &hasher, "alice", "pw123456", "Alice A").await;

        let id = create(
            &pool,
            &NewLeave {
                user_id: alice,
                start_date: date(10),
                end_date: date(12),
                reason: "trip",
            },
        )
        .await
        .unwrap();
        let leave = find_by_id(&pool, id).await.unwrap().unwrap();
        assert_eq!(leave.status, LeaveStatus::Pending);
        assert_eq!(leave.admin_comment, None);

        assert!(decide(&pool, id, LeaveDecision::Approved, Some("ok")).await.unwrap());

        let leave = find_by_id(&pool, id).await.unwrap().unwrap();
        assert_eq!(leave.status, LeaveStatus::Approved);
        assert_eq!(leave.admin_comment.as_deref(), Some("ok"));
    }

    #[actix_web::test]
    async fn decided_applications_are_final() {
        let pool = memory_pool().await;
        let hasher = test_hasher();
        let alice = insert_employee(&pool, &hasher, "alice", "pw123456", "Alice A").await;
        let new_leave = NewLeave {
            user_id: alice,
            start_date: date(3),
            end_date: date(4),
            reason: "appointment",
        };

        let approved = create(&pool, &new_leave).await.unwrap();
        let rejected = create(&pool, &new_leave).await.unwrap();
        assert!(decide(&pool, approved, LeaveDecision::Approved, None).await.unwrap());
        assert!(decide(&pool, rejected, LeaveDecision::Rejected, Some("busy")).await.unwrap());

        assert!(!decide(&pool, approved, LeaveDecision::Rejected, Some("late")).await.unwrap());
        assert!(!decide(&pool, rejected, LeaveDecision::Approved, None).await.unwrap());
        assert!(!decide(&pool, 9_999, LeaveDecision::Approved, None).await.unwrap());

        let approved = find_by_id(&pool, approved).await.unwrap().unwrap();
        assert_eq!(approved.status, LeaveStatus::Approved);
        assert_eq!(approved.admin_comment, None);
        let rejected = find_by_id(&pool, rejected).await.unwrap().unwrap();
        assert_eq!(rejected.status, LeaveStatus::Rejected);
        assert_eq!(rejected.admin_comment.as_deref(), Some("busy"));
    }

    #[actix_web::test]
    async fn admin_queue_filters_by_status() {
        let pool = memory_pool().await;
        let hasher = test_hasher();
        let alice = insert_employee(&pool, &hasher, "alice", "pw123456", "Alice A").await;
        let bob = insert_employee(&pool, &hasher, "bob", "pw123456", "Bob B").await;

        let first = create(
            &pool,
            &NewLeave {
                user_id: alice,
                start_date: date(1),
                end_date: date(2),
                reason: "rest",
            },
        )
        .await
        .unwrap();
        create(
            &pool,
            &NewLeave {
                user_id: bob,
                start_date: date(5),
                end_date: date(6),
                reason: "moving",
            },
        )
        .await
        .unwrap();
        decide(&pool, first, LeaveDecision::Rejected, None).await.unwrap();

        let (pending, total) = list_all(&pool, Some(LeaveStatus::Pending), PageRequest::new(None, None))
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(pending[0].username, "bob");

        let (all, total) = list_all(&pool, None, PageRequest::new(None, None)).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(all.len(), 2);
        assert_eq!(count_by_status(&pool, LeaveStatus::Rejected).await.unwrap(), 1);
        assert_eq!(list_for_user(&pool, alice).await.unwrap().len(), 1);
    }
}
