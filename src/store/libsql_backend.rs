//! libSQL backend — async `TaskStore` implementation.
//!
//! Supports local file and in-memory databases. Timestamps are written as
//! fixed-width RFC 3339 UTC strings so they sort lexicographically; task
//! deadlines are plain `YYYY-MM-DD` dates.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::TaskStore;
use crate::tasks::model::{
    Category, MonthlyRecurrence, NewTask, RECUR_TYPE_MONTHLY, Schedule, Task, User, UserIdentity,
};

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db)?;
        backend.init_schema().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let backend = Self::from_database(db)?;
        backend.init_schema().await?;
        Ok(backend)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Canonical write format: RFC 3339, microseconds, `Z` suffix.
fn fmt_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn fmt_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Split a schedule into the `(is_recurring, recur_type, recur_day, recur_window)` columns.
fn schedule_columns(schedule: &Schedule) -> (i64, &'static str, i64, i64) {
    match schedule {
        Schedule::OneOff => (0, "", 0, 0),
        Schedule::Monthly(rec) => (
            1,
            RECUR_TYPE_MONTHLY,
            i64::from(rec.day),
            i64::from(rec.window_days),
        ),
    }
}

// ── TaskStore implementation ────────────────────────────────────────

#[async_trait]
impl TaskStore for LibSqlBackend {
    async fn init_schema(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Users ───────────────────────────────────────────────────────

    async fn upsert_user(&self, identity: &UserIdentity) -> Result<User, DatabaseError> {
        let conn = self.conn();
        let now = fmt_datetime(&Utc::now());
        let mut rows = conn
            .query(
                &format!(
                    "INSERT INTO users (telegram_id, first_name, last_name, username, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                     ON CONFLICT(telegram_id) DO UPDATE SET
                        first_name = excluded.first_name,
                        last_name = excluded.last_name,
                        username = excluded.username,
                        updated_at = excluded.updated_at
                     RETURNING {USER_COLUMNS}"
                ),
                params![
                    identity.telegram_id,
                    identity.first_name.as_str(),
                    identity.last_name.as_str(),
                    identity.username.as_str(),
                    now,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_user: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => row_to_user(&row),
            Ok(None) => Err(DatabaseError::NotFound {
                entity: "user".to_string(),
                id: identity.telegram_id.to_string(),
            }),
            Err(e) => Err(DatabaseError::Query(format!("upsert_user row: {e}"))),
        }
    }

    async fn list_users(&self) -> Result<Vec<User>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"), ())
            .await
            .map_err(|e| DatabaseError::Query(format!("list_users: {e}")))?;

        let mut users = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_users row: {e}")))?
        {
            users.push(row_to_user(&row)?);
        }
        Ok(users)
    }

    // ── Categories ──────────────────────────────────────────────────

    async fn get_or_create_category(
        &self,
        user_id: i64,
        name: &str,
    ) -> Result<Category, DatabaseError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO categories (user_id, name, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id, name) DO NOTHING",
            params![user_id, name, fmt_datetime(&Utc::now())],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("get_or_create_category: {e}")))?;

        let mut rows = conn
            .query(
                &format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE user_id = ?1 AND name = ?2"),
                params![user_id, name],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_or_create_category select: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => row_to_category(&row),
            Ok(None) => Err(DatabaseError::NotFound {
                entity: "category".to_string(),
                id: name.to_string(),
            }),
            Err(e) => Err(DatabaseError::Query(format!("get_or_create_category row: {e}"))),
        }
    }

    async fn list_categories(&self, user_id: i64) -> Result<Vec<Category>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE user_id = ?1 ORDER BY name"),
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_categories: {e}")))?;

        let mut categories = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_categories row: {e}")))?
        {
            categories.push(row_to_category(&row)?);
        }
        Ok(categories)
    }

    // ── Tasks ───────────────────────────────────────────────────────

    async fn create_task(&self, task: &NewTask) -> Result<Task, DatabaseError> {
        let conn = self.conn();
        let (is_recurring, recur_type, recur_day, recur_window) = schedule_columns(&task.schedule);
        let created_at = fmt_datetime(&task.created_at);

        // RETURNING keeps the id tied to this statement on the shared connection.
        let mut rows = conn
            .query(
                &format!(
                    "INSERT INTO tasks (user_id, category_id, title, description, deadline, is_completed, is_recurring, recur_type, recur_day, recur_window, last_completed_at, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7, ?8, ?9, NULL, ?10, ?10)
                     RETURNING {TASK_COLUMNS}"
                ),
                params![
                    task.user_id,
                    task.category_id,
                    task.title.as_str(),
                    task.description.as_deref().unwrap_or(""),
                    task.deadline.as_ref().map(fmt_date),
                    is_recurring,
                    recur_type,
                    recur_day,
                    recur_window,
                    created_at,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("create_task: {e}")))?;

        let created = match rows.next().await {
            Ok(Some(row)) => row_to_task(&row)?,
            Ok(None) => {
                return Err(DatabaseError::Query(
                    "create_task: insert returned no row".to_string(),
                ));
            }
            Err(e) => return Err(DatabaseError::Query(format!("create_task row: {e}"))),
        };
        debug!(id = created.id, user_id = created.user_id, "Task created");
        Ok(created)
    }

    async fn find_task(&self, user_id: i64, task_id: i64) -> Result<Option<Task>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1 AND user_id = ?2"),
                params![task_id, user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("find_task: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_task(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("find_task row: {e}"))),
        }
    }

    async fn list_actionable_tasks(&self, user_id: i64) -> Result<Vec<Task>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {TASK_COLUMNS} FROM tasks
                     WHERE user_id = ?1 AND (is_completed = 0 OR is_recurring = 1)
                     ORDER BY deadline IS NULL, deadline ASC, created_at DESC, id DESC"
                ),
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_actionable_tasks: {e}")))?;

        let mut tasks = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_actionable_tasks row: {e}")))?
        {
            tasks.push(row_to_task(&row)?);
        }
        Ok(tasks)
    }

    async fn update_task_completion(&self, task: &Task) -> Result<(), DatabaseError> {
        let conn = self.conn();
        let affected = conn
            .execute(
                "UPDATE tasks SET is_completed = ?1, last_completed_at = ?2, updated_at = ?3
                 WHERE id = ?4 AND user_id = ?5",
                params![
                    task.completed as i64,
                    task.last_satisfied_at.as_ref().map(fmt_datetime),
                    fmt_datetime(&task.updated_at),
                    task.id,
                    task.user_id,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_task_completion: {e}")))?;

        if affected == 0 {
            return Err(DatabaseError::NotFound {
                entity: "task".to_string(),
                id: task.id.to_string(),
            });
        }
        debug!(id = task.id, completed = task.completed, "Task completion updated");
        Ok(())
    }

    async fn delete_task(&self, user_id: i64, task_id: i64) -> Result<bool, DatabaseError> {
        let conn = self.conn();
        let affected = conn
            .execute(
                "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2",
                params![task_id, user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_task: {e}")))?;
        Ok(affected > 0)
    }
}

// ── Row mapping helpers ─────────────────────────────────────────────

const USER_COLUMNS: &str =
    "id, telegram_id, first_name, last_name, username, created_at, updated_at";

const CATEGORY_COLUMNS: &str = "id, user_id, name, created_at";

/// Column list for task SELECT queries (14 columns).
const TASK_COLUMNS: &str = "id, user_id, category_id, title, description, deadline, is_completed, is_recurring, recur_type, recur_day, recur_window, last_completed_at, created_at, updated_at";

fn row_to_user(row: &libsql::Row) -> Result<User, DatabaseError> {
    let id: i64 = row.get(0).map_err(|e| DatabaseError::Query(format!("user.id: {e}")))?;
    let telegram_id: i64 = row
        .get(1)
        .map_err(|e| DatabaseError::Query(format!("user.telegram_id: {e}")))?;
    let created_at: String = row.get(5).unwrap_or_default();
    let updated_at: String = row.get(6).unwrap_or_default();

    Ok(User {
        id,
        telegram_id,
        first_name: row.get(2).unwrap_or_default(),
        last_name: row.get(3).unwrap_or_default(),
        username: row.get(4).unwrap_or_default(),
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

fn row_to_category(row: &libsql::Row) -> Result<Category, DatabaseError> {
    let id: i64 = row.get(0).map_err(|e| DatabaseError::Query(format!("category.id: {e}")))?;
    let user_id: i64 = row
        .get(1)
        .map_err(|e| DatabaseError::Query(format!("category.user_id: {e}")))?;
    let name: String = row
        .get(2)
        .map_err(|e| DatabaseError::Query(format!("category.name: {e}")))?;
    let created_at: String = row.get(3).unwrap_or_default();

    Ok(Category {
        id,
        user_id,
        name,
        created_at: parse_datetime(&created_at),
    })
}

fn row_to_task(row: &libsql::Row) -> Result<Task, DatabaseError> {
    let id: i64 = row.get(0).map_err(|e| DatabaseError::Query(format!("task.id: {e}")))?;
    let user_id: i64 = row
        .get(1)
        .map_err(|e| DatabaseError::Query(format!("task.user_id: {e}")))?;
    let category_id: Option<i64> = row.get::<i64>(2).ok();
    let title: String = row
        .get(3)
        .map_err(|e| DatabaseError::Query(format!("task.title: {e}")))?;

    let desc_raw: String = row.get(4).unwrap_or_default();
    let description = if desc_raw.is_empty() { None } else { Some(desc_raw) };

    let deadline_str: Option<String> = row.get(5).ok();
    let deadline = deadline_str
        .filter(|s| !s.is_empty())
        .and_then(|s| parse_date(&s));

    let completed = row.get::<i64>(6).unwrap_or(0) != 0;
    let is_recurring = row.get::<i64>(7).unwrap_or(0) != 0;
    let recur_type: String = row.get(8).unwrap_or_default();
    let schedule = if is_recurring && recur_type == RECUR_TYPE_MONTHLY {
        let day = u32::try_from(row.get::<i64>(9).unwrap_or(0))
            .map_err(|e| DatabaseError::Serialization(format!("task.recur_day: {e}")))?;
        let window = u32::try_from(row.get::<i64>(10).unwrap_or(0))
            .map_err(|e| DatabaseError::Serialization(format!("task.recur_window: {e}")))?;
        Schedule::Monthly(MonthlyRecurrence::new(day, window))
    } else {
        Schedule::OneOff
    };

    let last_completed_str: Option<String> = row.get(11).ok();
    let last_satisfied_at = last_completed_str
        .filter(|s| !s.is_empty())
        .map(|s| parse_datetime(&s));

    let created_at: String = row.get(12).unwrap_or_default();
    let updated_at: String = row.get(13).unwrap_or_default();

    Ok(Task {
        id,
        user_id,
        category_id,
        title,
        description,
        deadline,
        schedule,
        completed,
        last_satisfied_at,
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    async fn test_db() -> LibSqlBackend {
        LibSqlBackend::new_memory().await.unwrap()
    }

    async fn make_user(db: &LibSqlBackend, telegram_id: i64) -> User {
        db.upsert_user(&UserIdentity {
            telegram_id,
            first_name: "Ann".into(),
            ..Default::default()
        })
        .await
        .unwrap()
    }

    fn new_task(user_id: i64, title: &str) -> NewTask {
        NewTask {
            user_id,
            category_id: None,
            title: title.to_string(),
            description: None,
            deadline: None,
            schedule: Schedule::OneOff,
            created_at: Utc::now(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ── User tests ──────────────────────────────────────────────────

    #[tokio::test]
    async fn upsert_user_refreshes_profile() {
        let db = test_db().await;
        let first = make_user(&db, 42).await;

        let again = db
            .upsert_user(&UserIdentity {
                telegram_id: 42,
                first_name: "Anna".into(),
                username: "anna".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(first.id, again.id);
        assert_eq!(again.first_name, "Anna");
        assert_eq!(again.username, "anna");
        assert_eq!(db.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn list_users_oldest_first() {
        let db = test_db().await;
        let a = make_user(&db, 1).await;
        let b = make_user(&db, 2).await;
        let ids: Vec<i64> = db.list_users().await.unwrap().iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
    }

    // ── Category tests ──────────────────────────────────────────────

    #[tokio::test]
    async fn get_or_create_category_is_idempotent() {
        let db = test_db().await;
        let user = make_user(&db, 1).await;

        let first = db.get_or_create_category(user.id, "Home").await.unwrap();
        let second = db.get_or_create_category(user.id, "Home").await.unwrap();
        assert_eq!(first.id, second.id);

        let other_case = db.get_or_create_category(user.id, "home").await.unwrap();
        assert_ne!(first.id, other_case.id);
    }

    #[tokio::test]
    async fn categories_are_owner_scoped_and_sorted() {
        let db = test_db().await;
        let ann = make_user(&db, 1).await;
        let bob = make_user(&db, 2).await;

        db.get_or_create_category(ann.id, "Work").await.unwrap();
        db.get_or_create_category(ann.id, "Home").await.unwrap();
        db.get_or_create_category(bob.id, "Garden").await.unwrap();

        let names: Vec<String> = db
            .list_categories(ann.id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Home", "Work"]);
    }

    // ── Task tests ──────────────────────────────────────────────────

    #[tokio::test]
    async fn create_and_find_task() {
        let db = test_db().await;
        let user = make_user(&db, 1).await;
        let category = db.get_or_create_category(user.id, "Home").await.unwrap();

        let mut task = new_task(user.id, "Pay rent");
        task.category_id = Some(category.id);
        task.description = Some("landlord".into());
        task.deadline = Some(date(2026, 4, 30));
        task.schedule = Schedule::Monthly(MonthlyRecurrence::new(31, 2));

        let created = db.create_task(&task).await.unwrap();
        assert!(created.id > 0);

        let found = db.find_task(user.id, created.id).await.unwrap().unwrap();
        assert_eq!(found.title, "Pay rent");
        assert_eq!(found.category_id, Some(category.id));
        assert_eq!(found.description.as_deref(), Some("landlord"));
        assert_eq!(found.deadline, Some(date(2026, 4, 30)));
        assert_eq!(found.schedule, Schedule::Monthly(MonthlyRecurrence::new(31, 2)));
        assert!(!found.completed);
        assert!(found.last_satisfied_at.is_none());
    }

    #[tokio::test]
    async fn empty_description_reads_back_as_none() {
        let db = test_db().await;
        let user = make_user(&db, 1).await;
        let created = db.create_task(&new_task(user.id, "x")).await.unwrap();
        assert!(created.description.is_none());
        assert!(created.deadline.is_none());
        assert_eq!(created.schedule, Schedule::OneOff);
    }

    #[tokio::test]
    async fn find_task_is_owner_scoped() {
        let db = test_db().await;
        let ann = make_user(&db, 1).await;
        let bob = make_user(&db, 2).await;
        let task = db.create_task(&new_task(ann.id, "secret")).await.unwrap();

        assert!(db.find_task(bob.id, task.id).await.unwrap().is_none());
        assert!(db.find_task(ann.id, task.id).await.unwrap().is_some());
        assert!(!db.delete_task(bob.id, task.id).await.unwrap());
    }

    #[tokio::test]
    async fn actionable_tasks_filter_and_order() {
        let db = test_db().await;
        let user = make_user(&db, 1).await;
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();

        let mut undated_old = new_task(user.id, "undated old");
        undated_old.created_at = base;
        let mut undated_new = new_task(user.id, "undated new");
        undated_new.created_at = base + Duration::hours(1);
        let mut late = new_task(user.id, "late");
        late.deadline = Some(date(2026, 5, 1));
        let mut soon = new_task(user.id, "soon");
        soon.deadline = Some(date(2026, 3, 10));
        let mut recurring = new_task(user.id, "recurring");
        recurring.schedule = Schedule::Monthly(MonthlyRecurrence::new(5, 1));
        recurring.created_at = base - Duration::hours(1);
        let done = new_task(user.id, "done");

        for t in [&undated_old, &undated_new, &late, &soon, &recurring, &done] {
            db.create_task(t).await.unwrap();
        }
        let mut done_task = db
            .list_actionable_tasks(user.id)
            .await
            .unwrap()
            .into_iter()
            .find(|t| t.title == "done")
            .unwrap();
        done_task.completed = true;
        done_task.last_satisfied_at = Some(Utc::now());
        db.update_task_completion(&done_task).await.unwrap();

        let titles: Vec<String> = db
            .list_actionable_tasks(user.id)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(
            titles,
            vec!["soon", "late", "undated new", "undated old", "recurring"]
        );
    }

    #[tokio::test]
    async fn recurring_task_stays_actionable_after_completion() {
        let db = test_db().await;
        let user = make_user(&db, 1).await;
        let mut task = new_task(user.id, "rent");
        task.schedule = Schedule::Monthly(MonthlyRecurrence::new(1, 0));
        let mut created = db.create_task(&task).await.unwrap();

        let when = Utc.with_ymd_and_hms(2026, 4, 1, 10, 0, 0).unwrap();
        created.last_satisfied_at = Some(when);
        created.updated_at = when;
        db.update_task_completion(&created).await.unwrap();

        let listed = db.list_actionable_tasks(user.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].last_satisfied_at, Some(when));
        assert!(!listed[0].completed);
    }

    #[tokio::test]
    async fn update_missing_task_is_not_found() {
        let db = test_db().await;
        let user = make_user(&db, 1).await;
        let mut task = db.create_task(&new_task(user.id, "x")).await.unwrap();
        task.id += 100;
        let err = db.update_task_completion(&task).await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[tokio::test]
    async fn delete_task_reports_removal() {
        let db = test_db().await;
        let user = make_user(&db, 1).await;
        let task = db.create_task(&new_task(user.id, "x")).await.unwrap();

        assert!(db.delete_task(user.id, task.id).await.unwrap());
        assert!(!db.delete_task(user.id, task.id).await.unwrap());
        assert!(db.find_task(user.id, task.id).await.unwrap().is_none());
    }

    #[test]
    fn datetime_format_is_fixed_width() {
        let a = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let b = a + Duration::milliseconds(500);
        assert_eq!(fmt_datetime(&a).len(), fmt_datetime(&b).len());
        assert!(fmt_datetime(&a) < fmt_datetime(&b));
        assert_eq!(parse_datetime(&fmt_datetime(&b)), b);
    }
}
