/// SQLite implementation of the store collaborators
///
/// This plays the role of the REST-shaped completion/analytics backend for
/// the bundled binary. The schema enforces one completion per habit per day,
/// and `fetch_analytics` produces the same loosely typed summary object the
/// remote analytics endpoint does.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, ErrorCode};
use serde_json::{json, Value};

use crate::domain::{
    normalize, CompletionId, CompletionRecord, DateKey, HabitId, HabitSummary, StreakInfo,
};
use crate::storage::{migrations, AnalyticsStore, CompletionStore, HabitCatalog, StoreError};

/// SQLite-based store
///
/// The connection sits behind a lock and is never held across an await.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    today: Option<DateKey>,
}

impl SqliteStore {
    /// Open (or create) the database file and run migrations
    pub fn new(db_path: PathBuf) -> Result<Self, StoreError> {
        let conn = Connection::open(&db_path)
            .map_err(|e| StoreError::Transport(format!("Failed to open database: {}", e)))?;
        let store = Self::from_connection(conn)?;
        tracing::info!("SQLite store initialized at: {:?}", db_path);
        Ok(store)
    }

    /// A throwaway database, used by tests
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Transport(format!("Failed to open database: {}", e)))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute("PRAGMA foreign_keys = ON", [])
            .map_err(|e| StoreError::Transport(format!("Failed to enable foreign keys: {}", e)))?;
        migrations::initialize_database(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            today: None,
        })
    }

    /// Pin the date analytics are computed relative to
    pub fn with_today(mut self, today: DateKey) -> Self {
        self.today = Some(today);
        self
    }

    fn today(&self) -> DateKey {
        self.today.unwrap_or_else(DateKey::today)
    }

    fn load_habits(conn: &Connection, active_only: bool) -> Result<Vec<(HabitSummary, DateTime<Utc>)>, StoreError> {
        let mut sql = "SELECT id, name, color, frequency, is_active, created_at FROM habits".to_string();
        if active_only {
            sql.push_str(" WHERE is_active = 1");
        }
        sql.push_str(" ORDER BY created_at ASC");

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            let id_str: String = row.get(0)?;
            let id = HabitId::parse(&id_str).map_err(|_| {
                rusqlite::Error::InvalidColumnType(0, "Invalid UUID".to_string(), rusqlite::types::Type::Text)
            })?;

            let created_at_str: String = row.get(5)?;
            let created_at = DateTime::parse_from_rfc3339(&created_at_str)
                .map_err(|_| {
                    rusqlite::Error::InvalidColumnType(5, "Invalid datetime".to_string(), rusqlite::types::Type::Text)
                })?
                .with_timezone(&Utc);

            Ok((
                HabitSummary {
                    id,
                    name: row.get(1)?,
                    color: row.get(2)?,
                    frequency: row.get(3)?,
                    is_active: row.get(4)?,
                },
                created_at,
            ))
        })?;

        let mut habits = Vec::new();
        for habit in rows {
            habits.push(habit?);
        }
        Ok(habits)
    }

    /// Every completed day, grouped by habit
    fn load_completion_days(conn: &Connection) -> Result<HashMap<HabitId, BTreeSet<DateKey>>, StoreError> {
        let mut stmt = conn.prepare("SELECT habit_id, completion_date FROM habit_completions")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        let mut days: HashMap<HabitId, BTreeSet<DateKey>> = HashMap::new();
        for row in rows {
            let (habit_id, date) = row?;
            match (HabitId::parse(&habit_id), normalize(&date)) {
                (Ok(habit_id), Ok(date)) => {
                    days.entry(habit_id).or_default().insert(date);
                }
                _ => tracing::warn!("Skipping unreadable completion row ({}, {})", habit_id, date),
            }
        }
        Ok(days)
    }
}

fn count_between(days: &BTreeSet<DateKey>, start: DateKey, end: DateKey) -> u64 {
    if start > end {
        return 0;
    }
    days.range(start..=end).count() as u64
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn map_completion_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CompletionRecord> {
    let id_str: String = row.get(0)?;
    let id = CompletionId::parse(&id_str).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(0, "Invalid UUID".to_string(), rusqlite::types::Type::Text)
    })?;

    let habit_id_str: String = row.get(1)?;
    let habit_id = HabitId::parse(&habit_id_str).map_err(|_| {
        rusqlite::Error::InvalidColumnType(1, "Invalid UUID".to_string(), rusqlite::types::Type::Text)
    })?;

    let created_at_str: String = row.get(3)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at_str)
        .map_err(|_| {
            rusqlite::Error::InvalidColumnType(3, "Invalid datetime".to_string(), rusqlite::types::Type::Text)
        })?
        .with_timezone(&Utc);

    Ok(CompletionRecord::new(id, habit_id, row.get::<_, String>(2)?, created_at))
}

#[async_trait]
impl CompletionStore for SqliteStore {
    async fn list_completions(
        &self,
        habit_id: HabitId,
        start_date: Option<DateKey>,
        end_date: Option<DateKey>,
    ) -> Result<Vec<CompletionRecord>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, habit_id, completion_date, created_at
             FROM habit_completions
             WHERE habit_id = ?1
               AND (?2 IS NULL OR completion_date >= ?2)
               AND (?3 IS NULL OR completion_date <= ?3)
             ORDER BY completion_date DESC",
        )?;

        let rows = stmt.query_map(
            params![
                habit_id.to_string(),
                start_date.map(|d| d.to_string()),
                end_date.map(|d| d.to_string())
            ],
            map_completion_row,
        )?;

        let mut records = Vec::new();
        for record in rows {
            records.push(record?);
        }
        Ok(records)
    }

    async fn create_completion(&self, habit_id: HabitId, date: DateKey) -> Result<CompletionRecord, StoreError> {
        let record = CompletionRecord::new(CompletionId::new(), habit_id, date.to_string(), Utc::now());

        let conn = self.conn.lock();
        let result = conn.execute(
            "INSERT INTO habit_completions (id, habit_id, completion_date, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.id.to_string(),
                habit_id.to_string(),
                record.completion_date,
                record.created_at.to_rfc3339()
            ],
        );

        match result {
            Ok(_) => {
                tracing::debug!("Created completion {} for habit {} on {}", record.id, habit_id, date);
                Ok(record)
            }
            Err(rusqlite::Error::SqliteFailure(err, msg))
                if err.code == ErrorCode::ConstraintViolation
                    && msg.as_deref().map_or(false, |m| m.contains("FOREIGN KEY")) =>
            {
                Err(StoreError::NotFound {
                    what: format!("habit {}", habit_id),
                })
            }
            Err(rusqlite::Error::SqliteFailure(err, _)) if err.code == ErrorCode::ConstraintViolation => {
                Err(StoreError::DuplicateCompletion { habit_id, date })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_completion(&self, record_id: CompletionId) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let rows_affected = conn.execute(
            "DELETE FROM habit_completions WHERE id = ?1",
            params![record_id.to_string()],
        )?;

        if rows_affected == 0 {
            return Err(StoreError::NotFound {
                what: format!("completion {}", record_id),
            });
        }

        tracing::debug!("Deleted completion {}", record_id);
        Ok(())
    }
}

#[async_trait]
impl HabitCatalog for SqliteStore {
    async fn list_habits(&self, active_only: bool) -> Result<Vec<HabitSummary>, StoreError> {
        let conn = self.conn.lock();
        let habits = Self::load_habits(&conn, active_only)?;
        Ok(habits.into_iter().map(|(habit, _)| habit).collect())
    }

    async fn create_habit(&self, habit: &HabitSummary) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO habits (id, name, color, frequency, created_at, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                habit.id.to_string(),
                habit.name,
                habit.color,
                habit.frequency,
                Utc::now().to_rfc3339(),
                habit.is_active
            ],
        )?;

        tracing::debug!("Created habit: {} ({})", habit.name, habit.id);
        Ok(())
    }
}

#[async_trait]
impl AnalyticsStore for SqliteStore {
    async fn fetch_analytics(&self) -> Result<Value, StoreError> {
        let today = self.today();
        let week_start = today.week_start();
        let month_start = today.month_start();

        let conn = self.conn.lock();
        let habits = Self::load_habits(&conn, false)?;
        let days = Self::load_completion_days(&conn)?;
        drop(conn);

        let empty = BTreeSet::new();
        let active: Vec<_> = habits.iter().filter(|(h, _)| h.is_active).collect();

        let total_completions: u64 = days.values().map(|d| d.len() as u64).sum();
        let completions_this_week: u64 = days.values().map(|d| count_between(d, week_start, today)).sum();
        let completions_this_month: u64 = days.values().map(|d| count_between(d, month_start, today)).sum();

        let days_in_month_so_far = today.days_since(month_start) + 1;
        let expected = if active.is_empty() {
            1.0
        } else {
            (active.len() as i64 * days_in_month_so_far) as f64
        };
        let overall_completion_rate = round2(completions_this_month as f64 / expected * 100.0);

        let mut streaks = Vec::new();
        let mut habit_stats = Vec::new();
        for (habit, created_at) in &active {
            let completed = days.get(&habit.id).unwrap_or(&empty);
            let streak = StreakInfo::authoritative(habit.id, completed, today);

            streaks.push(json!({
                "habit_id": habit.id,
                "habit_name": habit.name,
                "current_streak": streak.current_streak,
                "longest_streak": streak.longest_streak,
                "last_completion_date": streak.last_completion_date,
                "streak_start_date": streak.streak_start_date,
            }));

            let month_count = count_between(completed, month_start, today);
            let days_since_creation = (today.days_since(DateKey::from(created_at.date_naive())) + 1).max(1);
            habit_stats.push(json!({
                "habit_id": habit.id,
                "habit_name": habit.name,
                "total_completions": month_count,
                "current_streak": streak.current_streak,
                "longest_streak": streak.longest_streak,
                "completion_rate": month_count as f64 / days_since_creation as f64 * 100.0,
                "last_completion_date": streak.last_completion_date,
            }));
        }

        Ok(json!({
            "total_habits": habits.len(),
            "active_habits": active.len(),
            "total_completions": total_completions,
            "completions_this_week": completions_this_week,
            "completions_this_month": completions_this_month,
            "overall_completion_rate": overall_completion_rate,
            "streaks": streaks,
            "habit_stats": habit_stats,
        }))
    }
}
