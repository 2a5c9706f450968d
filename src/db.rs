use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

use crate::error::BotError;

pub struct Database {
    conn: Mutex<Connection>,
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub telegram_id: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub language: String,
    pub joined_at: String,
}

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub id: i64,
    pub user_id: i64,
    pub command: String,
    pub input: Option<String>,
    pub output: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct UserStats {
    pub user_id: i64,
    pub xp_points: i64,
    pub level: i64,
    pub total_commands: i64,
    pub streak_days: i64,
    pub last_activity: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Badge {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub xp_required: i64,
    pub special_condition: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LeaderboardRow {
    pub first_name: Option<String>,
    pub username: Option<String>,
    pub xp_points: i64,
    pub level: i64,
}

#[derive(Debug, Clone, Default)]
pub struct GameStats {
    pub total_xp: i64,
    pub avg_level: f64,
    pub max_level: i64,
    pub badges_awarded: i64,
    pub top_badge: Option<(String, i64)>,
}

/// Badge catalog seeded once at startup. Name is the uniqueness key.
const BADGE_CATALOG: &[(&str, &str, &str, i64, Option<&str>)] = &[
    ("Débutant", "Première commande utilisée", "🚀", 0, Some("first_command")),
    ("Actif", "50 points d'expérience", "⚡", 50, None),
    ("Passionné", "250 points d'expérience", "🔥", 250, None),
    ("Expert", "500 points d'expérience", "💎", 500, None),
    ("Maître", "2500 points d'expérience", "👑", 2500, None),
    ("Légende", "5000 points d'expérience", "🌟", 5000, None),
    ("IA Lover", "Utilisateur assidu des commandes IA", "🤖", 100, Some("ai_commands")),
    ("Traducteur", "Utilisateur assidu de la traduction", "🌍", 100, Some("translate_commands")),
    ("Joueur", "Amateur de divertissement", "🎮", 75, Some("fun_commands")),
    ("Analyste", "Consulte régulièrement ses statistiques", "📊", 50, Some("stats_commands")),
    ("Série", "7 jours d'activité consécutifs", "🔥", 200, Some("streak_7")),
    ("Persévérant", "30 jours d'activité consécutifs", "💪", 1000, Some("streak_30")),
];

impl Database {
    pub fn new(data_dir: &str) -> Result<Self, BotError> {
        let db_path = Path::new(data_dir).join("nicebot.db");
        std::fs::create_dir_all(data_dir)?;

        let conn = Connection::open(db_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                telegram_id TEXT NOT NULL UNIQUE,
                username TEXT,
                first_name TEXT,
                language TEXT NOT NULL DEFAULT 'fr',
                joined_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                command TEXT NOT NULL,
                input TEXT,
                output TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_history_user_created
                ON history(user_id, created_at);

            CREATE TABLE IF NOT EXISTS user_stats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL UNIQUE,
                xp_points INTEGER NOT NULL DEFAULT 0,
                level INTEGER NOT NULL DEFAULT 1,
                total_commands INTEGER NOT NULL DEFAULT 0,
                streak_days INTEGER NOT NULL DEFAULT 0,
                last_activity TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS badges (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                description TEXT NOT NULL,
                icon TEXT NOT NULL,
                xp_required INTEGER NOT NULL DEFAULT 0,
                special_condition TEXT
            );

            CREATE TABLE IF NOT EXISTS user_badges (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                badge_id INTEGER NOT NULL,
                earned_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(user_id, badge_id)
            );",
        )?;

        let db = Database {
            conn: Mutex::new(conn),
        };
        db.seed_badges()?;
        Ok(db)
    }

    fn seed_badges(&self) -> Result<(), BotError> {
        let conn = self.conn.lock().unwrap();
        for (name, description, icon, xp_required, special) in BADGE_CATALOG {
            conn.execute(
                "INSERT OR IGNORE INTO badges (name, description, icon, xp_required, special_condition)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![name, description, icon, xp_required, special],
            )?;
        }
        Ok(())
    }

    /// Create on first sighting; later sightings only backfill missing
    /// username/first_name.
    pub fn upsert_user(
        &self,
        telegram_id: &str,
        username: Option<&str>,
        first_name: Option<&str>,
    ) -> Result<User, BotError> {
        let conn = self.conn.lock().unwrap();
        let now = chrono::Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO users (telegram_id, username, first_name, joined_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(telegram_id) DO UPDATE SET
                username = COALESCE(?2, username),
                first_name = COALESCE(?3, first_name)",
            params![telegram_id, username, first_name, now],
        )?;
        let user = conn.query_row(
            "SELECT id, telegram_id, username, first_name, language, joined_at
             FROM users WHERE telegram_id = ?1",
            params![telegram_id],
            row_to_user,
        )?;
        Ok(user)
    }

    pub fn get_user(&self, telegram_id: &str) -> Result<Option<User>, BotError> {
        let conn = self.conn.lock().unwrap();
        let user = conn
            .query_row(
                "SELECT id, telegram_id, username, first_name, language, joined_at
                 FROM users WHERE telegram_id = ?1",
                params![telegram_id],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    pub fn add_history(
        &self,
        user_id: i64,
        command: &str,
        input: Option<&str>,
        output: Option<&str>,
    ) -> Result<(), BotError> {
        let conn = self.conn.lock().unwrap();
        let now = chrono::Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO history (user_id, command, input, output, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![user_id, command, input, output, now],
        )?;
        Ok(())
    }

    pub fn recent_history(&self, limit: usize) -> Result<Vec<(String, HistoryEntry)>, BotError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT COALESCE(u.first_name, u.username, u.telegram_id),
                    h.id, h.user_id, h.command, h.input, h.output, h.created_at
             FROM history h
             JOIN users u ON u.id = h.user_id
             ORDER BY h.id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                HistoryEntry {
                    id: row.get(1)?,
                    user_id: row.get(2)?,
                    command: row.get(3)?,
                    input: row.get(4)?,
                    output: row.get(5)?,
                    created_at: row.get(6)?,
                },
            ))
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn history_count(&self, user_id: i64) -> Result<i64, BotError> {
        let conn = self.conn.lock().unwrap();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM history WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Lazily creates a zeroed row. INSERT OR IGNORE plus the UNIQUE
    /// constraint keeps this idempotent under concurrent calls.
    pub fn get_or_create_stats(&self, user_id: i64) -> Result<UserStats, BotError> {
        let conn = self.conn.lock().unwrap();
        let now = chrono::Utc::now().to_rfc3339();
        let today = chrono::Utc::now().date_naive().to_string();
        conn.execute(
            "INSERT OR IGNORE INTO user_stats (user_id, last_activity, created_at)
             VALUES (?1, ?2, ?3)",
            params![user_id, today, now],
        )?;
        let stats = conn.query_row(
            "SELECT user_id, xp_points, level, total_commands, streak_days, last_activity
             FROM user_stats WHERE user_id = ?1",
            params![user_id],
            row_to_stats,
        )?;
        Ok(stats)
    }

    pub fn update_stats(&self, stats: &UserStats) -> Result<(), BotError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE user_stats SET
                xp_points = ?2, level = ?3, total_commands = ?4,
                streak_days = ?5, last_activity = ?6
             WHERE user_id = ?1",
            params![
                stats.user_id,
                stats.xp_points,
                stats.level,
                stats.total_commands,
                stats.streak_days,
                stats.last_activity,
            ],
        )?;
        Ok(())
    }

    pub fn unearned_badges(&self, user_id: i64) -> Result<Vec<Badge>, BotError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, name, description, icon, xp_required, special_condition
             FROM badges
             WHERE id NOT IN (SELECT badge_id FROM user_badges WHERE user_id = ?1)",
        )?;
        let rows = stmt.query_map(params![user_id], row_to_badge)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Returns true when the badge was newly awarded.
    pub fn award_badge(&self, user_id: i64, badge_id: i64) -> Result<bool, BotError> {
        let conn = self.conn.lock().unwrap();
        let now = chrono::Utc::now().to_rfc3339();
        let changed = conn.execute(
            "INSERT OR IGNORE INTO user_badges (user_id, badge_id, earned_at)
             VALUES (?1, ?2, ?3)",
            params![user_id, badge_id, now],
        )?;
        Ok(changed > 0)
    }

    pub fn user_badges(&self, user_id: i64) -> Result<Vec<Badge>, BotError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT b.id, b.name, b.description, b.icon, b.xp_required, b.special_condition
             FROM badges b
             JOIN user_badges ub ON ub.badge_id = b.id
             WHERE ub.user_id = ?1
             ORDER BY ub.earned_at",
        )?;
        let rows = stmt.query_map(params![user_id], row_to_badge)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardRow>, BotError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT u.first_name, u.username, s.xp_points, s.level
             FROM user_stats s
             JOIN users u ON u.id = s.user_id
             ORDER BY s.xp_points DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(LeaderboardRow {
                first_name: row.get(0)?,
                username: row.get(1)?,
                xp_points: row.get(2)?,
                level: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn count_users(&self) -> Result<i64, BotError> {
        let conn = self.conn.lock().unwrap();
        let count = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn count_commands(&self) -> Result<i64, BotError> {
        let conn = self.conn.lock().unwrap();
        let count = conn.query_row("SELECT COUNT(*) FROM history", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn list_users(&self, limit: usize) -> Result<Vec<User>, BotError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, telegram_id, username, first_name, language, joined_at
             FROM users ORDER BY id LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], row_to_user)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn all_telegram_ids(&self) -> Result<Vec<String>, BotError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT telegram_id FROM users ORDER BY id")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Zeroes every user's gamification counters and strips earned badges.
    pub fn reset_all_stats(&self) -> Result<usize, BotError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE user_stats SET xp_points = 0, level = 1, total_commands = 0, streak_days = 0",
            [],
        )?;
        conn.execute("DELETE FROM user_badges", [])?;
        Ok(changed)
    }

    pub fn game_stats(&self) -> Result<GameStats, BotError> {
        let conn = self.conn.lock().unwrap();
        let (total_xp, avg_level, max_level) = conn.query_row(
            "SELECT COALESCE(SUM(xp_points), 0),
                    COALESCE(AVG(level), 0.0),
                    COALESCE(MAX(level), 0)
             FROM user_stats",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        let badges_awarded =
            conn.query_row("SELECT COUNT(*) FROM user_badges", [], |row| row.get(0))?;
        let top_badge = conn
            .query_row(
                "SELECT b.name, COUNT(*) AS c
                 FROM user_badges ub
                 JOIN badges b ON b.id = ub.badge_id
                 GROUP BY ub.badge_id
                 ORDER BY c DESC LIMIT 1",
                [],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;
        Ok(GameStats {
            total_xp,
            avg_level,
            max_level,
            badges_awarded,
            top_badge,
        })
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        telegram_id: row.get(1)?,
        username: row.get(2)?,
        first_name: row.get(3)?,
        language: row.get(4)?,
        joined_at: row.get(5)?,
    })
}

fn row_to_stats(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserStats> {
    Ok(UserStats {
        user_id: row.get(0)?,
        xp_points: row.get(1)?,
        level: row.get(2)?,
        total_commands: row.get(3)?,
        streak_days: row.get(4)?,
        last_activity: row.get(5)?,
    })
}

fn row_to_badge(row: &rusqlite::Row<'_>) -> rusqlite::Result<Badge> {
    Ok(Badge {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        icon: row.get(3)?,
        xp_required: row.get(4)?,
        special_condition: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn test_db() -> (Database, String) {
        let dir = std::env::temp_dir()
            .join(format!("nicebot_db_test_{}", Uuid::new_v4()))
            .to_string_lossy()
            .to_string();
        let db = Database::new(&dir).unwrap();
        (db, dir)
    }

    fn cleanup(dir: &str) {
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_upsert_user_creates_then_backfills() {
        let (db, dir) = test_db();

        let user = db.upsert_user("100", None, Some("Alice")).unwrap();
        assert_eq!(user.telegram_id, "100");
        assert_eq!(user.first_name.as_deref(), Some("Alice"));
        assert_eq!(user.username, None);
        assert_eq!(user.language, "fr");

        // Second sighting backfills username without clearing the name.
        let user2 = db.upsert_user("100", Some("alice"), None).unwrap();
        assert_eq!(user2.id, user.id);
        assert_eq!(user2.username.as_deref(), Some("alice"));
        assert_eq!(user2.first_name.as_deref(), Some("Alice"));

        cleanup(&dir);
    }

    #[test]
    fn test_get_user_missing_is_none() {
        let (db, dir) = test_db();
        assert!(db.get_user("999").unwrap().is_none());
        cleanup(&dir);
    }

    #[test]
    fn test_history_append_and_count() {
        let (db, dir) = test_db();
        let user = db.upsert_user("1", None, None).unwrap();

        db.add_history(user.id, "/meteo", Some("Paris"), None)
            .unwrap();
        db.add_history(user.id, "/ping", None, Some("pong")).unwrap();

        assert_eq!(db.history_count(user.id).unwrap(), 2);
        assert_eq!(db.count_commands().unwrap(), 2);

        let recent = db.recent_history(10).unwrap();
        assert_eq!(recent.len(), 2);
        // Newest first.
        assert_eq!(recent[0].1.command, "/ping");
        cleanup(&dir);
    }

    #[test]
    fn test_stats_lazily_created_and_idempotent() {
        let (db, dir) = test_db();
        let user = db.upsert_user("1", None, None).unwrap();

        let stats = db.get_or_create_stats(user.id).unwrap();
        assert_eq!(stats.xp_points, 0);
        assert_eq!(stats.level, 1);
        assert_eq!(stats.streak_days, 0);

        let again = db.get_or_create_stats(user.id).unwrap();
        assert_eq!(again.user_id, stats.user_id);

        let conn = db.conn.lock().unwrap();
        let rows: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM user_stats WHERE user_id = ?1",
                params![user.id],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(rows, 1);
        drop(conn);
        cleanup(&dir);
    }

    #[test]
    fn test_badge_catalog_seeded_once() {
        let (db, dir) = test_db();
        let user = db.upsert_user("1", None, None).unwrap();
        let badges = db.unearned_badges(user.id).unwrap();
        assert_eq!(badges.len(), 12);

        // Re-seeding must not duplicate.
        db.seed_badges().unwrap();
        assert_eq!(db.unearned_badges(user.id).unwrap().len(), 12);
        cleanup(&dir);
    }

    #[test]
    fn test_award_badge_unique_per_user() {
        let (db, dir) = test_db();
        let user = db.upsert_user("1", None, None).unwrap();
        let badge_id = db.unearned_badges(user.id).unwrap()[0].id;

        assert!(db.award_badge(user.id, badge_id).unwrap());
        assert!(!db.award_badge(user.id, badge_id).unwrap());
        assert_eq!(db.user_badges(user.id).unwrap().len(), 1);
        cleanup(&dir);
    }

    #[test]
    fn test_leaderboard_orders_by_xp() {
        let (db, dir) = test_db();
        for (tid, xp) in [("1", 10), ("2", 300), ("3", 50)] {
            let user = db.upsert_user(tid, None, Some(tid)).unwrap();
            let mut stats = db.get_or_create_stats(user.id).unwrap();
            stats.xp_points = xp;
            db.update_stats(&stats).unwrap();
        }
        let rows = db.leaderboard(2).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].xp_points, 300);
        assert_eq!(rows[1].xp_points, 50);
        cleanup(&dir);
    }

    #[test]
    fn test_reset_all_stats() {
        let (db, dir) = test_db();
        let user = db.upsert_user("1", None, None).unwrap();
        let mut stats = db.get_or_create_stats(user.id).unwrap();
        stats.xp_points = 500;
        stats.level = 4;
        db.update_stats(&stats).unwrap();
        let badge_id = db.unearned_badges(user.id).unwrap()[0].id;
        db.award_badge(user.id, badge_id).unwrap();

        db.reset_all_stats().unwrap();
        let stats = db.get_or_create_stats(user.id).unwrap();
        assert_eq!(stats.xp_points, 0);
        assert_eq!(stats.level, 1);
        assert!(db.user_badges(user.id).unwrap().is_empty());
        cleanup(&dir);
    }

    #[test]
    fn test_game_stats_aggregates() {
        let (db, dir) = test_db();
        assert_eq!(db.game_stats().unwrap().total_xp, 0);

        let user = db.upsert_user("1", None, None).unwrap();
        let mut stats = db.get_or_create_stats(user.id).unwrap();
        stats.xp_points = 120;
        stats.level = 2;
        db.update_stats(&stats).unwrap();

        let gs = db.game_stats().unwrap();
        assert_eq!(gs.total_xp, 120);
        assert_eq!(gs.max_level, 2);
        cleanup(&dir);
    }
}
