use rusqlite::Connection;
use std::path::Path;

pub const DB_FILE_NAME: &str = "freiarbeit.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS learning_groups(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS persons(
            id TEXT PRIMARY KEY,
            group_id TEXT NOT NULL,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            nickname TEXT,
            grade INTEGER NOT NULL,
            support_needs TEXT,
            support_measures TEXT,
            goals TEXT,
            updated_at TEXT,
            FOREIGN KEY(group_id) REFERENCES learning_groups(id)
        )",
        [],
    )?;
    // Workspaces created before profile editing lack updated_at.
    ensure_persons_updated_at(conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_persons_group ON persons(group_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS subject_areas(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS topic_assignments(
            id TEXT PRIMARY KEY,
            person_id TEXT NOT NULL,
            subject_id TEXT NOT NULL,
            base_topic TEXT,
            remark TEXT,
            FOREIGN KEY(person_id) REFERENCES persons(id),
            FOREIGN KEY(subject_id) REFERENCES subject_areas(id),
            UNIQUE(person_id, subject_id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS session_entries(
            id TEXT PRIMARY KEY,
            person_id TEXT NOT NULL,
            subject_id TEXT,
            date TEXT NOT NULL,
            period TEXT NOT NULL,
            topic TEXT,
            note TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY(person_id) REFERENCES persons(id),
            FOREIGN KEY(subject_id) REFERENCES subject_areas(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_session_entries_person ON session_entries(person_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_session_entries_subject_created
         ON session_entries(subject_id, created_at)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS course_feedback(
            id TEXT PRIMARY KEY,
            subject_id TEXT NOT NULL,
            group_id TEXT NOT NULL,
            date TEXT NOT NULL,
            period TEXT NOT NULL,
            topic TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(subject_id) REFERENCES subject_areas(id),
            FOREIGN KEY(group_id) REFERENCES learning_groups(id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance_records(
            id TEXT PRIMARY KEY,
            feedback_id TEXT NOT NULL,
            person_id TEXT NOT NULL,
            status TEXT NOT NULL CHECK(status IN ('present', 'absent')),
            note TEXT,
            FOREIGN KEY(feedback_id) REFERENCES course_feedback(id),
            FOREIGN KEY(person_id) REFERENCES persons(id),
            UNIQUE(feedback_id, person_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_records_person ON attendance_records(person_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS performance_feedback(
            id TEXT PRIMARY KEY,
            person_id TEXT NOT NULL,
            subject_id TEXT NOT NULL,
            date TEXT NOT NULL,
            topic TEXT NOT NULL,
            assessment TEXT NOT NULL,
            grade TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY(person_id) REFERENCES persons(id),
            FOREIGN KEY(subject_id) REFERENCES subject_areas(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_performance_feedback_person ON performance_feedback(person_id)",
        [],
    )?;

    Ok(())
}

/// Runs `f` inside one transaction. Commits on `Ok`; any `Err` drops the
/// transaction, which rolls it back.
pub fn with_tx<T, E, F>(conn: &Connection, f: F) -> Result<T, E>
where
    F: FnOnce(&Connection) -> Result<T, E>,
    E: From<rusqlite::Error>,
{
    let tx = conn.unchecked_transaction()?;
    let out = f(&tx)?;
    tx.commit()?;
    Ok(out)
}

fn ensure_persons_updated_at(conn: &Connection) -> rusqlite::Result<()> {
    if table_has_column(conn, "persons", "updated_at")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE persons ADD COLUMN updated_at TEXT", [])?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
