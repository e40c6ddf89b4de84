use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

use crate::models::{
    join_subjects, split_subjects, DescriptiveFields, NewPractice, Practice, PracticeSummary,
    Teacher, TeacherOverview,
};

pub const DB_FILE_NAME: &str = "lab_management.db";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Creates both tables when absent. Safe to call on every open.
pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS teachers(
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            subjects TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS practices(
            id INTEGER PRIMARY KEY,
            teacher_id INTEGER NOT NULL,
            subject TEXT NOT NULL,
            title TEXT NOT NULL,
            objective TEXT NOT NULL,
            introduction TEXT NOT NULL,
            summary TEXT NOT NULL,
            development TEXT NOT NULL,
            goals TEXT NOT NULL,
            upload_date TEXT NOT NULL,
            num_pages INTEGER NOT NULL DEFAULT 0,
            file_path TEXT NOT NULL,
            FOREIGN KEY(teacher_id) REFERENCES teachers(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_practices_teacher ON practices(teacher_id)",
        [],
    )?;
    Ok(())
}

pub fn insert_teacher(
    conn: &Connection,
    name: &str,
    subjects: &[String],
    created_at: DateTime<Utc>,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO teachers(name, subjects, created_at) VALUES(?, ?, ?)",
        params![name, join_subjects(subjects), created_at],
    )?;
    Ok(conn.last_insert_rowid())
}

fn row_to_teacher(row: &Row) -> rusqlite::Result<Teacher> {
    let subjects: String = row.get(2)?;
    Ok(Teacher {
        id: row.get(0)?,
        name: row.get(1)?,
        subjects: split_subjects(&subjects),
        created_at: row.get(3)?,
    })
}

pub fn find_teacher_by_name(conn: &Connection, name: &str) -> rusqlite::Result<Option<Teacher>> {
    conn.query_row(
        "SELECT id, name, subjects, created_at FROM teachers WHERE name = ?",
        [name],
        row_to_teacher,
    )
    .optional()
}

pub fn teacher_names(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM teachers ORDER BY id")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

pub fn teacher_overviews(conn: &Connection) -> rusqlite::Result<Vec<TeacherOverview>> {
    // Correlated subquery keeps teachers without practices in the list.
    let mut stmt = conn.prepare(
        "SELECT
           t.id,
           t.name,
           t.subjects,
           (SELECT COUNT(*) FROM practices p WHERE p.teacher_id = t.id) AS practice_count
         FROM teachers t
         ORDER BY t.id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            let subjects = split_subjects(&row.get::<_, String>(2)?);
            Ok(TeacherOverview {
                id: row.get(0)?,
                name: row.get(1)?,
                subject_count: subjects.len(),
                subjects,
                practice_count: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_teachers(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM teachers", [], |r| r.get(0))
}

pub fn count_practices(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM practices", [], |r| r.get(0))
}

pub fn insert_practice(conn: &Connection, practice: &NewPractice) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO practices(
            teacher_id, subject, title, objective, introduction,
            summary, development, goals, upload_date, num_pages, file_path
        ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            practice.teacher_id,
            practice.subject,
            practice.title,
            practice.fields.objective,
            practice.fields.introduction,
            practice.fields.summary,
            practice.fields.development,
            practice.fields.goals,
            practice.upload_date,
            practice.num_pages,
            practice.file_path,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

const PRACTICE_SELECT: &str = "SELECT
       p.id, p.teacher_id, t.name, p.subject, p.title,
       p.objective, p.introduction, p.summary, p.development, p.goals,
       p.upload_date, p.num_pages, p.file_path
     FROM practices p
     JOIN teachers t ON t.id = p.teacher_id";

fn row_to_practice(row: &Row) -> rusqlite::Result<Practice> {
    Ok(Practice {
        id: row.get(0)?,
        teacher_id: row.get(1)?,
        teacher_name: row.get(2)?,
        subject: row.get(3)?,
        title: row.get(4)?,
        fields: DescriptiveFields {
            objective: row.get(5)?,
            introduction: row.get(6)?,
            summary: row.get(7)?,
            development: row.get(8)?,
            goals: row.get(9)?,
        },
        upload_date: row.get(10)?,
        num_pages: row.get(11)?,
        file_path: row.get(12)?,
    })
}

pub fn practice_by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<Practice>> {
    conn.query_row(
        &format!("{PRACTICE_SELECT} WHERE p.id = ?"),
        [id],
        row_to_practice,
    )
    .optional()
}

pub fn practices_by_teacher(conn: &Connection, teacher_name: &str) -> rusqlite::Result<Vec<Practice>> {
    let mut stmt = conn.prepare(&format!("{PRACTICE_SELECT} WHERE t.name = ? ORDER BY p.id"))?;
    let rows = stmt
        .query_map([teacher_name], row_to_practice)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn practice_summaries(conn: &Connection) -> rusqlite::Result<Vec<PracticeSummary>> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.title, p.subject, t.name, p.upload_date
         FROM practices p
         JOIN teachers t ON t.id = p.teacher_id
         ORDER BY p.id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(PracticeSummary {
                id: row.get(0)?,
                title: row.get(1)?,
                subject: row.get(2)?,
                teacher_name: row.get(3)?,
                upload_date: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}


#[cfg(test)]
mod tests {
    use super::test_support::temp_dir;
    use super::*;

    fn table_exists(conn: &Connection, table: &str) -> bool {
        conn.query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?",
            [table],
            |r| r.get::<_, i64>(0),
        )
        .optional()
        .expect("query sqlite_master")
        .is_some()
    }

    #[test]
    fn open_db_creates_both_tables() {
        let dir = temp_dir("labdocs-db-open");
        let conn = open_db(&dir).expect("open db");
        assert!(dir.join(DB_FILE_NAME).is_file());
        assert!(table_exists(&conn, "teachers"));
        assert!(table_exists(&conn, "practices"));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn schema_init_is_idempotent_and_keeps_rows() {
        let dir = temp_dir("labdocs-db-idempotent");
        {
            let conn = open_db(&dir).expect("open db");
            insert_teacher(&conn, "Ada", &["Physics".to_string()], Utc::now()).expect("insert");
            init_schema(&conn).expect("second init");
        }
        let conn = open_db(&dir).expect("reopen db");
        assert_eq!(count_teachers(&conn).expect("count"), 1);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn teacher_row_roundtrips_subjects_and_timestamp() {
        let dir = temp_dir("labdocs-db-teacher");
        let conn = open_db(&dir).expect("open db");
        let created = Utc::now();
        let subjects = vec!["Chemistry".to_string(), "Biology".to_string()];
        let id = insert_teacher(&conn, "Dr. Smith", &subjects, created).expect("insert");

        let t = find_teacher_by_name(&conn, "Dr. Smith")
            .expect("query")
            .expect("teacher present");
        assert_eq!(t.id, id);
        assert_eq!(t.subjects, subjects);
        assert_eq!(t.created_at.timestamp(), created.timestamp());
        assert!(find_teacher_by_name(&conn, "dr. smith").expect("query").is_none());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn practice_requires_existing_teacher() {
        let dir = temp_dir("labdocs-db-fk");
        let conn = open_db(&dir).expect("open db");
        let orphan = NewPractice {
            teacher_id: 42,
            subject: "Chemistry".into(),
            title: "Orphan".into(),
            fields: DescriptiveFields::uniform(""),
            upload_date: Utc::now(),
            num_pages: 0,
            file_path: "nowhere.pdf".into(),
        };
        assert!(insert_practice(&conn, &orphan).is_err());
        assert_eq!(count_practices(&conn).expect("count"), 0);
        let _ = std::fs::remove_dir_all(dir);
    }
}
