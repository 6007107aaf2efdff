//! Shared fixture: a file-backed quiz database with emulated procedures
#![allow(dead_code)]

use chrono::NaiveDateTime;
use std::sync::Arc;
use stinger_core::application::{FieldMapBuilder, FromRecord, ProcedureRegistry, Repository};
use stinger_core::domain::{Entity, SqlValue, ToRecord};
use stinger_infra_sqlite::{PoolSettings, ProcedureCatalog, ProcedureDefinition, SqliteOrmContext};
use tempfile::TempDir;

const SCHEMA: &[&str] = &[
    "CREATE TABLE Users (
        UserId INTEGER PRIMARY KEY AUTOINCREMENT,
        Email TEXT NOT NULL,
        FullName TEXT NOT NULL
    )",
    "CREATE TABLE Questions (
        QuestionId INTEGER PRIMARY KEY AUTOINCREMENT,
        QuestionText TEXT NOT NULL,
        QuestionType TEXT NOT NULL,
        IsClosed INTEGER NOT NULL,
        IsActive INTEGER NOT NULL
    )",
    "CREATE TABLE QuestionOptions (
        OptionId INTEGER PRIMARY KEY AUTOINCREMENT,
        QuestionId INTEGER NOT NULL REFERENCES Questions(QuestionId),
        OptionText TEXT NOT NULL
    )",
    "CREATE TABLE UserAnswers (
        AnswerId INTEGER PRIMARY KEY AUTOINCREMENT,
        UserId INTEGER NOT NULL REFERENCES Users(UserId),
        QuestionId INTEGER NOT NULL REFERENCES Questions(QuestionId),
        AnswerText TEXT,
        OptionId INTEGER REFERENCES QuestionOptions(OptionId),
        AnsweredAt TEXT
    )",
    "INSERT INTO Users (Email, FullName) VALUES ('ada@example.com', 'Ada')",
    "INSERT INTO Questions (QuestionText, QuestionType, IsClosed, IsActive)
        VALUES ('Favourite colour?', 'close', 1, 1), ('Why?', 'open', 0, 1)",
    "INSERT INTO QuestionOptions (QuestionId, OptionText) VALUES (1, 'Red'), (1, 'Blue')",
];

pub fn catalog() -> ProcedureCatalog {
    ProcedureCatalog::new()
        .define(
            "Proc_GetQuestions",
            ProcedureDefinition::returning(
                "SELECT q.QuestionId, q.QuestionText, q.QuestionType, q.IsClosed, q.IsActive,
                        o.OptionId, o.OptionText
                 FROM Questions q LEFT JOIN QuestionOptions o ON o.QuestionId = q.QuestionId
                 ORDER BY q.QuestionId, o.OptionId",
            ),
        )
        .define(
            "Proc_SaveAnswer",
            ProcedureDefinition::default()
                .with_body(
                    "INSERT INTO UserAnswers (UserId, QuestionId, AnswerText)
                     VALUES (@parameter0, @parameter1, @parameter2)",
                )
                .with_outputs("SELECT last_insert_rowid() AS parameter3"),
        )
        .define(
            "Proc_SaveChoices",
            ProcedureDefinition::default()
                .with_body(
                    "INSERT INTO UserAnswers (UserId, QuestionId, OptionId)
                     SELECT @parameter0, QuestionId, OptionId FROM @parameter1",
                )
                .with_outputs("SELECT changes() AS parameter2"),
        )
        .define(
            "Proc_Double",
            ProcedureDefinition::default().with_outputs("SELECT @parameter0 * 2 AS parameter0"),
        )
        .define(
            "Proc_Echo",
            ProcedureDefinition::returning("SELECT @parameter0 AS Value"),
        )
        .define(
            "Proc_Numbers",
            ProcedureDefinition::returning(
                "WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n WHERE i < @parameter0)
                 SELECT i AS Id, 'row ' || i AS Name FROM n",
            ),
        )
}

pub struct Fixture {
    // Keeps the database file alive for the test
    _dir: TempDir,
    pub url: String,
    pub context: Arc<SqliteOrmContext>,
    pub repository: Repository,
}

pub async fn fixture() -> Fixture {
    fixture_with(ProcedureRegistry::new()).await
}

pub async fn fixture_with(procedures: ProcedureRegistry) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("quiz.db").display());
    let context = SqliteOrmContext::connect(&url, &PoolSettings::default(), catalog())
        .await
        .unwrap();
    for statement in SCHEMA {
        sqlx::query(statement).execute(context.pool()).await.unwrap();
    }
    let context = Arc::new(context);
    let repository = Repository::with_procedures(context.clone(), Arc::new(procedures));
    Fixture {
        _dir: dir,
        url,
        context,
        repository,
    }
}

/// A second repository instance with its own pool on the same database file
pub async fn second_repository(fixture: &Fixture) -> Repository {
    let context = SqliteOrmContext::connect(&fixture.url, &PoolSettings::default(), catalog())
        .await
        .unwrap();
    Repository::new(Arc::new(context))
}

pub async fn count(fixture: &Fixture, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(fixture.context.pool())
        .await
        .unwrap()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserAnswer {
    pub answer_id: i32,
    pub user_id: i32,
    pub question_id: i32,
    pub answer_text: Option<String>,
    pub option_id: Option<i32>,
    pub answered_at: Option<NaiveDateTime>,
}

impl UserAnswer {
    pub fn open(user_id: i32, question_id: i32, text: &str) -> Self {
        Self {
            user_id,
            question_id,
            answer_text: Some(text.to_string()),
            ..Default::default()
        }
    }
}

impl ToRecord for UserAnswer {
    const TYPE_NAME: &'static str = "UserAnswer";

    fn columns() -> &'static [&'static str] {
        &["AnswerId", "UserId", "QuestionId", "AnswerText", "OptionId", "AnsweredAt"]
    }

    fn to_record(&self) -> Vec<SqlValue> {
        vec![
            self.answer_id.into(),
            self.user_id.into(),
            self.question_id.into(),
            self.answer_text.clone().into(),
            self.option_id.into(),
            self.answered_at.into(),
        ]
    }
}

impl Entity for UserAnswer {
    const TABLE: &'static str = "UserAnswers";
    const KEY: &'static [&'static str] = &["AnswerId"];
    const IDENTITY: Option<&'static str> = Some("AnswerId");
}

impl FromRecord for UserAnswer {
    fn describe(map: &mut FieldMapBuilder<Self>) {
        map.required("AnswerId", |r: &mut Self, v| r.answer_id = v)
            .required("UserId", |r: &mut Self, v| r.user_id = v)
            .required("QuestionId", |r: &mut Self, v| r.question_id = v)
            .optional("AnswerText", |r: &mut Self, v| r.answer_text = v)
            .optional("OptionId", |r: &mut Self, v| r.option_id = v)
            .optional("AnsweredAt", |r: &mut Self, v| r.answered_at = v);
    }
}

/// Element of the `AnswerLine` table type
#[derive(Debug, Clone)]
pub struct AnswerLine {
    pub question_id: i32,
    pub option_id: i32,
}

impl ToRecord for AnswerLine {
    const TYPE_NAME: &'static str = "AnswerLine";

    fn columns() -> &'static [&'static str] {
        &["QuestionId", "OptionId"]
    }

    fn to_record(&self) -> Vec<SqlValue> {
        vec![self.question_id.into(), self.option_id.into()]
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetQuestionsResult {
    pub question_id: i32,
    pub question_text: String,
    pub question_type: String,
    pub is_closed: bool,
    pub is_active: bool,
    pub option_id: Option<i32>,
    pub option_text: Option<String>,
}

impl FromRecord for GetQuestionsResult {
    fn describe(map: &mut FieldMapBuilder<Self>) {
        map.required("QuestionId", |r: &mut Self, v| r.question_id = v)
            .required("QuestionText", |r: &mut Self, v| r.question_text = v)
            .required("QuestionType", |r: &mut Self, v| r.question_type = v)
            .required("IsClosed", |r: &mut Self, v| r.is_closed = v)
            .required("IsActive", |r: &mut Self, v| r.is_active = v)
            .optional("OptionId", |r: &mut Self, v| r.option_id = v)
            .optional("OptionText", |r: &mut Self, v| r.option_text = v);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumberRow {
    pub id: i64,
    pub name: String,
}

impl FromRecord for NumberRow {
    fn describe(map: &mut FieldMapBuilder<Self>) {
        map.required("Id", |r: &mut Self, v| r.id = v)
            .required("Name", |r: &mut Self, v| r.name = v);
    }
}
