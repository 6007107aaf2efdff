// Quiz schema: table entities and the Proc_GetQuestions row shape

use chrono::NaiveDateTime;
use stinger_core::application::{FieldMapBuilder, FromRecord};
use stinger_core::domain::{Entity, SqlValue, ToRecord};

/// One row of `Proc_GetQuestions`: a question joined with one of its options
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
pub struct User {
    pub user_id: i32,
    pub email: String,
    pub full_name: String,
}

impl ToRecord for User {
    const TYPE_NAME: &'static str = "User";

    fn columns() -> &'static [&'static str] {
        &["UserId", "Email", "FullName"]
    }

    fn to_record(&self) -> Vec<SqlValue> {
        vec![
            self.user_id.into(),
            self.email.clone().into(),
            self.full_name.clone().into(),
        ]
    }
}

impl Entity for User {
    const TABLE: &'static str = "Users";
    const KEY: &'static [&'static str] = &["UserId"];
    const IDENTITY: Option<&'static str> = Some("UserId");
}

impl FromRecord for User {
    fn describe(map: &mut FieldMapBuilder<Self>) {
        map.required("UserId", |r: &mut Self, v| r.user_id = v)
            .required("Email", |r: &mut Self, v| r.email = v)
            .required("FullName", |r: &mut Self, v| r.full_name = v);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Question {
    pub question_id: i32,
    pub question_text: String,
    pub question_type: String,
    pub is_closed: bool,
    pub is_active: bool,
}

impl ToRecord for Question {
    const TYPE_NAME: &'static str = "Question";

    fn columns() -> &'static [&'static str] {
        &["QuestionId", "QuestionText", "QuestionType", "IsClosed", "IsActive"]
    }

    fn to_record(&self) -> Vec<SqlValue> {
        vec![
            self.question_id.into(),
            self.question_text.clone().into(),
            self.question_type.clone().into(),
            self.is_closed.into(),
            self.is_active.into(),
        ]
    }
}

impl Entity for Question {
    const TABLE: &'static str = "Questions";
    const KEY: &'static [&'static str] = &["QuestionId"];
    const IDENTITY: Option<&'static str> = Some("QuestionId");
}

impl FromRecord for Question {
    fn describe(map: &mut FieldMapBuilder<Self>) {
        map.required("QuestionId", |r: &mut Self, v| r.question_id = v)
            .required("QuestionText", |r: &mut Self, v| r.question_text = v)
            .required("QuestionType", |r: &mut Self, v| r.question_type = v)
            .required("IsClosed", |r: &mut Self, v| r.is_closed = v)
            .required("IsActive", |r: &mut Self, v| r.is_active = v);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestionOption {
    pub option_id: i32,
    pub question_id: i32,
    pub option_text: String,
}

impl ToRecord for QuestionOption {
    const TYPE_NAME: &'static str = "QuestionOption";

    fn columns() -> &'static [&'static str] {
        &["OptionId", "QuestionId", "OptionText"]
    }

    fn to_record(&self) -> Vec<SqlValue> {
        vec![
            self.option_id.into(),
            self.question_id.into(),
            self.option_text.clone().into(),
        ]
    }
}

impl Entity for QuestionOption {
    const TABLE: &'static str = "QuestionOptions";
    const KEY: &'static [&'static str] = &["OptionId"];
    const IDENTITY: Option<&'static str> = Some("OptionId");
}

impl FromRecord for QuestionOption {
    fn describe(map: &mut FieldMapBuilder<Self>) {
        map.required("OptionId", |r: &mut Self, v| r.option_id = v)
            .required("QuestionId", |r: &mut Self, v| r.question_id = v)
            .required("OptionText", |r: &mut Self, v| r.option_text = v);
    }
}

/// A submitted answer; `AnswerId` is generated by the store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserAnswer {
    pub answer_id: i32,
    pub user_id: i32,
    pub question_id: i32,
    pub answer_text: Option<String>,
    pub option_id: Option<i32>,
    pub answered_at: Option<NaiveDateTime>,
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
