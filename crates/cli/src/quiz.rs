// Quiz use cases over the repository: list questions, register answers

use crate::models::{GetQuestionsResult, Question, QuestionOption, User, UserAnswer};
use anyhow::{bail, Result};
use serde::Serialize;
use std::sync::Arc;
use stinger_core::application::{CancellationToken, Repository};
use stinger_core::domain::{EntityWrapper, Filter};
use tracing::{info, warn};

pub const GET_QUESTIONS: &str = "Proc_GetQuestions";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct OptionDto {
    pub option_id: Option<i32>,
    pub option_text: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct QuestionDto {
    pub question_id: i32,
    pub question_text: String,
    pub question_type: String,
    pub is_closed: u8,
    pub is_active: u8,
    pub options: Vec<OptionDto>,
}

/// Group joined rows by question, in first-appearance order
pub fn group_questions(rows: Vec<GetQuestionsResult>) -> Vec<QuestionDto> {
    let mut questions: Vec<QuestionDto> = Vec::new();
    for row in rows {
        let option = OptionDto {
            option_id: row.option_id,
            option_text: row.option_text,
        };
        match questions.iter_mut().find(|q| q.question_id == row.question_id) {
            Some(question) => question.options.push(option),
            None => questions.push(QuestionDto {
                question_id: row.question_id,
                question_text: row.question_text,
                question_type: row.question_type,
                is_closed: row.is_closed as u8,
                is_active: row.is_active as u8,
                options: vec![option],
            }),
        }
    }
    questions
}

/// Kind of answer a question expects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerInput {
    Open { question_id: i32, text: String },
    Close { question_id: i32, option_id: i32 },
}

impl AnswerInput {
    pub fn question_id(&self) -> i32 {
        match self {
            AnswerInput::Open { question_id, .. } | AnswerInput::Close { question_id, .. } => {
                *question_id
            }
        }
    }

    /// `open:<question>:<text>` or `close:<question>:<option>`
    pub fn parse(raw: &str) -> Result<Self> {
        let mut parts = raw.splitn(3, ':');
        let (Some(kind), Some(question), Some(rest)) = (parts.next(), parts.next(), parts.next())
        else {
            bail!("answer '{}' must look like open:<question>:<text> or close:<question>:<option>", raw);
        };
        let question_id: i32 = question.trim().parse()?;
        match kind.to_ascii_lowercase().as_str() {
            "open" => Ok(AnswerInput::Open {
                question_id,
                text: rest.to_string(),
            }),
            "close" => Ok(AnswerInput::Close {
                question_id,
                option_id: rest.trim().parse()?,
            }),
            other => bail!(
                "question type '{}' is not valid for question {}; expected 'open' or 'close'",
                other,
                question_id
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RegisterSummary {
    pub total_answers_registered: usize,
    pub message: String,
}

pub struct QuizService {
    repository: Arc<Repository>,
}

impl QuizService {
    pub fn new(repository: Arc<Repository>) -> Self {
        Self { repository }
    }

    pub async fn questions(&self, cancel: &CancellationToken) -> Result<Vec<QuestionDto>> {
        let rows: Vec<GetQuestionsResult> = self
            .repository
            .get_data_by_procedure(GET_QUESTIONS, Vec::new(), cancel)
            .await?;
        if rows.is_empty() {
            bail!("{}: data not found", GET_QUESTIONS);
        }
        Ok(group_questions(rows))
    }

    /// Save every valid answer in one transaction.
    ///
    /// Invalid answers are skipped and reported; nothing is committed when
    /// no answer is valid.
    pub async fn register_answers(
        &self,
        user_id: i32,
        answers: Vec<AnswerInput>,
        cancel: &CancellationToken,
    ) -> Result<RegisterSummary> {
        let users: Vec<User> = self
            .repository
            .simple_select(Filter::eq("UserId", user_id), cancel)
            .await?;
        if users.is_empty() {
            bail!("User {} not found", user_id);
        }
        if answers.is_empty() {
            bail!("No answers to register");
        }

        let total = answers.len();
        let (registered, errors) = match self.save_valid_answers(user_id, answers, cancel).await {
            Ok(saved) => saved,
            Err(e) => {
                // The caller's token may already have fired
                self.repository.rollback(&CancellationToken::none()).await?;
                return Err(e);
            }
        };

        if registered == 0 {
            self.repository.rollback(&CancellationToken::none()).await?;
            bail!("No valid answer could be registered. Errors: {}", errors.join("; "));
        }
        self.repository.commit(cancel).await?;
        info!(user_id, registered, total, "Answers registered");

        let message = if registered == total {
            format!("Registered {} answers", registered)
        } else {
            format!(
                "Registered {} of {} answers. Errors: {}",
                registered,
                total,
                errors.join("; ")
            )
        };
        Ok(RegisterSummary {
            total_answers_registered: registered,
            message,
        })
    }

    /// Stage every answer that passes `check`; returns the saved count and
    /// the rejection reasons
    async fn save_valid_answers(
        &self,
        user_id: i32,
        answers: Vec<AnswerInput>,
        cancel: &CancellationToken,
    ) -> Result<(usize, Vec<String>)> {
        let mut registered = 0;
        let mut errors = Vec::new();

        for answer in answers {
            if let Some(problem) = self.check(&answer, cancel).await? {
                warn!(question_id = answer.question_id(), %problem, "Answer rejected");
                errors.push(problem);
                continue;
            }
            let (answer_text, option_id) = match &answer {
                AnswerInput::Open { text, .. } => (Some(text.clone()), None),
                AnswerInput::Close { option_id, .. } => (None, Some(*option_id)),
            };
            let row = UserAnswer {
                answer_id: 0,
                user_id,
                question_id: answer.question_id(),
                answer_text,
                option_id,
                answered_at: Some(chrono::Local::now().naive_local()),
            };
            self.repository.save_object(EntityWrapper::add(row), cancel).await?;
            registered += 1;
        }
        Ok((registered, errors))
    }

    /// Reason an answer cannot be saved, if any
    async fn check(&self, answer: &AnswerInput, cancel: &CancellationToken) -> Result<Option<String>> {
        let question_id = answer.question_id();
        let questions: Vec<Question> = self
            .repository
            .simple_select(Filter::eq("QuestionId", question_id), cancel)
            .await?;
        if questions.is_empty() {
            return Ok(Some(format!("Question {} not found", question_id)));
        }

        let problem = match answer {
            AnswerInput::Open { text, .. } if text.trim().is_empty() => Some(format!(
                "Open question {} requires an answer text",
                question_id
            )),
            AnswerInput::Open { .. } => None,
            AnswerInput::Close { option_id, .. } => {
                let filter = Filter::eq("OptionId", *option_id).and(Filter::eq("QuestionId", question_id));
                let options: Vec<QuestionOption> = self.repository.simple_select(filter, cancel).await?;
                options.is_empty().then(|| {
                    format!(
                        "Option {} does not exist or does not belong to question {}",
                        option_id, question_id
                    )
                })
            }
        };
        Ok(problem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use stinger_core::application::{cancel_channel, TransactionState};
    use stinger_core::domain::{RowSet, Schema, SqlValue};
    use stinger_core::AppError;
    use stinger_core::port::orm_context::mocks::{MemoryOrmContext, ScriptedProcedure};

    fn question_rows() -> RowSet {
        let schema = Schema::new([
            "QuestionId",
            "QuestionText",
            "QuestionType",
            "IsClosed",
            "IsActive",
            "OptionId",
            "OptionText",
        ]);
        let row = |q: i32, text: &str, kind: &str, closed: bool, option: Option<i32>, label: Option<&str>| {
            vec![
                SqlValue::I32(q),
                text.into(),
                kind.into(),
                SqlValue::Bool(closed),
                SqlValue::Bool(true),
                option.into(),
                label.into(),
            ]
        };
        RowSet::new(
            schema,
            vec![
                row(1, "Favourite colour?", "close", true, Some(10), Some("Red")),
                row(2, "Why?", "open", false, None, None),
                row(1, "Favourite colour?", "close", true, Some(11), Some("Blue")),
            ],
        )
    }

    fn store() -> MemoryOrmContext {
        MemoryOrmContext::new()
            .with_procedure(GET_QUESTIONS, ScriptedProcedure::returning(question_rows()))
            .with_table(
                "Users",
                RowSet::new(
                    Schema::new(["UserId", "Email", "FullName"]),
                    vec![vec![SqlValue::I32(4), "ada@example.com".into(), "Ada".into()]],
                ),
            )
            .with_table(
                "Questions",
                RowSet::new(
                    Schema::new(["QuestionId", "QuestionText", "QuestionType", "IsClosed", "IsActive"]),
                    vec![
                        vec![SqlValue::I32(1), "Favourite colour?".into(), "close".into(), true.into(), true.into()],
                        vec![SqlValue::I32(2), "Why?".into(), "open".into(), false.into(), true.into()],
                    ],
                ),
            )
            .with_table(
                "QuestionOptions",
                RowSet::new(
                    Schema::new(["OptionId", "QuestionId", "OptionText"]),
                    vec![
                        vec![SqlValue::I32(10), SqlValue::I32(1), "Red".into()],
                        vec![SqlValue::I32(11), SqlValue::I32(1), "Blue".into()],
                    ],
                ),
            )
    }

    fn service(store: &MemoryOrmContext) -> QuizService {
        QuizService::new(Arc::new(Repository::new(Arc::new(store.clone()))))
    }

    #[test]
    fn test_group_questions_keeps_order_and_flags() {
        let rows = vec![
            GetQuestionsResult {
                question_id: 1,
                question_text: "Q1".into(),
                question_type: "close".into(),
                is_closed: true,
                is_active: true,
                option_id: Some(10),
                option_text: Some("Red".into()),
            },
            GetQuestionsResult {
                question_id: 2,
                question_text: "Q2".into(),
                question_type: "open".into(),
                ..Default::default()
            },
            GetQuestionsResult {
                question_id: 1,
                option_id: Some(11),
                option_text: Some("Blue".into()),
                ..Default::default()
            },
        ];
        let grouped = group_questions(rows);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].question_id, 1);
        assert_eq!(grouped[0].is_closed, 1);
        assert_eq!(grouped[0].options.len(), 2);
        assert_eq!(grouped[1].is_active, 0);

        let json = serde_json::to_value(&grouped[0]).unwrap();
        assert_eq!(json["IsClosed"], 1);
        assert_eq!(json["Options"][1]["OptionText"], "Blue");
    }

    #[test]
    fn test_parse_answers() {
        assert_eq!(
            AnswerInput::parse("open:2:Because: it is").unwrap(),
            AnswerInput::Open {
                question_id: 2,
                text: "Because: it is".into()
            }
        );
        assert_eq!(
            AnswerInput::parse("close:1:10").unwrap(),
            AnswerInput::Close {
                question_id: 1,
                option_id: 10
            }
        );
        assert!(AnswerInput::parse("multi:1:10").is_err());
        assert!(AnswerInput::parse("close:1").is_err());
    }

    #[tokio::test]
    async fn test_questions_grouped_from_procedure() {
        let store = store();
        let questions = service(&store).questions(&CancellationToken::none()).await.unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].options.len(), 2);
        assert_eq!(store.statements(), vec!["Proc_GetQuestions".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_questions_is_error() {
        let store = MemoryOrmContext::new()
            .with_procedure(GET_QUESTIONS, ScriptedProcedure::returning(RowSet::empty()));
        let err = service(&store).questions(&CancellationToken::none()).await.unwrap_err();
        assert!(err.to_string().contains("Proc_GetQuestions: data not found"));
    }

    #[tokio::test]
    async fn test_register_valid_answers_and_report_rejected() {
        let store = store();
        let summary = service(&store)
            .register_answers(
                4,
                vec![
                    AnswerInput::Close {
                        question_id: 1,
                        option_id: 11,
                    },
                    AnswerInput::Open {
                        question_id: 2,
                        text: "It is calm".into(),
                    },
                    AnswerInput::Close {
                        question_id: 1,
                        option_id: 99,
                    },
                ],
                &CancellationToken::none(),
            )
            .await
            .unwrap();

        assert_eq!(summary.total_answers_registered, 2);
        assert!(summary.message.contains("Option 99"));

        let answers = store.table("UserAnswers").unwrap();
        assert_eq!(answers.len(), 2);
        assert_eq!(answers.value(0, "AnswerId"), Some(&SqlValue::I64(1)));
        assert_eq!(answers.value(1, "AnswerText"), Some(&SqlValue::String("It is calm".into())));
    }

    #[tokio::test]
    async fn test_unknown_user_saves_nothing() {
        let store = store();
        let err = service(&store)
            .register_answers(
                77,
                vec![AnswerInput::Open {
                    question_id: 2,
                    text: "x".into(),
                }],
                &CancellationToken::none(),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("User 77 not found"));
        assert_eq!(store.begin_count(), 0);
    }

    #[tokio::test]
    async fn test_all_invalid_rolls_back() {
        let store = store();
        let err = service(&store)
            .register_answers(
                4,
                vec![AnswerInput::Open {
                    question_id: 2,
                    text: "   ".into(),
                }],
                &CancellationToken::none(),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("requires an answer text"));
        assert!(store.table("UserAnswers").is_none());
    }

    #[tokio::test]
    async fn test_failing_check_rolls_back_saved_answers() {
        // No option table: checking the close answer fails after the open one was saved
        let store = MemoryOrmContext::new()
            .with_table(
                "Users",
                RowSet::new(
                    Schema::new(["UserId", "Email", "FullName"]),
                    vec![vec![SqlValue::I32(4), "ada@example.com".into(), "Ada".into()]],
                ),
            )
            .with_table(
                "Questions",
                RowSet::new(
                    Schema::new(["QuestionId", "QuestionText", "QuestionType", "IsClosed", "IsActive"]),
                    vec![
                        vec![SqlValue::I32(1), "Favourite colour?".into(), "close".into(), true.into(), true.into()],
                        vec![SqlValue::I32(2), "Why?".into(), "open".into(), false.into(), true.into()],
                    ],
                ),
            );
        let repository = Arc::new(Repository::new(Arc::new(store.clone())));
        let err = QuizService::new(repository.clone())
            .register_answers(
                4,
                vec![
                    AnswerInput::Open {
                        question_id: 2,
                        text: "It is calm".into(),
                    },
                    AnswerInput::Close {
                        question_id: 1,
                        option_id: 10,
                    },
                ],
                &CancellationToken::none(),
            )
            .await
            .unwrap_err();

        assert!(err.to_string().contains("no such table: QuestionOptions"));
        assert_eq!(repository.transaction_state().await, TransactionState::NoTransaction);
        assert!(store.events().contains(&"rollback".to_string()));
        assert!(store.table("UserAnswers").is_none());
    }

    #[tokio::test]
    async fn test_cancelled_registration_still_rolls_back() {
        let store = store().with_write_delay(Duration::from_secs(30));
        let repository = Arc::new(Repository::new(Arc::new(store.clone())));
        let (handle, cancel) = cancel_channel();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.cancel();
        });

        let err = QuizService::new(repository.clone())
            .register_answers(
                4,
                vec![AnswerInput::Open {
                    question_id: 2,
                    text: "It is calm".into(),
                }],
                &cancel,
            )
            .await
            .unwrap_err();

        assert!(err.downcast_ref::<AppError>().is_some_and(AppError::is_cancelled));
        assert_eq!(repository.transaction_state().await, TransactionState::NoTransaction);
        assert_eq!(store.events().last().map(String::as_str), Some("close"));
        assert!(store.table("UserAnswers").is_none());
    }
}
