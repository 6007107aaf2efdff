// Mapped procedures served by typed handlers instead of the store

use crate::models::Question;
use async_trait::async_trait;
use stinger_core::application::{map_rows, ProcedureRegistry};
use stinger_core::domain::{Arg, Entity, Filter};
use stinger_core::error::Result;
use stinger_core::port::{MappedProcedure, MappedReturn, ProcedureScope};

pub const GET_ACTIVE_QUESTIONS: &str = "Proc_GetActiveQuestions";

/// Active questions read straight from the `Questions` table
pub struct ActiveQuestions;

#[async_trait]
impl MappedProcedure for ActiveQuestions {
    fn arity(&self) -> Option<usize> {
        Some(0)
    }

    async fn invoke(&self, scope: &mut ProcedureScope<'_>, _args: &[Arg]) -> Result<MappedReturn> {
        let filter = Filter::eq("IsActive", true);
        let rows = scope.context().select(Question::TABLE, Some(&filter)).await?;
        Ok(MappedReturn::rows(map_rows::<Question>(&rows)?))
    }
}

pub fn registry() -> ProcedureRegistry {
    ProcedureRegistry::new().register(GET_ACTIVE_QUESTIONS, ActiveQuestions)
}
