// Procedure catalog: stored procedures emulated as named SQL scripts
//
// SQLite has no stored procedures. A catalog entry gives the statements a
// call runs, the query producing its result set and the query producing its
// output parameter values. Scripts refer to arguments by placeholder name
// (`@parameter0`); table-valued arguments are visible as temp tables.

use crate::binding::{bind_parameter, bind_value, coerce_output, decode_named, decode_rows, SqliteQuery};
use crate::error::map_sqlx_error;
use crate::sql::quote_ident;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Deserialize;
use sqlx::SqliteConnection;
use std::collections::HashMap;
use stinger_core::domain::{BoundParameter, BoundValue, ProcedureCall, ProviderOutcome, TableArg};
use stinger_core::error::{AppError, Result};
use tracing::debug;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@parameter(\d+)").expect("valid placeholder regex"));

/// One emulated procedure
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProcedureDefinition {
    /// Statements run in order before the result query
    pub body: Vec<String>,
    /// Query whose rows are the procedure's result set
    pub result: Option<String>,
    /// Single-row query; columns named `parameterN` supply output values
    pub outputs: Option<String>,
}

impl ProcedureDefinition {
    pub fn returning(result: impl Into<String>) -> Self {
        Self {
            result: Some(result.into()),
            ..Default::default()
        }
    }

    pub fn with_body(mut self, statement: impl Into<String>) -> Self {
        self.body.push(statement.into());
        self
    }

    pub fn with_outputs(mut self, outputs: impl Into<String>) -> Self {
        self.outputs = Some(outputs.into());
        self
    }
}

/// Catalog entry as written in configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NamedProcedure {
    pub name: String,
    #[serde(flatten)]
    pub definition: ProcedureDefinition,
}

/// Procedures known to the store, by exact name.
///
/// Configured as a list (`[[procedures]]` with a `name` key) so that
/// procedure names keep their case.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "Vec<NamedProcedure>")]
pub struct ProcedureCatalog {
    procedures: HashMap<String, ProcedureDefinition>,
}

impl From<Vec<NamedProcedure>> for ProcedureCatalog {
    fn from(entries: Vec<NamedProcedure>) -> Self {
        let procedures = entries
            .into_iter()
            .map(|entry| (entry.name, entry.definition))
            .collect();
        Self { procedures }
    }
}

impl ProcedureCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(mut self, name: impl Into<String>, definition: ProcedureDefinition) -> Self {
        self.procedures.insert(name.into(), definition);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ProcedureDefinition> {
        self.procedures.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.procedures.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }

    /// Run a marshalled call on `conn`
    pub(crate) async fn execute(
        &self,
        conn: &mut SqliteConnection,
        call: &ProcedureCall,
    ) -> Result<ProviderOutcome> {
        let definition = self.get(&call.procedure).ok_or_else(|| {
            AppError::Database(format!(
                "Could not find stored procedure '{}'",
                call.procedure
            ))
        })?;

        let tables = table_names(call);
        for (name, table) in &tables {
            create_table(conn, name, table).await?;
        }

        let outcome = run(conn, definition, call).await;

        for (name, _) in &tables {
            let drop = format!("DROP TABLE IF EXISTS temp.{}", quote_ident(name));
            let dropped = sqlx::query(&drop).execute(&mut *conn).await;
            if let Err(e) = dropped {
                debug!(table = %name, error = %e, "Failed to drop table-valued parameter");
            }
        }
        outcome
    }
}

fn table_name(table: &TableArg, position: usize) -> String {
    format!("{}_{}", table.type_name(), position)
}

/// Temp table name for each table-valued parameter
fn table_names(call: &ProcedureCall) -> Vec<(String, &TableArg)> {
    call.parameters
        .iter()
        .enumerate()
        .filter_map(|(position, p)| match &p.value {
            BoundValue::Table(table) => Some((table_name(table, position), table)),
            BoundValue::Scalar(_) => None,
        })
        .collect()
}

async fn create_table(conn: &mut SqliteConnection, name: &str, table: &TableArg) -> Result<()> {
    let columns: Vec<String> = table.schema().columns().iter().map(|c| quote_ident(c)).collect();
    let create = if columns.is_empty() {
        format!("CREATE TEMP TABLE {} (\"_\")", quote_ident(name))
    } else {
        format!("CREATE TEMP TABLE {} ({})", quote_ident(name), columns.join(", "))
    };
    sqlx::query(&create)
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;

    if columns.is_empty() {
        return Ok(());
    }
    let insert = format!(
        "INSERT INTO temp.{} ({}) VALUES ({})",
        quote_ident(name),
        columns.join(", "),
        vec!["?"; columns.len()].join(", ")
    );
    for row in table.rows() {
        let mut query = sqlx::query(&insert);
        for value in row {
            query = bind_value(query, value);
        }
        query.execute(&mut *conn).await.map_err(map_sqlx_error)?;
    }
    debug!(table = %name, rows = table.rows().len(), "Filled table-valued parameter");
    Ok(())
}

/// Script text with placeholders rewritten, plus the number of leading
/// parameters its numbered binds refer to
struct Translated {
    sql: String,
    binds: usize,
}

/// Rewrite `@parameterN` into numbered binds, or the temp table of a table argument
fn translate(script: &str, parameters: &[BoundParameter]) -> Translated {
    let mut binds = 0;
    let sql = PLACEHOLDER
        .replace_all(script, |caps: &Captures| {
            let Ok(index) = caps[1].parse::<usize>() else {
                return caps[0].to_string();
            };
            match parameters.get(index).map(|p| &p.value) {
                Some(BoundValue::Table(table)) => {
                    format!("temp.{}", quote_ident(&table_name(table, index)))
                }
                _ => {
                    binds = binds.max(index + 1);
                    format!("?{}", index + 1)
                }
            }
        })
        .into_owned();
    Translated { sql, binds }
}

fn bind_all<'q>(
    mut query: SqliteQuery<'q>,
    parameters: &[BoundParameter],
    count: usize,
) -> Result<SqliteQuery<'q>> {
    for parameter in parameters.iter().take(count) {
        query = bind_parameter(query, parameter)?;
    }
    Ok(query)
}

async fn run(
    conn: &mut SqliteConnection,
    definition: &ProcedureDefinition,
    call: &ProcedureCall,
) -> Result<ProviderOutcome> {
    let mut outcome = ProviderOutcome::default();

    for statement in &definition.body {
        let script = translate(statement, &call.parameters);
        debug!(procedure = %call.procedure, sql = %script.sql, "Executing procedure statement");
        let done = bind_all(sqlx::query(&script.sql), &call.parameters, script.binds)?
            .execute(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;
        outcome.rows_affected += done.rows_affected();
    }

    if let Some(result) = &definition.result {
        let script = translate(result, &call.parameters);
        let rows = bind_all(sqlx::query(&script.sql), &call.parameters, script.binds)?
            .fetch_all(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;
        outcome.rows = Some(decode_rows(&rows)?);
    }

    if let Some(outputs) = &definition.outputs {
        let script = translate(outputs, &call.parameters);
        let row = bind_all(sqlx::query(&script.sql), &call.parameters, script.binds)?
            .fetch_optional(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;
        if let Some(row) = row {
            for (column, value) in decode_named(&row)? {
                let declared = call
                    .parameters
                    .iter()
                    .find(|p| p.name == column)
                    .and_then(|p| p.provider_type);
                outcome.outputs.insert(column, coerce_output(value, declared));
            }
        }
    }

    Ok(outcome)
}
