// SQL text rendering for filters and staged entity changes
//
// Every value travels as a positional `?` bind, in the order returned.

use stinger_core::domain::{Filter, SqlValue, StagedChange, WriteOperation};
use stinger_core::error::{AppError, Result};

/// Statement text plus its positional bind values
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Statement {
    pub sql: String,
    pub binds: Vec<SqlValue>,
}

pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn comparison(column: &str, op: &str, value: &SqlValue, binds: &mut Vec<SqlValue>) -> String {
    binds.push(value.clone());
    format!("{} {} ?", quote_ident(column), op)
}

fn render_filter(filter: &Filter, binds: &mut Vec<SqlValue>) -> String {
    match filter {
        Filter::Eq(c, v) => comparison(c, "=", v, binds),
        Filter::Ne(c, v) => comparison(c, "<>", v, binds),
        Filter::Lt(c, v) => comparison(c, "<", v, binds),
        Filter::Le(c, v) => comparison(c, "<=", v, binds),
        Filter::Gt(c, v) => comparison(c, ">", v, binds),
        Filter::Ge(c, v) => comparison(c, ">=", v, binds),
        Filter::IsNull(c) => format!("{} IS NULL", quote_ident(c)),
        Filter::IsNotNull(c) => format!("{} IS NOT NULL", quote_ident(c)),
        Filter::In(_, values) if values.is_empty() => "0 = 1".to_string(),
        Filter::In(c, values) => {
            binds.extend(values.iter().cloned());
            let marks = vec!["?"; values.len()].join(", ");
            format!("{} IN ({})", quote_ident(c), marks)
        }
        Filter::And(parts) if parts.is_empty() => "1 = 1".to_string(),
        Filter::Or(parts) if parts.is_empty() => "0 = 1".to_string(),
        Filter::And(parts) => join(parts, " AND ", binds),
        Filter::Or(parts) => join(parts, " OR ", binds),
        Filter::Not(inner) => format!("NOT ({})", render_filter(inner, binds)),
    }
}

fn join(parts: &[Filter], separator: &str, binds: &mut Vec<SqlValue>) -> String {
    let rendered: Vec<String> = parts.iter().map(|p| render_filter(p, binds)).collect();
    format!("({})", rendered.join(separator))
}

/// `SELECT *` over one table with an optional predicate
pub(crate) fn select(table: &str, filter: Option<&Filter>) -> Statement {
    let mut binds = Vec::new();
    let mut sql = format!("SELECT * FROM {}", quote_ident(table));
    if let Some(filter) = filter {
        sql.push_str(" WHERE ");
        sql.push_str(&render_filter(filter, &mut binds));
    }
    Statement { sql, binds }
}

fn key_clause(change: &StagedChange, binds: &mut Vec<SqlValue>) -> Result<String> {
    let keys = change.key_pairs();
    if keys.is_empty() || keys.len() != change.key.len() {
        return Err(AppError::Database(format!(
            "Entity '{}' has no complete key for {}",
            change.table, change.operation
        )));
    }
    let clauses: Vec<String> = keys
        .into_iter()
        .map(|(column, value)| comparison(column, "=", value, binds))
        .collect();
    Ok(clauses.join(" AND "))
}

/// Statement applying one staged change; `None` when there is nothing to write
pub(crate) fn change(change: &StagedChange) -> Result<Option<Statement>> {
    let table = quote_ident(&change.table);
    let mut binds = Vec::new();

    let sql = match change.operation {
        WriteOperation::Add => {
            let pairs = change.insert_pairs();
            if pairs.is_empty() {
                format!("INSERT INTO {} DEFAULT VALUES", table)
            } else {
                let columns: Vec<String> = pairs.iter().map(|(c, _)| quote_ident(c)).collect();
                binds.extend(pairs.iter().map(|(_, v)| (*v).clone()));
                format!(
                    "INSERT INTO {} ({}) VALUES ({})",
                    table,
                    columns.join(", "),
                    vec!["?"; pairs.len()].join(", ")
                )
            }
        }
        WriteOperation::Modify => {
            let pairs = change.update_pairs();
            if pairs.is_empty() {
                return Ok(None);
            }
            let sets: Vec<String> = pairs
                .iter()
                .map(|(column, value)| comparison(column, "=", value, &mut binds))
                .collect();
            let keys = key_clause(change, &mut binds)?;
            format!("UPDATE {} SET {} WHERE {}", table, sets.join(", "), keys)
        }
        WriteOperation::Remove => {
            let keys = key_clause(change, &mut binds)?;
            format!("DELETE FROM {} WHERE {}", table, keys)
        }
        WriteOperation::None => return Ok(None),
    };
    Ok(Some(Statement { sql, binds }))
}
