use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Postgres, Row};

use crate::database::manager::DatabaseError;

/// Bind one filter parameter. Arrays and objects go over as JSONB.
pub fn bind_param<'q>(q: Query<'q, Postgres, PgArguments>, v: &'q Value) -> Query<'q, Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s.as_str()),
        Value::Array(_) | Value::Object(_) => q.bind(v),
    }
}

pub fn bind_all<'q>(mut q: Query<'q, Postgres, PgArguments>, params: &'q [Value]) -> Query<'q, Postgres, PgArguments> {
    for p in params {
        q = bind_param(q, p);
    }
    q
}

/// Text form used for `::text` comparisons against any column type
pub fn as_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The `row` JSONB column produced by `row_to_json(t)::jsonb AS row`
pub fn json_row(row: &PgRow) -> Result<Value, DatabaseError> {
    Ok(row.try_get::<Value, _>("row")?)
}
