use serde_json::{Map, Value};

use super::error::FilterError;
use super::types::{FilterOp, FilterWhereInfo};

/// Renders a filter mapping as a parameterized SQL `WHERE` clause.
///
/// Keys are column names. A scalar value means equality, an array means
/// `IN`, and an object maps `$op` keys to operands. `$and`, `$or` and `$not`
/// nest. Columns outside `allowed` are skipped; an empty `allowed` list
/// admits any syntactically valid column.
pub struct FilterWhere<'a> {
    param_values: Vec<Value>,
    param_index: usize,
    allowed: &'a [String],
}

impl<'a> FilterWhere<'a> {
    pub fn new(starting_param_index: usize, allowed: &'a [String]) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
            allowed,
        }
    }

    /// Returns the joined conditions (empty when nothing applies) and their parameters
    pub fn generate(
        filters: &Map<String, Value>,
        starting_param_index: usize,
        allowed: &'a [String],
    ) -> Result<(Vec<String>, Vec<Value>), FilterError> {
        let mut filter_where = Self::new(starting_param_index, allowed);
        let conditions = filter_where.build(filters)?;
        Ok((conditions, filter_where.param_values))
    }

    fn build(&mut self, filters: &Map<String, Value>) -> Result<Vec<String>, FilterError> {
        let mut sql = Vec::new();
        for (key, value) in filters {
            if key.starts_with('$') {
                sql.push(self.logical(key, value)?);
                continue;
            }
            if !self.admits(key)? {
                tracing::debug!("Skipping non-filterable column '{}'", key);
                continue;
            }
            for condition in Self::field_conditions(key, value)? {
                sql.push(self.condition_sql(&condition)?);
            }
        }
        Ok(sql)
    }

    fn admits(&self, column: &str) -> Result<bool, FilterError> {
        if !self.allowed.is_empty() {
            return Ok(self.allowed.iter().any(|c| c == column));
        }
        validate_identifier(column).map_err(FilterError::InvalidColumn)?;
        Ok(true)
    }

    fn logical(&mut self, op: &str, value: &Value) -> Result<String, FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                let mut parts = Vec::new();
                for v in arr {
                    let sub = self.nested(v)?;
                    if !sub.is_empty() {
                        parts.push(format!("({})", sub));
                    }
                }
                if parts.is_empty() {
                    return Ok("1=1".to_string());
                }
                let joiner = if op == "$and" { " AND " } else { " OR " };
                Ok(format!("({})", parts.join(joiner)))
            }
            "$not" => {
                let sub = self.nested(value)?;
                if sub.is_empty() {
                    Ok("1=1".to_string())
                } else {
                    Ok(format!("NOT ({})", sub))
                }
            }
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn nested(&mut self, value: &Value) -> Result<String, FilterError> {
        let obj = value
            .as_object()
            .ok_or_else(|| FilterError::InvalidOperatorData("nested clause must be an object".to_string()))?;
        let (sql, params) = Self::generate(obj, self.param_index, self.allowed)?;
        self.param_index += params.len();
        self.param_values.extend(params);
        Ok(sql.join(" AND "))
    }

    fn field_conditions(field: &str, value: &Value) -> Result<Vec<FilterWhereInfo>, FilterError> {
        let info = |operator, data: &Value| FilterWhereInfo {
            column: field.to_string(),
            operator,
            data: data.clone(),
        };
        match value {
            Value::Object(obj) if obj.keys().all(|k| k.starts_with('$')) && !obj.is_empty() => obj
                .iter()
                .map(|(op, data)| {
                    FilterOp::parse(op)
                        .map(|operator| info(operator, data))
                        .ok_or_else(|| FilterError::UnsupportedOperator(op.clone()))
                })
                .collect(),
            Value::Array(_) => Ok(vec![info(FilterOp::In, value)]),
            _ => Ok(vec![info(FilterOp::Eq, value)]),
        }
    }

    fn condition_sql(&mut self, condition: &FilterWhereInfo) -> Result<String, FilterError> {
        let column = format!("\"{}\"", condition.column);
        let data = &condition.data;
        let sql = match condition.operator {
            FilterOp::Eq if data.is_null() => format!("{} IS NULL", column),
            FilterOp::Neq if data.is_null() => format!("{} IS NOT NULL", column),
            FilterOp::Eq => format!("{} = {}", column, self.param(data)),
            FilterOp::Neq => format!("{} <> {}", column, self.param(data)),
            FilterOp::Gt => format!("{} > {}", column, self.param(data)),
            FilterOp::Gte => format!("{} >= {}", column, self.param(data)),
            FilterOp::Lt => format!("{} < {}", column, self.param(data)),
            FilterOp::Lte => format!("{} <= {}", column, self.param(data)),
            FilterOp::Like => format!("{} LIKE {}", column, self.param(data)),
            FilterOp::ILike => format!("{} ILIKE {}", column, self.param(data)),
            FilterOp::In | FilterOp::NIn => {
                let negate = condition.operator == FilterOp::NIn;
                match data {
                    Value::Array(values) if values.is_empty() => {
                        if negate { "1=1".to_string() } else { "1=0".to_string() }
                    }
                    Value::Array(values) => {
                        let params: Vec<String> = values.iter().map(|v| self.param(v)).collect();
                        let op = if negate { "NOT IN" } else { "IN" };
                        format!("{} {} ({})", column, op, params.join(", "))
                    }
                    other => {
                        let op = if negate { "<>" } else { "=" };
                        format!("{} {} {}", column, op, self.param(other))
                    }
                }
            }
            FilterOp::Between => match data {
                Value::Array(values) if values.len() == 2 => format!(
                    "{} BETWEEN {} AND {}",
                    column,
                    self.param(&values[0]),
                    self.param(&values[1])
                ),
                _ => {
                    return Err(FilterError::InvalidOperatorData(
                        "$between requires exactly 2 values".to_string(),
                    ))
                }
            },
        };
        Ok(sql)
    }

    fn param(&mut self, value: &Value) -> String {
        self.param_values.push(value.clone());
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

/// Letters, digits and underscores, not starting with a digit
pub fn validate_identifier(name: &str) -> Result<(), String> {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return Err(format!("Invalid identifier: {:?}", name)),
    }
    if chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(format!("Invalid identifier: {:?}", name))
    }
}
