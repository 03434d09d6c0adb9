//! # InfluxDB Emitter
//!
//! Renders a [`CompiledQuery`] as an InfluxQL `SELECT` statement.

use serde_json::Value;

use super::{value_text, CompareOp, CompiledQuery, Condition, Result, ZqlError};

const BACKEND: &str = "influxdb";

/// Emit InfluxQL. A non-empty `measurement` overrides the compiled table.
pub fn emit(query: &CompiledQuery, measurement: &str) -> Result<String> {
    let measurement = if measurement.is_empty() {
        query.table.as_str()
    } else {
        measurement
    };
    if measurement.is_empty() {
        return Err(unsupported(
            "no measurement given; add a FROM clause or a table prefix".into(),
        ));
    }

    let fields = if query.fields.is_empty() {
        "*".to_string()
    } else {
        query
            .fields
            .iter()
            .map(|f| quote_ident(f))
            .collect::<Vec<_>>()
            .join(",")
    };

    let mut out = format!("SELECT {} FROM {}", fields, quote_ident(measurement));

    if !query.filter.is_empty() {
        out.push_str(" WHERE ");
        out.push_str(&where_clause(&query.filter)?);
    }

    if let Some(order) = &query.order {
        if !order.field.eq_ignore_ascii_case("time") {
            return Err(unsupported(format!(
                "ORDER BY is only supported on time, not '{}'",
                order.field
            )));
        }
        out.push_str(if order.descending {
            " ORDER BY time DESC"
        } else {
            " ORDER BY time ASC"
        });
    }
    if let Some(limit) = query.limit {
        out.push_str(&format!(" LIMIT {}", limit));
    }
    if let Some(offset) = query.offset {
        out.push_str(&format!(" OFFSET {}", offset));
    }

    Ok(out)
}

fn where_clause(filter: &[Vec<Condition>]) -> Result<String> {
    let wrap = filter.len() > 1;
    let mut groups = Vec::with_capacity(filter.len());
    for group in filter {
        let parts = group
            .iter()
            .map(condition)
            .collect::<Result<Vec<_>>>()?;
        let joined = parts.join(" AND ");
        if wrap && parts.len() > 1 {
            groups.push(format!("({})", joined));
        } else {
            groups.push(joined);
        }
    }
    Ok(groups.join(" OR "))
}

fn condition(cond: &Condition) -> Result<String> {
    let field = quote_ident(&cond.field);
    let op = match cond.op {
        CompareOp::Eq => "=",
        CompareOp::Neq => "!=",
        CompareOp::Gt => ">",
        CompareOp::Gte => ">=",
        CompareOp::Lt => "<",
        CompareOp::Lte => "<=",
        CompareOp::Contains => {
            return Ok(format!("{} =~ /{}/", field, regex_body(&cond.value)));
        }
        CompareOp::StartsWith => {
            return Ok(format!("{} =~ /^{}/", field, regex_body(&cond.value)));
        }
    };
    Ok(format!("{} {} {}", field, op, literal(&cond.field, &cond.value)?))
}

fn literal(field: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(format!(
            "'{}'",
            s.replace('\\', "\\\\").replace('\'', "\\'")
        )),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(unsupported(format!(
            "cannot compare '{}' against {}",
            field, value
        ))),
    }
}

fn regex_body(value: &Value) -> String {
    regex::escape(&value_text(value)).replace('/', "\\/")
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\\\""))
}

fn unsupported(reason: String) -> ZqlError {
    ZqlError::Unsupported {
        backend: BACKEND,
        reason,
    }
}
