//! # Elasticsearch Emitter
//!
//! Renders a [`CompiledQuery`] as a `_search` request body. The index is
//! chosen by the caller, so the compiled table name is not part of the output.

use serde_json::{json, Map, Value};

use super::{value_text, CompareOp, CompiledQuery, Condition, Result, ZqlError};

/// Emit the search body as compact JSON.
pub fn emit(query: &CompiledQuery) -> Result<String> {
    let mut body = Map::new();
    body.insert("query".into(), query_clause(&query.filter)?);

    if let Some(from) = query.offset {
        body.insert("from".into(), json!(from));
    }
    if let Some(size) = query.limit {
        body.insert("size".into(), json!(size));
    }
    if let Some(order) = &query.order {
        let dir = if order.descending { "desc" } else { "asc" };
        body.insert(
            "sort".into(),
            json!([{ order.field.as_str(): { "order": dir } }]),
        );
    }
    if !query.fields.is_empty() {
        body.insert("_source".into(), json!(query.fields));
    }

    Ok(Value::Object(body).to_string())
}

fn query_clause(filter: &[Vec<Condition>]) -> Result<Value> {
    match filter {
        [] => Ok(json!({ "match_all": {} })),
        [group] => bool_group(group),
        groups => {
            let should = groups
                .iter()
                .map(|g| bool_group(g))
                .collect::<Result<Vec<_>>>()?;
            Ok(json!({ "bool": { "should": should, "minimum_should_match": 1 } }))
        }
    }
}

fn bool_group(group: &[Condition]) -> Result<Value> {
    let mut must = Vec::new();
    let mut must_not = Vec::new();

    for cond in group {
        let field = cond.field.as_str();
        let value = &cond.value;
        match cond.op {
            CompareOp::Eq if value.is_null() => must_not.push(json!({ "exists": { "field": field } })),
            CompareOp::Neq if value.is_null() => must.push(json!({ "exists": { "field": field } })),
            CompareOp::Eq => must.push(json!({ "term": { field: value } })),
            CompareOp::Neq => must_not.push(json!({ "term": { field: value } })),
            op if op.is_range() => {
                if !(value.is_number() || value.is_string()) {
                    return Err(ZqlError::Unsupported {
                        backend: "elasticsearch",
                        reason: format!("range comparison on '{}' needs a number or string, found {}", field, value),
                    });
                }
                let key = match op {
                    CompareOp::Gt => "gt",
                    CompareOp::Gte => "gte",
                    CompareOp::Lt => "lt",
                    _ => "lte",
                };
                must.push(json!({ "range": { field: { key: value } } }));
            }
            CompareOp::Contains => {
                let pattern = format!("*{}*", escape_wildcard(&value_text(value)));
                must.push(json!({ "wildcard": { field: { "value": pattern } } }));
            }
            _ => must.push(json!({ "prefix": { field: value_text(value) } })),
        }
    }

    let mut clauses = Map::new();
    if !must.is_empty() {
        clauses.insert("must".into(), Value::Array(must));
    }
    if !must_not.is_empty() {
        clauses.insert("must_not".into(), Value::Array(must_not));
    }
    Ok(json!({ "bool": clauses }))
}

fn escape_wildcard(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if matches!(ch, '*' | '?' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
