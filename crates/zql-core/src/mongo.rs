//! # MongoDB Emitter
//!
//! Renders a [`CompiledQuery`] as a `mongo` shell expression:
//!
//! ```text
//! db.getSiblingDB("shop").getCollection("orders").find({"amount":{"$gt":100}}).limit(50)
//! ```

use std::collections::HashSet;

use serde_json::{json, Map, Value};

use super::{value_text, CompareOp, CompiledQuery, Condition, Result, ZqlError};

const BACKEND: &str = "mongodb";

/// Handle to the database the emitted query runs against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Database {
    name: String,
}

impl Database {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Emit a shell query. A non-empty `collection` overrides the compiled table.
pub fn emit(query: &CompiledQuery, db: &Database, collection: &str) -> Result<String> {
    if db.name.is_empty() {
        return Err(unsupported("database name is empty"));
    }
    let collection = if collection.is_empty() {
        query.table.as_str()
    } else {
        collection
    };
    if collection.is_empty() {
        return Err(unsupported(
            "no collection given; add a FROM clause or a table prefix",
        ));
    }

    let mut out = format!(
        "db.getSiblingDB({}).getCollection({}).find({}",
        Value::from(db.name.as_str()),
        Value::from(collection),
        filter_document(&query.filter)
    );
    if !query.fields.is_empty() {
        let projection: Map<String, Value> = query
            .fields
            .iter()
            .map(|f| (f.clone(), json!(1)))
            .collect();
        out.push(',');
        out.push_str(&Value::Object(projection).to_string());
    }
    out.push(')');

    if let Some(order) = &query.order {
        let dir = if order.descending { -1 } else { 1 };
        out.push_str(&format!(".sort({})", json!({ order.field.as_str(): dir })));
    }
    if let Some(skip) = query.offset {
        out.push_str(&format!(".skip({})", skip));
    }
    if let Some(limit) = query.limit {
        out.push_str(&format!(".limit({})", limit));
    }

    Ok(out)
}

/// Build the `find()` filter document for an OR-of-ANDs filter.
pub fn filter_document(filter: &[Vec<Condition>]) -> Value {
    match filter {
        [] => json!({}),
        [group] => and_document(group),
        groups => json!({ "$or": groups.iter().map(|g| and_document(g)).collect::<Vec<_>>() }),
    }
}

fn and_document(group: &[Condition]) -> Value {
    let mut seen = HashSet::new();
    let distinct = group.iter().all(|c| seen.insert(c.field.as_str()));

    if distinct {
        let doc: Map<String, Value> = group
            .iter()
            .map(|c| (c.field.clone(), condition_value(c)))
            .collect();
        Value::Object(doc)
    } else {
        let clauses: Vec<Value> = group
            .iter()
            .map(|c| json!({ c.field.as_str(): condition_value(c) }))
            .collect();
        json!({ "$and": clauses })
    }
}

fn condition_value(cond: &Condition) -> Value {
    let v = cond.value.clone();
    match cond.op {
        CompareOp::Eq => v,
        CompareOp::Neq => json!({ "$ne": v }),
        CompareOp::Gt => json!({ "$gt": v }),
        CompareOp::Gte => json!({ "$gte": v }),
        CompareOp::Lt => json!({ "$lt": v }),
        CompareOp::Lte => json!({ "$lte": v }),
        CompareOp::Contains => json!({ "$regex": regex::escape(&value_text(&v)) }),
        CompareOp::StartsWith => {
            json!({ "$regex": format!("^{}", regex::escape(&value_text(&v))) })
        }
    }
}

fn unsupported(reason: &str) -> ZqlError {
    ZqlError::Unsupported {
        backend: BACKEND,
        reason: reason.to_string(),
    }
}
