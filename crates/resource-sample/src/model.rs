//! # Sample Data Model
//!
//! Inputs follow the `{ params: { queries: [{ name, value }] } }` shape the
//! sample data managers understand.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const ANIMALS: &str = "animals";
pub const USERS: &str = "users";

pub const RETRIEVE_ONE: &str = "retrieveOne";
pub const RETRIEVE_USERS: &str = "retrieveUsers";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Builds an input carrying `queries` as `{name, value}` pairs.
pub fn queries_input<V: Into<Value>>(queries: impl IntoIterator<Item = (&'static str, V)>) -> Value {
    let queries: Vec<Value> = queries
        .into_iter()
        .map(|(name, value)| json!({ "name": name, "value": value.into() }))
        .collect();
    json!({ "params": { "queries": queries } })
}

/// Reads a query value back out of an input built by [`queries_input`].
pub fn query<'a>(input: &'a Value, name: &str) -> Option<&'a Value> {
    input["params"]["queries"]
        .as_array()?
        .iter()
        .find(|query| query["name"] == name)
        .map(|query| &query["value"])
}

/// Renders the queries as a URL query string: `?kind=fox&page=1`.
/// Queries without a value are left out.
pub fn queries_string(input: &Value) -> String {
    let Some(queries) = input["params"]["queries"].as_array() else {
        return String::new();
    };
    let pairs: Vec<String> = queries
        .iter()
        .filter_map(|query| {
            let name = query["name"].as_str()?;
            match &query["value"] {
                Value::Null | Value::Bool(false) => None,
                Value::String(value) if value.is_empty() => None,
                Value::String(value) => Some(format!("{name}={value}")),
                value => Some(format!("{name}={value}")),
            }
        })
        .collect();
    if pairs.is_empty() {
        String::new()
    } else {
        format!("?{}", pairs.join("&"))
    }
}
