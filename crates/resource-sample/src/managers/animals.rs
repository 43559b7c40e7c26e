//! Random animal pictures, one kind at a time.

use crate::model::{query, queries_string, RETRIEVE_ONE};
use serde_json::json;
use std::time::Duration;
use tracing::debug;
use with_resources::MethodTable;

pub const NETWORK_DELAY: Duration = Duration::from_millis(50);

/// Kinds the image service knows; anything else gets a fox.
pub const KINDS: [&str; 3] = ["fox", "cat", "dog"];

/// `retrieveOne` answers `{ image }` for the `kind` query.
pub fn animals() -> MethodTable {
    MethodTable::new().method(RETRIEVE_ONE, |input| async move {
        debug!(queries = %queries_string(&input), "Fetching animal");
        tokio::time::sleep(NETWORK_DELAY).await;
        let kind = query(&input, "kind")
            .and_then(|kind| kind.as_str())
            .filter(|kind| KINDS.contains(kind))
            .unwrap_or("fox");
        Ok(json!({ "image": format!("{kind}.png") }))
    })
}
