//! A paged user directory.

use crate::model::{queries_string, User, RETRIEVE_USERS};
use serde_json::json;
use std::time::Duration;
use tracing::debug;
use with_resources::{FetchError, MethodTable};

pub const NETWORK_DELAY: Duration = Duration::from_millis(1000);

pub fn directory() -> Vec<User> {
    vec![
        User {
            first_name: "John".to_string(),
            last_name: "Smith".to_string(),
            email: "john.smith@withResources.com".to_string(),
        },
        User {
            first_name: "Alice".to_string(),
            last_name: "Green".to_string(),
            email: "alice.green@withResources.com".to_string(),
        },
    ]
}

/// `retrieveUsers` answers `{ users }` after [`NETWORK_DELAY`].
pub fn users() -> MethodTable {
    MethodTable::new().method(RETRIEVE_USERS, |input| async move {
        debug!(queries = %queries_string(&input), "Fetching users");
        tokio::time::sleep(NETWORK_DELAY).await;
        serde_json::to_value(directory())
            .map(|users| json!({ "users": users }))
            .map_err(|e| FetchError::failed(e.to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::queries_input;
    use with_resources::{Cargo, DataManager};

    #[tokio::test(start_paused = true)]
    async fn test_retrieve_users_takes_a_network_delay() {
        let cargo = Cargo::new(RETRIEVE_USERS, queries_input([("page", 1), ("pageSize", 10)]));
        let started = tokio::time::Instant::now();
        let result = users().fetch(&cargo).await.unwrap();

        assert!(started.elapsed() >= NETWORK_DELAY);
        let users: Vec<User> = serde_json::from_value(result["retrieveUsers"]["users"].clone()).unwrap();
        assert_eq!(users, directory());
    }
}
