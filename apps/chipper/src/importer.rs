use std::sync::Arc;
use std::time::Duration;

use chipper_core::error::ChipperError;
use chipper_core::traits::ContentStore;
use tracing::{info, warn};

/// Outcome counters for one import run.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub created: u64,
    pub skipped: u64,
    pub failed: u64,
    pub failures: Vec<String>,
}

/// Imports users from a JSON endpoint: an array of `{name, email}` records.
/// Existing emails are skipped, malformed records are counted as failures and
/// never abort the run.
pub async fn import_users(
    store: Arc<dyn ContentStore>,
    url: &str,
    limit: i64,
) -> Result<ImportReport, ChipperError> {
    if limit < 1 {
        return Err(ChipperError::Infrastructure {
            reason: "Limit must be greater than zero".to_string(),
        });
    }

    info!("Fetching users from {} (limit: {})", url, limit);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| ChipperError::Infrastructure {
            reason: format!("Failed to build import client: {}", e),
        })?;

    let response = client
        .get(url)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| ChipperError::Infrastructure {
            reason: format!("Request failed: {}", e),
        })?;

    if !response.status().is_success() {
        return Err(ChipperError::Infrastructure {
            reason: format!("Request failed with status {}", response.status()),
        });
    }

    let payload: serde_json::Value =
        response
            .json()
            .await
            .map_err(|e| ChipperError::Infrastructure {
                reason: format!("Failed to parse JSON payload: {}", e),
            })?;

    let Some(records) = payload.as_array() else {
        return Err(ChipperError::Infrastructure {
            reason: "JSON payload is not an array".to_string(),
        });
    };

    let mut report = ImportReport::default();

    for (index, record) in records.iter().take(limit as usize).enumerate() {
        match import_record(store.as_ref(), record).await {
            Ok(true) => {
                report.created += 1;
                info!("User imported (index: {})", index);
            }
            Ok(false) => {
                report.skipped += 1;
                info!("User skipped (already exists) (index: {})", index);
            }
            Err(reason) => {
                report.failed += 1;
                warn!("User import failure (index: {}): {}", index, reason);
                report.failures.push(reason);
            }
        }
    }

    info!(
        "Import completed. Created: {}, Skipped: {}, Failed: {}",
        report.created, report.skipped, report.failed
    );

    Ok(report)
}

async fn import_record(
    store: &dyn ContentStore,
    record: &serde_json::Value,
) -> Result<bool, String> {
    let Some(fields) = record.as_object() else {
        return Err("Malformed record encountered.".to_string());
    };

    let name = fields.get("name").and_then(|v| v.as_str());
    let email = fields.get("email").and_then(|v| v.as_str());

    let (Some(name), Some(email)) = (name, email) else {
        return Err(format!("Missing name/email for record {}", record));
    };

    store
        .insert_user_if_absent(name, email)
        .await
        .map_err(|e| format!("Failed to import {}: {}", email, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use infrastructure::content_store::SqliteContentStore;
    use serde_json::json;

    async fn create_test_store() -> (Arc<SqliteContentStore>, tempfile::TempDir) {
        let tmp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let db_path = tmp_dir.path().join("test.db");
        let store = SqliteContentStore::new(db_path.to_str().expect("Invalid path"))
            .await
            .expect("Failed to create test store");
        (Arc::new(store), tmp_dir)
    }

    #[tokio::test]
    async fn test_import_record_created_then_skipped() {
        let (store, _tmp) = create_test_store().await;
        let record = json!({"name": "Ada", "email": "ada@example.com"});

        let first = import_record(store.as_ref(), &record).await.unwrap();
        assert!(first);

        let second = import_record(store.as_ref(), &record).await.unwrap();
        assert!(!second);
    }

    #[tokio::test]
    async fn test_import_record_rejects_malformed() {
        let (store, _tmp) = create_test_store().await;

        let err = import_record(store.as_ref(), &json!("not an object"))
            .await
            .unwrap_err();
        assert!(err.contains("Malformed"));
    }

    #[tokio::test]
    async fn test_import_record_rejects_missing_fields() {
        let (store, _tmp) = create_test_store().await;

        let err = import_record(store.as_ref(), &json!({"name": "Ada"}))
            .await
            .unwrap_err();
        assert!(err.contains("Missing name/email"));
    }

    #[tokio::test]
    async fn test_import_rejects_non_positive_limit() {
        let (store, _tmp) = create_test_store().await;

        let result = import_users(store, "http://localhost:1/users.json", 0).await;
        assert!(matches!(result, Err(ChipperError::Infrastructure { .. })));
    }
}
