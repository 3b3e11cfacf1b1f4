// libs/scheduling-cell/src/services/search.rs
use tracing::debug;

use crate::error::StoreError;
use crate::models::SearchResults;
use crate::services::store::SchedulingStore;

/// Free-text lookup over doctors and medical fields. A blank query returns
/// nothing without reaching the store.
pub async fn search_directory(store: &dyn SchedulingStore, query: &str) -> Result<SearchResults, StoreError> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(SearchResults::default());
    }

    let results = store.search_directory(query.to_string()).await?;
    debug!("Search '{}' matched {} doctors and {} fields",
           query, results.doctors.len(), results.medical_fields.len());
    Ok(results)
}
