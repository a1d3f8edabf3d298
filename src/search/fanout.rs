use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use crate::places::{Coordinates, Place, PlacesClient};

/// Run one text search per term concurrently and gather the places in completion order.
///
/// # Arguments
/// * `places` - Places client, cloned into each task
/// * `terms` - Text queries, one request each
/// * `pool_size` - Maximum number of requests in flight
/// * `deadline` - Stop waiting after this long; unfinished searches are aborted
pub async fn search_all(
    places: &PlacesClient,
    terms: &[&str],
    center: Coordinates,
    radius_meters: f64,
    pool_size: usize,
    deadline: Duration,
) -> Vec<Place> {
    let permits = Arc::new(Semaphore::new(pool_size.max(1)));
    let mut tasks = JoinSet::new();

    for term in terms {
        let term = term.to_string();
        let client = places.clone();
        let permits = permits.clone();
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await.ok();
            let result = client.search_text(&term, center, radius_meters).await;
            (term, result)
        });
    }

    let stop_at = Instant::now() + deadline;
    let mut collected = Vec::new();
    loop {
        match timeout_at(stop_at, tasks.join_next()).await {
            Ok(Some(Ok((term, Ok(found))))) => {
                debug!("Found {} results for '{}'", found.len(), term);
                collected.extend(found);
            }
            Ok(Some(Ok((term, Err(e))))) => {
                warn!("Error searching for '{}': {}", term, e);
            }
            Ok(Some(Err(e))) => {
                warn!("Search task failed: {}", e);
            }
            Ok(None) => break,
            Err(_) => {
                warn!(
                    "Places fan-out timed out after {:?}, {} search(es) abandoned",
                    deadline,
                    tasks.len()
                );
                tasks.abort_all();
                break;
            }
        }
    }

    collected
}

/// Keep the first place seen for each identifier; places without one are dropped
pub fn dedup_by_id(places: Vec<Place>) -> Vec<Place> {
    let mut seen = HashSet::new();
    places
        .into_iter()
        .filter(|place| match place.id.as_deref() {
            Some(id) if !id.is_empty() => seen.insert(id.to_string()),
            _ => false,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::places::types::LocalizedText;

    fn place(id: Option<&str>, name: &str) -> Place {
        Place {
            id: id.map(str::to_string),
            display_name: Some(LocalizedText {
                text: name.to_string(),
                language_code: None,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn first_occurrence_wins() {
        let unique = dedup_by_id(vec![
            place(Some("a"), "first"),
            place(Some("b"), "other"),
            place(Some("a"), "second"),
            place(None, "anonymous"),
            place(Some(""), "blank"),
        ]);

        let names: Vec<&str> = unique.iter().map(Place::name).collect();
        assert_eq!(names, vec!["first", "other"]);
    }
}
