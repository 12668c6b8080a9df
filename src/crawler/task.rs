//! Per-record crawl tasks
//!
//! Each task walks the same protocol: navigate, stabilize (search tasks
//! only), discover or extract, classify, persist. Tasks never propagate
//! failures upward: every outcome lands on the record, and page handles are
//! released on every path.

use crate::crawler::extract::{extract_fields, FIELD_RULES, REQUIRED_FIELD};
use crate::crawler::AppContext;
use crate::fetch::{FetchResult, PageHandle};
use crate::store::{DiscoveredPlace, DocumentStore, PlaceRecord, SearchTarget};
use std::collections::BTreeSet;
use std::time::Duration;
use url::Url;

/// Terminal classification of one crawl task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Task succeeded; `new_places` counts net-new discoveries (always 0 for
    /// detail tasks)
    Completed { new_places: u64 },

    /// Task failed with a human-readable reason, recorded on the record
    Failed { reason: String },
}

impl TaskOutcome {
    fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }
}

/// Builds the search page URL for a target from the configured template
pub fn build_search_url(template: &str, target: &SearchTarget) -> String {
    template
        .replace("{query}", &target.encoded_query)
        .replace("{lat}", &target.lat)
        .replace("{long}", &target.lng)
}

/// Polls the growth of a scrollable container until it reaches a fixed point.
///
/// Each poll triggers growth and reads the new extent. The loop terminates
/// once the extent is unchanged for `stable_polls` consecutive polls, a
/// fixed-point detector rather than a fixed iteration count. Returns the stable
/// extent.
pub(crate) async fn stabilize(
    page: &dyn PageHandle,
    container_selector: &str,
    poll_interval: Duration,
    stable_polls: u32,
) -> FetchResult<u64> {
    let mut last_extent: Option<u64> = None;
    let mut unchanged = 0u32;

    loop {
        let extent = page.evaluate_growth(container_selector).await?;
        if Some(extent) == last_extent {
            unchanged += 1;
        } else {
            unchanged = 0;
        }
        last_extent = Some(extent);

        if unchanged >= stable_polls {
            return Ok(extent);
        }

        tokio::time::sleep(poll_interval).await;
    }
}

/// Crawls one search target: loads its search page, stabilizes the result
/// list, discovers place URLs and hands them to the dedup sink.
///
/// The returned outcome is persisted onto the target by the scheduler.
pub async fn run_search_task(ctx: &AppContext, target: &SearchTarget) -> TaskOutcome {
    if target.encoded_query.is_empty() {
        return TaskOutcome::failed("missing encoded query");
    }

    let scraper = &ctx.config.scraper;
    let url = build_search_url(&scraper.search_url_template, target);
    tracing::debug!(target_id = target.id, url = %url, "Navigating to search page");

    let page = match ctx
        .engine
        .open(&url, Duration::from_secs(scraper.navigation_timeout_secs))
        .await
    {
        Ok(page) => page,
        Err(e) => return TaskOutcome::failed(e.to_string()),
    };

    let result = discover_places(ctx, target, page.as_ref()).await;
    page.close().await;

    match result {
        Ok(new_places) => TaskOutcome::Completed { new_places },
        Err(reason) => TaskOutcome::failed(reason),
    }
}

/// The discover/persist half of a search task, separated so the page handle
/// is closed on every path by the caller.
async fn discover_places(
    ctx: &AppContext,
    target: &SearchTarget,
    page: &dyn PageHandle,
) -> Result<u64, String> {
    let scraper = &ctx.config.scraper;

    let extent = stabilize(
        page,
        &scraper.results_container_selector,
        Duration::from_millis(scraper.scroll_poll_interval_ms),
        scraper.stable_polls,
    )
    .await
    .map_err(|e| e.to_string())?;

    let anchors = page
        .query_all(&scraper.place_link_selector)
        .await
        .map_err(|e| e.to_string())?;

    let mut urls = BTreeSet::new();
    for anchor in &anchors {
        let Some(href) = anchor.attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.starts_with(&scraper.place_url_prefix) && Url::parse(href).is_ok() {
            urls.insert(href.to_string());
        }
    }

    tracing::debug!(
        target_id = target.id,
        extent,
        discovered = urls.len(),
        "Search results stabilized"
    );

    if urls.is_empty() {
        return Ok(0);
    }

    let docs: Vec<DiscoveredPlace> = urls
        .into_iter()
        .map(|url| DiscoveredPlace {
            url,
            target_id: target.id,
            region: target.region.clone(),
            category: target.category.clone(),
        })
        .collect();

    let outcome = ctx
        .store()
        .insert_discovered(&docs)
        .map_err(|e| e.to_string())?;

    if outcome.conflicts > 0 {
        tracing::debug!(
            target_id = target.id,
            conflicts = outcome.conflicts,
            "Duplicate place URLs skipped"
        );
    }

    Ok(outcome.inserted)
}

/// Crawls one place detail page: extracts every attribute independently and
/// updates the place record directly.
///
/// The task settles regardless of persistence failures; those are logged and
/// never re-raised.
pub async fn run_detail_task(ctx: &AppContext, place: &PlaceRecord) -> TaskOutcome {
    let scraper = &ctx.config.scraper;
    tracing::debug!(place_id = place.id, url = %place.url, "Navigating to place page");

    let page = match ctx
        .engine
        .open(&place.url, Duration::from_secs(scraper.detail_timeout_secs))
        .await
    {
        Ok(page) => page,
        Err(e) => {
            let reason = e.to_string();
            persist_place_failure(ctx, place.id, &reason);
            return TaskOutcome::failed(reason);
        }
    };

    let values = extract_fields(page.as_ref(), FIELD_RULES).await;
    page.close().await;

    // The task only counts as successful when the designated required
    // attribute was read, however many others populated.
    let name = values.get(REQUIRED_FIELD).cloned();
    match name {
        Some(name) => {
            let mut attrs = values;
            attrs.remove(REQUIRED_FIELD);
            if let Err(e) = ctx.store().complete_place(place.id, &name, &attrs) {
                tracing::error!(place_id = place.id, error = %e, "Failed to persist place");
            }
            TaskOutcome::Completed { new_places: 0 }
        }
        None => {
            let reason = format!("required attribute missing: {}", REQUIRED_FIELD);
            persist_place_failure(ctx, place.id, &reason);
            TaskOutcome::failed(reason)
        }
    }
}

fn persist_place_failure(ctx: &AppContext, place_id: i64, reason: &str) {
    if let Err(e) = ctx.store().fail_place(place_id, reason) {
        tracing::error!(place_id, error = %e, "Failed to record place failure");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{Element, FetchError};
    use crate::store::TargetStatus;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct GrowthPage {
        extents: Mutex<Vec<u64>>,
    }

    #[async_trait]
    impl PageHandle for GrowthPage {
        async fn query(&self, _selector: &str) -> FetchResult<Option<Element>> {
            Ok(None)
        }

        async fn query_all(&self, _selector: &str) -> FetchResult<Vec<Element>> {
            Ok(vec![])
        }

        async fn evaluate_growth(&self, _container_selector: &str) -> FetchResult<u64> {
            let mut extents = self.extents.lock().unwrap();
            assert!(!extents.is_empty(), "polled past the scripted sequence");
            Ok(extents.remove(0))
        }

        async fn close(self: Box<Self>) {}
    }

    #[tokio::test]
    async fn test_stabilization_terminates_at_fixed_point() {
        let page = GrowthPage {
            extents: Mutex::new(vec![10, 50, 90, 90, 90, 90]),
        };

        let extent = stabilize(&page, "div", Duration::from_millis(1), 3)
            .await
            .unwrap();

        assert_eq!(extent, 90);
        // Exactly the scripted sequence was consumed, nothing more
        assert!(page.extents.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stabilization_propagates_container_errors() {
        struct NoContainer;

        #[async_trait]
        impl PageHandle for NoContainer {
            async fn query(&self, _selector: &str) -> FetchResult<Option<Element>> {
                Ok(None)
            }
            async fn query_all(&self, _selector: &str) -> FetchResult<Vec<Element>> {
                Ok(vec![])
            }
            async fn evaluate_growth(&self, selector: &str) -> FetchResult<u64> {
                Err(FetchError::MissingContainer(selector.to_string()))
            }
            async fn close(self: Box<Self>) {}
        }

        let result = stabilize(&NoContainer, "div", Duration::from_millis(1), 3).await;
        assert!(matches!(result, Err(FetchError::MissingContainer(_))));
    }

    #[test]
    fn test_build_search_url_substitutes_placeholders() {
        let target = SearchTarget {
            id: 1,
            encoded_query: "coffee+shops".to_string(),
            label: "coffee shops".to_string(),
            lat: "12.97".to_string(),
            lng: "77.59".to_string(),
            region: None,
            category: None,
            status: TargetStatus::Entry,
            result_count: 0,
            error_message: None,
            created_at: String::new(),
            updated_at: String::new(),
        };

        let url = build_search_url(
            "https://www.google.com/maps/search/{query}/@{lat},{long}",
            &target,
        );
        assert_eq!(
            url,
            "https://www.google.com/maps/search/coffee+shops/@12.97,77.59"
        );
    }
}
