// One check cycle for one task.
//
// Guard -> listing crawl -> mode selection -> single-page or listing
// processing -> atomic commit. Writes accumulate in a CheckCycle and reach
// the store only when the cycle completes; any error before that drops them
// and leaves `last_checked` untouched so the task is retried next pass.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use pagewatch_common::{CrawlConfig, Task};
use pagewatch_web::{
    extract_links, is_same_domain, normalize_detail_url, paged_url, LinkFilter, PageFetcher,
    TextExtractor,
};

use crate::cycle::CheckCycle;
use crate::snippet::{context_snippet, detail_context, single_page_context};
use crate::traits::TaskStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckMode {
    /// No candidate links: the task URL itself was inspected.
    SinglePage,
    /// New detail links were collected and each was inspected.
    Listing,
}

/// Why the listing crawl stopped paginating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Every page up to `max_pages` was visited.
    PageBudgetExhausted,
    /// `max_detail_links` candidates were collected.
    LinkBudgetReached,
    /// A page contributed no unrecorded links; later pages are assumed seen.
    NoNewLinks,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckOutcome {
    /// Task missing or inactive. Nothing was fetched or written.
    Skipped,
    /// Single-page mode found no text. Nothing was written, so the task stays due.
    NoText,
    /// The cycle ran to completion and was committed.
    Completed {
        mode: CheckMode,
        stop: StopReason,
        alerts: usize,
        links_recorded: usize,
    },
    /// The cycle aborted. Nothing was written.
    Failed { error: String },
}

impl CheckOutcome {
    /// At least one alert was created.
    pub fn found(&self) -> bool {
        matches!(self, CheckOutcome::Completed { alerts, .. } if *alerts > 0)
    }
}

/// Result of paginating a task's listing.
#[derive(Debug)]
struct ListingCrawl {
    candidates: Vec<String>,
    pages_fetched: u32,
    stop: StopReason,
}

pub struct TaskChecker {
    store: Arc<dyn TaskStore>,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn TextExtractor>,
    config: CrawlConfig,
    filter: LinkFilter,
}

impl TaskChecker {
    pub fn new(
        store: Arc<dyn TaskStore>,
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn TextExtractor>,
        config: CrawlConfig,
    ) -> Self {
        let filter = LinkFilter::from_config(&config);
        Self {
            store,
            fetcher,
            extractor,
            config,
            filter,
        }
    }

    /// Run one cycle. Errors never escape: they are logged and reported as
    /// [`CheckOutcome::Failed`].
    pub async fn check_task(&self, task_id: Uuid) -> CheckOutcome {
        match self.run_cycle(task_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let message = format!("{e:#}");
                error!(%task_id, error = message.as_str(), "Check cycle aborted");
                CheckOutcome::Failed { error: message }
            }
        }
    }

    async fn run_cycle(&self, task_id: Uuid) -> Result<CheckOutcome> {
        let task = match self.store.get_task(task_id).await? {
            Some(task) if task.is_active => task,
            Some(_) => {
                info!(%task_id, "Task is paused, skipping");
                return Ok(CheckOutcome::Skipped);
            }
            None => {
                info!(%task_id, "Task not found, skipping");
                return Ok(CheckOutcome::Skipped);
            }
        };

        info!(%task_id, url = task.url.as_str(), keyword = task.keyword.as_str(), "Checking task");

        let crawl = self.crawl_listing(&task).await?;
        debug!(
            %task_id,
            pages = crawl.pages_fetched,
            candidates = crawl.candidates.len(),
            stop = ?crawl.stop,
            "Listing crawl finished"
        );

        let mut cycle = CheckCycle::new(task.id);
        let mode = if crawl.candidates.is_empty() {
            if !self.check_single_page(&task, &mut cycle).await? {
                return Ok(CheckOutcome::NoText);
            }
            CheckMode::SinglePage
        } else {
            self.check_detail_links(&task, &crawl.candidates, &mut cycle)
                .await?;
            CheckMode::Listing
        };

        self.store
            .commit_cycle(&cycle, Utc::now())
            .await
            .context("committing check cycle")?;

        let alerts = cycle.alerts().len();
        info!(
            %task_id,
            mode = ?mode,
            alerts,
            links = cycle.links().len(),
            "Check cycle complete"
        );

        Ok(CheckOutcome::Completed {
            mode,
            stop: crawl.stop,
            alerts,
            links_recorded: cycle.links().len(),
        })
    }

    /// Walk listing pages collecting detail links not yet recorded for the task.
    async fn crawl_listing(&self, task: &Task) -> Result<ListingCrawl> {
        let mut candidates = Vec::new();
        let mut seen = HashSet::new();
        let mut pages_fetched = 0;

        for page in 1..=self.config.max_pages {
            let page_url = paged_url(&task.url, page, &self.config.page_param)
                .with_context(|| format!("building page {page} of {}", task.url))?;

            let html = self
                .fetcher
                .fetch(&page_url)
                .await
                .with_context(|| format!("fetching listing page {page_url}"))?;
            pages_fetched = page;

            let links = match html {
                Some(html) => self.listing_links(&task.url, &page_url, &html),
                None => {
                    warn!(task_id = %task.id, url = page_url.as_str(), "Listing page forbidden");
                    Vec::new()
                }
            };

            let known = self.store.known_links(task.id, &links).await?;
            let new_links: Vec<String> = links
                .into_iter()
                .filter(|link| !known.contains(link))
                .collect();

            debug!(task_id = %task.id, page, new = new_links.len(), known = known.len(), "Listing page scanned");

            if new_links.is_empty() {
                return Ok(ListingCrawl {
                    candidates,
                    pages_fetched,
                    stop: StopReason::NoNewLinks,
                });
            }

            for link in new_links {
                if !seen.insert(link.clone()) {
                    continue;
                }
                candidates.push(link);
                if candidates.len() >= self.config.max_detail_links {
                    return Ok(ListingCrawl {
                        candidates,
                        pages_fetched,
                        stop: StopReason::LinkBudgetReached,
                    });
                }
            }
        }

        Ok(ListingCrawl {
            candidates,
            pages_fetched,
            stop: StopReason::PageBudgetExhausted,
        })
    }

    /// Same-domain, normalized, rule-passing links of one listing page, first occurrence kept.
    fn listing_links(&self, task_url: &str, page_url: &str, html: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        extract_links(page_url, html)
            .into_iter()
            .filter(|link| is_same_domain(task_url, link))
            .filter_map(|link| normalize_detail_url(&link).ok())
            .filter(|link| self.filter.allows(link))
            .filter(|link| seen.insert(link.clone()))
            .collect()
    }

    /// Inspect the task URL itself. Returns `false` when no text came back.
    async fn check_single_page(&self, task: &Task, cycle: &mut CheckCycle) -> Result<bool> {
        let text = self
            .extractor
            .extract(&task.url)
            .await
            .with_context(|| format!("extracting text from {}", task.url))?;

        let Some(text) = text else {
            warn!(task_id = %task.id, url = task.url.as_str(), "No text extracted");
            return Ok(false);
        };

        match context_snippet(&text, &task.keyword) {
            Some(snippet) => {
                info!(task_id = %task.id, keyword = task.keyword.as_str(), "Keyword found");
                cycle.add_alert(single_page_context(&snippet));
            }
            None => {
                info!(task_id = %task.id, keyword = task.keyword.as_str(), "Keyword not found");
            }
        }
        Ok(true)
    }

    /// Inspect each candidate in discovery order. Every candidate is recorded,
    /// whether or not it produced text.
    async fn check_detail_links(
        &self,
        task: &Task,
        candidates: &[String],
        cycle: &mut CheckCycle,
    ) -> Result<()> {
        for link in candidates {
            let text = self
                .extractor
                .extract(link)
                .await
                .with_context(|| format!("extracting text from {link}"))?;
            cycle.record_link(link.as_str());

            let Some(text) = text else {
                warn!(task_id = %task.id, url = link.as_str(), "No text extracted");
                continue;
            };

            if let Some(snippet) = context_snippet(&text, &task.keyword) {
                info!(
                    task_id = %task.id,
                    url = link.as_str(),
                    keyword = task.keyword.as_str(),
                    "Keyword found on detail page"
                );
                cycle.add_alert(detail_context(link, &snippet));
            }
        }
        Ok(())
    }
}
