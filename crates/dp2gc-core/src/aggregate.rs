//! Range aggregation
//!
//! Turns a date range into a month schedule, asks the scraper for each
//! month and concatenates the results in schedule order.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Datelike;
use futures::future::try_join_all;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::event::{Credentials, EventList};
use crate::months::{month_range, year_month_schedule};
use crate::quarter::DateRange;

/// Source of monthly event lists
///
/// Implementations must return `Error::Authentication` when the portal
/// rejects the credentials. Every other failure is passed on unchanged.
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Fetch every event of one calendar month
    async fn fetch_events(&self, credentials: &Credentials, year: i32, month: u32) -> Result<EventList>;
}

/// Collects events across all months of a date range
#[derive(Clone)]
pub struct EventAggregator {
    scraper: Arc<dyn Scraper>,
    concurrent: bool,
}

impl EventAggregator {
    /// Create an aggregator that scrapes one month at a time
    pub fn new(scraper: Arc<dyn Scraper>) -> Self {
        Self {
            scraper,
            concurrent: false,
        }
    }

    /// Issue all month requests at once instead of one after another.
    ///
    /// The result order is the same either way.
    pub fn with_concurrency(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    pub fn is_concurrent(&self) -> bool {
        self.concurrent
    }

    /// Aggregate every month spanned by `range`
    pub async fn aggregate(&self, credentials: &Credentials, range: &DateRange) -> Result<EventList> {
        let months = month_range(range.start.month(), range.end.month());
        self.aggregate_months(credentials, range.start.year(), &months).await
    }

    /// Aggregate an explicit month sequence starting in `start_year`.
    ///
    /// The first error aborts the whole aggregation and no partial list is
    /// returned.
    pub async fn aggregate_months(
        &self,
        credentials: &Credentials,
        start_year: i32,
        months: &[u32],
    ) -> Result<EventList> {
        let schedule = year_month_schedule(start_year, months);
        debug!(
            "Aggregating {} months for {}: {:?}",
            schedule.len(),
            credentials.username,
            schedule
        );

        let result = if self.concurrent {
            self.collect_concurrent(credentials, &schedule).await
        } else {
            self.collect_sequential(credentials, &schedule).await
        };

        match result {
            Ok(events) => {
                info!("Aggregated {} events over {} months", events.len(), schedule.len());
                Ok(events)
            }
            Err(e) => {
                if e.is_authentication() {
                    warn!("Portal rejected credentials for {}: {}", credentials.username, e);
                } else {
                    warn!("Aggregation failed: {}", e);
                }
                Err(e)
            }
        }
    }

    async fn collect_sequential(&self, credentials: &Credentials, schedule: &[(i32, u32)]) -> Result<EventList> {
        let mut aggregated = EventList::default();

        for &(year, month) in schedule {
            let page = self.scraper.fetch_events(credentials, year, month).await?;
            debug!("{}-{:02}: {} events", year, month, page.len());
            aggregated.extend(page);
        }

        Ok(aggregated)
    }

    async fn collect_concurrent(&self, credentials: &Credentials, schedule: &[(i32, u32)]) -> Result<EventList> {
        let requests = schedule
            .iter()
            .map(|&(year, month)| self.scraper.fetch_events(credentials, year, month));

        // try_join_all keeps input order and stops at the first error
        let pages = try_join_all(requests).await?;

        let mut aggregated = EventList::default();
        for page in pages {
            aggregated.extend(page);
        }
        Ok(aggregated)
    }
}
