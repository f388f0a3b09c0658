//! dp2gc-core: class event aggregation core
//!
//! Quarter tokens and their date ranges, the month sequence a range spans,
//! and the loop that collects monthly event lists from a [`Scraper`] into
//! one list.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod event;
pub mod months;
pub mod quarter;

pub use aggregate::{EventAggregator, Scraper};
pub use config::{AggregationConfig, Config, PortalConfig, ServerConfig};
pub use error::{Error, Result};
pub use event::{mask_password, Credentials, Event, EventList};
pub use months::{month_range, year_month_schedule};
pub use quarter::{is_valid_import_range, DateRange, QuarterTable, QuarterToken, ACADEMIC_YEARS};
