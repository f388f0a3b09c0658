//! dp2gc-portal: university portal scraper
//!
//! Logs into the student portal with the caller's credentials and reads
//! one month of the class calendar at a time.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dp2gc_core::{Credentials, PortalConfig, Scraper};
//! use dp2gc_portal::PortalClient;
//!
//! let client = PortalClient::new(PortalConfig::default())?;
//! let credentials = Credentials::new("s123456", "password");
//!
//! // April 2022
//! let events = client.fetch_events(&credentials, 2022, 4).await?;
//! ```

pub mod client;
pub mod error;
pub mod response;
pub mod session;

pub use client::PortalClient;
pub use error::{PortalError, Result};
pub use session::PortalSession;
