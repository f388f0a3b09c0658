//! University portal client

use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDate, NaiveTime, Utc};
use dp2gc_core::{Credentials, EventList, PortalConfig, Scraper};
use reqwest::header::{ACCEPT, CONTENT_TYPE, COOKIE, ORIGIN, REFERER, SET_COOKIE};
use reqwest::{Client, Url};
use tracing::{debug, error, info};

use crate::error::{PortalError, Result};
use crate::response::parse_events;
use crate::session::{login_form, PortalSession};

/// The portal reports dates in JST (UTC+9, no DST)
const PORTAL_UTC_OFFSET_SECS: i32 = 9 * 3600;

/// Client id of the calendar component on the portal's top page
const CALENDAR: &str = "funcForm:j_idt361";

/// Number of per-day memo fields the calendar form posts back
const MEMO_FIELDS: usize = 9;

/// Logs into the portal and reads its monthly calendar
pub struct PortalClient {
    client: Client,
    config: PortalConfig,
    origin: String,
}

impl PortalClient {
    /// Create a new portal client
    pub fn new(config: PortalConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| PortalError::Configuration(e.to_string()))?;

        let origin = Url::parse(&config.login_url)
            .map(|url| url.origin().ascii_serialization())
            .map_err(|e| PortalError::Configuration(format!("Invalid login URL: {}", e)))?;

        info!("Portal client initialized for: {}", origin);

        Ok(Self {
            client,
            config,
            origin,
        })
    }

    /// Log in and collect the session tokens
    pub async fn login(&self, credentials: &Credentials) -> Result<PortalSession> {
        debug!(
            "Logging in as {} (password {})",
            credentials.username,
            credentials.masked_password()
        );

        let response = self
            .client
            .post(&self.config.login_url)
            .form(&login_form(&credentials.username, &credentials.password))
            .send()
            .await
            .map_err(|e| PortalError::Connection(e.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            error!("Portal login failed: {}", status);
            return Err(PortalError::Authentication(format!("Login failed: {}", status)));
        }

        let set_cookie: Vec<String> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(|value| value.to_string())
            .collect();

        let html = response
            .text()
            .await
            .map_err(|e| PortalError::HttpError(e.to_string()))?;

        PortalSession::from_login_page(&html, set_cookie.iter().map(String::as_str))
    }

    /// Fetch one month of calendar events with an existing session
    pub async fn fetch_month(&self, session: &PortalSession, year: i32, month: u32) -> Result<EventList> {
        let (start, end) = month_bounds_millis(year, month)?;
        let today = Utc::now().with_timezone(&portal_offset()?).format("%Y/%m/%d").to_string();
        let form = calendar_form(session, start, end, &today);

        debug!("Fetching calendar {}-{:02} from {}", year, month, self.config.api_url);

        let response = self
            .client
            .post(&self.config.api_url)
            .header(ACCEPT, "application/xml, text/xml, */*; q=0.01")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded; charset=UTF-8")
            .header(COOKIE, session.cookie_header())
            .header(ORIGIN, &self.origin)
            .header(REFERER, &self.config.login_url)
            .header("Faces-Request", "partial/ajax")
            .header("X-Requested-With", "XMLHttpRequest")
            .form(&form)
            .send()
            .await
            .map_err(|e| PortalError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Calendar request failed: {} - {}", status, error_text);
            return Err(PortalError::HttpError(format!(
                "Failed to fetch class events: {}",
                status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PortalError::HttpError(e.to_string()))?;
        let events = parse_events(&body)?;

        info!("{}-{:02}: fetched {} events", year, month, events.len());
        Ok(EventList::new(events))
    }
}

#[async_trait]
impl Scraper for PortalClient {
    async fn fetch_events(
        &self,
        credentials: &Credentials,
        year: i32,
        month: u32,
    ) -> dp2gc_core::Result<EventList> {
        // Reject before touching the network
        if !(1..=12).contains(&month) {
            return Err(PortalError::InvalidMonth(month).into());
        }

        let session = self.login(credentials).await?;
        Ok(self.fetch_month(&session, year, month).await?)
    }
}

fn portal_offset() -> Result<FixedOffset> {
    FixedOffset::east_opt(PORTAL_UTC_OFFSET_SECS)
        .ok_or_else(|| PortalError::Configuration("Invalid portal UTC offset".to_string()))
}

/// Midnight of the first and of the last day of a month, in epoch
/// milliseconds at the portal's UTC offset.
pub fn month_bounds_millis(year: i32, month: u32) -> Result<(i64, i64)> {
    if !(1..=12).contains(&month) {
        return Err(PortalError::InvalidMonth(month));
    }

    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or(PortalError::InvalidMonth(month))?;
    let last = first
        .checked_add_months(chrono::Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or(PortalError::InvalidMonth(month))?;

    let offset = portal_offset()?;
    let to_millis = |date: NaiveDate| {
        date.and_time(NaiveTime::MIN)
            .and_local_timezone(offset)
            .single()
            .map(|dt| dt.timestamp_millis())
            .ok_or(PortalError::InvalidMonth(month))
    };

    Ok((to_millis(first)?, to_millis(last)?))
}

/// Form fields for the calendar's partial-ajax month request
pub fn calendar_form(
    session: &PortalSession,
    start_millis: i64,
    end_millis: i64,
    today: &str,
) -> Vec<(String, String)> {
    let content = format!("{}:content", CALENDAR);
    let field = |name: &str, value: &str| (name.to_string(), value.to_string());

    let mut form = vec![
        field("javax.faces.partial.ajax", "true"),
        field("javax.faces.source", &content),
        field("javax.faces.partial.execute", &content),
        field("javax.faces.partial.render", &content),
        field(&content, &content),
        field(&format!("{}_start", content), &start_millis.to_string()),
        field(&format!("{}_end", content), &end_millis.to_string()),
        field("funcForm", "funcForm"),
        field("rx-token", &session.rx_token),
        field("rx-loginKey", &session.rx_login_key),
        field("rx-deviceKbn", "1"),
        field("rx-loginType", "Gakuen"),
        field("funcForm:j_idt162_activeIndex", "0"),
        field(&format!("{}:j_idt1767:j_idt1767_input", CALENDAR), today),
        field(&format!("{}_view", content), "month"),
    ];

    for i in 0..MEMO_FIELDS {
        form.push(field(&format!("{}:j_idt2402:{}:jugyoMemo", CALENDAR, i), ""));
    }

    form.push(field(&format!("{}_activeIndex", CALENDAR), "1"));
    form.push(field("javax.faces.ViewState", &session.view_state));
    form
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY_MILLIS: i64 = 86_400_000;

    fn session() -> PortalSession {
        PortalSession {
            jsession_id: "abc".to_string(),
            rx_token: "tok".to_string(),
            rx_login_key: "key".to_string(),
            view_state: "1:2".to_string(),
        }
    }

    fn value<'a>(form: &'a [(String, String)], name: &str) -> Option<&'a str> {
        form.iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_month_bounds_april_2022() {
        let (start, end) = month_bounds_millis(2022, 4).unwrap();
        // 2022-04-01T00:00:00+09:00
        assert_eq!(start, 1_648_738_800_000);
        // 2022-04-30T00:00:00+09:00
        assert_eq!(end, 1_651_244_400_000);
    }

    #[test]
    fn test_month_bounds_december_and_february() {
        let (start, end) = month_bounds_millis(2022, 12).unwrap();
        assert_eq!(end - start, 30 * DAY_MILLIS);

        let (start, end) = month_bounds_millis(2024, 2).unwrap();
        assert_eq!(end - start, 28 * DAY_MILLIS);
    }

    #[test]
    fn test_month_bounds_rejects_invalid_month() {
        assert!(matches!(month_bounds_millis(2022, 0), Err(PortalError::InvalidMonth(0))));
        assert!(matches!(month_bounds_millis(2022, 13), Err(PortalError::InvalidMonth(13))));
    }

    #[test]
    fn test_calendar_form_fields() {
        let form = calendar_form(&session(), 10, 20, "2022/04/01");

        assert_eq!(value(&form, "funcForm:j_idt361:content_start"), Some("10"));
        assert_eq!(value(&form, "funcForm:j_idt361:content_end"), Some("20"));
        assert_eq!(value(&form, "funcForm:j_idt361:content_view"), Some("month"));
        assert_eq!(value(&form, "rx-token"), Some("tok"));
        assert_eq!(value(&form, "rx-loginKey"), Some("key"));
        assert_eq!(value(&form, "javax.faces.ViewState"), Some("1:2"));
        assert_eq!(
            value(&form, "funcForm:j_idt361:j_idt1767:j_idt1767_input"),
            Some("2022/04/01")
        );
        assert_eq!(value(&form, "funcForm:j_idt361:j_idt2402:8:jugyoMemo"), Some(""));
        assert_eq!(value(&form, "funcForm:j_idt361:j_idt2402:9:jugyoMemo"), None);
    }

    #[test]
    fn test_client_rejects_invalid_login_url() {
        let config = PortalConfig {
            login_url: "not a url".to_string(),
            ..PortalConfig::default()
        };
        assert!(matches!(PortalClient::new(config), Err(PortalError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_invalid_month_never_contacts_portal() {
        // Unroutable address: any request would fail as a connection error
        let config = PortalConfig {
            login_url: "http://127.0.0.1:9/login".to_string(),
            api_url: "http://127.0.0.1:9/calendar".to_string(),
            ..PortalConfig::default()
        };
        let client = PortalClient::new(config).unwrap();
        let credentials = Credentials::new("s123456", "secret");

        let err = client.fetch_events(&credentials, 2022, 13).await.unwrap_err();
        assert!(matches!(err, dp2gc_core::Error::Scraper(ref msg) if msg.contains("Invalid month")));
    }
}
