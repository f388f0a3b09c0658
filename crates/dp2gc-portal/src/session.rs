//! Portal login session
//!
//! The portal is a JSF application. Logging in returns a page whose hidden
//! inputs carry the tokens every later request has to echo back, plus a
//! `JSESSIONID` cookie.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::error::{PortalError, Result};

const RX_TOKEN: &str = "rx-token";
const RX_LOGIN_KEY: &str = "rx-loginKey";
const VIEW_STATE: &str = "javax.faces.ViewState";

static JSESSIONID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"JSESSIONID=([^;]+)").expect("valid JSESSIONID pattern"));

/// Tokens obtained from a successful login
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortalSession {
    pub jsession_id: String,
    pub rx_token: String,
    pub rx_login_key: String,
    pub view_state: String,
}

impl PortalSession {
    /// Build a session from the page returned by the login form.
    ///
    /// A page without the session tokens means the portal did not accept
    /// the credentials and sent the login form back.
    pub fn from_login_page<'a, I>(html: &str, set_cookie_headers: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut session = Self {
            jsession_id: extract_jsession_id(set_cookie_headers).unwrap_or_default(),
            ..Self::default()
        };

        let document = Html::parse_document(html);
        let selector = Selector::parse("input[name]")
            .map_err(|e| PortalError::ParseError(format!("Invalid selector: {:?}", e)))?;

        for input in document.select(&selector) {
            let element = input.value();
            let value = element.attr("value").unwrap_or_default().to_string();
            match element.attr("name") {
                Some(RX_TOKEN) => session.rx_token = value,
                Some(RX_LOGIN_KEY) => session.rx_login_key = value,
                Some(VIEW_STATE) => session.view_state = value,
                _ => {}
            }
        }

        if session.rx_token.is_empty() || session.rx_login_key.is_empty() || session.view_state.is_empty() {
            return Err(PortalError::Authentication(
                "Login was not accepted by the portal".to_string(),
            ));
        }

        Ok(session)
    }

    /// `Cookie` header value for portal requests
    pub fn cookie_header(&self) -> String {
        format!("JSESSIONID={}", self.jsession_id)
    }
}

/// Form fields posted to the login endpoint
pub fn login_form(username: &str, password: &str) -> Vec<(&'static str, String)> {
    vec![
        ("loginForm", "loginForm".to_string()),
        ("loginForm:userId", username.to_string()),
        ("loginForm:password", password.to_string()),
        ("loginForm:loginButton", String::new()),
        (VIEW_STATE, "stateless".to_string()),
    ]
}

/// First `JSESSIONID` value found among `Set-Cookie` headers
pub fn extract_jsession_id<'a, I>(set_cookie_headers: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    set_cookie_headers.into_iter().find_map(|header| {
        JSESSIONID_RE
            .captures(header)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGGED_IN_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>ポータル</title></head>
<body>
<form id="funcForm" name="funcForm" method="post">
  <input type="hidden" name="funcForm" value="funcForm">
  <input type="hidden" name="rx-token" value="tok-123">
  <input type="hidden" name="rx-loginKey" value="key-456">
  <input type="hidden" name="rx-deviceKbn" value="1">
  <input type="hidden" name="javax.faces.ViewState" id="j_id1:javax.faces.ViewState:0" value="-123:456">
</form>
</body>
</html>"#;

    const LOGIN_FORM_PAGE: &str = r#"<html><body>
<form id="loginForm">
  <input type="text" name="loginForm:userId" value="">
  <input type="password" name="loginForm:password" value="">
  <span class="error">ユーザIDまたはパスワードが正しくありません</span>
</form>
</body></html>"#;

    #[test]
    fn test_session_from_logged_in_page() {
        let session = PortalSession::from_login_page(
            LOGGED_IN_PAGE,
            ["JSESSIONID=abc123; Path=/uprx; HttpOnly"],
        )
        .unwrap();

        assert_eq!(session.jsession_id, "abc123");
        assert_eq!(session.rx_token, "tok-123");
        assert_eq!(session.rx_login_key, "key-456");
        assert_eq!(session.view_state, "-123:456");
        assert_eq!(session.cookie_header(), "JSESSIONID=abc123");
    }

    #[test]
    fn test_login_form_page_is_authentication_error() {
        let err = PortalSession::from_login_page(LOGIN_FORM_PAGE, [] as [&str; 0]).unwrap_err();
        assert!(matches!(err, PortalError::Authentication(_)));
    }

    #[test]
    fn test_extract_jsession_id_among_cookies() {
        let headers = ["lang=ja; Path=/", "JSESSIONID=xyz789; Path=/uprx; Secure"];
        assert_eq!(extract_jsession_id(headers), Some("xyz789".to_string()));
        assert_eq!(extract_jsession_id(["lang=ja"]), None);
    }

    #[test]
    fn test_login_form_fields() {
        let form = login_form("s123456", "secret");
        assert!(form.contains(&("loginForm:userId", "s123456".to_string())));
        assert!(form.contains(&("loginForm:password", "secret".to_string())));
        assert!(form.contains(&("javax.faces.ViewState", "stateless".to_string())));
    }
}
