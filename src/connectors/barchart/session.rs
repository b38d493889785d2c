// @file: src/connectors/barchart/session.rs
// @description: Browser-like HTTP session factory that bootstraps the CSRF token from cookies.
// @author: LAS.

use std::sync::Arc;
use log::{debug, info};
use percent_encoding::percent_decode_str;
use reqwest::blocking::Client;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use url::Url;

use crate::core::errors::{FetchError, FetchResult};
use crate::core::interfaces::{ApiSession, AuthToken, HttpReply, PageRequest, SessionFactory, SessionHandle};
use crate::core::models::ProviderSettings;

//
// CONSTANTS
//

const BOOTSTRAP_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

//
// FACTORY
//

pub struct BrowserSessionFactory {
    settings: ProviderSettings,
}

impl BrowserSessionFactory {
    pub fn new(settings: ProviderSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self, jar: Arc<Jar>) -> FetchResult<Client> {
        // No TLS handshake impersonation in this stack: the client passes as a
        // browser through its User-Agent and default headers only.
        let mut headers: HeaderMap = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&self.settings.accept_language) {
            headers.insert(ACCEPT_LANGUAGE, value);
        }

        Client::builder()
            .cookie_provider(jar)
            .user_agent(self.settings.user_agent.as_str())
            .default_headers(headers)
            .timeout(self.settings.request_timeout)
            .build()
            .map_err(|e| FetchError::Connectivity(format!("Could not build HTTP client: {}", e)))
    }
}

impl SessionFactory for BrowserSessionFactory {
    fn create(&self) -> FetchResult<SessionHandle> {
        // #1. Client with its own cookie jar
        let bootstrap_url: Url = Url::parse(&self.settings.bootstrap_url)
            .map_err(|e| FetchError::InvalidInput(format!("bootstrap url: {}", e)))?;
        let jar: Arc<Jar> = Arc::new(Jar::default());
        let client: Client = self.build_client(jar.clone())?;

        // #2. Visit the page that sets the anti-CSRF cookie
        debug!("Bootstrapping session via {}", bootstrap_url);
        let response = client
            .get(bootstrap_url.clone())
            .header(ACCEPT, BOOTSTRAP_ACCEPT)
            .send()
            .map_err(|e| FetchError::Connectivity(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Connectivity(format!("bootstrap returned HTTP {}", status.as_u16())));
        }

        // #3. Harvest the token
        let token: AuthToken = extract_token(jar.as_ref(), &bootstrap_url, &self.settings.token_cookie)?;
        info!("New provider session established");

        Ok(SessionHandle {
            session: Box::new(BrowserSession { client }),
            token,
        })
    }
}

//
// SESSION
//

pub struct BrowserSession {
    client: Client,
}

impl ApiSession for BrowserSession {
    fn get(&self, request: &PageRequest) -> FetchResult<HttpReply> {
        let mut builder = self.client.get(&request.url).query(&request.query);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().map_err(|e| FetchError::Request(e.to_string()))?;
        let status: u16 = response.status().as_u16();
        let body: String = response.text().map_err(|e| FetchError::Request(e.to_string()))?;

        Ok(HttpReply { status, body })
    }
}

//
// TOKEN HELPERS
//

pub fn extract_token(jar: &Jar, url: &Url, cookie_name: &str) -> FetchResult<AuthToken> {
    let header: Option<HeaderValue> = jar.cookies(url);
    let raw: Option<String> = header
        .as_ref()
        .and_then(|h| h.to_str().ok())
        .and_then(|h| find_cookie(h, cookie_name))
        .map(decode_cookie_value);

    match raw {
        Some(token) if !token.is_empty() => Ok(AuthToken::new(token)),
        _ => Err(FetchError::MissingToken(cookie_name.to_string())),
    }
}

/// Picks one value out of a `Cookie:` header ("a=1; b=2").
pub fn find_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

pub fn decode_cookie_value(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}


//
// UNIT TESTS
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_cookie_in_header() {
        let header = "laravel_session=abc; XSRF-TOKEN=eyJpdiI6%3D%3D; market=us";
        assert_eq!(find_cookie(header, "XSRF-TOKEN"), Some("eyJpdiI6%3D%3D"));
        assert_eq!(find_cookie(header, "missing"), None);
    }

    #[test]
    fn test_decode_cookie_value() {
        assert_eq!(decode_cookie_value("eyJpdiI6%3D%3D"), "eyJpdiI6==");
        assert_eq!(decode_cookie_value("plain"), "plain");
    }

    #[test]
    fn test_extract_token_from_jar() {
        let url: Url = Url::parse("https://www.example.test/options/open-interest-change").unwrap();
        let jar: Jar = Jar::default();
        jar.add_cookie_str("XSRF-TOKEN=abc%2Fdef%3D; Path=/", &url);

        let token = extract_token(&jar, &url, "XSRF-TOKEN").unwrap();
        assert_eq!(token.as_str(), "abc/def=");

        let empty: Jar = Jar::default();
        assert!(matches!(extract_token(&empty, &url, "XSRF-TOKEN"), Err(FetchError::MissingToken(_))));
    }
}
