// @file: src/core/interfaces.rs
// @description: Seams between the paginator and the HTTP/session layer, plus the pacing clock.
// @author: LAS.

use std::fmt;
use std::time::Duration;

use crate::core::errors::FetchResult;


//
// REQUEST / REPLY
//

#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl PageRequest {
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn header_value(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}


//
// SESSION TYPES
//

/// CSRF token harvested from the bootstrap cookies.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(value: impl Into<String>) -> Self {
        AuthToken(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "AuthToken(***)")
    }
}

pub trait ApiSession: Send {
    fn get(&self, request: &PageRequest) -> FetchResult<HttpReply>;
}

/// Session + token pair. Dropping it ends the session.
pub struct SessionHandle {
    pub session: Box<dyn ApiSession>,
    pub token: AuthToken,
}

pub trait SessionFactory: Send + Sync {
    fn create(&self) -> FetchResult<SessionHandle>;
}


//
// PACING
//

pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}
