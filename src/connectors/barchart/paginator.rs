// @file: src/connectors/barchart/paginator.rs
// @description: Paginated options-API fetcher with 429 backoff, session rotation and partial results.
// @author: LAS.

use std::time::Duration;
use log::{debug, info, warn};
use serde_json::Value;

use crate::connectors::barchart::parser::parse_page;
use crate::core::errors::{FetchError, FetchResult};
use crate::core::interfaces::{HttpReply, PageRequest, SessionFactory, SessionHandle, Sleeper};
use crate::core::models::{FetchPolicy, PageResult, ProviderSettings, QueryScope, QuerySpec, ResultTable};

//
// CONSTANTS
//

const META_HINTS: &str = "field.shortName,field.type,field.description";

//
// STATE MACHINE TYPES
//

/// What a single response means for the page being fetched.
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    Success(String),
    RateLimited,
    Blocked,
    SessionExpired,
    ServerError(u16),
}

impl PageEvent {
    // 403 only counts as expiry when this session already served a page and
    // has not been replaced for the current page yet.
    pub fn classify(reply: HttpReply, pages_this_session: usize, renewed_for_page: bool) -> Self {
        match reply.status {
            429 => PageEvent::RateLimited,
            403 if pages_this_session > 0 && !renewed_for_page => PageEvent::SessionExpired,
            403 => PageEvent::Blocked,
            _ if reply.is_success() => PageEvent::Success(reply.body),
            status => PageEvent::ServerError(status),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Accept(String),
    RetrySamePage(Duration),
    RenewSessionAndRetry,
    Terminate(PageHalt),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageHalt {
    Blocked,
    RateLimitExhausted(u32),
    Http(u16),
}

impl From<PageHalt> for FetchError {
    fn from(halt: PageHalt) -> Self {
        match halt {
            PageHalt::Blocked => FetchError::Blocked,
            PageHalt::RateLimitExhausted(attempts) => FetchError::RateLimitExhausted { attempts },
            PageHalt::Http(status) => FetchError::Http(status),
        }
    }
}

/// `rate_limited_attempts` counts the 429s already seen for this page, including this one.
pub fn next_transition(event: PageEvent, rate_limited_attempts: u32, policy: &FetchPolicy) -> Transition {
    match event {
        PageEvent::Success(body) => Transition::Accept(body),
        PageEvent::RateLimited => {
            let delay: Duration = policy.backoff_for(rate_limited_attempts.saturating_sub(1));
            if rate_limited_attempts >= policy.rate_limit_attempts {
                Transition::Terminate(PageHalt::RateLimitExhausted(rate_limited_attempts))
            } else {
                Transition::RetrySamePage(delay)
            }
        }
        PageEvent::SessionExpired => Transition::RenewSessionAndRetry,
        PageEvent::Blocked => Transition::Terminate(PageHalt::Blocked),
        PageEvent::ServerError(status) => Transition::Terminate(PageHalt::Http(status)),
    }
}

/// Result of driving one page to a conclusion.
enum PageStep {
    Accepted(PageResult),
    // Stops pagination; partial results win if any.
    Halted(FetchError),
    // Aborts the whole operation.
    Failed(FetchError),
}

struct Cursor {
    page: usize,
    fetched: usize,
    pages_this_session: usize,
}

//
// PAGINATOR
//

pub struct Paginator<'a> {
    factory: &'a dyn SessionFactory,
    sleeper: &'a dyn Sleeper,
    settings: &'a ProviderSettings,
    policy: &'a FetchPolicy,
}

impl<'a> Paginator<'a> {
    pub fn new(
        factory: &'a dyn SessionFactory,
        sleeper: &'a dyn Sleeper,
        settings: &'a ProviderSettings,
        policy: &'a FetchPolicy,
    ) -> Self {
        Self { factory, sleeper, settings, policy }
    }

    //
    // PUBLIC INTERFACE
    //

    pub fn run(&self, query: &QuerySpec) -> FetchResult<ResultTable> {
        let label: String = query.scope.label();

        // #1. First session: failures here are terminal for the call
        let mut handle: SessionHandle = self.factory.create()?;
        let mut cursor: Cursor = Cursor { page: 1, fetched: 0, pages_this_session: 0 };
        let mut pages: Vec<PageResult> = Vec::new();

        while cursor.fetched < query.overall_cap {
            // #2. Proactive rotation
            if let Some(limit) = self.policy.pages_per_session {
                if cursor.pages_this_session >= limit {
                    debug!("[{}] Rotating session after {} pages", label, cursor.pages_this_session);
                    match self.renew(&mut handle, &mut cursor) {
                        Ok(()) => {}
                        Err(e) if !pages.is_empty() => {
                            warn!("[{}] Session rotation failed, keeping {} pages: {}", label, pages.len(), e);
                            break;
                        }
                        Err(e) => return Err(e),
                    }
                }
            }

            // #3. Drive the current page through the state machine
            let page: PageResult = match self.fetch_page(query, &mut handle, &mut cursor) {
                PageStep::Accepted(page) => page,
                PageStep::Halted(e) if !pages.is_empty() => {
                    warn!("[{}] Stopping at page {} with partial data: {}", label, cursor.page, e);
                    break;
                }
                PageStep::Halted(e) | PageStep::Failed(e) => return Err(e),
            };

            // #4. Accumulate and decide whether to continue
            if page.is_empty() {
                debug!("[{}] Page {} is empty, no more data", label, cursor.page);
                break;
            }

            let row_count: usize = page.len();
            let total_available: Option<u64> = page.total_available;
            cursor.fetched += row_count;
            cursor.pages_this_session += 1;
            pages.push(page);

            debug!("[{}] Page {}: {} rows ({} total)", label, cursor.page, row_count, cursor.fetched);

            if row_count < query.page_size {
                break;
            }
            if let Some(total) = total_available {
                if cursor.fetched as u64 >= total {
                    break;
                }
            }
            if cursor.fetched >= query.overall_cap {
                break;
            }

            cursor.page += 1;
            self.sleeper.sleep(self.policy.page_delay);
        }

        // #5. Assemble
        if pages.is_empty() {
            return Err(FetchError::NoData(label));
        }

        let page_count: usize = pages.len();
        let mut table: ResultTable = ResultTable::from_pages(pages);
        table.sort_by_oi_change_desc();
        table.truncate(query.overall_cap);

        info!("[{}] Fetched {} rows over {} pages", label, table.len(), page_count);
        Ok(table)
    }

    pub fn build_request(&self, query: &QuerySpec, page: usize, handle: &SessionHandle) -> PageRequest {
        let mut params: Vec<(String, String)> = vec![
            ("fields".to_string(), query.fields.join(",")),
            ("orderBy".to_string(), query.order_by.clone()),
            ("orderDir".to_string(), query.order_dir.as_str().to_string()),
        ];

        if let Some(option_type) = query.option_class.query_value() {
            params.push(("optionType".to_string(), option_type.to_string()));
        }
        if let QueryScope::Symbol(symbol) = &query.scope {
            params.push(("baseSymbol".to_string(), symbol.clone()));
        }

        params.push(("hasOptions".to_string(), "true".to_string()));
        params.push(("raw".to_string(), "1".to_string()));
        params.push(("page".to_string(), page.to_string()));
        params.push(("limit".to_string(), query.page_size.to_string()));
        params.push(("meta".to_string(), META_HINTS.to_string()));

        let headers: Vec<(String, String)> = vec![
            (self.settings.token_header.clone(), handle.token.as_str().to_string()),
            ("Referer".to_string(), self.settings.referer_for(&query.scope)),
            ("Accept".to_string(), "application/json".to_string()),
            ("Accept-Language".to_string(), self.settings.accept_language.clone()),
        ];

        PageRequest { url: self.settings.api_url.clone(), query: params, headers }
    }

    //
    // INTERNAL HELPERS
    //

    fn fetch_page(&self, query: &QuerySpec, handle: &mut SessionHandle, cursor: &mut Cursor) -> PageStep {
        let mut rate_limited: u32 = 0;
        let mut renewed_for_page: bool = false;

        loop {
            let request: PageRequest = self.build_request(query, cursor.page, handle);
            let reply: HttpReply = match handle.session.get(&request) {
                Ok(reply) => reply,
                Err(e) => return PageStep::Halted(e),
            };

            let event: PageEvent = PageEvent::classify(reply, cursor.pages_this_session, renewed_for_page);
            if event == PageEvent::RateLimited {
                rate_limited += 1;
            }

            match next_transition(event, rate_limited, self.policy) {
                Transition::Accept(body) => {
                    let payload: Value = match serde_json::from_str(&body) {
                        Ok(v) => v,
                        Err(e) => return PageStep::Failed(FetchError::MalformedPayload(e.to_string())),
                    };
                    return match parse_page(&payload, query.option_class.labels_contracts()) {
                        Ok(page) => PageStep::Accepted(page),
                        Err(e) => PageStep::Failed(e),
                    };
                }
                Transition::RetrySamePage(delay) => {
                    warn!("Rate limited on page {} (attempt {}), retrying in {:?}", cursor.page, rate_limited, delay);
                    self.sleeper.sleep(delay);
                }
                Transition::RenewSessionAndRetry => {
                    warn!("HTTP 403 on page {}, session looks expired, renewing", cursor.page);
                    if let Err(e) = self.renew(handle, cursor) {
                        return PageStep::Halted(e);
                    }
                    renewed_for_page = true;
                }
                Transition::Terminate(halt) => {
                    // The last 429 still waits out its backoff before giving up.
                    if let PageHalt::RateLimitExhausted(attempts) = halt {
                        self.sleeper.sleep(self.policy.backoff_for(attempts.saturating_sub(1)));
                    }
                    return PageStep::Halted(halt.into());
                }
            }
        }
    }

    fn renew(&self, handle: &mut SessionHandle, cursor: &mut Cursor) -> FetchResult<()> {
        self.sleeper.sleep(self.policy.renewal_pause);
        *handle = self.factory.create()?;
        cursor.pages_this_session = 0;
        Ok(())
    }
}


//
// UNIT TESTS
//

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> FetchPolicy {
        FetchPolicy {
            page_size: 1000,
            rate_limit_attempts: 4,
            page_delay: Duration::from_millis(300),
            renewal_pause: Duration::from_millis(1500),
            pages_per_session: Some(10),
        }
    }

    fn reply(status: u16) -> HttpReply {
        HttpReply { status, body: "{}".to_string() }
    }

    #[test]
    fn test_classify_forbidden_depends_on_session_progress() {
        assert_eq!(PageEvent::classify(reply(403), 0, false), PageEvent::Blocked);
        assert_eq!(PageEvent::classify(reply(403), 4, false), PageEvent::SessionExpired);
        assert_eq!(PageEvent::classify(reply(403), 4, true), PageEvent::Blocked);
        assert_eq!(PageEvent::classify(reply(429), 0, false), PageEvent::RateLimited);
        assert_eq!(PageEvent::classify(reply(502), 3, false), PageEvent::ServerError(502));
        assert_eq!(PageEvent::classify(reply(200), 0, false), PageEvent::Success("{}".to_string()));
    }

    #[test]
    fn test_rate_limit_backoff_sequence() {
        let policy = policy();
        let delays: Vec<Transition> = (1..=3)
            .map(|attempt| next_transition(PageEvent::RateLimited, attempt, &policy))
            .collect();

        assert_eq!(
            delays,
            vec![
                Transition::RetrySamePage(Duration::from_secs(1)),
                Transition::RetrySamePage(Duration::from_secs(2)),
                Transition::RetrySamePage(Duration::from_secs(4)),
            ]
        );
        assert_eq!(
            next_transition(PageEvent::RateLimited, 4, &policy),
            Transition::Terminate(PageHalt::RateLimitExhausted(4))
        );
    }
}
