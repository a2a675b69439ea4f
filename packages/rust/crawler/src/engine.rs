//! Search-page fetcher that turns a free-text query into candidate links.
//!
//! The client issues one GET against a configurable search URL template,
//! parses the response with `scraper`, and also picks up markdown-style
//! `[title](url)` spans for sources that answer in markdown. Candidate
//! filtering (noise hosts, dedup, cap) is the caller's job.

use std::net::IpAddr;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, instrument, warn};
use url::Url;

use destinos_shared::{DestinosError, Link, ResolverConfig, Result};

use crate::LinkSource;

/// User-Agent string for search requests.
const USER_AGENT: &str = concat!("Destinos/", env!("CARGO_PKG_VERSION"));

/// Placeholder substituted in the search URL template.
const QUERY_PLACEHOLDER: &str = "{query}";

/// Markdown inline link with an absolute http(s) target.
static MARKDOWN_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]\n]+)\]\((https?://[^)\s]+)\)").expect("markdown link regex")
});

// ---------------------------------------------------------------------------
// SearchClient
// ---------------------------------------------------------------------------

/// HTTP-backed [`LinkSource`].
pub struct SearchClient {
    client: Client,
    search_url: String,
    /// Allow localhost/private IPs (for integration tests with mock servers).
    allow_localhost: bool,
}

impl SearchClient {
    /// Create a new client from the resolver configuration.
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        if !config.search_url.contains(QUERY_PLACEHOLDER) {
            return Err(DestinosError::config(format!(
                "search_url must contain {QUERY_PLACEHOLDER}: {}",
                config.search_url
            )));
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(config.timeout.max(Duration::from_secs(1)))
            .build()
            .map_err(|e| DestinosError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            search_url: config.search_url.clone(),
            allow_localhost: false,
        })
    }

    /// Allow querying localhost/private IPs (for integration tests).
    pub fn allow_localhost(mut self) -> Self {
        self.allow_localhost = true;
        self
    }

    /// Fetch the search page for `query` and extract every candidate link.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn fetch_candidates(&self, query: &str) -> Result<Vec<Link>> {
        let url = build_search_url(&self.search_url, query)?;

        if !self.allow_localhost && is_ssrf_target(&url) {
            warn!(%url, "SSRF protection: blocked");
            return Err(DestinosError::Network(format!(
                "refusing to query private address {url}"
            )));
        }

        debug!(%url, "querying link source");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| DestinosError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DestinosError::Network(format!("{url}: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| DestinosError::Network(format!("{url}: body read failed: {e}")))?;

        let mut links = extract_anchor_links(&body, &url);
        for link in extract_markdown_links(&body) {
            if !links.iter().any(|l| l.url == link.url) {
                links.push(link);
            }
        }

        debug!(candidates = links.len(), "link source answered");
        Ok(links)
    }
}

impl LinkSource for SearchClient {
    async fn search(&self, query: &str) -> Result<Vec<Link>> {
        self.fetch_candidates(query).await
    }
}

// ---------------------------------------------------------------------------
// URL building
// ---------------------------------------------------------------------------

/// Substitute the form-encoded query into the template.
fn build_search_url(template: &str, query: &str) -> Result<Url> {
    let encoded: String = url::form_urlencoded::byte_serialize(query.trim().as_bytes()).collect();
    let raw = template.replace(QUERY_PLACEHOLDER, &encoded);
    Url::parse(&raw).map_err(|e| DestinosError::config(format!("invalid search URL {raw}: {e}")))
}

// ---------------------------------------------------------------------------
// Candidate extraction
// ---------------------------------------------------------------------------

/// Extract titled `<a href>` links, resolved against the page URL.
fn extract_anchor_links(html: &str, base_url: &Url) -> Vec<Link> {
    let doc = Html::parse_document(html);
    let link_sel = Selector::parse("a[href]").expect("anchor selector");
    let mut links: Vec<Link> = Vec::new();

    for el in doc.select(&link_sel) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };

        // Skip anchors, javascript:, mailto:
        if href.starts_with('#') || href.starts_with("javascript:") || href.starts_with("mailto:")
        {
            continue;
        }

        let Ok(resolved) = base_url.join(href) else {
            continue;
        };
        let mut target = unwrap_redirect(&resolved).unwrap_or(resolved);
        target.set_fragment(None);

        if target.scheme() != "http" && target.scheme() != "https" {
            continue;
        }

        let title = collapse_whitespace(&el.text().collect::<String>());
        if title.is_empty() {
            continue;
        }

        let url = target.to_string();
        if links.iter().any(|l| l.url == url) {
            continue;
        }
        links.push(Link::new(title, url, ""));
    }

    links
}

/// Extract `[title](https://...)` spans from text.
fn extract_markdown_links(text: &str) -> Vec<Link> {
    MARKDOWN_LINK_RE
        .captures_iter(text)
        .map(|caps| Link::new(collapse_whitespace(&caps[1]), caps[2].to_string(), ""))
        .filter(|l| !l.titulo.is_empty())
        .collect()
}

/// Search engines wrap result links as `/url?q=<target>`; return the target.
fn unwrap_redirect(url: &Url) -> Option<Url> {
    if url.path() != "/url" {
        return None;
    }
    url.query_pairs()
        .find(|(k, _)| k == "q" || k == "url")
        .and_then(|(_, v)| Url::parse(&v).ok())
        .filter(|u| u.scheme() == "http" || u.scheme() == "https")
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Check if a URL targets a potentially dangerous resource.
fn is_ssrf_target(url: &Url) -> bool {
    // Block non-HTTP schemes
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    // Block private/loopback IPs
    if let Some(host) = url.host_str() {
        let bare = host.trim_start_matches('[').trim_end_matches(']');
        if let Ok(ip) = bare.parse::<IpAddr>() {
            return is_private_ip(&ip);
        }
        // Block known local hostnames
        if host == "localhost" || host.ends_with(".local") || host.ends_with(".internal") {
            return true;
        }
    }

    false
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}
