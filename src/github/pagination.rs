// Link header parsing.
// Discovers the total page count of a paginated list response.
//
// A GitHub Link header looks like:
// <https://api.github.com/repositories/1/pulls?state=all&page=2>; rel="next",
// <https://api.github.com/repositories/1/pulls?state=all&page=60>; rel="last"

use tracing::warn;

use crate::error::{GhstatsError, Result};

/// One `<url>; rel="..."` entry of a Link header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRelation {
    pub rel: String,
    pub url: String,
}

impl LinkRelation {
    /// Value of the `page` query parameter in the target URL.
    pub fn page(&self) -> Option<u32> {
        let (_, query) = self.url.split_once('?')?;
        query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == "page")
            .and_then(|(_, value)| value.parse().ok())
    }
}

/// Split a Link header into its relations.
pub fn parse_link_header(value: &str) -> Result<Vec<LinkRelation>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(parse_entry)
        .collect()
}

fn parse_entry(entry: &str) -> Result<LinkRelation> {
    let malformed = || GhstatsError::Protocol(format!("malformed Link header entry: {}", entry));

    let mut parts = entry.split(';').map(str::trim);
    let url = parts
        .next()
        .and_then(|u| u.strip_prefix('<'))
        .and_then(|u| u.strip_suffix('>'))
        .ok_or_else(malformed)?;

    let rel = parts
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim() == "rel")
        .map(|(_, value)| value.trim().trim_matches('"'))
        .ok_or_else(malformed)?;

    Ok(LinkRelation {
        rel: rel.to_string(),
        url: url.to_string(),
    })
}

/// Total page count reported when the header gives no usable bound.
/// Callers that do not need a total treat it as "no limit".
pub const UNKNOWN_TOTAL: u32 = u32::MAX;

/// Total number of pages for a list response fetched at `current_page`.
///
/// GitHub drops `rel="last"` on the final page and omits the header entirely
/// for single-page results. Missing or malformed metadata is an error only if
/// `requires_total` is set; otherwise a missing header past page 1 yields the
/// current page and an unusable header yields `UNKNOWN_TOTAL`.
pub fn last_page(link: Option<&str>, current_page: u32, requires_total: bool) -> Result<u32> {
    let Some(link) = link else {
        if current_page <= 1 || !requires_total {
            return Ok(current_page.max(1));
        }
        return Err(GhstatsError::Protocol(format!(
            "missing Link header on page {}",
            current_page
        )));
    };

    match last_page_from_header(link, current_page) {
        Err(err) if !requires_total => {
            warn!(%err, "ignoring unusable Link header");
            Ok(UNKNOWN_TOTAL)
        }
        result => result,
    }
}

fn last_page_from_header(link: &str, current_page: u32) -> Result<u32> {
    let relations = parse_link_header(link)?;

    if let Some(last) = relations.iter().find(|r| r.rel == "last") {
        return last.page().ok_or_else(|| {
            GhstatsError::Protocol(format!("no page number in last link: {}", last.url))
        });
    }

    if relations.iter().any(|r| r.rel == "prev") {
        return Ok(current_page);
    }

    Err(GhstatsError::Protocol(format!(
        "Link header has neither last nor prev relation: {}",
        link
    )))
}
