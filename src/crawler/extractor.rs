//! Structured extraction from fetched HTML
//!
//! This module turns a fetched document into page content and outbound
//! links:
//! - Title, description and keywords from `<meta>` tags, via a rule table
//! - Header text from `<h1>`..`<h6>`
//! - Image captions from `<img alt>`
//! - Child URLs from `<a href>`, resolved against the final URL, and the
//!   domain-roots they belong to
//!
//! The meta rules are a heuristic and the whole strategy sits behind the
//! [`Extractor`] trait so it can be swapped out.

use crate::crawler::fetcher::FetchedPage;
use crate::storage::PageRecord;
use crate::url::{domain_root, resolve_href};
use scraper::{ElementRef, Html, Selector};
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;
use url::Url;

/// A failure anywhere in the extraction pipeline; the page is dropped
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Document is not HTML (content-type {content_type})")]
    NotHtml { content_type: String },

    #[error("Invalid base URL {url}: {message}")]
    InvalidBaseUrl { url: String, message: String },

    #[error("Invalid selector {selector}: {message}")]
    Selector { selector: String, message: String },
}

/// Content and links extracted from one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub title: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub headers: BTreeSet<String>,
    pub image_captions: BTreeSet<String>,

    /// Every resolved anchor target
    pub child_urls: BTreeSet<String>,

    /// Domain-roots of the child URLs not yet visited by the caller,
    /// in first-seen order
    pub child_domain_roots: Vec<String>,
}

impl Extraction {
    /// Builds the page record for `url` from this extraction
    pub fn to_page_record(&self, url: &str) -> PageRecord {
        PageRecord {
            url: url.to_string(),
            title: self.title.clone(),
            description: self.description.clone(),
            keywords: self.keywords.clone(),
            headers: self.headers.clone(),
            image_captions: self.image_captions.clone(),
            child_urls: self.child_urls.clone(),
        }
    }
}

/// Extraction strategy
pub trait Extractor: Send + Sync {
    /// Extracts content and links from `page`
    ///
    /// Domain-roots already in `visited` are left out of
    /// `child_domain_roots`; the full child URL set is not filtered.
    fn extract(
        &self,
        page: &FetchedPage,
        visited: &HashSet<String>,
    ) -> Result<Extraction, ExtractionError>;
}

/// Page fields that a meta rule can fill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaField {
    Title,
    Description,
    Keywords,
}

/// Maps a substring of any attribute value on a `<meta>` tag to a field
///
/// Matching is case-sensitive: `name="Description"` does not match the
/// `description` needle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetaRule {
    pub needle: &'static str,
    pub field: MetaField,
}

/// Rules are tried in order and only the first match applies to a tag
pub const DEFAULT_META_RULES: &[MetaRule] = &[
    MetaRule {
        needle: "description",
        field: MetaField::Description,
    },
    MetaRule {
        needle: "title",
        field: MetaField::Title,
    },
    MetaRule {
        needle: "keyword",
        field: MetaField::Keywords,
    },
];

const HEADER_SELECTOR: &str = "h1, h2, h3, h4, h5, h6";

/// The default HTML extractor, built on `scraper`
#[derive(Debug, Clone)]
pub struct HtmlExtractor {
    meta_rules: Vec<MetaRule>,
}

impl Default for HtmlExtractor {
    fn default() -> Self {
        Self::with_rules(DEFAULT_META_RULES.to_vec())
    }
}

impl HtmlExtractor {
    /// Creates an extractor with a custom meta rule table
    pub fn with_rules(meta_rules: Vec<MetaRule>) -> Self {
        Self { meta_rules }
    }

    /// Returns the rule that applies to a meta tag, if any
    fn matching_rule(&self, meta: &ElementRef<'_>) -> Option<MetaField> {
        self.meta_rules
            .iter()
            .find(|rule| {
                meta.value()
                    .attrs()
                    .any(|(_, value)| value.contains(rule.needle))
            })
            .map(|rule| rule.field)
    }
}

impl Extractor for HtmlExtractor {
    fn extract(
        &self,
        page: &FetchedPage,
        visited: &HashSet<String>,
    ) -> Result<Extraction, ExtractionError> {
        if let Some(content_type) = &page.content_type {
            if !content_type.to_lowercase().contains("html") {
                return Err(ExtractionError::NotHtml {
                    content_type: content_type.clone(),
                });
            }
        }

        let base_url =
            Url::parse(&page.final_url).map_err(|e| ExtractionError::InvalidBaseUrl {
                url: page.final_url.clone(),
                message: e.to_string(),
            })?;

        let document = Html::parse_document(&page.body);
        let mut extraction = Extraction::default();

        self.extract_meta(&document, &mut extraction)?;
        extraction.headers = extract_headers(&document)?;
        extraction.image_captions = extract_image_captions(&document)?;
        extract_links(&document, &base_url, visited, &mut extraction)?;

        Ok(extraction)
    }
}

impl HtmlExtractor {
    fn extract_meta(
        &self,
        document: &Html,
        extraction: &mut Extraction,
    ) -> Result<(), ExtractionError> {
        let mut title: Option<String> = None;
        let mut description: Option<String> = None;
        let mut keywords: Option<Vec<String>> = None;

        for meta in document.select(&selector("meta")?) {
            let Some(field) = self.matching_rule(&meta) else {
                continue;
            };
            let Some(value) = meta
                .value()
                .attr("content")
                .or_else(|| meta.value().attr("value"))
            else {
                continue;
            };

            match field {
                MetaField::Title if title.is_none() => title = Some(value.to_string()),
                MetaField::Description if description.is_none() => {
                    description = Some(value.to_string())
                }
                MetaField::Keywords if keywords.is_none() => keywords = Some(split_keywords(value)),
                _ => {}
            }
        }

        extraction.title = match title.filter(|t| !t.is_empty()) {
            Some(title) => title,
            None => document
                .select(&selector("title")?)
                .next()
                .map(|element| element.text().collect::<String>().trim().to_string())
                .unwrap_or_default(),
        };
        extraction.description = description.unwrap_or_default();
        extraction.keywords = keywords.unwrap_or_default();

        Ok(())
    }
}

fn selector(css: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(css).map_err(|e| ExtractionError::Selector {
        selector: css.to_string(),
        message: format!("{:?}", e),
    })
}

fn split_keywords(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

fn extract_headers(document: &Html) -> Result<BTreeSet<String>, ExtractionError> {
    Ok(document
        .select(&selector(HEADER_SELECTOR)?)
        .map(|element| element.text().collect::<String>().trim().to_string())
        .collect())
}

fn extract_image_captions(document: &Html) -> Result<BTreeSet<String>, ExtractionError> {
    Ok(document
        .select(&selector("img")?)
        .filter_map(|element| element.value().attr("alt"))
        .filter(|alt| !alt.is_empty())
        .map(str::to_string)
        .collect())
}

fn extract_links(
    document: &Html,
    base_url: &Url,
    visited: &HashSet<String>,
    extraction: &mut Extraction,
) -> Result<(), ExtractionError> {
    let mut seen_roots = HashSet::new();

    for anchor in document.select(&selector("a[href]")?) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(child) = resolve_href(href, base_url) else {
            continue;
        };

        if let Some(root) = domain_root(&child) {
            if !visited.contains(&root) && seen_roots.insert(root.clone()) {
                extraction.child_domain_roots.push(root);
            }
        }
        extraction.child_urls.insert(child.to_string());
    }

    Ok(())
}
