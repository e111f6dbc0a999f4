//! Content-key request parsing.
//!
//! Inbound paths address content by hex hash with optional modifiers:
//! `<hash>.<format>`, `<hash>:<width>`, `<hash>:fullhd`, or a two-segment
//! `<hash>/<args>` form where args carry a type filter. Query parameters
//! `w` (width) and `n` (name) override any path-derived thumbnail spec.

use crate::{MediaType, ThumbSpec};
use derive_getters::Getters;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static FORMAT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9a-f]*)\.(\w+)$").expect("Valid format regex"));
static WIDTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9a-f]*)(:(\d+))?$").expect("Valid width regex"));
static NAMED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9a-f]*)(:(fullhd))?$").expect("Valid named regex"));
static ARGS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(image|video)(\.(\w+))?$").expect("Valid args regex"));

/// Canonical form of one inbound content request.
///
/// The hash is the only durable identity; everything else is query-derived
/// and never persisted. Any string parses: unknown hashes simply miss at
/// lookup time.
///
/// # Examples
///
/// ```
/// use caldera_core::{ContentRequest, ThumbSpec};
/// use std::collections::HashMap;
///
/// let request = ContentRequest::parse_hash_param("abcd1234:200", &HashMap::new());
/// assert_eq!(request.hash(), "abcd1234");
/// assert_eq!(
///     request.thumb().as_ref(),
///     Some(&ThumbSpec::Width("200".to_string()))
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct ContentRequest {
    /// Hex content hash addressed by the request
    hash: String,
    /// Required media type, when the two-segment form names one
    type_filter: Option<MediaType>,
    /// Requested container/extension; informational only
    format: Option<String>,
    /// Requested thumbnail variant
    thumb: Option<ThumbSpec>,
}

impl ContentRequest {
    /// Create a bare request for a hash with no modifiers.
    pub fn new(hash: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            type_filter: None,
            format: None,
            thumb: None,
        }
    }

    /// Parse the single-segment path form.
    ///
    /// Grammar, first match wins:
    /// 1. `<hex>.<format>`
    /// 2. `<hex>:<digits>` (width thumbnail)
    /// 3. `<hex>:fullhd` (named thumbnail)
    /// 4. anything else is taken as a literal hash
    ///
    /// Query `w`/`n` then override any path-derived thumbnail spec.
    pub fn parse_hash_param(raw: &str, query: &HashMap<String, String>) -> Self {
        let mut request = if let Some(caps) = FORMAT_RE.captures(raw) {
            let mut request = Self::new(&caps[1]);
            request.format = Some(caps[2].to_string());
            request
        } else if let Some(caps) = WIDTH_RE.captures(raw) {
            let mut request = Self::new(&caps[1]);
            if let Some(width) = caps.get(3) {
                request.thumb = Some(ThumbSpec::Width(width.as_str().to_string()));
            }
            request
        } else if let Some(caps) = NAMED_RE.captures(raw) {
            let mut request = Self::new(&caps[1]);
            if let Some(name) = caps.get(3) {
                request.thumb = Some(ThumbSpec::Name(name.as_str().to_string()));
            }
            request
        } else {
            Self::new(raw)
        };

        request.apply_query(query);
        request
    }

    /// Parse the two-segment `<hash>/<args>` form.
    ///
    /// `args` matching `(image|video)(.<format>)?` sets the type filter and
    /// optional format; anything else leaves the request bare. Query
    /// overrides apply identically to the single-segment form.
    pub fn parse_hash_args(hash: &str, args: &str, query: &HashMap<String, String>) -> Self {
        let mut request = Self::new(hash);

        if let Some(caps) = ARGS_RE.captures(args) {
            request.type_filter = caps[1].parse::<MediaType>().ok();
            if let Some(format) = caps.get(3) {
                request.format = Some(format.as_str().to_string());
            }
        }

        request.apply_query(query);
        request
    }

    /// Apply `w`/`n` query overrides; `w` wins when both are present.
    fn apply_query(&mut self, query: &HashMap<String, String>) {
        if let Some(width) = query.get("w") {
            self.thumb = Some(ThumbSpec::Width(width.clone()));
        } else if let Some(name) = query.get("n") {
            self.thumb = Some(ThumbSpec::Name(name.clone()));
        }
    }
}
