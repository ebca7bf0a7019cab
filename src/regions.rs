//! NinjaOne regional endpoint directory.
//!
//! Every NinjaOne tenant lives in exactly one region, and each region has its
//! own API host. [`Region`] enumerates the known regions; [`default_candidates`]
//! is the ordered list tried by auto-detection when neither a base URL nor a
//! region is configured.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ClientError;

/// A known NinjaOne region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Us,
    Us2,
    Eu,
    Ca,
    Oc,
}

impl Region {
    /// All regions, in auto-detection order.
    pub const ALL: [Region; 5] = [Region::Us, Region::Us2, Region::Eu, Region::Ca, Region::Oc];

    /// Short key used in configuration (`NINJA_REGION`) and tool arguments.
    pub fn key(self) -> &'static str {
        match self {
            Region::Us => "us",
            Region::Us2 => "us2",
            Region::Eu => "eu",
            Region::Ca => "ca",
            Region::Oc => "oc",
        }
    }

    /// Fully-qualified API base URL (no trailing slash).
    pub fn base_url(self) -> &'static str {
        match self {
            Region::Us => "https://app.ninjarmm.com",
            Region::Us2 => "https://us2.ninjarmm.com",
            Region::Eu => "https://eu.ninjarmm.com",
            Region::Ca => "https://ca.ninjarmm.com",
            Region::Oc => "https://oc.ninjarmm.com",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Region {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Region::ALL
            .into_iter()
            .find(|r| r.key() == key)
            .ok_or_else(|| {
                ClientError::Configuration(format!(
                    "Unknown region '{}'. Valid regions: {}",
                    s,
                    Region::ALL.map(Region::key).join(", ")
                ))
            })
    }
}

/// A `{region, baseUrl}` pair as returned by the `list_regions` tool.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RegionInfo {
    pub region: &'static str,
    #[serde(rename = "baseUrl")]
    pub base_url: &'static str,
}

/// The full region directory.
pub fn list_regions() -> Vec<RegionInfo> {
    Region::ALL
        .into_iter()
        .map(|r| RegionInfo {
            region: r.key(),
            base_url: r.base_url(),
        })
        .collect()
}

/// Built-in auto-detection candidates: US, US2, EU, CA, OC.
pub fn default_candidates() -> Vec<String> {
    Region::ALL.into_iter().map(|r| r.base_url().to_string()).collect()
}

/// Normalize an operator-supplied base URL.
///
/// Bare hostnames get an `https://` prefix and trailing slashes are stripped
/// so paths can be appended directly.
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

/// Parse a comma-separated candidate override list (`NINJA_BASE_URLS`).
///
/// Returns `None` when the list contains no usable entries, in which case the
/// caller falls back to [`default_candidates`].
pub fn parse_candidate_list(raw: &str) -> Option<Vec<String>> {
    let urls: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(normalize_base_url)
        .collect();
    if urls.is_empty() {
        None
    } else {
        Some(urls)
    }
}
