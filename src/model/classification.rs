//! Page and link classification values
//!
//! Classifier output arrives as loosely-typed labels from an external service.
//! Labels are mapped onto closed enums with an explicit `Other` fallback, and
//! confidences are validated at construction.

use crate::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Kind of page, as judged by the page classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageType {
    /// A hub page linking to lower levels of the hierarchy (e.g. a list of regions)
    IndexPage,

    /// A page listing members directly
    MemberListPage,

    /// Anything else
    Other,
}

impl PageType {
    /// Maps a raw classifier label onto a page type
    ///
    /// Matching ignores case, underscores, hyphens and spaces. Unrecognized
    /// labels fall back to `Other`.
    pub fn from_label(label: &str) -> Self {
        match squash_label(label).as_str() {
            "indexpage" | "index" => Self::IndexPage,
            "memberlistpage" | "memberlist" => Self::MemberListPage,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IndexPage => "index_page",
            Self::MemberListPage => "member_list_page",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of link target, as judged by the link classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkType {
    PrefectureList,
    CityList,
    MemberList,
    MemberProfile,
    Other,
}

impl LinkType {
    /// Maps a raw classifier label onto a link type, falling back to `Other`
    pub fn from_label(label: &str) -> Self {
        match squash_label(label).as_str() {
            "prefecturelist" | "prefecture" => Self::PrefectureList,
            "citylist" | "city" => Self::CityList,
            "memberlist" => Self::MemberList,
            "memberprofile" | "profile" => Self::MemberProfile,
            _ => Self::Other,
        }
    }

    /// Returns true for link types worth following during discovery
    ///
    /// Individual profiles are not followed; the roster is harvested from the
    /// list pages that link to them.
    pub fn is_navigable(&self) -> bool {
        matches!(self, Self::PrefectureList | Self::CityList | Self::MemberList)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrefectureList => "prefecture_list",
            Self::CityList => "city_list",
            Self::MemberList => "member_list",
            Self::MemberProfile => "member_profile",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict of the page classifier for one page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageClassification {
    page_type: PageType,
    confidence: f64,
    reason: String,
    has_child_links: bool,
    has_member_info: bool,
}

impl PageClassification {
    /// Creates a classification, rejecting confidences outside `[0, 1]`
    pub fn new(
        page_type: PageType,
        confidence: f64,
        reason: impl Into<String>,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            page_type,
            confidence: validate_confidence(confidence)?,
            reason: reason.into(),
            has_child_links: false,
            has_member_info: false,
        })
    }

    /// The fallback classification used whenever a page cannot be classified
    pub fn soft_fail(reason: impl Into<String>) -> Self {
        Self {
            page_type: PageType::Other,
            confidence: 0.0,
            reason: reason.into(),
            has_child_links: false,
            has_member_info: false,
        }
    }

    pub fn with_child_links(mut self, has_child_links: bool) -> Self {
        self.has_child_links = has_child_links;
        self
    }

    pub fn with_member_info(mut self, has_member_info: bool) -> Self {
        self.has_member_info = has_member_info;
        self
    }

    pub fn page_type(&self) -> PageType {
        self.page_type
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn has_child_links(&self) -> bool {
        self.has_child_links
    }

    pub fn has_member_info(&self) -> bool {
        self.has_member_info
    }
}

/// Verdict of the link classifier for one link
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkClassification {
    url: Url,
    link_type: LinkType,
    confidence: f64,
    reason: String,
}

impl LinkClassification {
    /// Creates a link classification, rejecting confidences outside `[0, 1]`
    pub fn new(
        url: Url,
        link_type: LinkType,
        confidence: f64,
        reason: impl Into<String>,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            url,
            link_type,
            confidence: validate_confidence(confidence)?,
            reason: reason.into(),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn link_type(&self) -> LinkType {
        self.link_type
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// True if the link is navigable and meets the confidence threshold
    pub fn is_followable(&self, threshold: f64) -> bool {
        self.link_type.is_navigable() && self.confidence >= threshold
    }
}

/// Rejects NaN and values outside `[0, 1]`
pub(crate) fn validate_confidence(confidence: f64) -> Result<f64, ModelError> {
    if (0.0..=1.0).contains(&confidence) {
        Ok(confidence)
    } else {
        Err(ModelError::InvalidConfidence(confidence))
    }
}

fn squash_label(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}
