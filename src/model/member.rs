use crate::ModelError;
use serde::{Deserialize, Serialize};

/// One person found on a roster page
///
/// The name is the identity key for deduplication within a session and is
/// guaranteed non-empty; every other attribute is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ExtractedMember")]
pub struct RosterMember {
    name: String,
    pub position: Option<String>,
    pub electoral_district: Option<String>,
    pub prefecture: Option<String>,
    pub profile_url: Option<String>,
    pub party_position: Option<String>,
}

impl RosterMember {
    /// Creates a member, trimming the name and rejecting it if empty
    pub fn new(name: impl Into<String>) -> Result<Self, ModelError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(ModelError::EmptyMemberName);
        }

        Ok(Self {
            name,
            position: None,
            electoral_district: None,
            prefecture: None,
            profile_url: None,
            party_position: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_position(mut self, position: impl Into<String>) -> Self {
        self.position = Some(position.into());
        self
    }

    pub fn with_electoral_district(mut self, district: impl Into<String>) -> Self {
        self.electoral_district = Some(district.into());
        self
    }

    pub fn with_prefecture(mut self, prefecture: impl Into<String>) -> Self {
        self.prefecture = Some(prefecture.into());
        self
    }

    pub fn with_profile_url(mut self, url: impl Into<String>) -> Self {
        self.profile_url = Some(url.into());
        self
    }

    pub fn with_party_position(mut self, position: impl Into<String>) -> Self {
        self.party_position = Some(position.into());
        self
    }
}

/// Member record as returned by an extractor, before validation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedMember {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub electoral_district: Option<String>,
    #[serde(default)]
    pub prefecture: Option<String>,
    #[serde(default)]
    pub profile_url: Option<String>,
    #[serde(default)]
    pub party_position: Option<String>,
}

impl ExtractedMember {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }
}

impl TryFrom<ExtractedMember> for RosterMember {
    type Error = ModelError;

    fn try_from(raw: ExtractedMember) -> Result<Self, Self::Error> {
        let mut member = RosterMember::new(raw.name.unwrap_or_default())?;
        member.position = non_blank(raw.position);
        member.electoral_district = non_blank(raw.electoral_district);
        member.prefecture = non_blank(raw.prefecture);
        member.profile_url = non_blank(raw.profile_url);
        member.party_position = non_blank(raw.party_position);
        Ok(member)
    }
}

/// Result of one member-extraction call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberExtraction {
    pub members: Vec<ExtractedMember>,
    pub success: bool,
    pub error: Option<String>,
}

impl MemberExtraction {
    pub fn succeeded(members: Vec<ExtractedMember>) -> Self {
        Self {
            members,
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            members: Vec::new(),
            success: false,
            error: Some(error.into()),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
