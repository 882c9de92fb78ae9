//! Domain values exchanged between the discovery engine and its collaborators
//!
//! - `Link`: a hyperlink found on a page
//! - `PageClassification` / `LinkClassification`: classifier verdicts
//! - `RosterMember`: one extracted person
//! - `DiscoveryRequest`: the input describing one discovery run

mod classification;
mod link;
mod member;
mod request;

pub use classification::{LinkClassification, LinkType, PageClassification, PageType};
pub use link::Link;
pub use member::{ExtractedMember, MemberExtraction, RosterMember};
pub use request::{
    ClassificationContext, DiscoveryRequest, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_STEP_BUDGET,
};
