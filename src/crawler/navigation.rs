//! Navigation decision engine
//!
//! `decide` maps one page's classification plus the traversal position onto
//! the next action. It is a pure function: no I/O, no session access.

use crate::model::{PageClassification, PageType};
use crate::state::DriverState;
use std::fmt;

/// What the driver does with the current page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Classify the page's links and enqueue navigable ones one level deeper
    ExploreChildren,

    /// Extract roster members from the page
    ExtractMembers,

    /// Do nothing with this page and move on to the next pending URL
    Continue,

    /// Nothing left to do
    End,
}

impl Action {
    /// Driver state that carries out this action
    pub fn driver_state(&self) -> DriverState {
        match self {
            Self::ExploreChildren => DriverState::ExploreChildren,
            Self::ExtractMembers => DriverState::ExtractMembers,
            Self::Continue => DriverState::Skip,
            Self::End => DriverState::End,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExploreChildren => "explore_children",
            Self::ExtractMembers => "extract_members",
            Self::Continue => "continue",
            Self::End => "end",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decides the next action for a classified page
///
/// Rules, first match wins:
///
/// 1. At or beyond `max_depth` nothing can be enqueued, so the page is only
///    worth acting on if it is a confident member list, which is extracted.
///    Anything else moves on.
/// 2. Confidence below `threshold` moves on.
/// 3. `IndexPage` explores children.
/// 4. `MemberListPage` explores children when it also links further down the
///    hierarchy, and extracts members otherwise.
/// 5. `Other` moves on.
///
/// "Moves on" is `Continue` while URLs are pending and `End` once the queue
/// is empty. Low confidence and `Other` are deliberately indistinguishable.
pub fn decide(
    classification: &PageClassification,
    depth: u32,
    max_depth: u32,
    pending_nonempty: bool,
    threshold: f64,
) -> Action {
    let move_on = if pending_nonempty {
        Action::Continue
    } else {
        Action::End
    };
    let confident = classification.confidence() >= threshold;

    if depth >= max_depth {
        return match classification.page_type() {
            PageType::MemberListPage if confident => Action::ExtractMembers,
            _ => move_on,
        };
    }

    if !confident {
        return move_on;
    }

    match classification.page_type() {
        PageType::IndexPage => Action::ExploreChildren,
        PageType::MemberListPage if classification.has_child_links() => Action::ExploreChildren,
        PageType::MemberListPage => Action::ExtractMembers,
        PageType::Other => move_on,
    }
}
