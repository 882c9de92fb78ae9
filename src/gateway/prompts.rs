//! Prompt construction for the model-backed gateway
//!
//! Pages are sent to the model as a condensed text digest rather than raw
//! HTML: scripts and styles are dropped, block elements become line breaks,
//! and anchors are rendered as `[text](href)` so the model can still see
//! where a page links.

use crate::model::{ClassificationContext, Link};
use scraper::{ElementRef, Html, Node, Selector};
use serde_json::json;
use url::Url;

pub const PAGE_SYSTEM_PROMPT: &str = "\
You classify pages of a political organization's website while searching for its roster of members.
Answer with a JSON object: {\"page_type\": one of \"index_page\", \"member_list_page\", \"other\", \
\"confidence\": number between 0 and 1, \"reason\": short string, \
\"has_child_links\": boolean, \"has_member_info\": boolean}.
index_page: a hub linking to lower levels (regions, prefectures, cities, branches).
member_list_page: a page listing members by name.
has_child_links: the page links to further lists below it in the hierarchy.
has_member_info: the page itself shows member names.";

pub const LINKS_SYSTEM_PROMPT: &str = "\
You classify links on a political organization's website while searching for its roster of members.
Answer with a JSON object: {\"links\": [{\"url\": the exact url given, \
\"link_type\": one of \"prefecture_list\", \"city_list\", \"member_list\", \"member_profile\", \"other\", \
\"confidence\": number between 0 and 1, \"reason\": short string}]}.
Only include links from the input. Navigation, news, donation and social links are \"other\".";

pub const MEMBERS_SYSTEM_PROMPT: &str = "\
You extract the members listed on a page of a political organization's website.
Answer with a JSON object: {\"members\": [{\"name\": string, \"position\": string or null, \
\"electoral_district\": string or null, \"prefecture\": string or null, \
\"profile_url\": absolute url or null, \"party_position\": string or null}]}.
Only include people actually listed on the page. Return an empty list if there are none.";

const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "svg"];

const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "br", "li", "ul", "ol", "tr", "table", "section", "article", "header", "footer",
    "nav", "h1", "h2", "h3", "h4", "h5", "h6", "dt", "dd", "dl",
];

/// User prompt for page classification
pub fn page_prompt(url: &Url, context: &ClassificationContext, digest: &str) -> String {
    format!(
        "Organization: {} (id {})\nDepth: {} of {}\nURL: {}\n\nPage content:\n{}",
        context.party_name, context.party_id, context.depth, context.max_depth, url, digest
    )
}

/// User prompt for link classification
pub fn links_prompt(context: &ClassificationContext, links: &[Link]) -> String {
    let listed: Vec<_> = links
        .iter()
        .map(|link| {
            json!({
                "url": link.url.as_str(),
                "text": link.text,
                "title": link.title,
            })
        })
        .collect();

    format!(
        "Organization: {} (id {})\nDepth: {} of {}\n\nLinks:\n{}",
        context.party_name,
        context.party_id,
        context.depth,
        context.max_depth,
        serde_json::Value::Array(listed)
    )
}

/// User prompt for member extraction
pub fn members_prompt(url: &Url, context: &ClassificationContext, digest: &str) -> String {
    format!(
        "Organization: {} (id {})\nURL: {}\n\nPage content:\n{}",
        context.party_name, context.party_id, url, digest
    )
}

/// Condenses an HTML document to readable text, truncated to `max_chars`
pub fn page_digest(html: &str, max_chars: usize) -> String {
    let document = Html::parse_document(html);

    let body = Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .unwrap_or_else(|| document.root_element());

    let mut raw = String::new();
    render(body, &mut raw);

    let condensed = raw
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    truncate_chars(&condensed, max_chars).to_string()
}

fn render(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push(' ');
                out.push_str(text);
            }
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED_ELEMENTS.contains(&name) {
                    continue;
                }
                let Some(child_element) = ElementRef::wrap(child) else {
                    continue;
                };

                if name == "a" {
                    if let Some(href) = el.attr("href") {
                        out.push_str(" [");
                        render(child_element, out);
                        out.push_str("](");
                        out.push_str(href.trim());
                        out.push_str(") ");
                        continue;
                    }
                }

                let block = BLOCK_ELEMENTS.contains(&name);
                if block {
                    out.push('\n');
                }
                render(child_element, out);
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Truncates on a char boundary
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((index, _)) => &s[..index],
        None => s,
    }
}
