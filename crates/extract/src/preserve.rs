// ABOUTME: Structure-preserving serializer: captures a node's markup subtree and sanitizes it.
// ABOUTME: SanitizationPolicy filters tags and attributes while serializing; string input is finished by ammonia.

//! Structure-preserving markup capture.
//!
//! Long-form sections carry tables, lists and emphasis worth keeping. This
//! module serializes the matched subtree (or a run of sibling nodes) back to
//! markup through a [`SanitizationPolicy`]:
//!
//! - elements off the tag allow-list are dropped together with their content,
//!   whatever their name (custom and vendor-prefixed tags included);
//! - attributes off the per-tag or wildcard allow-list are dropped;
//! - allowed elements keep their nesting (tables inside tables, lists inside
//!   list items);
//! - whitespace-only text between elements is discarded outside `pre`/`code`.
//!
//! Sanitizing happens while serializing the parsed tree, so a captured node
//! keeps its place even when it is a table cell or row. Markup that arrives
//! as a string goes through [`SanitizationPolicy::clean`], which parses it,
//! applies the same walk and finishes with the policy's ammonia sanitizer.
//! The parsed document is never mutated.

use std::collections::{HashMap, HashSet};
use std::fmt::{self, Write};
use std::sync::Arc;

use ego_tree::NodeRef;
use scraper::{ElementRef, Html, Node, Selector};

use crate::error::ConfigError;
use crate::select::select_one;

const DEFAULT_TAGS: &[&str] = &[
    "table", "tr", "td", "th", "thead", "tbody", "p", "b", "strong", "i", "em", "u", "div",
    "span", "br", "hr", "sup", "sub", "ul", "ol", "li", "pre", "code", "h1", "h2", "h3", "h4",
    "h5", "h6",
];

const DEFAULT_GENERIC_ATTRIBUTES: &[&str] = &["class", "style", "id", "data-type", "data-lang"];

const DEFAULT_TABLE_ATTRIBUTES: &[&str] = &["border", "cellspacing", "cellpadding", "width", "height"];

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

// Never allowed, whatever the policy says.
const FORBIDDEN_TAGS: &[&str] = &["script", "style", "iframe", "object", "embed"];

const WHITESPACE_SENSITIVE: &[&str] = &["pre", "code", "textarea", "script", "style"];

// Wraps loose text found between the elements of a captured range.
const LOOSE_TEXT_WRAPPER: &str = "p";

/// Allow-list of tags and attributes kept in captured markup.
#[derive(Debug, Clone)]
pub struct SanitizationPolicy {
    tags: HashSet<&'static str>,
    generic_attributes: HashSet<&'static str>,
    tag_attributes: HashMap<&'static str, HashSet<&'static str>>,
    // Built once per allow-list change and shared by clones.
    sanitizer: Arc<ammonia::Builder<'static>>,
}

impl Default for SanitizationPolicy {
    fn default() -> Self {
        let mut tag_attributes = HashMap::new();
        tag_attributes.insert("table", DEFAULT_TABLE_ATTRIBUTES.iter().copied().collect());
        Self::from_lists(
            DEFAULT_TAGS.iter().copied().collect(),
            DEFAULT_GENERIC_ATTRIBUTES.iter().copied().collect(),
            tag_attributes,
        )
    }
}

impl SanitizationPolicy {
    /// Creates a policy with nothing allowed.
    pub fn empty() -> Self {
        Self::from_lists(HashSet::new(), HashSet::new(), HashMap::new())
    }

    fn from_lists(
        tags: HashSet<&'static str>,
        generic_attributes: HashSet<&'static str>,
        tag_attributes: HashMap<&'static str, HashSet<&'static str>>,
    ) -> Self {
        let sanitizer = Arc::new(build_sanitizer(&tags, &generic_attributes, &tag_attributes));
        Self {
            tags,
            generic_attributes,
            tag_attributes,
            sanitizer,
        }
    }

    fn rebuilt(self) -> Self {
        Self::from_lists(self.tags, self.generic_attributes, self.tag_attributes)
    }

    /// Allows a tag.
    pub fn allow_tag(mut self, tag: &'static str) -> Self {
        self.tags.insert(tag);
        self.rebuilt()
    }

    /// Allows an attribute on every allowed tag.
    pub fn allow_generic_attribute(mut self, attr: &'static str) -> Self {
        self.generic_attributes.insert(attr);
        self.rebuilt()
    }

    /// Allows attributes on one tag.
    pub fn allow_tag_attributes(mut self, tag: &'static str, attrs: &[&'static str]) -> Self {
        self.tag_attributes
            .entry(tag)
            .or_default()
            .extend(attrs.iter().copied());
        self.rebuilt()
    }

    /// Returns true if the tag is on the allow-list and not executable.
    pub fn allows_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag) && !FORBIDDEN_TAGS.contains(&tag)
    }

    /// Returns true if the attribute is allowed on the tag, directly or via the wildcard.
    pub fn allows_attribute(&self, tag: &str, attr: &str) -> bool {
        self.generic_attributes.contains(attr)
            || self
                .tag_attributes
                .get(tag)
                .is_some_and(|attrs| attrs.contains(attr))
    }

    /// Rejects a policy that keeps nothing or lets executable content through.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tags.is_empty() {
            return Err(ConfigError::policy(
                "validate policy",
                Some(anyhow::anyhow!("no tags are allowed")),
            ));
        }
        if let Some(tag) = FORBIDDEN_TAGS.iter().find(|t| self.tags.contains(**t)) {
            return Err(ConfigError::policy(
                "validate policy",
                Some(anyhow::anyhow!("tag {} cannot be allowed", tag)),
            ));
        }
        Ok(())
    }

    /// Sanitizes a markup string against the allow-list.
    ///
    /// The string is parsed as a body fragment, so table parts outside a
    /// table are dropped by the parser before the allow-list applies.
    pub fn clean(&self, html: &str) -> String {
        if html.trim().is_empty() {
            return String::new();
        }
        let fragment = Html::parse_fragment(html);
        let mut markup = String::new();
        for child in fragment.root_element().children() {
            if let Err(err) = write_node(&mut markup, child, self, false) {
                tracing::error!(error = %err, "failed to serialize markup");
                return String::new();
            }
        }
        self.sanitizer.clean(&markup).to_string().trim().to_string()
    }
}

fn build_sanitizer(
    tags: &HashSet<&'static str>,
    generic_attributes: &HashSet<&'static str>,
    tag_attributes: &HashMap<&'static str, HashSet<&'static str>>,
) -> ammonia::Builder<'static> {
    let mut builder = ammonia::Builder::default();
    // Disallowed content is already gone by the time ammonia runs; an empty
    // clean-content set also keeps ammonia's overlap assertions quiet.
    builder
        .tags(tags.clone())
        .clean_content_tags(HashSet::new())
        .generic_attributes(generic_attributes.clone())
        .tag_attributes(tag_attributes.clone())
        .link_rel(None)
        .strip_comments(true);
    builder
}

fn escape_text(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

fn write_node(
    out: &mut String,
    node: NodeRef<'_, Node>,
    policy: &SanitizationPolicy,
    keep_whitespace: bool,
) -> fmt::Result {
    match node.value() {
        Node::Text(text) => {
            if keep_whitespace || !text.trim().is_empty() {
                escape_text(out, text);
            }
            Ok(())
        }
        Node::Element(element) => {
            let name = element.name();
            if !policy.allows_tag(name) {
                tracing::trace!(element = %name, "dropping disallowed element");
                return Ok(());
            }
            write!(out, "<{}", name)?;
            let mut attrs: Vec<(&str, &str)> = element
                .attrs()
                .filter(|(attr, _)| policy.allows_attribute(name, attr))
                .collect();
            attrs.sort_by(|a, b| a.0.cmp(b.0));
            for (attr, value) in attrs {
                write!(out, " {}=\"", attr)?;
                escape_attr(out, value);
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&name) {
                return Ok(());
            }
            let keep = keep_whitespace || WHITESPACE_SENSITIVE.contains(&name);
            for child in node.children() {
                write_node(out, child, policy, keep)?;
            }
            write!(out, "</{}>", name)
        }
        _ => Ok(()),
    }
}

fn write_loose_text(out: &mut String, text: &str, policy: &SanitizationPolicy) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    if !policy.allows_tag(LOOSE_TEXT_WRAPPER) {
        tracing::debug!("dropping loose section text; paragraph tag not allowed");
        return;
    }
    out.push('<');
    out.push_str(LOOSE_TEXT_WRAPPER);
    out.push('>');
    escape_text(out, text);
    out.push_str("</");
    out.push_str(LOOSE_TEXT_WRAPPER);
    out.push('>');
}

/// Captures the element's full subtree, sanitized.
///
/// The element itself is part of the output, whatever its parsing context.
/// Returns an empty string when the element is not allowed, or, with an
/// error logged, when serialization fails.
pub fn preserve(element: ElementRef<'_>, policy: &SanitizationPolicy) -> String {
    let mut markup = String::new();
    match write_node(&mut markup, *element, policy, false) {
        Ok(()) => markup.trim().to_string(),
        Err(err) => {
            tracing::error!(element = %element.value().name(), error = %err, "failed to serialize markup");
            String::new()
        }
    }
}

/// Captures `start` and its following siblings until `stop` matches an element.
///
/// The stopping element is not included. Loose text between the captured
/// elements is wrapped in a paragraph so the result always starts with a
/// tag, and is dropped when paragraphs are not allowed.
pub fn extract_range_from<F>(start: ElementRef<'_>, policy: &SanitizationPolicy, stop: F) -> String
where
    F: Fn(ElementRef<'_>) -> bool,
{
    let mut markup = String::new();
    let mut current: Option<NodeRef<'_, Node>> = Some(*start);
    while let Some(node) = current {
        match node.value() {
            Node::Element(_) => {
                if ElementRef::wrap(node).is_some_and(&stop) {
                    break;
                }
                if let Err(err) = write_node(&mut markup, node, policy, false) {
                    tracing::error!(error = %err, "failed to serialize section range");
                    return String::new();
                }
            }
            Node::Text(text) => write_loose_text(&mut markup, text, policy),
            _ => {}
        }
        current = node.next_sibling();
    }
    markup
}

/// Resolves `start` and captures the sibling range that follows it.
pub fn extract_range<F>(doc: &Html, start: &Selector, policy: &SanitizationPolicy, stop: F) -> String
where
    F: Fn(ElementRef<'_>) -> bool,
{
    match select_one(doc, start) {
        Some(element) => extract_range_from(element, policy, stop),
        None => {
            tracing::debug!("range start not found");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::select::is_section_heading;
    use pretty_assertions::assert_eq;

    fn sel(css: &str) -> Selector {
        Selector::parse(css).unwrap()
    }

    fn range(doc: &Html, start: &str, policy: &SanitizationPolicy) -> String {
        extract_range(doc, &sel(start), policy, is_section_heading)
    }

    #[test]
    fn test_default_policy_allow_lists() {
        let policy = SanitizationPolicy::default();
        assert!(policy.allows_tag("table"));
        assert!(!policy.allows_tag("script"));
        assert!(policy.allows_attribute("p", "class"));
        assert!(policy.allows_attribute("table", "border"));
        assert!(!policy.allows_attribute("td", "border"));
        assert!(!policy.allows_attribute("p", "onclick"));
    }

    #[test]
    fn test_policy_validation() {
        assert!(SanitizationPolicy::default().validate().is_ok());
        assert!(SanitizationPolicy::empty().validate().unwrap_err().is_policy());
        let unsafe_policy = SanitizationPolicy::default().allow_tag("script");
        assert!(unsafe_policy.validate().unwrap_err().is_policy());
        assert!(SanitizationPolicy::empty().allow_tag("p").validate().is_ok());
    }

    #[test]
    fn test_forbidden_tag_never_serialized() {
        let policy = SanitizationPolicy::default().allow_tag("script");
        assert!(!policy.allows_tag("script"));
        let doc = Html::parse_fragment("<div><script>alert(1)</script><p>본문</p></div>");
        let div = select_one(&doc, &sel("div")).unwrap();
        assert_eq!(preserve(div, &policy), "<div><p>본문</p></div>");
    }

    #[test]
    fn test_script_and_event_handlers_removed() {
        let policy = SanitizationPolicy::default();
        let out = policy.clean(
            r#"<div class="box" onclick="steal()"><script>alert(1)</script><p onmouseover="x()">복용 전 상담</p></div>"#,
        );
        assert!(!out.contains("script"));
        assert!(!out.contains("alert"));
        assert!(!out.contains("onclick"));
        assert!(!out.contains("onmouseover"));
        assert!(out.contains(r#"<div class="box">"#));
        assert!(out.contains("<p>복용 전 상담</p>"));
    }

    #[test]
    fn test_disallowed_element_content_removed() {
        let policy = SanitizationPolicy::default();
        let out = policy.clean("<p>keep<iframe>gone</iframe><a href=\"x\">link text</a></p>");
        assert_eq!(out, "<p>keep</p>");
    }

    #[test]
    fn test_unknown_element_content_removed() {
        let policy = SanitizationPolicy::default();
        let html = "<p>keep<x-note>SECRET</x-note><nobr>NOBR</nobr><o:p>WORD</o:p></p>";
        assert_eq!(policy.clean(html), "<p>keep</p>");

        let doc = Html::parse_document(html);
        let p = select_one(&doc, &sel("p")).unwrap();
        assert_eq!(preserve(p, &policy), "<p>keep</p>");
    }

    #[test]
    fn test_nested_tables_survive() {
        let policy = SanitizationPolicy::default();
        let out = policy.clean(
            "<table border=\"1\" onload=\"x()\"><tr><td><table><tr><td>inner</td></tr></table></td></tr></table>",
        );
        assert_eq!(out.matches("<table").count(), 2);
        assert!(out.contains("<table border=\"1\">"));
        assert!(out.contains("<td>inner</td>"));
        assert!(!out.contains("onload"));
    }

    #[test]
    fn test_nested_lists_survive() {
        let policy = SanitizationPolicy::default();
        let html = "<ul><li>a<ul><li>b</li></ul></li></ul>";
        assert_eq!(policy.clean(html), html);
    }

    #[test]
    fn test_clean_blank_input() {
        assert_eq!(SanitizationPolicy::default().clean("  \n "), "");
    }

    #[test]
    fn test_preserve_drops_whitespace_only_text() {
        let policy = SanitizationPolicy::default();
        let doc = Html::parse_fragment("<div>\n  <p>one</p>\n  <pre>  keep  </pre>\n</div>");
        let div = select_one(&doc, &sel("div")).unwrap();
        assert_eq!(preserve(div, &policy), "<div><p>one</p><pre>  keep  </pre></div>");
    }

    #[test]
    fn test_preserve_escapes() {
        let policy = SanitizationPolicy::default();
        let doc = Html::parse_fragment(r#"<p class="a &quot;b&quot;">1 &lt; 2 &amp; 3</p>"#);
        let p = select_one(&doc, &sel("p")).unwrap();
        assert_eq!(
            preserve(p, &policy),
            r#"<p class="a &quot;b&quot;">1 &lt; 2 &amp; 3</p>"#
        );
    }

    #[test]
    fn test_preserve_includes_matched_node() {
        let policy = SanitizationPolicy::default();
        let doc = Html::parse_document(r#"<p class="txt" data-x="1"><b>주의</b> 사항</p>"#);
        let p = select_one(&doc, &sel("p.txt")).unwrap();
        assert_eq!(preserve(p, &policy), r#"<p class="txt"><b>주의</b> 사항</p>"#);
    }

    #[test]
    fn test_preserve_keeps_table_cell_root() {
        let policy = SanitizationPolicy::default();
        let doc = Html::parse_document(
            r#"<table><tr><th>주의</th><td class="c" onclick="x()"><b>주의</b> 사항</td></tr></table>"#,
        );
        let td = select_one(&doc, &sel("td.c")).unwrap();
        assert_eq!(preserve(td, &policy), r#"<td class="c"><b>주의</b> 사항</td>"#);
        let tr = select_one(&doc, &sel("tr")).unwrap();
        assert!(preserve(tr, &policy).starts_with("<tr><th>주의</th>"));
    }

    #[test]
    fn test_preserve_disallowed_root_is_empty() {
        let policy = SanitizationPolicy::default();
        let doc = Html::parse_document("<dl><dt>용법</dt><dd>1정</dd></dl>");
        let dl = select_one(&doc, &sel("dl")).unwrap();
        assert_eq!(preserve(dl, &policy), "");
    }

    #[test]
    fn test_extract_range_stops_at_next_section() {
        let policy = SanitizationPolicy::default();
        let doc = Html::parse_document(
            r#"<h3 class="stress" id="A">효능</h3>
            <p class="txt">첫 문단</p>
            <table><tr><td>표</td></tr></table>
            <h3 class="stress" id="B">용법</h3>
            <p class="txt">다음 섹션</p>"#,
        );
        let out = range(&doc, "h3#A + p.txt", &policy);
        assert!(out.starts_with(r#"<p class="txt">첫 문단</p>"#));
        assert!(out.contains("<td>표</td>"));
        assert!(!out.contains("다음 섹션"));
        assert!(!out.contains("용법"));
    }

    #[test]
    fn test_extract_range_runs_to_end_of_siblings() {
        let policy = SanitizationPolicy::default();
        let doc = Html::parse_document(r#"<div><p id="s">a</p><p>b</p></div>"#);
        let out = range(&doc, "p#s", &policy);
        assert_eq!(out, r#"<p id="s">a</p><p>b</p>"#);
    }

    #[test]
    fn test_extract_range_wraps_loose_text() {
        let policy = SanitizationPolicy::default();
        let doc = Html::parse_document(
            r#"<div><h3 class="stress" id="A">용법용량</h3><dl><dt>용법</dt><dd>1정</dd></dl>
            식후 30분에 복용 <p>물과 함께</p> 1 &lt; 2
            <h3 class="stress" id="B">저장방법</h3>실온</div>"#,
        );
        let out = range(&doc, "h3#A + dl", &policy);
        assert_eq!(out, "<p>식후 30분에 복용</p><p>물과 함께</p><p>1 &lt; 2</p>");
        assert!(out.starts_with('<'));
    }

    #[test]
    fn test_extract_range_drops_loose_text_without_paragraphs() {
        let policy = SanitizationPolicy::empty().allow_tag("b");
        let doc = Html::parse_document(r#"<div><b id="s">굵게</b> 풀린 글</div>"#);
        let out = range(&doc, "b#s", &policy);
        assert_eq!(out, r#"<b>굵게</b>"#);
    }

    #[test]
    fn test_extract_range_missing_start_is_empty() {
        let policy = SanitizationPolicy::default();
        let doc = Html::parse_document("<p>x</p>");
        assert_eq!(range(&doc, "p.none", &policy), "");
    }

    #[test]
    fn test_custom_policy() {
        let policy = SanitizationPolicy::empty()
            .allow_tag("p")
            .allow_tag("b")
            .allow_tag_attributes("p", &["lang"]);
        let out = policy.clean(r#"<p lang="ko" class="c"><b>굵게</b><i>기울임</i></p>"#);
        assert_eq!(out, r#"<p lang="ko"><b>굵게</b></p>"#);
    }

    #[test]
    fn test_cloned_policy_shares_sanitizer() {
        let policy = SanitizationPolicy::default();
        let copy = policy.clone();
        assert!(Arc::ptr_eq(&policy.sanitizer, &copy.sanitizer));
        let widened = copy.allow_tag("dl");
        assert!(!Arc::ptr_eq(&policy.sanitizer, &widened.sanitizer));
        assert_eq!(widened.clean("<dl>정의</dl>"), "<dl>정의</dl>");
    }
}
