//! Placeholder substitution inside paragraphs.
//!
//! Word splits a sentence into runs wherever formatting, spell-check state or
//! edit history changes, so a token such as `{{JobContact}}` is often spread
//! over several `<w:r>` elements. Two strategies are provided:
//!
//! - [`substitute_paragraph`] rebuilds the paragraph's text runs after
//!   substitution, carrying per-character formatting over to the new runs.
//! - [`substitute_leaves`] concatenates every `<w:t>` leaf, substitutes, and
//!   writes the result into the first leaf. Used for text-box paragraphs.

use super::xml::{Element, Node};
use crate::placeholders::{normalize, Field, Placeholder, PlaceholderMap};
use regex::Regex;

/// Paragraph children that take no space in the text and may sit between
/// the runs of a token without splitting it.
const ZERO_WIDTH_MARKERS: &[&str] = &[
    "w:bookmarkStart",
    "w:bookmarkEnd",
    "w:proofErr",
    "w:commentRangeStart",
    "w:commentRangeEnd",
    "w:permStart",
    "w:permEnd",
];

/// Per-character formatting captured before a paragraph is rewritten.
#[derive(Debug, Clone, PartialEq)]
pub struct FormattingSpan {
    pub bold: bool,
    pub italic: bool,
    pub underline: Option<String>,
    pub font_name: Option<String>,
    /// Half-points, as stored in `w:sz`.
    pub font_size: Option<String>,
    pub paragraph_style: Option<String>,
    run_properties: Option<Element>,
}

impl FormattingSpan {
    pub fn from_run(run: &Element, paragraph_style: Option<&str>) -> Self {
        let rpr = run.child("w:rPr");
        let flag = |name: &str| {
            rpr.and_then(|p| p.child(name))
                .map(|e| !matches!(e.attr("w:val").as_deref(), Some("0" | "false" | "off")))
                .unwrap_or(false)
        };
        let val = |name: &str| rpr.and_then(|p| p.child(name)).and_then(|e| e.attr("w:val"));

        FormattingSpan {
            bold: flag("w:b"),
            italic: flag("w:i"),
            underline: val("w:u").filter(|u| u != "none"),
            font_name: rpr
                .and_then(|p| p.child("w:rFonts"))
                .and_then(|f| f.attr("w:ascii").or_else(|| f.attr("w:hAnsi"))),
            font_size: val("w:sz"),
            paragraph_style: paragraph_style.map(str::to_string),
            run_properties: rpr.cloned(),
        }
    }

    /// Whether two characters can share a run.
    pub fn same_style(&self, other: &FormattingSpan) -> bool {
        self.bold == other.bold
            && self.italic == other.italic
            && self.underline == other.underline
            && self.font_size == other.font_size
            && self.font_name == other.font_name
    }
}

// ─── Run text ───────────────────────────────────────────────────────────────

/// A run is rebuildable when it holds nothing but properties and plain text
/// (text, tabs, line breaks).
fn is_text_run(run: &Element) -> bool {
    run.name == "w:r"
        && run.elements().all(|e| match e.name.as_str() {
            "w:rPr" | "w:t" | "w:tab" | "w:cr" | "w:lastRenderedPageBreak" => true,
            "w:br" => matches!(e.attr("w:type").as_deref(), None | Some("textWrapping")),
            _ => false,
        })
}

/// Visible text of a run's own content: tabs become `\t`, breaks `\n`.
pub fn run_text(run: &Element) -> String {
    let mut out = String::new();
    for e in run.elements() {
        match e.name.as_str() {
            "w:t" => out.push_str(&e.text()),
            "w:tab" => out.push('\t'),
            "w:br" | "w:cr" => out.push('\n'),
            _ => {}
        }
    }
    out
}

/// Replace a text run's content with `text`, keeping its run properties.
fn set_run_text(run: &mut Element, text: &str) {
    let rpr = run.child("w:rPr").cloned();
    run.children.clear();
    if let Some(rpr) = rpr {
        run.children.push(Node::Element(rpr));
    }
    run.children.extend(text_content(text));
}

/// `w:t` / `w:tab` / `w:br` nodes spelling out `text`.
fn text_content(text: &str) -> Vec<Node> {
    let mut nodes = Vec::new();
    let mut pending = String::new();
    let flush = |pending: &mut String, nodes: &mut Vec<Node>| {
        if !pending.is_empty() {
            let mut t = Element::new("w:t");
            t.preserve_space();
            t.set_text(pending);
            nodes.push(Node::Element(t));
            pending.clear();
        }
    };
    for ch in text.chars() {
        match ch {
            '\t' => {
                flush(&mut pending, &mut nodes);
                nodes.push(Node::Element(Element::empty("w:tab")));
            }
            '\n' => {
                flush(&mut pending, &mut nodes);
                nodes.push(Node::Element(Element::empty("w:br")));
            }
            _ => pending.push(ch),
        }
    }
    flush(&mut pending, &mut nodes);
    nodes
}

fn paragraph_style(paragraph: &Element) -> Option<String> {
    paragraph
        .child("w:pPr")
        .and_then(|p| p.child("w:pStyle"))
        .and_then(|s| s.attr("w:val"))
}

// ─── Contractor fields ──────────────────────────────────────────────────────

lazy_static::lazy_static! {
    static ref CONTRACTOR_NAME: Regex = lenient_token_pattern(Field::ContractorName);
    static ref CONTRACTOR_EMAIL: Regex = lenient_token_pattern(Field::ContractorEmail);
}

/// Matches a field's token with any whitespace between its characters and
/// in any case, i.e. everything that normalizes to the tight token.
fn lenient_token_pattern(field: Field) -> Regex {
    let body: Vec<String> = field
        .key()
        .chars()
        .map(|c| regex::escape(&c.to_string()))
        .collect();
    let pattern = format!(r"(?i)\{{\s*\{{\s*{}\s*\}}\s*\}}", body.join(r"\s*"));
    Regex::new(&pattern).expect("invalid regex")
}

fn lenient_token_regex(field: Field) -> Option<&'static Regex> {
    match field {
        Field::ContractorName => Some(&*CONTRACTOR_NAME),
        Field::ContractorEmail => Some(&*CONTRACTOR_EMAIL),
        _ => None,
    }
}

/// Strip exactly one `{{`…`}}` pair from a value that still carries one.
fn unwrap_token_braces(value: &str) -> &str {
    if value.len() >= 4 && value.starts_with("{{") && value.ends_with("}}") {
        &value[2..value.len() - 2]
    } else {
        value
    }
}

fn resolved_value(p: &Placeholder) -> &str {
    if p.field.is_contractor() {
        unwrap_token_braces(&p.value)
    } else {
        &p.value
    }
}

fn contractor_fields(map: &PlaceholderMap) -> Vec<(Field, String)> {
    let mut fields: Vec<(Field, String)> = Vec::new();
    for p in map.iter() {
        if p.field.is_contractor() && !fields.iter().any(|(f, _)| *f == p.field) {
            fields.push((p.field, resolved_value(p).to_string()));
        }
    }
    fields
}

/// Apply contractor replacements to `text`, returning `None` if nothing matched.
fn replace_contractor_tokens(text: &str, fields: &[(Field, String)]) -> Option<String> {
    let normalized = normalize(text);
    let mut out = text.to_string();
    let mut changed = false;
    for (field, value) in fields {
        if !normalized.contains(&field.normalized_token()) {
            continue;
        }
        let Some(re) = lenient_token_regex(*field) else {
            continue;
        };
        let replaced = re.replace_all(&out, regex::NoExpand(value));
        if replaced != out {
            out = replaced.into_owned();
            changed = true;
        }
    }
    changed.then_some(out)
}

/// Replace contractor tokens run by run. Only runs whose own text holds
/// the token are touched.
fn substitute_contractor_runs(paragraph: &mut Element, fields: &[(Field, String)]) -> bool {
    let mut changed = false;
    for run in paragraph.elements_mut().filter(|e| is_text_run(e)) {
        if let Some(new_text) = replace_contractor_tokens(&run_text(run), fields) {
            set_run_text(run, &new_text);
            changed = true;
        }
    }
    changed
}

// ─── Run-rebuilding substitution ────────────────────────────────────────────

/// Replace every occurrence of `token` in `chars`, keeping `spans` aligned.
/// Inserted characters take the style of the first character they replace.
fn replace_tracked(
    chars: &mut Vec<char>,
    spans: &mut Vec<FormattingSpan>,
    token: &[char],
    value: &[char],
) -> bool {
    if token.is_empty() || chars.len() < token.len() {
        return false;
    }
    let mut changed = false;
    let mut pos = 0;
    while pos + token.len() <= chars.len() {
        if chars[pos..pos + token.len()] == *token {
            let style = spans[pos].clone();
            chars.splice(pos..pos + token.len(), value.iter().copied());
            spans.splice(
                pos..pos + token.len(),
                std::iter::repeat(style).take(value.len()),
            );
            pos += value.len();
            changed = true;
        } else {
            pos += 1;
        }
    }
    changed
}

/// Emit the fewest runs that reproduce `chars` with `spans` styling: a new
/// run starts wherever the style differs from the previous character's.
/// Characters beyond the captured spans use the last captured style.
fn emit_runs(chars: &[char], spans: &[FormattingSpan]) -> Vec<Node> {
    let mut runs = Vec::new();
    let Some(last) = spans.last() else {
        return runs;
    };
    let style_at = |i: usize| spans.get(i).unwrap_or(last);

    let mut start = 0;
    while start < chars.len() {
        let style = style_at(start);
        let mut end = start + 1;
        while end < chars.len() && style_at(end).same_style(style) {
            end += 1;
        }
        let mut run = Element::new("w:r");
        if let Some(rpr) = &style.run_properties {
            run.children.push(Node::Element(rpr.clone()));
        }
        let text: String = chars[start..end].iter().collect();
        run.children.extend(text_content(&text));
        runs.push(Node::Element(run));
        start = end;
    }
    runs
}

enum Slot {
    Run,
    Marker,
    Boundary,
}

fn classify(node: &Node) -> Slot {
    match node {
        Node::Element(e) if is_text_run(e) => Slot::Run,
        Node::Element(e) if ZERO_WIDTH_MARKERS.contains(&e.name.as_str()) => Slot::Marker,
        Node::Element(_) => Slot::Boundary,
        Node::Text(_) | Node::Other(_) => Slot::Marker,
    }
}

/// Maximal sequences of child indices made of text runs and zero-width
/// markers. Groups with no text run are dropped.
fn run_groups(paragraph: &Element) -> Vec<Vec<usize>> {
    let mut groups = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    let mut has_run = false;
    for (i, node) in paragraph.children.iter().enumerate() {
        match classify(node) {
            Slot::Run => {
                current.push(i);
                has_run = true;
            }
            Slot::Marker => current.push(i),
            Slot::Boundary => {
                if has_run {
                    groups.push(std::mem::take(&mut current));
                }
                current.clear();
                has_run = false;
            }
        }
    }
    if has_run {
        groups.push(current);
    }
    groups
}

/// Substitute one run group in place. Returns true if it was rewritten.
fn substitute_group(
    paragraph: &mut Element,
    group: &[usize],
    map: &PlaceholderMap,
    style: Option<&str>,
) -> bool {
    let runs: Vec<&Element> = group
        .iter()
        .filter_map(|&i| match &paragraph.children[i] {
            Node::Element(run) if run.name == "w:r" => Some(run),
            _ => None,
        })
        .collect();
    let texts: Vec<String> = runs.iter().map(|run| run_text(run)).collect();
    let text: String = texts.concat();
    if !map.iter().any(|p| text.contains(&p.token)) {
        return false;
    }

    let mut chars: Vec<char> = Vec::with_capacity(text.len());
    let mut spans: Vec<FormattingSpan> = Vec::with_capacity(text.len());
    for (run, own_text) in runs.iter().zip(&texts) {
        let span = FormattingSpan::from_run(run, style);
        for ch in own_text.chars() {
            chars.push(ch);
            spans.push(span.clone());
        }
    }

    let mut changed = false;
    for p in map.iter() {
        let token: Vec<char> = p.token.chars().collect();
        let value: Vec<char> = resolved_value(p).chars().collect();
        changed |= replace_tracked(&mut chars, &mut spans, &token, &value);
    }
    if !changed {
        return false;
    }

    // Markers keep their relative order ahead of the rebuilt runs.
    let first = group[0];
    let mut rebuilt: Vec<Node> = Vec::new();
    for &i in group.iter().rev() {
        let node = paragraph.children.remove(i);
        if !matches!(classify(&node), Slot::Run) {
            rebuilt.insert(0, node);
        }
    }
    rebuilt.extend(emit_runs(&chars, &spans));
    paragraph.children.splice(first..first, rebuilt);
    true
}

/// Substitute placeholders in a body or table-cell paragraph.
///
/// Contractor tokens are replaced inside the run that holds them so their
/// surroundings keep their exact formatting. Every other token is replaced
/// across run boundaries by rebuilding the affected runs. Returns true if
/// the paragraph changed.
pub fn substitute_paragraph(paragraph: &mut Element, map: &PlaceholderMap) -> bool {
    let runs: Vec<&Element> = paragraph.elements().filter(|e| is_text_run(e)).collect();
    if runs.is_empty() {
        return false;
    }
    let full_text: String = runs.iter().map(|r| run_text(r)).collect();

    let mut changed = false;
    let normalized = normalize(&full_text);
    let contractors = contractor_fields(map);
    if contractors
        .iter()
        .any(|(f, _)| normalized.contains(&f.normalized_token()))
    {
        changed |= substitute_contractor_runs(paragraph, &contractors);
    }

    let style = paragraph_style(paragraph);
    let groups = run_groups(paragraph);
    for group in groups.iter().rev() {
        changed |= substitute_group(paragraph, group, map, style.as_deref());
    }
    changed
}

/// Substitute placeholders in a text-box paragraph by concatenating all of
/// its `<w:t>` leaves. The result goes into the first leaf; the others are
/// blanked. Nested drawings are left to their own visit.
pub fn substitute_leaves(paragraph: &mut Element, map: &PlaceholderMap) -> bool {
    let mut leaves: Vec<&mut Element> = Vec::new();
    paragraph.collect_mut("w:t", &["w:drawing", "w:pict"], &mut leaves);
    if leaves.is_empty() {
        return false;
    }
    let combined: String = leaves.iter().map(|t| t.text()).collect();

    let mut text = replace_contractor_tokens(&combined, &contractor_fields(map))
        .unwrap_or_else(|| combined.clone());
    for p in map.iter() {
        if text.contains(&p.token) {
            text = text.replace(&p.token, resolved_value(p));
        }
    }
    if text == combined {
        return false;
    }

    let mut iter = leaves.into_iter();
    if let Some(first) = iter.next() {
        first.set_text(&text);
        first.preserve_space();
    }
    for leaf in iter {
        leaf.set_text("");
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::xml::XmlDocument;

    fn paragraph(xml: &str) -> Element {
        let doc = XmlDocument::parse(xml).unwrap();
        doc.root().unwrap().clone()
    }

    fn to_xml(e: &Element) -> String {
        let mut out = String::new();
        e.write_to(&mut out);
        out
    }

    fn text_of(p: &Element) -> String {
        p.elements().filter(|e| e.name == "w:r").map(run_text).collect()
    }

    fn map() -> PlaceholderMap {
        let mut map = PlaceholderMap::default();
        map.insert(Field::Name, "Barn Roof");
        map.insert(Field::JobContact, "Dana Reyes");
        map.insert(Field::ContractorEmail, "crew@example.com");
        map.insert(Field::ContractorName, "{{Acme Roofing}}");
        map
    }

    #[test]
    fn test_token_split_across_runs_keeps_formatting() {
        let mut p = paragraph(
            r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Project: </w:t></w:r><w:r><w:t>{{Na</w:t></w:r><w:proofErr w:type="spellStart"/><w:r><w:t>me}} today</w:t></w:r></w:p>"#,
        );
        assert!(substitute_paragraph(&mut p, &map()));
        assert_eq!(text_of(&p), "Project: Barn Roof today");
        let runs: Vec<&Element> = p.elements().filter(|e| e.name == "w:r").collect();
        assert_eq!(runs.len(), 2);
        assert!(runs[0].child("w:rPr").is_some());
        assert_eq!(run_text(runs[0]), "Project: ");
        assert_eq!(run_text(runs[1]), "Barn Roof today");
        // the proofing marker survives ahead of the rebuilt runs
        assert_eq!(p.elements().next().unwrap().name, "w:proofErr");
    }

    #[test]
    fn test_spaced_token() {
        let mut p = paragraph(r#"<w:p><w:r><w:t>Contact: {{ JobContact }}</w:t></w:r></w:p>"#);
        assert!(substitute_paragraph(&mut p, &map()));
        assert_eq!(text_of(&p), "Contact: Dana Reyes");
    }

    #[test]
    fn test_no_token_is_noop() {
        let xml = r#"<w:p><w:r><w:t>Nothing here</w:t></w:r></w:p>"#;
        let mut p = paragraph(xml);
        assert!(!substitute_paragraph(&mut p, &map()));
        assert_eq!(to_xml(&p), xml);
    }

    #[test]
    fn test_no_runs_is_noop() {
        let xml = r#"<w:p><w:pPr><w:pStyle w:val="Title"/></w:pPr></w:p>"#;
        let mut p = paragraph(xml);
        assert!(!substitute_paragraph(&mut p, &map()));
        assert_eq!(to_xml(&p), xml);
    }

    #[test]
    fn test_contractor_email_is_run_local() {
        let mut p = paragraph(
            r#"<w:p><w:r><w:rPr><w:i/><w:color w:val="FF0000"/></w:rPr><w:t xml:space="preserve">Email: </w:t></w:r><w:r><w:t>{{ContractorEmail}}</w:t></w:r></w:p>"#,
        );
        let before = to_xml(p.elements().next().unwrap());
        assert!(substitute_paragraph(&mut p, &map()));
        let runs: Vec<&Element> = p.elements().collect();
        assert_eq!(runs.len(), 2);
        assert_eq!(to_xml(runs[0]), before);
        assert_eq!(run_text(runs[1]), "crew@example.com");
    }

    #[test]
    fn test_contractor_name_lenient_and_unwrapped() {
        let mut p = paragraph(r#"<w:p><w:r><w:t>By {{ contractor Name }}</w:t></w:r></w:p>"#);
        assert!(substitute_paragraph(&mut p, &map()));
        assert_eq!(text_of(&p), "By Acme Roofing");
    }

    #[test]
    fn test_other_tokens_alongside_contractor() {
        let mut p = paragraph(
            r#"<w:p><w:r><w:t>{{ContractorEmail}}</w:t></w:r><w:r><w:t> re {{Name}}</w:t></w:r></w:p>"#,
        );
        assert!(substitute_paragraph(&mut p, &map()));
        assert_eq!(text_of(&p), "crew@example.com re Barn Roof");
    }

    #[test]
    fn test_boundary_elements_are_untouched() {
        let mut p = paragraph(
            r#"<w:p><w:r><w:t>{{Name}}</w:t></w:r><w:hyperlink r:id="rId4"><w:r><w:t>link</w:t></w:r></w:hyperlink><w:r><w:tab/><w:t>{{JobContact}}</w:t></w:r></w:p>"#,
        );
        assert!(substitute_paragraph(&mut p, &map()));
        let names: Vec<&str> = p.elements().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["w:r", "w:hyperlink", "w:r"]);
        let runs: Vec<&Element> = p.elements().collect();
        assert_eq!(run_text(runs[0]), "Barn Roof");
        assert_eq!(run_text(runs[2]), "\tDana Reyes");
        assert!(runs[2].child("w:tab").is_some());
    }

    #[test]
    fn test_longer_value_inherits_token_style() {
        let mut chars: Vec<char> = "ab{{X}}".chars().collect();
        let plain = FormattingSpan::from_run(&Element::new("w:r"), None);
        let mut bold = plain.clone();
        bold.bold = true;
        let mut spans = vec![plain.clone(), plain.clone()];
        spans.extend(std::iter::repeat(bold.clone()).take(5));
        let token: Vec<char> = "{{X}}".chars().collect();
        let value: Vec<char> = "a much longer value".chars().collect();
        assert!(replace_tracked(&mut chars, &mut spans, &token, &value));
        assert_eq!(chars.len(), spans.len());
        assert!(spans[2..].iter().all(|s| s.bold));
        assert_eq!(emit_runs(&chars, &spans).len(), 2);
    }

    #[test]
    fn test_emit_runs_past_captured_range_uses_last_style() {
        let plain = FormattingSpan::from_run(&Element::new("w:r"), None);
        let chars: Vec<char> = "abcdef".chars().collect();
        let runs = emit_runs(&chars, &[plain.clone(), plain]);
        assert_eq!(runs.len(), 1);
        assert!(emit_runs(&chars, &[]).is_empty());
    }

    #[test]
    fn test_leaves_concatenated_into_first() {
        let mut p = paragraph(
            r#"<w:p><w:r><w:t>{{Job</w:t></w:r><w:r><w:t>Contact}}</w:t></w:r><w:r><w:t> / {{ CONTRACTOREMAIL }}</w:t></w:r></w:p>"#,
        );
        assert!(substitute_leaves(&mut p, &map()));
        let mut leaves = Vec::new();
        p.collect_mut("w:t", &[], &mut leaves);
        assert_eq!(leaves[0].text(), "Dana Reyes / crew@example.com");
        assert_eq!(leaves[1].text(), "");
        assert_eq!(leaves[2].text(), "");
    }

    #[test]
    fn test_formatting_span_flags() {
        let run = paragraph(
            r#"<w:r><w:rPr><w:rFonts w:ascii="Tahoma" w:hAnsi="Tahoma"/><w:b w:val="0"/><w:i/><w:u w:val="single"/><w:sz w:val="20"/></w:rPr><w:t>x</w:t></w:r>"#,
        );
        let span = FormattingSpan::from_run(&run, Some("Heading1"));
        assert!(!span.bold);
        assert!(span.italic);
        assert_eq!(span.underline.as_deref(), Some("single"));
        assert_eq!(span.font_name.as_deref(), Some("Tahoma"));
        assert_eq!(span.font_size.as_deref(), Some("20"));
        assert_eq!(span.paragraph_style.as_deref(), Some("Heading1"));
    }
}
