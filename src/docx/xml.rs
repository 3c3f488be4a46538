//! Lenient element tree over WordprocessingML parts.
//!
//! Tags are tokenized with a regex and every element keeps its raw opening
//! tag, so serializing an untouched tree reproduces the input byte for byte.
//! Only elements the caller rewrites change on output.

use anyhow::{bail, Result};
use regex::Regex;

lazy_static::lazy_static! {
    static ref TOKEN: Regex =
        Regex::new(r"(?s)<!--.*?-->|<!\[CDATA\[.*?\]\]>|<\?.*?\?>|<![^>]*>|<[^>]+>")
            .expect("invalid regex");
    static ref TAG_NAME: Regex = Regex::new(r"^</?\s*([^\s/>]+)").expect("invalid regex");
    static ref ATTRIBUTE: Regex =
        Regex::new(r#"\s([^\s=/>]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("invalid regex");
    static ref ENTITY: Regex =
        Regex::new(r"&(#x[0-9A-Fa-f]+|#[0-9]+|lt|gt|amp|quot|apos);").expect("invalid regex");
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    /// Character data, stored escaped exactly as it appeared.
    Text(String),
    /// Declarations, comments, processing instructions, CDATA.
    Other(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    open_tag: String,
    self_closing: bool,
    pub children: Vec<Node>,
}

impl Element {
    /// A new, empty element with a bare opening tag (`<name>`).
    pub fn new(name: &str) -> Self {
        Element {
            name: name.to_string(),
            open_tag: format!("<{}>", name),
            self_closing: false,
            children: Vec::new(),
        }
    }

    /// A new self-closing element (`<name/>`).
    pub fn empty(name: &str) -> Self {
        Element {
            name: name.to_string(),
            open_tag: format!("<{}/>", name),
            self_closing: true,
            children: Vec::new(),
        }
    }

    /// Build an element from a raw opening tag such as `<w:t xml:space="preserve">`.
    pub fn from_open_tag(open_tag: &str) -> Option<Self> {
        let name = TAG_NAME.captures(open_tag)?.get(1)?.as_str().to_string();
        Some(Element {
            name,
            open_tag: open_tag.to_string(),
            self_closing: open_tag.ends_with("/>"),
            children: Vec::new(),
        })
    }

    /// Value of an attribute on the opening tag, unescaped.
    pub fn attr(&self, name: &str) -> Option<String> {
        ATTRIBUTE
            .captures_iter(&self.open_tag)
            .find(|caps| &caps[1] == name)
            .and_then(|caps| caps.get(2).or_else(|| caps.get(3)))
            .map(|m| unescape(m.as_str()))
    }

    /// Add `xml:space="preserve"` to the opening tag unless it is already there.
    pub fn preserve_space(&mut self) {
        if self.open_tag.contains("xml:space=") {
            return;
        }
        let cut = if self.self_closing {
            self.open_tag.trim_end_matches("/>").trim_end().len()
        } else {
            self.open_tag.len() - 1
        };
        let tail = self.open_tag[cut..].to_string();
        self.open_tag.truncate(cut);
        self.open_tag.push_str(" xml:space=\"preserve\"");
        self.open_tag.push_str(&tail);
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.elements_mut().find(|e| e.name == name)
    }

    /// Direct element children, in document order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// True if any descendant element is named `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.elements().any(|e| e.name == name || e.contains(name))
    }

    /// Unescaped text of the direct character-data children.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            match node {
                Node::Text(raw) => out.push_str(&unescape(raw)),
                Node::Other(raw) if raw.starts_with("<![CDATA[") => {
                    out.push_str(&raw["<![CDATA[".len()..raw.len() - "]]>".len()]);
                }
                _ => {}
            }
        }
        out
    }

    /// Replace all children with a single escaped text node.
    pub fn set_text(&mut self, text: &str) {
        if self.self_closing {
            let cut = self.open_tag.trim_end_matches("/>").trim_end().len();
            self.open_tag.truncate(cut);
            self.open_tag.push('>');
            self.self_closing = false;
        }
        self.children.clear();
        if !text.is_empty() {
            self.children.push(Node::Text(escape(text)));
        }
    }

    /// Collect mutable references to every descendant named `name`, in
    /// document order, without descending into matches or into any element
    /// named in `skip`.
    pub fn collect_mut<'a>(
        &'a mut self,
        name: &str,
        skip: &[&str],
        out: &mut Vec<&'a mut Element>,
    ) {
        for child in self.children.iter_mut() {
            if let Node::Element(e) = child {
                if e.name == name {
                    out.push(e);
                } else if !skip.contains(&e.name.as_str()) {
                    e.collect_mut(name, skip, out);
                }
            }
        }
    }

    pub fn write_to(&self, out: &mut String) {
        out.push_str(&self.open_tag);
        if self.self_closing {
            return;
        }
        for child in &self.children {
            match child {
                Node::Element(e) => e.write_to(out),
                Node::Text(s) | Node::Other(s) => out.push_str(s),
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

/// A parsed XML part: the prolog, the root element and anything trailing it.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    pub nodes: Vec<Node>,
}

impl XmlDocument {
    pub fn parse(xml: &str) -> Result<Self> {
        let mut stack: Vec<Element> = Vec::new();
        let mut top: Vec<Node> = Vec::new();
        let mut last = 0usize;

        fn push(stack: &mut [Element], top: &mut Vec<Node>, node: Node) {
            match stack.last_mut() {
                Some(parent) => parent.children.push(node),
                None => top.push(node),
            }
        }

        for m in TOKEN.find_iter(xml) {
            if m.start() > last {
                push(&mut stack, &mut top, Node::Text(xml[last..m.start()].to_string()));
            }
            last = m.end();
            let tag = m.as_str();

            if tag.starts_with("<!") || tag.starts_with("<?") {
                push(&mut stack, &mut top, Node::Other(tag.to_string()));
            } else if tag.starts_with("</") {
                let name = TAG_NAME
                    .captures(tag)
                    .and_then(|c| c.get(1))
                    .map(|n| n.as_str())
                    .unwrap_or("");
                let Some(element) = stack.pop() else {
                    bail!("Unexpected closing tag {} at byte {}", tag, m.start());
                };
                if element.name != name {
                    bail!(
                        "Mismatched closing tag {} for <{}> at byte {}",
                        tag,
                        element.name,
                        m.start()
                    );
                }
                push(&mut stack, &mut top, Node::Element(element));
            } else {
                let Some(element) = Element::from_open_tag(tag) else {
                    bail!("Malformed tag {} at byte {}", tag, m.start());
                };
                if element.self_closing {
                    push(&mut stack, &mut top, Node::Element(element));
                } else {
                    stack.push(element);
                }
            }
        }

        if let Some(open) = stack.last() {
            bail!("Unclosed element <{}>", open.name);
        }
        if last < xml.len() {
            top.push(Node::Text(xml[last..].to_string()));
        }
        Ok(XmlDocument { nodes: top })
    }

    pub fn root(&self) -> Option<&Element> {
        self.nodes.iter().find_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn root_mut(&mut self) -> Option<&mut Element> {
        self.nodes.iter_mut().find_map(|n| match n {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            match node {
                Node::Element(e) => e.write_to(&mut out),
                Node::Text(s) | Node::Other(s) => out.push_str(s),
            }
        }
        out
    }
}

pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Decode entity and character references in one pass, so decoded text is
/// never decoded again.
pub fn unescape(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    ENTITY
        .replace_all(raw, |caps: &regex::Captures| {
            let decoded = match &caps[1] {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "amp" => Some('&'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                reference => {
                    let code = &reference[1..];
                    let value = match code.strip_prefix('x') {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => code.parse().ok(),
                    };
                    value.and_then(char::from_u32)
                }
            };
            decoded
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
