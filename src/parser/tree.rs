use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};

static BARE_URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://\S+").unwrap());

/// Minimal DOM: text leaves and elements, with the href kept for anchors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    Text(String),
    Element {
        tag: String,
        href: Option<String>,
        children: Vec<Node>,
    },
}

impl Node {
    pub fn text(value: impl Into<String>) -> Self {
        Node::Text(value.into())
    }

    pub fn element(tag: impl Into<String>, children: Vec<Node>) -> Self {
        Node::Element {
            tag: tag.into(),
            href: None,
            children,
        }
    }

    pub fn anchor(href: impl Into<String>, children: Vec<Node>) -> Self {
        Node::Element {
            tag: "a".to_string(),
            href: Some(href.into()),
            children,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Text(_) => &[],
            Node::Element { children, .. } => children,
        }
    }

    pub fn is_anchor(&self) -> bool {
        matches!(self, Node::Element { tag, .. } if tag.eq_ignore_ascii_case("a"))
    }

    pub fn href(&self) -> Option<&str> {
        match self {
            Node::Element { href, .. } => href.as_deref(),
            Node::Text(_) => None,
        }
    }

    /// Concatenated text of this node and everything below it.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                Node::Text(t) => out.push_str(t),
                Node::Element { children, .. } => stack.extend(children.iter().rev()),
            }
        }
        out
    }

    /// Parse an HTML fragment into a `div` rooted tree.
    pub fn from_html(html: &str) -> Self {
        let fragment = Html::parse_fragment(html);
        convert(fragment.root_element())
    }

    /// Build a tree from extracted text, turning bare http(s) URLs into anchors.
    pub fn from_plain_text(text: &str) -> Self {
        let mut children = Vec::new();
        let mut last = 0;
        for m in BARE_URL_RE.find_iter(text) {
            let url = trim_url_end(m.as_str());
            if url.ends_with("://") {
                continue;
            }
            if m.start() > last {
                children.push(Node::text(&text[last..m.start()]));
            }
            children.push(Node::anchor(url, vec![Node::text(url)]));
            last = m.start() + url.len();
        }
        if last < text.len() {
            children.push(Node::text(&text[last..]));
        }
        Node::element("div", children)
    }

    /// Serialize the children back to markup, like `innerHTML`.
    pub fn inner_html(&self) -> String {
        enum Step<'n> {
            Open(&'n Node),
            Close(&'n str),
        }

        let mut out = String::new();
        let mut stack: Vec<Step<'_>> = self.children().iter().rev().map(Step::Open).collect();
        while let Some(step) = stack.pop() {
            match step {
                Step::Open(Node::Text(t)) => out.push_str(&escape(t, false)),
                Step::Open(Node::Element { tag, href, children }) => {
                    out.push('<');
                    out.push_str(tag);
                    if let Some(href) = href {
                        out.push_str(" href=\"");
                        out.push_str(&escape(href, true));
                        out.push('"');
                    }
                    out.push('>');
                    stack.push(Step::Close(tag));
                    stack.extend(children.iter().rev().map(Step::Open));
                }
                Step::Close(tag) => {
                    out.push_str("</");
                    out.push_str(tag);
                    out.push('>');
                }
            }
        }
        out
    }
}

// Deep trees would otherwise drop one stack frame per level.
impl Drop for Node {
    fn drop(&mut self) {
        let Node::Element { children, .. } = self else {
            return;
        };
        let mut stack = std::mem::take(children);
        while let Some(mut node) = stack.pop() {
            if let Node::Element { children, .. } = &mut node {
                stack.append(children);
            }
        }
    }
}

/// Drop trailing sentence punctuation from a bare URL match. A closing
/// bracket stays when it balances an opening one inside the URL.
fn trim_url_end(url: &str) -> &str {
    let mut end = url;
    loop {
        let Some(c) = end.chars().last() else {
            return end;
        };
        let strip = match c {
            '.' | ',' | ';' | ':' | '!' | '?' | '\'' | '"' => true,
            ')' => end.matches('(').count() < end.matches(')').count(),
            ']' => end.matches('[').count() < end.matches(']').count(),
            '}' => end.matches('{').count() < end.matches('}').count(),
            _ => false,
        };
        if !strip {
            return end;
        }
        end = &end[..end.len() - c.len_utf8()];
    }
}

/// Items still to be converted under one open element.
enum Pending<'a> {
    Text(String),
    Element(ElementRef<'a>),
}

struct Frame<'a> {
    tag: String,
    href: Option<String>,
    pending: Vec<Pending<'a>>,
    done: Vec<Node>,
}

impl<'a> Frame<'a> {
    fn open(el: ElementRef<'a>, tag: String, href: Option<String>) -> Self {
        let mut pending = Vec::new();
        for child in el.children() {
            match child.value() {
                scraper::Node::Text(t) => pending.push(Pending::Text(String::from(&**t))),
                scraper::Node::Element(e) if e.name().eq_ignore_ascii_case("br") => {
                    pending.push(Pending::Text("\n".to_string()));
                }
                scraper::Node::Element(_) => {
                    if let Some(child_el) = ElementRef::wrap(child) {
                        pending.push(Pending::Element(child_el));
                    }
                }
                _ => {}
            }
        }
        pending.reverse();
        Self {
            tag,
            href,
            pending,
            done: Vec::new(),
        }
    }
}

/// Convert the fragment root into a `div` tree, one open element per frame.
fn convert(root: ElementRef<'_>) -> Node {
    let mut stack = vec![Frame::open(root, "div".to_string(), None)];
    loop {
        let Some(frame) = stack.last_mut() else {
            return Node::element("div", Vec::new());
        };
        match frame.pending.pop() {
            Some(Pending::Text(t)) => frame.done.push(Node::Text(t)),
            Some(Pending::Element(el)) => {
                let e = el.value();
                let tag = e.name().to_ascii_lowercase();
                let href = e.attr("href").map(str::to_string);
                stack.push(Frame::open(el, tag, href));
            }
            None => {
                let Some(closed) = stack.pop() else {
                    continue;
                };
                let node = Node::Element {
                    tag: closed.tag,
                    href: closed.href,
                    children: closed.done,
                };
                match stack.last_mut() {
                    Some(parent) => parent.done.push(node),
                    None => return node,
                }
            }
        }
    }
}

fn escape(s: &str, attr: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attr => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
