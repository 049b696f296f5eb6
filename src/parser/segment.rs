use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::tree::Node;
use crate::config::ParserConfig;

/// Smallest annotated unit of a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parcel {
    #[serde(rename = "text")]
    Text(String),
    #[serde(rename = "url")]
    Link(String),
}

/// One visual line. Never holds an empty (trimmed) text parcel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Line(Vec<Parcel>);

impl Line {
    pub fn parcels(&self) -> &[Parcel] {
        &self.0
    }

    pub fn links(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter_map(|p| match p {
            Parcel::Link(url) => Some(url.as_str()),
            Parcel::Text(_) => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Parcel>> for Line {
    /// Finalizes the parcels: text is trimmed and empty text dropped.
    fn from(parcels: Vec<Parcel>) -> Self {
        let parcels = parcels
            .into_iter()
            .filter_map(|p| match p {
                Parcel::Text(t) => {
                    let t = t.trim();
                    (!t.is_empty()).then(|| Parcel::Text(t.to_string()))
                }
                link => Some(link),
            })
            .collect();
        Line(parcels)
    }
}

/// Ordered lines of a description. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotatedText(Vec<Line>);

impl AnnotatedText {
    pub fn lines(&self) -> &[Line] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Line>> for AnnotatedText {
    fn from(lines: Vec<Line>) -> Self {
        AnnotatedText(lines)
    }
}

impl<'a> IntoIterator for &'a AnnotatedText {
    type Item = &'a Line;
    type IntoIter = std::slice::Iter<'a, Line>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Walk `root` depth-first and split its text into annotated lines.
///
/// Adjacent text from sibling nodes is concatenated before trimming, so
/// `<b>foo</b> bar` stays one `"foo bar"` parcel. Every `\n` inside a text
/// run closes the current line.
pub fn segment(root: &Node, config: &ParserConfig) -> AnnotatedText {
    let mut seg = Segmenter::new(config);
    seg.walk(root);
    seg.flush_line();
    debug!(lines = seg.lines.len(), "segmented description");
    AnnotatedText(seg.lines)
}

struct Segmenter<'c> {
    config: &'c ParserConfig,
    base: Option<Url>,
    lines: Vec<Line>,
    current: Vec<Parcel>,
}

impl<'c> Segmenter<'c> {
    fn new(config: &'c ParserConfig) -> Self {
        let base = config
            .page_host
            .as_deref()
            .and_then(|host| Url::parse(&format!("https://{}/", host)).ok());
        Self {
            config,
            base,
            lines: Vec::new(),
            current: Vec::new(),
        }
    }

    /// Depth-first, left to right. Leaves are handled against their parent,
    /// which decides whether they are link targets.
    fn walk(&mut self, root: &Node) {
        let mut stack: Vec<(&Node, &Node)> =
            root.children().iter().rev().map(|c| (root, c)).collect();
        while let Some((parent, child)) = stack.pop() {
            if !child.children().is_empty() {
                stack.extend(child.children().iter().rev().map(|c| (child, c)));
                continue;
            }

            let content = child.text_content();
            if parent.is_anchor() && !content.starts_with('#') {
                match self.resolve_link(parent.href()) {
                    Some(url) => self.current.push(Parcel::Link(url)),
                    None => {
                        warn!(href = ?parent.href(), "unresolvable link, keeping as text");
                        self.push_text_run(&content);
                    }
                }
            } else {
                self.push_text_run(&content);
            }
        }
    }

    fn push_text_run(&mut self, text: &str) {
        let mut sublines = text.split('\n');
        if let Some(first) = sublines.next() {
            self.append_text(first);
        }
        for subline in sublines {
            self.flush_line();
            self.append_text(subline);
        }
    }

    fn append_text(&mut self, text: &str) {
        match self.current.last_mut() {
            Some(Parcel::Text(last)) => last.push_str(text),
            _ => self.current.push(Parcel::Text(text.to_string())),
        }
    }

    fn flush_line(&mut self) {
        let parcels = std::mem::take(&mut self.current);
        self.lines.push(Line::from(parcels));
    }

    /// Absolute target of an anchor, unwrapping same-host redirect links.
    fn resolve_link(&self, href: Option<&str>) -> Option<String> {
        let href = href?.trim();
        if href.is_empty() {
            return None;
        }
        let (parsed, literal) = match Url::parse(href) {
            Ok(url) => (url, href.to_string()),
            Err(_) => {
                let url = self.base.as_ref()?.join(href).ok()?;
                let resolved = url.to_string();
                (url, resolved)
            }
        };

        if let Some(target) = self.redirect_target(&parsed) {
            return Some(target);
        }
        Some(literal)
    }

    fn redirect_target(&self, url: &Url) -> Option<String> {
        let page_host = self.config.page_host.as_deref()?;
        let host = host_with_port(url)?;
        if !host.eq_ignore_ascii_case(page_host) || url.path() != self.config.redirect_path {
            return None;
        }
        url.query_pairs()
            .find(|(k, _)| *k == self.config.redirect_param.as_str())
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty())
    }
}

fn host_with_port(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}
