pub mod label;
pub mod segment;
pub mod tree;
pub mod widgets;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ParserConfig;
use crate::error::{ParseError, Result};
use label::LabeledLink;
use segment::AnnotatedText;
use tree::Node;
use widgets::Widget;

/// What a description can be handed in as.
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    /// An already built node tree (the description container).
    Tree(&'a Node),
    /// Inner HTML of the description container.
    Html(&'a str),
    /// Extracted text; bare http(s) URLs are treated as links.
    Text(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub raw_input: String,
    pub annotated_text: AnnotatedText,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseResult {
    pub source: SourceInfo,
    /// Every link with its label, platform links included, in source order.
    pub links: Vec<LabeledLink>,
    pub widgets: Vec<Widget>,
}

/// Three-stage pipeline: source → annotated lines → labeled links → widgets.
pub fn parse_description(source: Source<'_>, config: &ParserConfig) -> Result<ParseResult> {
    let raw_input;
    let built;
    let root = match source {
        Source::Tree(node) => {
            if matches!(node, Node::Text(_)) {
                return Err(ParseError::MalformedInput(
                    "tree root must be an element, got a text node".into(),
                ));
            }
            raw_input = node.inner_html();
            node
        }
        Source::Html(html) => {
            check_text(html)?;
            raw_input = html.to_string();
            built = Node::from_html(html);
            &built
        }
        Source::Text(text) => {
            check_text(text)?;
            raw_input = text.to_string();
            built = Node::from_plain_text(text);
            &built
        }
    };

    let annotated_text = segment::segment(root, config);
    let links = label::label_links(&annotated_text, config);
    let widgets: Vec<Widget> = widgets::classify(links.iter().cloned(), config).collect();
    debug!(
        lines = annotated_text.len(),
        widgets = widgets.len(),
        "parsed description"
    );

    Ok(ParseResult {
        source: SourceInfo {
            raw_input,
            annotated_text,
        },
        links,
        widgets,
    })
}

fn check_text(input: &str) -> Result<()> {
    if let Some(pos) = input.find('\0') {
        return Err(ParseError::MalformedInput(format!(
            "NUL byte at offset {} in description text",
            pos
        )));
    }
    Ok(())
}

// ── Tests ──
