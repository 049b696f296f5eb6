use serde::{Deserialize, Serialize};
use tracing::debug;

use super::segment::{AnnotatedText, Parcel};
use crate::config::ParserConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledLink {
    pub label: Option<String>,
    pub url: String,
}

impl LabeledLink {
    pub fn new(label: Option<&str>, url: &str) -> Self {
        Self {
            label: label.map(str::to_string),
            url: url.to_string(),
        }
    }
}

/// Pair every link in `text` with the label its line layout implies.
///
/// Single forward pass. The only state carried between lines is the pending
/// label set by a text-only line, which the next link-only line inherits.
pub fn label_links(text: &AnnotatedText, config: &ParserConfig) -> Vec<LabeledLink> {
    let mut links = Vec::new();
    let mut pending: Option<String> = None;

    for line in text {
        match line.parcels() {
            [Parcel::Link(url)] => {
                links.push(LabeledLink::new(pending.as_deref(), url));
            }
            // bullet glyph in front of a link: reuse the heading above
            [Parcel::Text(t), Parcel::Link(url)] if is_bullet(t, config) => {
                links.push(LabeledLink::new(pending.as_deref(), url));
            }
            [Parcel::Text(t), Parcel::Link(url)] => {
                pending = None;
                let label = strip_label(t, config);
                links.push(LabeledLink::new(Some(label.as_str()), url));
            }
            [Parcel::Text(t)] => {
                pending = Some(strip_label(t, config));
            }
            other => {
                pending = None;
                for parcel in other {
                    if let Parcel::Link(url) = parcel {
                        links.push(LabeledLink::new(None, url));
                    }
                }
            }
        }
    }

    debug!(links = links.len(), "labeled links");
    links
}

fn is_bullet(text: &str, config: &ParserConfig) -> bool {
    config.prefix_glyphs.iter().any(|g| g == text)
}

/// Drop one leading and one trailing decorative glyph, then trim.
pub fn strip_label(text: &str, config: &ParserConfig) -> String {
    let s = config
        .prefix_glyphs
        .iter()
        .find_map(|g| text.strip_prefix(g.as_str()))
        .unwrap_or(text);
    let s = config
        .postfix_glyphs
        .iter()
        .find_map(|g| s.strip_suffix(g.as_str()))
        .unwrap_or(s);
    s.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::segment::Line;

    fn text(s: &str) -> Parcel {
        Parcel::Text(s.to_string())
    }

    fn link(s: &str) -> Parcel {
        Parcel::Link(s.to_string())
    }

    fn annotated(lines: Vec<Vec<Parcel>>) -> AnnotatedText {
        AnnotatedText::from(lines.into_iter().map(Line::from).collect::<Vec<_>>())
    }

    fn resolve(lines: Vec<Vec<Parcel>>) -> Vec<LabeledLink> {
        label_links(&annotated(lines), &ParserConfig::default())
    }

    #[test]
    fn label_from_previous_line() {
        let links = resolve(vec![vec![text("My Label")], vec![link("http://example.com/x")]]);
        assert_eq!(links, vec![LabeledLink::new(Some("My Label"), "http://example.com/x")]);
    }

    #[test]
    fn inline_label() {
        let links = resolve(vec![vec![text("Website:"), link("http://example.com")]]);
        assert_eq!(links, vec![LabeledLink::new(Some("Website"), "http://example.com")]);
    }

    #[test]
    fn unlabeled_link() {
        let links = resolve(vec![vec![link("http://example.com")]]);
        assert_eq!(links, vec![LabeledLink::new(None, "http://example.com")]);
    }

    #[test]
    fn pending_label_shared_by_link_run() {
        let links = resolve(vec![
            vec![text("Socials")],
            vec![link("https://a.test")],
            vec![link("https://b.test")],
        ]);
        assert_eq!(links[0].label.as_deref(), Some("Socials"));
        assert_eq!(links[1].label.as_deref(), Some("Socials"));
    }

    #[test]
    fn bullet_reuses_pending_label() {
        let links = resolve(vec![
            vec![text("Merch:")],
            vec![text("\u{25ba}"), link("https://shop.test")],
            vec![text("-"), link("https://store.test")],
        ]);
        assert_eq!(
            links,
            vec![
                LabeledLink::new(Some("Merch"), "https://shop.test"),
                LabeledLink::new(Some("Merch"), "https://store.test"),
            ]
        );
    }

    #[test]
    fn inline_label_resets_pending() {
        let links = resolve(vec![
            vec![text("Heading")],
            vec![text("Twitter |"), link("https://twitter.test")],
            vec![link("https://after.test")],
        ]);
        assert_eq!(links[0].label.as_deref(), Some("Twitter"));
        assert_eq!(links[1].label, None);
    }

    #[test]
    fn mixed_line_emits_unlabeled_and_resets() {
        let links = resolve(vec![
            vec![text("Heading")],
            vec![text("see"), link("https://a.test"), text("and"), link("https://b.test")],
            vec![link("https://c.test")],
        ]);
        assert_eq!(
            links,
            vec![
                LabeledLink::new(None, "https://a.test"),
                LabeledLink::new(None, "https://b.test"),
                LabeledLink::new(None, "https://c.test"),
            ]
        );
    }

    #[test]
    fn empty_line_resets_pending() {
        let links = resolve(vec![vec![text("Heading")], vec![], vec![link("https://a.test")]]);
        assert_eq!(links[0].label, None);
    }

    #[test]
    fn text_lines_replace_pending() {
        let links = resolve(vec![
            vec![text("first")],
            vec![text("\u{2192} second \u{2192}")],
            vec![link("https://a.test")],
        ]);
        assert_eq!(links[0].label.as_deref(), Some("second"));
    }

    #[test]
    fn strip_only_one_glyph_each_side() {
        let cfg = ParserConfig::default();
        assert_eq!(strip_label("\u{00bb} Shop \u{00bb}", &cfg), "Shop");
        assert_eq!(strip_label(">> Shop ::", &cfg), "> Shop :");
        assert_eq!(strip_label("Plain", &cfg), "Plain");
        // ':' is only stripped as a postfix
        assert_eq!(strip_label(":Shop", &cfg), ":Shop");
    }

    #[test]
    fn custom_glyphs() {
        let mut cfg = ParserConfig::default();
        cfg.prefix_glyphs = vec!["*".to_string()];
        cfg.postfix_glyphs = vec!["=".to_string()];
        assert_eq!(strip_label("* Donate =", &cfg), "Donate");
        assert_eq!(strip_label("Website:", &cfg), "Website:");
    }
}
