use serde::{Deserialize, Serialize};
use url::Url;

use super::label::LabeledLink;
use crate::config::{ParserConfig, Platform};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Widget {
    /// One link on a recognized host.
    Platform {
        platform: String,
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    /// Every other link, in arrival order.
    Unknown { links: Vec<LabeledLink> },
}

/// Lazily group labeled links into widgets.
///
/// Platform widgets come out as soon as their link is seen; the unknown
/// bucket is emitted once, after the input runs dry, and only if non-empty.
pub fn classify<'c, I>(links: I, config: &'c ParserConfig) -> Widgets<'c, I::IntoIter>
where
    I: IntoIterator<Item = LabeledLink>,
{
    Widgets {
        links: links.into_iter(),
        config,
        unknown: Vec::new(),
        done: false,
    }
}

pub struct Widgets<'c, I> {
    links: I,
    config: &'c ParserConfig,
    unknown: Vec<LabeledLink>,
    done: bool,
}

impl<I: Iterator<Item = LabeledLink>> Iterator for Widgets<'_, I> {
    type Item = Widget;

    fn next(&mut self) -> Option<Widget> {
        if self.done {
            return None;
        }
        for link in self.links.by_ref() {
            match match_platform(&link.url, &self.config.platforms) {
                Some(platform) => {
                    let label = if self.config.keep_platform_label {
                        link.label
                    } else {
                        None
                    };
                    return Some(Widget::Platform {
                        platform: platform.name.clone(),
                        url: link.url,
                        label,
                    });
                }
                None => self.unknown.push(link),
            }
        }

        self.done = true;
        if self.unknown.is_empty() {
            None
        } else {
            Some(Widget::Unknown {
                links: std::mem::take(&mut self.unknown),
            })
        }
    }
}

impl<I: Iterator<Item = LabeledLink>> std::iter::FusedIterator for Widgets<'_, I> {}

/// Platform whose host equals the URL's host or is a parent domain of it.
pub fn match_platform<'p>(url: &str, platforms: &'p [Platform]) -> Option<&'p Platform> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    platforms.iter().find(|p| {
        let want = p.host.to_ascii_lowercase();
        host == want || host.strip_suffix(want.as_str()).is_some_and(|sub| sub.ends_with('.'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_platform_and_unknown() {
        let links = vec![
            LabeledLink::new(None, "https://sub.patreon.com/x"),
            LabeledLink::new(Some("A"), "https://other.test"),
        ];
        let widgets: Vec<_> = classify(links, &ParserConfig::default()).collect();
        assert_eq!(
            widgets,
            vec![
                Widget::Platform {
                    platform: "patreon".into(),
                    url: "https://sub.patreon.com/x".into(),
                    label: None,
                },
                Widget::Unknown {
                    links: vec![LabeledLink::new(Some("A"), "https://other.test")],
                },
            ]
        );
    }

    #[test]
    fn no_unknown_widget_when_all_match() {
        let links = vec![
            LabeledLink::new(None, "https://patreon.com/a"),
            LabeledLink::new(None, "https://www.patreon.com/b"),
        ];
        let widgets: Vec<_> = classify(links, &ParserConfig::default()).collect();
        assert_eq!(widgets.len(), 2);
        assert!(widgets.iter().all(|w| matches!(w, Widget::Platform { .. })));
    }

    #[test]
    fn no_links_no_widgets() {
        assert_eq!(classify(Vec::<LabeledLink>::new(), &ParserConfig::default()).count(), 0);
    }

    #[test]
    fn unknown_keeps_order_and_labels() {
        let links = vec![
            LabeledLink::new(Some("one"), "https://a.test"),
            LabeledLink::new(None, "https://patreon.com/p"),
            LabeledLink::new(Some("two"), "https://b.test"),
            LabeledLink::new(None, "not a url"),
        ];
        let widgets: Vec<_> = classify(links, &ParserConfig::default()).collect();
        assert!(matches!(&widgets[0], Widget::Platform { .. }));
        let Widget::Unknown { links } = &widgets[1] else {
            panic!("expected unknown widget, got {:?}", widgets[1]);
        };
        let urls: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.test", "https://b.test", "not a url"]);
        assert_eq!(links[0].label.as_deref(), Some("one"));
    }

    #[test]
    fn platform_label_dropped_by_default() {
        let links = vec![LabeledLink::new(Some("Support me"), "https://patreon.com/me")];
        let widgets: Vec<_> = classify(links, &ParserConfig::default()).collect();
        assert!(matches!(&widgets[0], Widget::Platform { label: None, .. }));
    }

    #[test]
    fn platform_label_kept_when_configured() {
        let cfg = ParserConfig::default().with_platform_labels(true);
        let links = vec![LabeledLink::new(Some("Support me"), "https://patreon.com/me")];
        let widgets: Vec<_> = classify(links, &cfg).collect();
        assert!(matches!(&widgets[0], Widget::Platform { label: Some(l), .. } if l == "Support me"));
    }

    #[test]
    fn lookalike_host_is_unknown() {
        let platforms = ParserConfig::default().platforms;
        assert!(match_platform("https://notpatreon.com/x", &platforms).is_none());
        assert!(match_platform("https://patreon.com.evil.test/x", &platforms).is_none());
        assert!(match_platform("https://WWW.Patreon.com/x", &platforms).is_some());
    }

    #[test]
    fn exhausted_iterator_stays_empty() {
        let links = vec![LabeledLink::new(None, "https://a.test")];
        let cfg = ParserConfig::default();
        let mut widgets = classify(links, &cfg);
        assert!(widgets.next().is_some());
        assert!(widgets.next().is_none());
        assert!(widgets.next().is_none());
    }

    #[test]
    fn wire_shape() {
        let w = Widget::Platform {
            platform: "patreon".into(),
            url: "https://patreon.com/x".into(),
            label: None,
        };
        assert_eq!(
            serde_json::to_string(&w).unwrap(),
            r#"{"type":"platform","platform":"patreon","url":"https://patreon.com/x"}"#
        );
    }
}
