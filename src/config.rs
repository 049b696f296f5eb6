use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

const PREFIX_GLYPHS: &[&str] = &["\u{25b6}", "\u{25ba}", "\u{00bb}", "\u{2192}", "-", ">"];
const POSTFIX_GLYPHS: &[&str] = &[
    "\u{25b6}", "\u{25ba}", "\u{00bb}", "\u{2192}", ":", "-", ">", "|",
];
const REDIRECT_PATH: &str = "/redirect";
const REDIRECT_PARAM: &str = "q";

/// A host whose links get a dedicated widget instead of the unknown bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub name: String,
    pub host: String,
}

/// Everything that steers a parse. Passed explicitly into every call; there
/// is no process-wide parser state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Host of the page the description was taken from (`location.host`).
    /// Relative hrefs resolve against it and same-host redirects unwrap.
    pub page_host: Option<String>,
    pub redirect_path: String,
    pub redirect_param: String,
    pub prefix_glyphs: Vec<String>,
    pub postfix_glyphs: Vec<String>,
    pub platforms: Vec<Platform>,
    /// Carry the inferred label onto platform widgets.
    pub keep_platform_label: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            page_host: None,
            redirect_path: REDIRECT_PATH.to_string(),
            redirect_param: REDIRECT_PARAM.to_string(),
            prefix_glyphs: PREFIX_GLYPHS.iter().map(|g| g.to_string()).collect(),
            postfix_glyphs: POSTFIX_GLYPHS.iter().map(|g| g.to_string()).collect(),
            platforms: vec![Platform {
                name: "patreon".to_string(),
                host: "patreon.com".to_string(),
            }],
            keep_platform_label: false,
        }
    }
}

impl ParserConfig {
    /// Layer an optional config file and `FIDO_*` env vars over the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let settings = builder
            .add_source(config::Environment::with_prefix("FIDO").try_parsing(true))
            .build()
            .context("Failed to read parser config")?;

        let cfg: ParserConfig = settings
            .try_deserialize()
            .context("Invalid parser config")?;
        debug!(?cfg, "loaded parser config");
        Ok(cfg)
    }

    pub fn with_page_host(mut self, host: impl Into<String>) -> Self {
        self.page_host = Some(host.into());
        self
    }

    pub fn with_platform_labels(mut self, keep: bool) -> Self {
        self.keep_platform_label = keep;
        self
    }
}
