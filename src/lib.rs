//! Turns video description text into labeled links and link widgets.

pub mod config;
pub mod error;
pub mod parser;

pub use config::{ParserConfig, Platform};
pub use error::ParseError;
pub use parser::label::LabeledLink;
pub use parser::segment::{AnnotatedText, Line, Parcel};
pub use parser::tree::Node;
pub use parser::widgets::Widget;
pub use parser::{parse_description, ParseResult, Source};
