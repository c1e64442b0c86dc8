mod annotation;
mod config;
mod document;
mod error;
mod escape;
mod parser;
mod registry;
mod render;

pub use annotation::{Annotation, AnnotationId, AnnotationRef, ContentUnit, Payload, plain_units};
pub use config::{Config, MarkupConfig, PRESETS, RuleConfig};
pub use document::{Document, RangeAnnotation};
pub use error::{ConfigError, DocumentError, Error, RenderError};
pub use escape::Escaper;
pub use registry::{AnnotationRegistry, Markup, RenderRule};
pub use render::{Renderer, render, render_into};

/// Parse markdown text into annotated content units.
pub fn parse_markdown(markdown: &str) -> Vec<ContentUnit> {
    parser::parse(markdown)
}

/// Convert markdown to markup using the default (HTML) config.
pub fn markdown_to_markup(markdown: &str) -> Result<String, Error> {
    markdown_to_markup_with_config(markdown, &Config::compiled_default())
}

/// Convert markdown to markup with custom config.
pub fn markdown_to_markup_with_config(markdown: &str, config: &Config) -> Result<String, Error> {
    let units = parse_markdown(markdown);
    Ok(Renderer::from_config(config)?.render(&units)?)
}

/// Convert a JSON range document to markup using the default (HTML) config.
pub fn document_to_markup(json: &str) -> Result<String, Error> {
    document_to_markup_with_config(json, &Config::compiled_default())
}

/// Convert a JSON range document to markup with custom config.
pub fn document_to_markup_with_config(json: &str, config: &Config) -> Result<String, Error> {
    let units = Document::from_json(json)?.to_units()?;
    Ok(Renderer::from_config(config)?.render(&units)?)
}
