use html2text::render::text_renderer::TrivialDecorator;
use serde::Deserialize;

/// One post as delivered by the remote listing with `_embed` enabled. Every
/// field is optional on the wire; consumers read through the accessor methods,
/// which collapse missing values to empty strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemotePost {
    #[serde(default)]
    pub guid: Option<RenderedText>,
    #[serde(default)]
    pub title: Option<RenderedText>,
    #[serde(default)]
    pub content: Option<RenderedText>,
    #[serde(default)]
    pub excerpt: Option<RenderedText>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub date_gmt: Option<String>,
    #[serde(default, rename = "_embedded")]
    pub embedded: Option<EmbeddedPayload>,
    #[serde(default, rename = "_links")]
    pub links: Option<LinkPayload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RenderedText {
    #[serde(default)]
    pub rendered: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmbeddedPayload {
    #[serde(default, rename = "wp:term")]
    pub terms: Vec<Vec<RemoteTerm>>,
    #[serde(default, rename = "wp:featuredmedia")]
    pub featured_media: Vec<EmbeddedMedia>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteTerm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub taxonomy: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmbeddedMedia {
    #[serde(default)]
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LinkPayload {
    #[serde(default, rename = "wp:featuredmedia")]
    pub featured_media: Vec<MediaLink>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaLink {
    #[serde(default)]
    pub href: String,
}

impl RemotePost {
    pub fn guid_value(&self) -> String {
        self.guid
            .as_ref()
            .map(|guid| guid.rendered.trim().to_string())
            .unwrap_or_default()
    }

    pub fn plain_title(&self) -> String {
        self.title
            .as_ref()
            .map(|title| strip_html(&title.rendered))
            .unwrap_or_default()
    }

    pub fn content_html(&self) -> String {
        self.content
            .as_ref()
            .map(|content| content.rendered.clone())
            .unwrap_or_default()
    }

    pub fn plain_excerpt(&self) -> String {
        self.excerpt
            .as_ref()
            .map(|excerpt| strip_html(&excerpt.rendered))
            .unwrap_or_default()
    }

    pub fn slug_value(&self) -> String {
        self.slug
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string()
    }

    pub fn status_value(&self) -> Option<&str> {
        self.status
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Embedded terms, flattened across the per-taxonomy groups.
    pub fn remote_terms(&self) -> Vec<RemoteTerm> {
        self.embedded
            .as_ref()
            .map(|embedded| embedded.terms.iter().flatten().cloned().collect())
            .unwrap_or_default()
    }

    pub fn embedded_media_url(&self) -> Option<String> {
        self.embedded
            .as_ref()
            .and_then(|embedded| embedded.featured_media.first())
            .and_then(|media| media.source_url.as_deref())
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(ToString::to_string)
    }

    pub fn media_link_href(&self) -> Option<String> {
        self.links
            .as_ref()
            .and_then(|links| links.featured_media.first())
            .map(|link| link.href.trim())
            .filter(|href| !href.is_empty())
            .map(ToString::to_string)
    }
}

/// Reduces rendered HTML to a single line of plain text. Used for titles and
/// excerpts, which must be comparable across imports.
pub fn strip_html(input: &str) -> String {
    if input.trim().is_empty() {
        return String::new();
    }
    let rendered = html2text::from_read_with_decorator(input.as_bytes(), 200, TrivialDecorator::new());
    rendered.split_whitespace().collect::<Vec<_>>().join(" ")
}
