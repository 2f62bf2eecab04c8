//! Embedded-content capabilities.
//!
//! Each kind of replaced content is probed once into a [`MediaSource`]
//! variant; the controller then asks it uniformly for the best source URL
//! and the intrinsic size.

use domframe_core::Size;
use url::Url;

use crate::accessor::{ElementId, RenderTreeAccessor};
use crate::classify::SpecialTag;

/// `data:` URIs shorter than this are treated as lazy-load placeholders.
pub const PLACEHOLDER_DATA_URI_LEN: usize = 1024;

/// Attributes lazy-loading libraries park the real source in.
const LAZY_SRC_ATTRIBUTES: &[&str] = &["data-src", "data-lazy-src", "data-original"];

/// Uniform queries over embedded content.
pub trait MediaCapability {
    /// The URL that best represents the content, if any.
    fn best_source_url(&self) -> Option<String>;

    /// Natural size of the content, if known.
    fn intrinsic_size(&self) -> Option<Size>;
}

/// One candidate from a `srcset` or a plain source attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct SrcCandidate {
    /// Candidate URL.
    pub url: String,
    /// Effective pixel width used to rank candidates.
    pub score: f32,
}

/// Raster image (`<img>`, possibly inside `<picture>`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageMedia {
    /// Candidates in discovery order.
    pub candidates: Vec<SrcCandidate>,
    /// Natural size.
    pub natural: Option<Size>,
}

impl ImageMedia {
    /// Probe an `<img>` element.
    pub fn probe(accessor: &dyn RenderTreeAccessor, element: ElementId, rendered_width: f32) -> Self {
        let natural = accessor.intrinsic_size(element);
        let base_width = natural
            .map(|s| s.width)
            .filter(|w| *w > 0.0)
            .unwrap_or(rendered_width)
            .max(1.0);
        let mut candidates = Vec::new();

        if let Some(current) = accessor.current_src(element) {
            candidates.push(SrcCandidate {
                url: current,
                score: base_width,
            });
        }
        for source in accessor.picture_sources(element) {
            candidates.extend(parse_srcset(&source.srcset, base_width));
        }
        for attr in ["srcset", "data-srcset"] {
            if let Some(srcset) = accessor.attribute(element, attr) {
                candidates.extend(parse_srcset(&srcset, base_width));
            }
        }
        for attr in std::iter::once("src").chain(LAZY_SRC_ATTRIBUTES.iter().copied()) {
            if let Some(url) = accessor.attribute(element, attr) {
                candidates.push(SrcCandidate {
                    url,
                    score: base_width,
                });
            }
        }
        candidates.retain(|c| is_usable_url(&c.url));
        Self { candidates, natural }
    }
}

impl MediaCapability for ImageMedia {
    fn best_source_url(&self) -> Option<String> {
        pick_best(&self.candidates)
    }

    fn intrinsic_size(&self) -> Option<Size> {
        self.natural
    }
}

/// `<video>`: the poster frame stands in for the content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoMedia {
    /// `poster` attribute.
    pub poster: Option<String>,
    /// Natural video size.
    pub natural: Option<Size>,
}

impl MediaCapability for VideoMedia {
    fn best_source_url(&self) -> Option<String> {
        self.poster.clone().filter(|p| is_usable_url(p))
    }

    fn intrinsic_size(&self) -> Option<Size> {
        self.natural
    }
}

/// Inline `<svg>` markup or an SVG file referenced by `<img>`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorMedia {
    /// Serialized markup with external sprites inlined.
    pub markup: Option<String>,
    /// External SVG URL.
    pub url: Option<String>,
}

impl MediaCapability for VectorMedia {
    fn best_source_url(&self) -> Option<String> {
        self.url.clone()
    }

    #[allow(clippy::cast_precision_loss)]
    fn intrinsic_size(&self) -> Option<Size> {
        let dims = domframe_assets::probe::svg_dimensions(self.markup.as_deref()?)?;
        Some(Size::new(dims.width as f32, dims.height as f32))
    }
}

/// Known video platforms whose thumbnails follow a URL convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedPlatform {
    /// YouTube.
    YouTube,
    /// Vimeo.
    Vimeo,
}

/// `<iframe>`, `<object>` or `<embed>`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbedMedia {
    /// Embedded document URL.
    pub src: Option<String>,
    /// Detected platform and video id.
    pub video: Option<(EmbedPlatform, String)>,
}

impl EmbedMedia {
    /// Probe an embed from its source URL.
    #[must_use]
    pub fn from_src(src: Option<String>) -> Self {
        let video = src.as_deref().and_then(detect_video_platform);
        Self { src, video }
    }
}

impl MediaCapability for EmbedMedia {
    fn best_source_url(&self) -> Option<String> {
        let (platform, id) = self.video.as_ref()?;
        Some(match platform {
            EmbedPlatform::YouTube => format!("https://img.youtube.com/vi/{id}/hqdefault.jpg"),
            EmbedPlatform::Vimeo => format!("https://vumbnail.com/{id}.jpg"),
        })
    }

    fn intrinsic_size(&self) -> Option<Size> {
        None
    }
}

/// Embedded content, selected by the element's classified kind.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaSource {
    /// Raster image.
    Image(ImageMedia),
    /// Video poster.
    Video(VideoMedia),
    /// Vector graphic.
    Vector(VectorMedia),
    /// Embedded document.
    Embed(EmbedMedia),
}

impl MediaSource {
    /// Probe an element already classified as `tag`.
    ///
    /// An `<img>` whose best source is an SVG file becomes a vector.
    #[must_use]
    pub fn probe(
        accessor: &dyn RenderTreeAccessor,
        element: ElementId,
        tag: SpecialTag,
        rendered_width: f32,
    ) -> Option<Self> {
        match tag {
            SpecialTag::Image => {
                let image = ImageMedia::probe(accessor, element, rendered_width);
                match image.best_source_url() {
                    Some(url) if is_svg_url(&url) => Some(Self::Vector(VectorMedia {
                        markup: None,
                        url: Some(url),
                    })),
                    _ => Some(Self::Image(image)),
                }
            }
            SpecialTag::Video => Some(Self::Video(VideoMedia {
                poster: accessor.attribute(element, "poster"),
                natural: accessor.intrinsic_size(element),
            })),
            SpecialTag::Svg => Some(Self::Vector(VectorMedia {
                markup: accessor
                    .outer_markup(element)
                    .map(|markup| inline_sprites(&markup, |href| accessor.sprite_markup(href))),
                url: None,
            })),
            SpecialTag::Embed => {
                let src = accessor
                    .attribute(element, "src")
                    .or_else(|| accessor.attribute(element, "data"));
                Some(Self::Embed(EmbedMedia::from_src(src)))
            }
            SpecialTag::Canvas | SpecialTag::FormControl | SpecialTag::Audio => None,
        }
    }

    fn capability(&self) -> &dyn MediaCapability {
        match self {
            Self::Image(m) => m,
            Self::Video(m) => m,
            Self::Vector(m) => m,
            Self::Embed(m) => m,
        }
    }
}

impl MediaCapability for MediaSource {
    fn best_source_url(&self) -> Option<String> {
        self.capability().best_source_url()
    }

    fn intrinsic_size(&self) -> Option<Size> {
        self.capability().intrinsic_size()
    }
}

/// Parse a `srcset` attribute.
///
/// `w` descriptors score by their width; `x` descriptors score as a
/// multiple of `base_width`; a bare URL counts as `1x`.
#[must_use]
pub fn parse_srcset(srcset: &str, base_width: f32) -> Vec<SrcCandidate> {
    let mut candidates = Vec::new();
    let mut rest = srcset;
    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        if rest.is_empty() {
            break;
        }
        let url_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let raw_url = &rest[..url_end];
        rest = &rest[url_end..];

        // A URL ending in a comma carries no descriptor.
        let (url, descriptor) = if let Some(url) = raw_url.strip_suffix(',') {
            (url.trim_end_matches(','), "")
        } else {
            let descriptor_end = rest.find(',').unwrap_or(rest.len());
            let descriptor = rest[..descriptor_end].trim();
            rest = &rest[descriptor_end..];
            (raw_url, descriptor)
        };
        if url.is_empty() {
            continue;
        }
        let score = descriptor_score(descriptor, base_width);
        candidates.push(SrcCandidate {
            url: url.to_string(),
            score,
        });
    }
    candidates
}

fn descriptor_score(descriptor: &str, base_width: f32) -> f32 {
    descriptor
        .split_whitespace()
        .find_map(|token| {
            if let Some(w) = token.strip_suffix('w') {
                w.parse::<f32>().ok()
            } else if let Some(x) = token.strip_suffix('x') {
                x.parse::<f32>().ok().map(|x| x * base_width)
            } else {
                None
            }
        })
        .unwrap_or(base_width)
}

/// Highest-scoring candidate; placeholders only win when nothing else exists.
fn pick_best(candidates: &[SrcCandidate]) -> Option<String> {
    let real: Vec<&SrcCandidate> = candidates.iter().filter(|c| !is_placeholder(&c.url)).collect();
    let pool: Vec<&SrcCandidate> = if real.is_empty() {
        candidates.iter().collect()
    } else {
        real
    };
    // Earliest wins ties.
    pool.into_iter()
        .fold(None::<&SrcCandidate>, |best, c| match best {
            Some(b) if b.score >= c.score => Some(b),
            _ => Some(c),
        })
        .map(|c| c.url.clone())
}

fn is_placeholder(url: &str) -> bool {
    url.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("data:")) && url.len() < PLACEHOLDER_DATA_URI_LEN
}

fn is_usable_url(url: &str) -> bool {
    let url = url.trim();
    !url.is_empty() && url != "about:blank" && !url.starts_with("javascript:")
}

fn is_svg_url(url: &str) -> bool {
    if url.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("data:")) {
        return url[5..].to_ascii_lowercase().starts_with("image/svg+xml");
    }
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.to_ascii_lowercase().ends_with(".svg")
}

/// Detect YouTube and Vimeo embed URLs and extract the video id.
#[must_use]
pub fn detect_video_platform(src: &str) -> Option<(EmbedPlatform, String)> {
    let src = if src.starts_with("//") {
        format!("https:{src}")
    } else {
        src.to_string()
    };
    let url = Url::parse(&src).ok()?;
    let host = url.host_str()?.trim_start_matches("www.").trim_start_matches("m.");
    let segments: Vec<&str> = url.path_segments().map(Iterator::collect).unwrap_or_default();

    let id = match host {
        "youtube.com" | "youtube-nocookie.com" => {
            let id = match segments.as_slice() {
                ["embed" | "shorts" | "v", id, ..] => Some((*id).to_string()),
                ["watch", ..] => url.query_pairs().find(|(k, _)| k == "v").map(|(_, v)| v.into_owned()),
                _ => None,
            };
            id.map(|id| (EmbedPlatform::YouTube, id))
        }
        "youtu.be" => segments.first().map(|id| (EmbedPlatform::YouTube, (*id).to_string())),
        "player.vimeo.com" => match segments.as_slice() {
            ["video", id, ..] => Some((EmbedPlatform::Vimeo, (*id).to_string())),
            _ => None,
        },
        "vimeo.com" => segments
            .iter()
            .find(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
            .map(|id| (EmbedPlatform::Vimeo, (*id).to_string())),
        _ => None,
    }?;
    (!id.1.is_empty()).then_some(id)
}

/// Inline external sprite references in SVG markup.
///
/// Every `<use href="file.svg#id">` whose sprite markup `lookup` can supply
/// is rewritten to `#id`, and the sprite markup is added to a `<defs>`
/// block right after the opening `<svg>` tag.
pub fn inline_sprites(markup: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut output = String::with_capacity(markup.len());
    let mut defs: Vec<String> = Vec::new();
    let mut rest = markup;

    while let Some(found) = find_href(rest) {
        let (value_start, value_end) = found;
        let href = &rest[value_start..value_end];
        output.push_str(&rest[..value_start]);
        match href.split_once('#') {
            Some((file, id)) if !file.is_empty() && !id.is_empty() => match lookup(href) {
                Some(sprite) => {
                    if !defs.contains(&sprite) {
                        defs.push(sprite);
                    }
                    output.push('#');
                    output.push_str(id);
                }
                None => output.push_str(href),
            },
            _ => output.push_str(href),
        }
        rest = &rest[value_end..];
    }
    output.push_str(rest);

    if defs.is_empty() {
        return output;
    }
    let Some(open_end) = svg_open_tag_end(&output) else {
        return output;
    };
    let mut inlined = String::with_capacity(output.len() + defs.iter().map(String::len).sum::<usize>() + 16);
    inlined.push_str(&output[..open_end]);
    inlined.push_str("<defs>");
    for sprite in &defs {
        inlined.push_str(sprite);
    }
    inlined.push_str("</defs>");
    inlined.push_str(&output[open_end..]);
    inlined
}

/// Byte range of the next `href`/`xlink:href` attribute value.
fn find_href(markup: &str) -> Option<(usize, usize)> {
    let mut offset = 0;
    while let Some(pos) = markup[offset..].find("href=") {
        let attr = offset + pos;
        let preceded_ok = markup[..attr]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_whitespace() || c == ':');
        let quote_at = attr + "href=".len();
        let quote = markup[quote_at..].chars().next();
        if let (true, Some(q @ ('"' | '\''))) = (preceded_ok, quote) {
            let start = quote_at + 1;
            let end = start + markup[start..].find(q)?;
            return Some((start, end));
        }
        offset = quote_at;
    }
    None
}

fn svg_open_tag_end(markup: &str) -> Option<usize> {
    let start = markup.find("<svg")?;
    markup[start..].find('>').map(|end| start + end + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_srcset_width_descriptors() {
        let candidates = parse_srcset("/a-480.jpg 480w, /a-960.jpg 960w,/a-1440.jpg 1440w", 300.0);
        assert_eq!(candidates.len(), 3);
        assert_eq!(pick_best(&candidates).as_deref(), Some("/a-1440.jpg"));
    }

    #[test]
    fn test_srcset_density_descriptors() {
        let candidates = parse_srcset("/a.png, /a@2x.png 2x, /a@3x.png 3x", 100.0);
        assert_eq!(candidates[0].score, 100.0);
        assert_eq!(candidates[2].score, 300.0);
        assert_eq!(pick_best(&candidates).as_deref(), Some("/a@3x.png"));
    }

    #[test]
    fn test_srcset_data_uri_with_commas() {
        let candidates = parse_srcset("data:image/png;base64,AAAA 1x, /real.png 2x", 10.0);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].url, "data:image/png;base64,AAAA");
    }

    #[test]
    fn test_placeholder_loses_to_real_url() {
        let candidates = vec![
            SrcCandidate {
                url: "data:image/gif;base64,R0lGODlhAQABAAAAACw=".into(),
                score: 5000.0,
            },
            SrcCandidate {
                url: "/photo.jpg".into(),
                score: 100.0,
            },
        ];
        assert_eq!(pick_best(&candidates).as_deref(), Some("/photo.jpg"));
    }

    #[test]
    fn test_placeholder_used_when_alone() {
        let candidates = vec![SrcCandidate {
            url: "data:image/gif;base64,R0lGODlhAQABAAAAACw=".into(),
            score: 1.0,
        }];
        assert!(pick_best(&candidates).is_some());
    }

    #[test]
    fn test_youtube_detection() {
        for src in [
            "https://www.youtube.com/embed/dQw4w9WgXcQ?autoplay=1",
            "//www.youtube-nocookie.com/embed/dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=10",
        ] {
            assert_eq!(
                detect_video_platform(src),
                Some((EmbedPlatform::YouTube, "dQw4w9WgXcQ".to_string())),
                "{src}"
            );
        }
        let embed = EmbedMedia::from_src(Some("https://www.youtube.com/embed/abc".into()));
        assert_eq!(
            embed.best_source_url().as_deref(),
            Some("https://img.youtube.com/vi/abc/hqdefault.jpg")
        );
    }

    #[test]
    fn test_vimeo_detection() {
        let embed = EmbedMedia::from_src(Some("https://player.vimeo.com/video/76979871?h=8272103f6e".into()));
        assert_eq!(embed.best_source_url().as_deref(), Some("https://vumbnail.com/76979871.jpg"));
        assert_eq!(
            detect_video_platform("https://vimeo.com/channels/staffpicks/76979871"),
            Some((EmbedPlatform::Vimeo, "76979871".to_string()))
        );
    }

    #[test]
    fn test_unknown_embed_has_no_thumbnail() {
        let embed = EmbedMedia::from_src(Some("https://maps.example.com/embed?q=1".into()));
        assert!(embed.best_source_url().is_none());
    }

    #[test]
    fn test_svg_url_detection() {
        assert!(is_svg_url("/icons/logo.svg?v=2"));
        assert!(is_svg_url("data:image/svg+xml;utf8,<svg/>"));
        assert!(!is_svg_url("/photo.png"));
    }

    #[test]
    fn test_inline_sprites() {
        let markup = r##"<svg class="icon"><use xlink:href="/sprite.svg#close"></use></svg>"##;
        let inlined = inline_sprites(markup, |href| {
            (href == "/sprite.svg#close").then(|| r#"<symbol id="close"><path d="M0 0"/></symbol>"#.to_string())
        });
        assert_eq!(
            inlined,
            r##"<svg class="icon"><defs><symbol id="close"><path d="M0 0"/></symbol></defs><use xlink:href="#close"></use></svg>"##
        );
    }

    #[test]
    fn test_local_and_unknown_sprites_untouched() {
        let markup = r##"<svg><use href="#local"/><use href="/missing.svg#x"/></svg>"##;
        assert_eq!(inline_sprites(markup, |_| None), markup);
    }
}
