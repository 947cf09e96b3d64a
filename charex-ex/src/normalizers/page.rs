//! SakuraFM page normalizer
//!
//! Fetches a public character page and scrapes the profile block. The avatar
//! is optional: if it cannot be fetched or decoded the card is still produced,
//! just without an image.

use async_trait::async_trait;
use charex_common::{Card, CardData};
use once_cell::sync::Lazy;
use reqwest::{Client, Url};
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{ExtractionError, Result};
use crate::transcoder::normalize_to_png;
use crate::types::{Extraction, SourceNormalizer};

pub const LABEL: &str = "SakuraFM";
pub const JOB_TYPE: &str = "extract_sakura";
pub const SHORT_NAME: &str = "sakura";

/// Host fragment every accepted URL must contain
const SITE_MARKER: &str = "sakura.fm";

/// Creator recorded when the page names none
pub const DEFAULT_CREATOR: &str = "Anonymous";

static PROFILE_BLOCK: Lazy<Selector> = Lazy::new(|| selector("div.flex.flex-col.space-y-6.pt-6"));
static NAME_TEXT: Lazy<Selector> = Lazy::new(|| selector(".text-muted-foreground.line-clamp-2"));
static SHORT_TEXT: Lazy<Selector> = Lazy::new(|| selector(".text-muted-foreground.line-clamp-3"));
static LONG_TEXT: Lazy<Selector> = Lazy::new(|| selector(".text-muted-foreground.line-clamp-5"));
static ASSISTANT_BUBBLE: Lazy<Selector> = Lazy::new(|| selector(".bg-message-assistant"));
static BOLD_LABEL: Lazy<Selector> = Lazy::new(|| selector("div.font-bold"));
static CREATOR_NAME: Lazy<Selector> = Lazy::new(|| selector("span.flex-1.truncate.tracking-tight"));
static LINKED_CREATOR_NAME: Lazy<Selector> =
    Lazy::new(|| selector("a span.flex-1.truncate.tracking-tight"));
static AVATAR_IMAGE: Lazy<Selector> = Lazy::new(|| {
    selector(r#"img.mx-auto.rounded-md.object-cover[class~="h-[200px]"][class~="w-[200px]"]"#)
});

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

/// Fields scraped from a character page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPage {
    pub name: String,
    pub short_description: String,
    pub long_description: String,
    pub first_mes: String,
    pub creator: String,
    /// Avatar `src` exactly as written in the page
    pub avatar_src: Option<String>,
}

impl ParsedPage {
    /// Map scraped fields onto the card
    ///
    /// The short blurb becomes `creator_notes` and the long text becomes
    /// `description`; `scenario` stays empty.
    pub fn into_card(self) -> Card {
        let mut data = CardData {
            name: self.name,
            description: self.long_description,
            first_mes: self.first_mes,
            creator_notes: self.short_description,
            creator: self.creator,
            character_version: "1.0".to_string(),
            ..Default::default()
        };
        data.add_tag(LABEL);
        Card::new(data)
    }
}

/// Scrape a character page
pub fn parse_page(html: &str) -> ParsedPage {
    let doc = Html::parse_document(html);

    let first_mes = doc
        .select(&ASSISTANT_BUBBLE)
        .next()
        .map(element_text)
        .unwrap_or_default();

    let avatar_src = doc
        .select(&AVATAR_IMAGE)
        .find_map(|img| img.value().attr("src"))
        .map(str::to_string);

    ParsedPage {
        name: profile_text(&doc, &NAME_TEXT),
        short_description: profile_text(&doc, &SHORT_TEXT),
        long_description: profile_text(&doc, &LONG_TEXT),
        first_mes,
        creator: find_creator(&doc).unwrap_or_else(|| DEFAULT_CREATOR.to_string()),
        avatar_src,
    }
}

/// First match of `sel` inside the profile block
fn profile_text(doc: &Html, sel: &Selector) -> String {
    doc.select(&PROFILE_BLOCK)
        .find_map(|block| block.select(sel).next())
        .map(element_text)
        .unwrap_or_default()
}

/// A "Creator" label followed by the name block, or a linked name
fn find_creator(doc: &Html) -> Option<String> {
    let labelled = doc
        .select(&BOLD_LABEL)
        .filter(|label| element_text(*label) == "Creator")
        .filter_map(|label| label.next_siblings().find_map(ElementRef::wrap))
        .filter_map(|block| block.select(&CREATOR_NAME).next())
        .map(element_text)
        .find(|name| !name.is_empty());

    labelled.or_else(|| {
        doc.select(&LINKED_CREATOR_NAME)
            .map(element_text)
            .find(|name| !name.is_empty())
    })
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Resolve an avatar `src` against the page it appeared on
pub fn resolve_avatar_url(page: &Url, src: &str) -> Option<Url> {
    page.join(src.trim()).ok()
}

/// Normalizer for SakuraFM character pages
#[derive(Debug, Clone)]
pub struct PageNormalizer {
    client: Client,
}

impl PageNormalizer {
    /// Create a normalizer whose requests time out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("charex/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Validate the locator before any network access
    pub fn parse_locator(input: &[u8]) -> Result<Url> {
        let text = std::str::from_utf8(input)
            .map_err(|_| ExtractionError::Input("URL is not valid UTF-8".to_string()))?
            .trim();
        if !text.contains(SITE_MARKER) {
            return Err(ExtractionError::Input(format!(
                "invalid url: not a {} url",
                SITE_MARKER
            )));
        }
        Url::parse(text).map_err(|e| ExtractionError::Input(format!("invalid url: {}", e)))
    }

    async fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExtractionError::Transport(format!(
                "failed to fetch {}: status code {}",
                url,
                status.as_u16()
            )));
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn fetch_avatar(&self, url: &Url) -> Result<Vec<u8>> {
        let bytes = self.fetch(url).await?;
        tokio::task::spawn_blocking(move || normalize_to_png(bytes))
            .await
            .map_err(|e| ExtractionError::Decode(format!("avatar decode task failed: {}", e)))?
            .map_err(|e| ExtractionError::Decode(e.to_string()))
    }
}

#[async_trait]
impl SourceNormalizer for PageNormalizer {
    fn label(&self) -> &'static str {
        LABEL
    }

    fn job_type(&self) -> &'static str {
        JOB_TYPE
    }

    fn short_name(&self) -> &'static str {
        SHORT_NAME
    }

    async fn extract(&self, input: &[u8]) -> Result<Extraction> {
        let url = Self::parse_locator(input)?;
        info!(url = %url, "Fetching SakuraFM page");

        let raw = self.fetch(&url).await?;
        let page = parse_page(&String::from_utf8_lossy(&raw));
        debug!(
            name = %page.name,
            creator = %page.creator,
            has_avatar = page.avatar_src.is_some(),
            "Parsed SakuraFM page"
        );

        let avatar = match page.avatar_src.as_deref() {
            Some(src) => match resolve_avatar_url(&url, src) {
                Some(avatar_url) => match self.fetch_avatar(&avatar_url).await {
                    Ok(bytes) => Some(bytes),
                    Err(e) => {
                        warn!(url = %avatar_url, error = %e, "Failed to download character image");
                        None
                    }
                },
                None => {
                    warn!(src = %src, "Unresolvable character image URL");
                    None
                }
            },
            None => None,
        };

        Ok(Extraction {
            card: page.into_card(),
            raw,
            avatar,
        })
    }
}
