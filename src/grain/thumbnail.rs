//! Thumbnail resolution: an ordered fallback cascade.
//!
//! Probes share one signature and short-circuit on the first hit:
//! 1. CDN URL conventions (HEAD existence check)
//! 2. `poster` attribute on the public embeddable player page
//! 3. `og:image` / `twitter:image` meta tag on the public share page
//! 4. External screenshot-generation call (only when a key is configured)
//! 5. Synthesized placeholder keyed by the first letter of the title
//!
//! Every step is independently time-bounded and failure-tolerant; total
//! failure yields `None`, which callers persist as a NULL thumbnail. It is
//! never a sync error.

use std::time::Duration;

use base64::Engine;
use sha2::{Digest, Sha256};

use crate::config::ThumbnailConfig;

/// Per-probe timeout. A slow CDN must not stall the whole recording.
const PROBE_TIMEOUT_SECS: u64 = 5;

/// Inputs available to every probe.
pub struct ProbeContext<'a> {
    pub recording_id: &'a str,
    pub title: &'a str,
    pub share_url: Option<&'a str>,
}

pub struct ThumbnailResolver {
    http: reqwest::Client,
    screenshot_api_key: Option<String>,
    remote_probes: bool,
}

impl ThumbnailResolver {
    pub fn new(config: &ThumbnailConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self {
            http,
            screenshot_api_key: config.screenshot_api_key.clone(),
            remote_probes: config.remote_probes,
        }
    }

    /// Resolver that skips network probes and only synthesizes placeholders.
    pub fn offline() -> Self {
        Self {
            http: reqwest::Client::new(),
            screenshot_api_key: None,
            remote_probes: false,
        }
    }

    /// Walk the cascade, returning the first URL any probe produces.
    pub async fn resolve(&self, ctx: &ProbeContext<'_>) -> Option<String> {
        if self.remote_probes {
            if let Some(url) = self.probe_cdn(ctx).await {
                log::debug!("thumbnail for {} via CDN probe", ctx.recording_id);
                return Some(url);
            }
            if let Some(url) = self.probe_player_poster(ctx).await {
                log::debug!("thumbnail for {} via player poster", ctx.recording_id);
                return Some(url);
            }
            if let Some(url) = self.probe_share_meta(ctx).await {
                log::debug!("thumbnail for {} via share page meta", ctx.recording_id);
                return Some(url);
            }
            if let Some(url) = self.probe_screenshot_service(ctx).await {
                log::debug!("thumbnail for {} via screenshot service", ctx.recording_id);
                return Some(url);
            }
        }
        placeholder_thumbnail(ctx.title)
    }

    /// Probe provider CDN URL conventions with HEAD requests.
    async fn probe_cdn(&self, ctx: &ProbeContext<'_>) -> Option<String> {
        for candidate in [
            format!(
                "https://media.grain.com/recordings/{}/thumbnail.jpeg",
                ctx.recording_id
            ),
            format!(
                "https://media.grain.com/recordings/{}/thumbnail.png",
                ctx.recording_id
            ),
        ] {
            match self.http.head(&candidate).send().await {
                Ok(resp) if resp.status().is_success() => return Some(candidate),
                _ => continue,
            }
        }
        None
    }

    /// Fetch the embeddable player page and pull its video `poster` attribute.
    async fn probe_player_poster(&self, ctx: &ProbeContext<'_>) -> Option<String> {
        let embed = embed_url_from_share(ctx.share_url?)?;
        let html = self.fetch_page(&embed).await?;
        extract_poster(&html)
    }

    /// Scrape an `og:image` / `twitter:image` tag from the public share page.
    async fn probe_share_meta(&self, ctx: &ProbeContext<'_>) -> Option<String> {
        let html = self.fetch_page(ctx.share_url?).await?;
        extract_meta_image(&html)
    }

    /// Ask an external screenshot service to render the share page.
    async fn probe_screenshot_service(&self, ctx: &ProbeContext<'_>) -> Option<String> {
        let key = self.screenshot_api_key.as_deref()?;
        let share = ctx.share_url?;

        #[derive(serde::Deserialize)]
        struct ScreenshotResponse {
            screenshot: Option<String>,
        }

        let resp = self
            .http
            .get("https://shot.screenshotapi.net/screenshot")
            .query(&[("token", key), ("url", share), ("output", "json")])
            .send()
            .await
            .ok()?;
        if !resp.status().is_success() {
            return None;
        }
        let body: ScreenshotResponse = resp.json().await.ok()?;
        body.screenshot
    }

    async fn fetch_page(&self, url: &str) -> Option<String> {
        let resp = self.http.get(url).send().await.ok()?;
        if !resp.status().is_success() {
            return None;
        }
        resp.text().await.ok()
    }
}

/// Derive the embeddable player URL from a public share URL.
/// `https://grain.com/share/recording/{id}/{token}` →
/// `https://grain.com/_/embed/recording/{id}/{token}`
pub fn embed_url_from_share(share_url: &str) -> Option<String> {
    let parsed = url::Url::parse(share_url).ok()?;
    let path = parsed.path();
    let rest = path.strip_prefix("/share/")?;
    Some(format!(
        "{}://{}/_/embed/{}",
        parsed.scheme(),
        parsed.host_str()?,
        rest
    ))
}

/// Pull the `poster="…"` attribute out of player page HTML.
fn extract_poster(html: &str) -> Option<String> {
    let re = regex::Regex::new(r#"poster="([^"]+)""#).ok()?;
    re.captures(html)
        .map(|c| c[1].to_string())
        .filter(|u| u.starts_with("http"))
}

/// Pull an Open Graph or Twitter image URL out of share page HTML.
/// Handles both attribute orders (`property` before or after `content`).
fn extract_meta_image(html: &str) -> Option<String> {
    let patterns = [
        r#"<meta[^>]+(?:property|name)="(?:og:image|twitter:image)"[^>]+content="([^"]+)""#,
        r#"<meta[^>]+content="([^"]+)"[^>]+(?:property|name)="(?:og:image|twitter:image)""#,
    ];
    for pattern in patterns {
        let re = regex::Regex::new(pattern).ok()?;
        if let Some(captures) = re.captures(html) {
            let url = captures[1].to_string();
            if url.starts_with("http") {
                return Some(url);
            }
        }
    }
    None
}

/// Synthesize an inline SVG placeholder keyed by the first letter of the
/// title. Pure; always succeeds when the title has a usable character.
fn placeholder_thumbnail(title: &str) -> Option<String> {
    let letter = title
        .chars()
        .find(|c| c.is_alphanumeric())?
        .to_uppercase()
        .next()?;

    // Stable color per letter
    let digest = Sha256::digest(letter.to_string().as_bytes());
    let color = format!("#{}", hex::encode(&digest[..3]));

    let svg = format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="640" height="360"><rect width="640" height="360" fill="{}"/><text x="320" y="180" font-family="sans-serif" font-size="160" fill="#ffffff" text-anchor="middle" dominant-baseline="central">{}</text></svg>"##,
        color, letter
    );
    let encoded = base64::engine::general_purpose::STANDARD.encode(svg);
    Some(format!("data:image/svg+xml;base64,{}", encoded))
}
