use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::LOCATION;
use tracing::debug;

use crate::{
  identity::IdentityProfile,
  page_data,
  video::{self, ResolvedVideo},
  Error, Result,
};

pub const SHARE_PAGE_BASE: &str = "https://www.iesdouyin.com/share/video";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// Generic URL shape: scheme plus the characters share links are known
// to use, including percent-encoded octets.
static SHARE_URL_REGEX: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r"http[s]?://(?:[a-zA-Z]|[0-9]|[$-_@.&+]|[!*(),]|(?:%[0-9a-fA-F][0-9a-fA-F]))+",
  )
  .unwrap()
});

static VIDEO_PATH_REGEX: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"/video/(\d+)").unwrap());

/// Runs the share-link resolution pipeline: extract the short URL from
/// the share text, capture its first redirect hop, derive the video ID,
/// fetch the share page, and dig the playback URL and title out of the
/// embedded page data. Each stage depends on the previous one, so the
/// fetches are strictly sequential and the first failure aborts the
/// whole resolution.
pub struct Resolver {
  page_client: reqwest::Client,
  redirect_client: reqwest::Client,
  identity: IdentityProfile,
  share_page_base: String,
}

impl Resolver {
  pub fn new(identity: IdentityProfile) -> Result<Self> {
    let page_client = reqwest::Client::builder()
      .connect_timeout(CONNECT_TIMEOUT)
      .timeout(REQUEST_TIMEOUT)
      .build()?;

    // redirects disabled so the Location header of the first hop stays
    // observable; following further would hit endpoints with different
    // cookie and anti-bot behavior than the share page
    let redirect_client = reqwest::Client::builder()
      .redirect(reqwest::redirect::Policy::none())
      .connect_timeout(CONNECT_TIMEOUT)
      .timeout(REQUEST_TIMEOUT)
      .build()?;

    Ok(Self {
      page_client,
      redirect_client,
      identity,
      share_page_base: SHARE_PAGE_BASE.to_owned(),
    })
  }

  /// Points the page fetcher at a different host, e.g. a mock server.
  pub fn with_share_page_base(mut self, base: impl Into<String>) -> Self {
    self.share_page_base = base.into();
    self
  }

  pub async fn resolve(&self, share_text: &str) -> Result<ResolvedVideo> {
    let short_url = extract_share_url(share_text)?;
    debug!(short_url, "resolving share link");

    let redirect_url = self.first_redirect(short_url).await?;
    let video_id = extract_video_id(&redirect_url)?;
    debug!(%video_id, "extracted video id");

    let html = self.fetch_share_page(&video_id).await?;
    let payload =
      page_data::strip_envelope(page_data::extract_router_data(&html)?);
    let item = page_data::first_playable_item(payload)?;

    let play_url = item
      .video
      .play_addr
      .url_list
      .into_iter()
      .next()
      .ok_or(Error::VideoInfoNotFound)?;

    let title = if item.desc.is_empty() {
      video::fallback_title(&video_id)
    } else {
      item.desc
    };

    Ok(ResolvedVideo {
      url: video::strip_watermark(&play_url),
      title: video::sanitize_title(&title),
      video_id,
    })
  }

  /// Single non-following GET against the short link; the canonical
  /// page URL lives in the Location header of the first hop.
  async fn first_redirect(&self, short_url: &str) -> Result<String> {
    let resp = self
      .redirect_client
      .get(short_url)
      .headers(self.identity.browsing())
      .send()
      .await?;

    resp
      .headers()
      .get(LOCATION)
      .and_then(|location| location.to_str().ok())
      .map(str::to_owned)
      .ok_or(Error::NoRedirectLocation)
  }

  async fn fetch_share_page(&self, video_id: &str) -> Result<String> {
    let page_url = format!("{}/{}", self.share_page_base, video_id);
    let resp = self
      .page_client
      .get(&page_url)
      .headers(self.identity.browsing())
      .send()
      .await?;

    Ok(resp.text().await?)
  }
}

/// First URL-shaped substring of the share text. Share texts place the
/// canonical link first, so later URLs are ignored.
pub fn extract_share_url(share_text: &str) -> Result<&str> {
  SHARE_URL_REGEX
    .find(share_text)
    .map(|m| m.as_str())
    .ok_or(Error::NoUrlFound)
}

/// Last path segment of the redirect URL with the query string
/// stripped. The platform has used at least two URL shapes, so an
/// empty segment falls back to matching `/video/<digits>` anywhere in
/// the URL.
pub fn extract_video_id(url: &str) -> Result<String> {
  let path = url.split('?').next().unwrap_or(url);
  let last_segment = path.rsplit('/').next().unwrap_or("");

  if !last_segment.is_empty() {
    return Ok(last_segment.to_owned());
  }

  VIDEO_PATH_REGEX
    .captures(url)
    .and_then(|caps| caps.get(1))
    .map(|m| m.as_str().to_owned())
    .ok_or_else(|| Error::VideoIdNotFound(url.to_owned()))
}
