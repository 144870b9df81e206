use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::{Error, Result};

// The share page serializes its render state into a script tag as
// `window._ROUTER_DATA = {...}</script>`. The payload is a single line
// of JSON, so a non-greedy capture up to the closing tag isolates it.
static ROUTER_DATA_REGEX: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"window\._ROUTER_DATA\s*=\s*(.*?)</script>").unwrap());

const ENVELOPE_PREFIX: &str = "{\"app\":";

/// Parsed embedded page data. The loader keys are opaque route names
/// with no documented shape; only the fragments carrying a populated
/// `videoInfoRes` matter here, so everything else deserializes to
/// defaults rather than failing.
#[derive(Debug, Deserialize)]
pub struct RouterData {
  #[serde(rename = "loaderData", default)]
  pub loader_data: HashMap<String, PageData>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageData {
  #[serde(rename = "videoInfoRes", default)]
  pub video_info: VideoInfoRes,
}

#[derive(Debug, Default, Deserialize)]
pub struct VideoInfoRes {
  #[serde(rename = "item_list", default)]
  pub item_list: Vec<VideoItem>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VideoItem {
  #[serde(default)]
  pub desc: String,
  #[serde(default)]
  pub video: VideoMedia,
}

#[derive(Debug, Default, Deserialize)]
pub struct VideoMedia {
  #[serde(default)]
  pub play_addr: PlayAddr,
}

#[derive(Debug, Default, Deserialize)]
pub struct PlayAddr {
  // ordered candidates, first preferred
  #[serde(default)]
  pub url_list: Vec<String>,
}

/// Locates the embedded JSON payload in the share page HTML. No parse
/// is attempted when the marker is absent (site redesign, A/B variant,
/// or a bot-detection substitute page).
pub fn extract_router_data(html: &str) -> Result<&str> {
  ROUTER_DATA_REGEX
    .captures(html)
    .and_then(|caps| caps.get(1))
    .map(|m| m.as_str())
    .ok_or(Error::EmbeddedDataNotFound)
}

/// Drops any envelope text preceding the real page-data object.
///
/// Some page variants wrap the router data inside an outer assignment
/// whose leading text the naive capture picks up. The true object is
/// assumed to (a) start at the first occurrence of `{"app":` and (b)
/// extend to the end of the capture. This is a targeted heuristic over
/// semi-structured text, not general JSON balancing; inputs without
/// the prefix pass through unchanged.
pub fn strip_envelope(captured: &str) -> &str {
  match captured.find(ENVELOPE_PREFIX) {
    Some(idx) => &captured[idx..],
    None => captured,
  }
}

/// Parses the payload and searches the loader fragments for the first
/// item with a populated item list. Map iteration order is
/// unspecified, so when several fragments qualify any of them may win;
/// the contract is only that *a* playable item is returned.
pub fn first_playable_item(payload: &str) -> Result<VideoItem> {
  let data: RouterData = serde_json::from_str(payload)?;

  let item = data
    .loader_data
    .into_values()
    .find_map(|page| page.video_info.item_list.into_iter().next())
    .ok_or(Error::VideoInfoNotFound)?;

  if item.video.play_addr.url_list.is_empty() {
    return Err(Error::VideoInfoNotFound);
  }

  Ok(item)
}
