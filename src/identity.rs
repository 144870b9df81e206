use reqwest::header::{
  HeaderMap, HeaderValue, ACCEPT, ORIGIN, RANGE, REFERER, USER_AGENT,
};

// Douyin serves different page variants per device class; the mobile
// variant carries the embedded page data we scrape.
pub const MOBILE_USER_AGENT: &str =
  "Mozilla/5.0 (iPhone; CPU iPhone OS 17_2 like Mac OS X) \
   AppleWebKit/605.1.15 (KHTML, like Gecko) EdgiOS/121.0.2277.107 \
   Version/17.0 Mobile/15E148 Safari/604.1";

pub const DOUYIN_REFERER: &str = "https://www.douyin.com/";
pub const DOUYIN_ORIGIN: &str = "https://www.douyin.com";

/// Outbound request headers simulating a mobile browser. Immutable
/// after construction and injected into every component that talks to
/// the platform, so tests can substitute their own.
#[derive(Clone, Debug)]
pub struct IdentityProfile {
  user_agent: HeaderValue,
}

impl IdentityProfile {
  pub fn new(user_agent: HeaderValue) -> Self {
    Self { user_agent }
  }

  pub fn mobile() -> Self {
    Self::new(HeaderValue::from_static(MOBILE_USER_AGENT))
  }

  /// Headers for the resolution fetches (short link and share page).
  pub fn browsing(&self) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, self.user_agent.clone());
    headers
  }

  /// Headers for the proxy fetch: the browsing set plus a spoofed
  /// `Referer`/`Origin` pair matching the platform's own site, and the
  /// caller's `Range` header forwarded verbatim when present.
  pub fn streaming(&self, range: Option<&HeaderValue>) -> HeaderMap {
    let mut headers = self.browsing();
    headers.insert(REFERER, HeaderValue::from_static(DOUYIN_REFERER));
    headers.insert(ORIGIN, HeaderValue::from_static(DOUYIN_ORIGIN));
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    if let Some(range) = range {
      headers.insert(RANGE, range.clone());
    }
    headers
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn browsing_headers_carry_only_the_user_agent() {
    let headers = IdentityProfile::mobile().browsing();

    assert_eq!(headers.len(), 1);
    assert_eq!(headers[USER_AGENT], MOBILE_USER_AGENT);
  }

  #[test]
  fn streaming_headers_spoof_the_platform_site() {
    let range = HeaderValue::from_static("bytes=0-1023");
    let headers = IdentityProfile::mobile().streaming(Some(&range));

    assert_eq!(headers[REFERER], DOUYIN_REFERER);
    assert_eq!(headers[ORIGIN], DOUYIN_ORIGIN);
    assert_eq!(headers[ACCEPT], "*/*");
    assert_eq!(headers[RANGE], "bytes=0-1023");
  }

  #[test]
  fn range_is_omitted_when_the_caller_sent_none() {
    let headers = IdentityProfile::mobile().streaming(None);

    assert!(headers.get(RANGE).is_none());
  }
}
