use std::time::Duration;

use axum::{
  body::{self, StreamBody},
  extract::{Query, State},
  http::{HeaderMap, StatusCode},
  response::{IntoResponse, Response},
  Json,
};
use reqwest::header::{
  HeaderValue, ACCEPT_RANGES, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_RANGE,
  CONTENT_TYPE, LOCATION, RANGE,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::{api::AppState, identity::IdentityProfile, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Manual redirect following that re-sends the full header set on
/// every hop. The transport's built-in following drops sensitive
/// headers cross-origin, which would strip the spoofed identity before
/// it reaches the media host.
#[derive(Clone, Copy, Debug)]
pub struct RedirectPolicy {
  pub max_hops: usize,
}

impl Default for RedirectPolicy {
  fn default() -> Self {
    Self { max_hops: 10 }
  }
}

impl RedirectPolicy {
  /// Issues the GET and chases Location headers until a non-redirect
  /// response arrives or the hop budget runs out, re-applying the same
  /// headers each time. Relative Location values resolve against the
  /// current URL.
  pub async fn follow(
    &self,
    client: &reqwest::Client,
    url: &str,
    headers: HeaderMap,
  ) -> Result<reqwest::Response> {
    let mut resp = client.get(url).headers(headers.clone()).send().await?;

    for _ in 0..self.max_hops {
      if !resp.status().is_redirection() {
        break;
      }
      let Some(next) = next_location(&resp) else {
        break;
      };
      debug!(%next, "following redirect");
      resp = client.get(next).headers(headers.clone()).send().await?;
    }

    Ok(resp)
  }
}

fn next_location(resp: &reqwest::Response) -> Option<reqwest::Url> {
  let location = resp.headers().get(LOCATION)?.to_str().ok()?;
  resp.url().join(location).ok()
}

/// Fetches media with the spoofed identity and hands the response back
/// for streaming. Only the connection attempt carries a deadline; a
/// whole-request timeout would cut off long-running streams.
pub struct ProxyStreamer {
  client: reqwest::Client,
  identity: IdentityProfile,
  policy: RedirectPolicy,
}

impl ProxyStreamer {
  pub fn new(identity: IdentityProfile) -> Result<Self> {
    let client = reqwest::Client::builder()
      .redirect(reqwest::redirect::Policy::none())
      .connect_timeout(CONNECT_TIMEOUT)
      .build()?;

    Ok(Self {
      client,
      identity,
      policy: RedirectPolicy::default(),
    })
  }

  pub async fn stream(
    &self,
    url: &str,
    range: Option<&HeaderValue>,
  ) -> Result<reqwest::Response> {
    let headers = self.identity.streaming(range);
    self.policy.follow(&self.client, url, headers).await
  }
}

#[derive(Deserialize)]
pub struct ProxyParams {
  url: Option<String>,
}

pub async fn proxy_video(
  State(state): State<AppState>,
  Query(params): Query<ProxyParams>,
  req_headers: HeaderMap,
) -> Response {
  let Some(url) = params.url else {
    let body = Json(json!({ "error": "missing url parameter" }));
    return (StatusCode::BAD_REQUEST, body).into_response();
  };

  match state.streamer.stream(&url, req_headers.get(RANGE)).await {
    Ok(upstream) => forward(upstream),
    Err(err) => {
      warn!(%url, error = %err, "proxy upstream fetch failed");
      err.into_response()
    }
  }
}

/// Forwards the upstream status and the streaming-relevant headers,
/// then hands the body through chunk by chunk without buffering it.
fn forward(upstream: reqwest::Response) -> Response {
  let mut builder = Response::builder().status(upstream.status());

  for name in [CONTENT_TYPE, CONTENT_LENGTH, ACCEPT_RANGES, CONTENT_RANGE] {
    if let Some(value) = upstream.headers().get(&name) {
      builder = builder.header(name, value.clone());
    }
  }
  builder = builder.header(CACHE_CONTROL, "public, max-age=3600");

  match builder.body(body::boxed(StreamBody::new(upstream.bytes_stream()))) {
    Ok(resp) => resp,
    Err(err) => {
      warn!(error = %err, "failed to assemble proxy response");
      StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
  }
}

#[cfg(test)]
mod test {
  use wiremock::matchers::{header, header_regex, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  use super::*;
  use crate::identity::{DOUYIN_ORIGIN, DOUYIN_REFERER, MOBILE_USER_AGENT};

  // wiremock's `header` exact matcher splits received values on commas,
  // so it can never match a user-agent containing "(KHTML, like Gecko)";
  // an anchored escaped regex performs the same exact comparison.
  fn exact_user_agent() -> impl wiremock::Match {
    header_regex("user-agent", &format!("^{}$", regex::escape(MOBILE_USER_AGENT)))
  }

  fn streamer() -> ProxyStreamer {
    ProxyStreamer::new(IdentityProfile::mobile()).unwrap()
  }

  #[tokio::test]
  async fn spoofed_headers_survive_every_redirect_hop() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
      .and(path("/first"))
      .respond_with(
        ResponseTemplate::new(302).insert_header("Location", "/second"),
      )
      .expect(1)
      .mount(&server)
      .await;

    Mock::given(method("GET"))
      .and(path("/second"))
      .and(exact_user_agent())
      .and(header("referer", DOUYIN_REFERER))
      .and(header("origin", DOUYIN_ORIGIN))
      .and(header("range", "bytes=0-1"))
      .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
      .expect(1)
      .mount(&server)
      .await;

    let range = HeaderValue::from_static("bytes=0-1");
    let resp = streamer()
      .stream(&format!("{}/first", server.uri()), Some(&range))
      .await
      .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ok");
  }

  #[tokio::test]
  async fn range_requests_pass_through_with_partial_content() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
      .and(path("/video.mp4"))
      .and(header("range", "bytes=0-1023"))
      .respond_with(
        ResponseTemplate::new(206)
          .insert_header("Content-Range", "bytes 0-1023/4096")
          .insert_header("Accept-Ranges", "bytes")
          .set_body_bytes(vec![0u8; 1024]),
      )
      .expect(1)
      .mount(&server)
      .await;

    let range = HeaderValue::from_static("bytes=0-1023");
    let resp = streamer()
      .stream(&format!("{}/video.mp4", server.uri()), Some(&range))
      .await
      .unwrap();

    assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(resp.headers()[CONTENT_RANGE], "bytes 0-1023/4096");
    assert_eq!(resp.bytes().await.unwrap().len(), 1024);
  }

  #[tokio::test]
  async fn hop_budget_caps_redirect_chains() {
    let server = MockServer::start().await;

    // every hop redirects back to itself
    Mock::given(method("GET"))
      .and(path("/loop"))
      .respond_with(
        ResponseTemplate::new(302).insert_header("Location", "/loop"),
      )
      .mount(&server)
      .await;

    let policy = RedirectPolicy { max_hops: 3 };
    let client = reqwest::Client::builder()
      .redirect(reqwest::redirect::Policy::none())
      .build()
      .unwrap();

    let resp = policy
      .follow(&client, &format!("{}/loop", server.uri()), HeaderMap::new())
      .await
      .unwrap();

    // budget exhausted, the last redirect response is surfaced as-is
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(server.received_requests().await.unwrap().len(), 4);
  }
}

