use std::{sync::Arc, time::Duration};

use axum::{
  extract::{rejection::JsonRejection, State},
  http::{header, Method, StatusCode},
  response::{IntoResponse, Response},
  routing::{get, post},
  Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::{
  identity::IdentityProfile,
  proxy::{self, ProxyStreamer},
  resolver::Resolver,
  Result,
};

#[derive(Clone)]
pub struct AppState {
  pub resolver: Arc<Resolver>,
  pub streamer: Arc<ProxyStreamer>,
}

impl AppState {
  pub fn new() -> Result<Self> {
    let identity = IdentityProfile::mobile();

    Ok(Self {
      resolver: Arc::new(Resolver::new(identity.clone())?),
      streamer: Arc::new(ProxyStreamer::new(identity)?),
    })
  }
}

pub fn router(state: AppState) -> Router {
  Router::new()
    .route("/health", get(health))
    .route(
      "/api/v1/douyin",
      post(resolve_share_link).layer(api_cors()),
    )
    .route(
      "/api/v1/douyin/proxy",
      get(proxy::proxy_video).layer(proxy_cors()),
    )
    .with_state(state)
}

fn api_cors() -> CorsLayer {
  CorsLayer::new()
    .allow_origin(Any)
    .allow_methods([Method::POST, Method::OPTIONS])
    .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN])
    .max_age(Duration::from_secs(86400))
}

// the proxy surface only ever serves byte ranges
fn proxy_cors() -> CorsLayer {
  CorsLayer::new()
    .allow_origin(Any)
    .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
    .allow_headers([header::RANGE])
    .expose_headers([
      header::CONTENT_TYPE,
      header::CONTENT_LENGTH,
      header::CONTENT_RANGE,
      header::ACCEPT_RANGES,
    ])
    .max_age(Duration::from_secs(86400))
}

#[derive(Deserialize)]
pub struct ShareLinkRequest {
  pub share_link: String,
}

pub async fn resolve_share_link(
  State(state): State<AppState>,
  body: Result<Json<ShareLinkRequest>, JsonRejection>,
) -> Response {
  let Ok(Json(req)) = body else {
    let body = Json(json!({ "error": "invalid request body" }));
    return (StatusCode::BAD_REQUEST, body).into_response();
  };

  match state.resolver.resolve(&req.share_link).await {
    Ok(video) => {
      info!(video_id = %video.video_id, "resolved share link");
      Json(json!({
        "status": "success",
        "video_id": video.video_id,
        "title": video.title,
        "download_url": video.url,
      }))
      .into_response()
    }
    Err(err) => {
      warn!(code = err.code(), error = %err, "share link resolution failed");
      err.into_response()
    }
  }
}

async fn health() -> impl IntoResponse {
  "ok".to_owned()
}
