use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde_json::json;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// One variant per pipeline failure kind. Every kind propagates to the
/// HTTP boundary unrecovered; none of them is fatal to the process.
#[derive(Debug, Error)]
pub enum Error {
  #[error("no valid share URL found in the text")]
  NoUrlFound,

  #[error("upstream request failed: {0}")]
  RequestFailed(#[from] reqwest::Error),

  #[error("could not find redirect location")]
  NoRedirectLocation,

  #[error("could not extract video ID from URL: {0}")]
  VideoIdNotFound(String),

  #[error("could not find embedded page data in HTML")]
  EmbeddedDataNotFound,

  #[error("embedded page data is not valid JSON: {0}")]
  MalformedData(#[from] serde_json::Error),

  #[error("no usable video information in page data")]
  VideoInfoNotFound,
}

impl Error {
  /// Stable machine-readable identifier, exposed in the error envelope
  /// so callers can tell the failure kinds apart.
  pub fn code(&self) -> &'static str {
    match self {
      Error::NoUrlFound => "no_url_found",
      Error::RequestFailed(_) => "request_failed",
      Error::NoRedirectLocation => "no_redirect_location",
      Error::VideoIdNotFound(_) => "video_id_not_found",
      Error::EmbeddedDataNotFound => "embedded_data_not_found",
      Error::MalformedData(_) => "malformed_data",
      Error::VideoInfoNotFound => "video_info_not_found",
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let body = Json(json!({
      "status": "error",
      "code": self.code(),
      "error": self.to_string(),
    }));

    (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
  }
}
