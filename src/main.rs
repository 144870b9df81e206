use tracing::info;
use tracing_subscriber::EnvFilter;

mod api;
mod error;
mod identity;
mod page_data;
mod proxy;
mod resolver;
mod video;

pub use error::{Error, Result};

pub const LISTEN_ADDR: &str = "0.0.0.0:8080";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("douyin_downloader=info")),
    )
    .init();

  let state = api::AppState::new()?;
  let app = api::router(state);

  info!("listening on {LISTEN_ADDR}");

  axum::Server::bind(&LISTEN_ADDR.parse().unwrap())
    .serve(app.into_make_service())
    .await
    .expect("Failed to start server");

  Ok(())
}
