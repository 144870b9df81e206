use once_cell::sync::Lazy;
use regex::Regex;

/// Fully resolved share link. All three fields are non-empty on
/// success; the pipeline never returns a partial record.
#[derive(Clone, Debug)]
pub struct ResolvedVideo {
  pub video_id: String,
  pub title: String,
  pub url: String,
}

// `playwm` is the platform's path token for the watermarked encoding,
// `play` for the clean one.
pub fn strip_watermark(url: &str) -> String {
  url.replacen("playwm", "play", 1)
}

static ILLEGAL_PATH_CHARS: Lazy<Regex> =
  Lazy::new(|| Regex::new(r#"[/\\:*?"<>|]"#).unwrap());

/// Makes a display title safe for use as a filename by replacing each
/// character illegal in filesystem paths with an underscore.
pub fn sanitize_title(title: &str) -> String {
  ILLEGAL_PATH_CHARS.replace_all(title, "_").into_owned()
}

pub fn fallback_title(video_id: &str) -> String {
  format!("douyin_{video_id}")
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn strip_watermark_replaces_exactly_one_occurrence() {
    assert_eq!(
      strip_watermark("https://v.example.com/playwm/xyz?playwm=1"),
      "https://v.example.com/play/xyz?playwm=1"
    );
  }

  #[test]
  fn strip_watermark_passes_clean_urls_through() {
    let url = "https://v.example.com/play/xyz";
    assert_eq!(strip_watermark(url), url);
  }

  #[test]
  fn sanitize_title_replaces_every_illegal_character() {
    assert_eq!(sanitize_title(r#"a/b\c:d*e?f"g<h>i|j"#), "a_b_c_d_e_f_g_h_i_j");

    let sanitized = sanitize_title(r#"My/Trip\2024:*?"<>|"#);
    for c in ['/', '\\', ':', '*', '?', '"', '<', '>', '|'] {
      assert!(!sanitized.contains(c));
    }
  }

  #[test]
  fn sanitize_title_is_identity_on_clean_input() {
    assert_eq!(sanitize_title("My Trip 2024"), "My Trip 2024");
  }

  #[test]
  fn sanitize_title_is_idempotent() {
    let once = sanitize_title("My Trip:2024");
    assert_eq!(once, "My Trip_2024");
    assert_eq!(sanitize_title(&once), once);
  }

  #[test]
  fn fallback_title_embeds_the_video_id() {
    assert_eq!(fallback_title("7123"), "douyin_7123");
  }
}
