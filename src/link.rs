//! Resolve pasted drive and docs links to item IDs.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{DriveError, Result};

/// Every link shape the chooser accepts, with the ID in group `id`.
static LINK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        ^https?://
        (?:
            drive\.google\.com/
            (?:
                drive/(?:u/\d+/)?folders/
              | file/d/
              | open\?id=
            )
          | docs\.google\.com/
            (?:document|spreadsheets|presentation)/d/
        )
        (?P<id>[a-zA-Z0-9_-]+)",
    )
    .expect("Invalid link regex")
});

static ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("Invalid ID regex"));

/// Extract an item ID from a drive/docs link, or accept a bare ID.
///
/// ```
/// use drive_pick::link::extract_id;
///
/// let id = extract_id("https://docs.google.com/spreadsheets/d/1abc/edit#gid=0").unwrap();
/// assert_eq!(id, "1abc");
/// ```
pub fn extract_id(link_or_id: &str) -> Result<String> {
    let trimmed = link_or_id.trim();

    if let Some(id) = LINK_REGEX.captures(trimmed).and_then(|c| c.name("id")) {
        return Ok(id.as_str().to_string());
    }

    if ID_REGEX.is_match(trimmed) {
        return Ok(trimmed.to_string());
    }

    Err(DriveError::InvalidUrlOrId(link_or_id.to_string()))
}
