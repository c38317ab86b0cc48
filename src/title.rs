use ulid::Ulid;

use crate::limits::MAX_TITLE_LEN;

/// Room left for a `-N` collision suffix.
const SUFFIX_ROOM: usize = 8;

pub const DEFAULT_TITLE_TEMPLATE: &str = "Custom Product List";

/// URL-safe slug: lowercase ASCII alphanumerics, runs of anything else become one `-`,
/// no leading or trailing `-`.
pub fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    let mut pending_dash = false;
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
        if slug.len() >= MAX_TITLE_LEN - SUFFIX_ROOM {
            break;
        }
    }
    slug
}

/// `"{template} {id}"`, used when nothing better can be derived.
pub fn default_title(template: &str, id: Ulid) -> String {
    format!("{template} {id}")
}

/// Replace any trailing `-<digits>` with `-{n}`.
pub fn with_suffix(title: &str, n: u32) -> String {
    let base = match title.rsplit_once('-') {
        Some((head, tail)) if !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) => head,
        _ => title,
    };
    format!("{base}-{n}")
}
