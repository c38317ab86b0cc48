/// Titles are stored in a 255-character column upstream.
pub const MAX_TITLE_LEN: usize = 255;

/// Upper bound on `-2`, `-3`, … suffixes tried before a title is given up on.
pub const MAX_TITLE_ATTEMPTS: u32 = 1_000;

pub const MAX_CODE_LEN: usize = 255;
pub const MAX_CODES_PER_LIST: usize = 100_000;
pub const MAX_LISTS: usize = 50_000;
pub const MAX_ACTIONS: usize = 50_000;
pub const MAX_AFFECTED_LISTS: usize = 256;
pub const MAX_KIND_TAG_LEN: usize = 255;

/// Leaves room in [`MAX_TITLE_LEN`] for the dates and item count of a derived action title.
pub const MAX_KIND_LABEL_LEN: usize = 128;

/// Accept instants between 2000-01-01 and 2100-01-01 UTC.
pub const MIN_VALID_TIMESTAMP_MS: i64 = 946_684_800_000;
pub const MAX_VALID_TIMESTAMP_MS: i64 = 4_102_444_800_000;
