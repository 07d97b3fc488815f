//! Page directory naming convention.
//!
//! Every page lives in its own directory under the pages root. The directory
//! name decides both whether it is a page at all and where it lands in the
//! render order:
//!
//! - `cover` → the cover, always first
//! - `p01`, `p2`, `p013-rooftop` → numbered pages, ordered by their number
//! - `bonus`, `bonus1`, `bonus-sketches-2` → bonus pages after every numbered
//!   page, ordered by the first number found in the name
//!
//! Anything else (`drafts`, `page1`, `p`) is not a page.

/// Rank of the cover page.
pub const COVER_RANK: i64 = -1;

/// Rank offset for bonus pages; keeps them after any numbered page.
pub const BONUS_RANK_BASE: i64 = 1000;

/// What kind of page a directory name denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Cover,
    Numbered(u32),
    /// Bonus page with the first digit run in its name, if any.
    Bonus(Option<u32>),
}

impl PageKind {
    /// Total ordering key across all page kinds.
    pub fn rank(&self) -> i64 {
        match self {
            PageKind::Cover => COVER_RANK,
            PageKind::Numbered(n) => i64::from(*n),
            PageKind::Bonus(n) => BONUS_RANK_BASE + i64::from(n.unwrap_or(0)),
        }
    }
}

/// Classify a directory name as a page, or `None` if it is not one.
///
/// - `"cover"` → `Cover`
/// - `"p07"` → `Numbered(7)`
/// - `"p12-finale"` → `Numbered(12)`
/// - `"bonus"` → `Bonus(None)`
/// - `"bonus-2"` → `Bonus(Some(2))`
/// - `"pages"`, `"p"`, `"Cover"` → `None`
pub fn parse_page_name(name: &str) -> Option<PageKind> {
    if name == "cover" {
        return Some(PageKind::Cover);
    }
    if let Some(rest) = name.strip_prefix("bonus") {
        return Some(PageKind::Bonus(first_number(rest)));
    }
    let rest = name.strip_prefix('p')?;
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok().map(PageKind::Numbered)
}

/// First run of ASCII digits in `s`, parsed.
fn first_number(s: &str) -> Option<u32> {
    let start = s.find(|c: char| c.is_ascii_digit())?;
    let digits: String = s[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
