//! Pagination over in-memory collections
//!
//! `lastPage` divides by at least one so an empty collection still has one
//! page. Pages past the end are not clamped: they come back empty with
//! `from` and `to` both 0.

use serde::Serialize;

/// Allowed page sizes for the proxy listing and the dashboard
pub const PER_PAGE_OPTIONS: [usize; 4] = [10, 25, 50, 100];

pub const DEFAULT_PER_PAGE: usize = 25;

/// Page number from a raw query value; anything unusable is page 1
pub fn parse_page(raw: Option<&str>) -> usize {
    raw.and_then(leading_int)
        .filter(|page| *page >= 1)
        .map(|page| page as usize)
        .unwrap_or(1)
}

/// Page size restricted to [`PER_PAGE_OPTIONS`]
pub fn parse_per_page(raw: Option<&str>) -> usize {
    raw.and_then(leading_int)
        .and_then(|n| usize::try_from(n).ok())
        .filter(|n| PER_PAGE_OPTIONS.contains(n))
        .unwrap_or(DEFAULT_PER_PAGE)
}

/// Integer value of a query parameter, reading leading digits (`"3abc"` → 3)
pub fn leading_int(raw: &str) -> Option<i64> {
    let s = raw.trim();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(digits.len());
    let value: i64 = digits[..end].parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Pagination metadata as served to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub last_page: usize,
    /// 1-based index of the first returned item, 0 when the page is empty
    pub from: usize,
    /// 1-based index of the last returned item, 0 when the page is empty
    pub to: usize,
}

impl PageMeta {
    /// Metadata for a window of `returned` items starting at page `page`
    pub fn new(total: usize, page: usize, per_page: usize, returned: usize) -> Self {
        let page = page.max(1);
        let per_page = per_page.max(1);
        let offset = (page - 1).saturating_mul(per_page);
        let (from, to) = if returned == 0 {
            (0, 0)
        } else {
            (offset + 1, offset + returned)
        };
        Self {
            total,
            page,
            per_page,
            last_page: total.max(1).div_ceil(per_page),
            from,
            to,
        }
    }
}

/// Slice one page out of `items`
///
/// # Examples
/// ```
/// use intake_server::pagination::paginate;
///
/// let (page, meta) = paginate(&[1, 2, 3, 4, 5], 2, 2);
/// assert_eq!(page, vec![3, 4]);
/// assert_eq!((meta.from, meta.to, meta.last_page), (3, 4, 3));
/// ```
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> (Vec<T>, PageMeta) {
    let page = page.max(1);
    let per_page = per_page.max(1);
    let offset = (page - 1).saturating_mul(per_page);

    let slice: Vec<T> = items.iter().skip(offset).take(per_page).cloned().collect();
    let meta = PageMeta::new(items.len(), page, per_page, slice.len());
    (slice, meta)
}
