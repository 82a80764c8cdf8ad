//! List endpoint queries: pagination, `field:needle` search and `field:dir` sort.
//!
//! Raw parameters arrive as strings from the HTTP layer. Parsing never fails:
//! unknown fields and malformed values fall back to the resource defaults.

use core::cmp::Ordering;

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// A field of a listable resource that can appear in `search` or `sort`.
pub trait ListField: Copy + Eq + core::fmt::Debug + Send + Sync + 'static {
    /// Resolve a field name from the query string.
    fn parse(name: &str) -> Option<Self>;

    /// Whether `search` may filter on this field (text fields only).
    fn is_searchable(self) -> bool;

    /// Ordering used when the client sends no `sort` parameter at all.
    fn default_sort() -> SortSpec<Self>;
}

/// Query-string shape shared by all list endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawListQuery {
    pub page_number: Option<u32>,
    pub page_size: Option<u32>,
    pub search: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SortSpec<F> {
    pub field: F,
    pub order: SortOrder,
}

impl<F> SortSpec<F> {
    pub fn asc(field: F) -> Self {
        Self {
            field,
            order: SortOrder::Asc,
        }
    }

    pub fn desc(field: F) -> Self {
        Self {
            field,
            order: SortOrder::Desc,
        }
    }

    /// Apply the direction to an ascending comparison.
    pub fn apply(&self, ascending: Ordering) -> Ordering {
        match self.order {
            SortOrder::Asc => ascending,
            SortOrder::Desc => ascending.reverse(),
        }
    }
}

/// Case-insensitive literal substring filter on one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilter<F> {
    pub field: F,
    /// Lowercased needle.
    pub needle: String,
}

impl<F> SearchFilter<F> {
    pub fn matches(&self, haystack: &str) -> bool {
        haystack.to_lowercase().contains(&self.needle)
    }
}

/// A parsed list query.
///
/// `sort == None` means natural ordering by name (the client sent an empty
/// `sort` parameter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery<F> {
    pub page_number: u32,
    pub page_size: u32,
    pub search: Option<SearchFilter<F>>,
    pub sort: Option<SortSpec<F>>,
}

impl<F: ListField> Default for ListQuery<F> {
    fn default() -> Self {
        Self::parse(&RawListQuery::default())
    }
}

impl<F: ListField> ListQuery<F> {
    pub fn parse(raw: &RawListQuery) -> Self {
        let page_number = raw.page_number.unwrap_or(1).max(1);
        let page_size = raw
            .page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);

        let search = raw.search.as_deref().and_then(|s| {
            let (name, needle) = s.split_once(':')?;
            let field = F::parse(name.trim()).filter(|f| f.is_searchable())?;
            let needle = needle.trim();
            if needle.is_empty() {
                return None;
            }
            Some(SearchFilter {
                field,
                needle: needle.to_lowercase(),
            })
        });

        let sort = match raw.sort.as_deref().map(str::trim) {
            None => Some(F::default_sort()),
            Some("") => None,
            Some(s) => {
                let (name, dir) = s.split_once(':').unwrap_or((s, "asc"));
                Some(match F::parse(name.trim()) {
                    Some(field) if dir.trim().eq_ignore_ascii_case("desc") => SortSpec::desc(field),
                    Some(field) => SortSpec::asc(field),
                    None => F::default_sort(),
                })
            }
        };

        Self {
            page_number,
            page_size,
            search,
            sort,
        }
    }

    /// Number of records to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.page_number - 1) * u64::from(self.page_size)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }
}

/// One page of a list response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub page_number: u32,
    pub page_size: u32,
    pub count: usize,
    pub total_pages: u64,
    pub has_previous_page: bool,
    pub has_next_page: bool,
    pub data: Vec<T>,
}

impl<T> Page<T> {
    pub fn new<F>(data: Vec<T>, total: u64, query: &ListQuery<F>) -> Self {
        let total_pages = total.div_ceil(u64::from(query.page_size));
        Self {
            page_number: query.page_number,
            page_size: query.page_size,
            count: data.len(),
            total_pages,
            has_previous_page: query.page_number > 1,
            has_next_page: u64::from(query.page_number) < total_pages,
            data,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            page_number: self.page_number,
            page_size: self.page_size,
            count: self.count,
            total_pages: self.total_pages,
            has_previous_page: self.has_previous_page,
            has_next_page: self.has_next_page,
            data: self.data.into_iter().map(f).collect(),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Chunk<'a> {
    Digits(&'a str),
    Text(&'a str),
}

fn chunks(s: &str) -> impl Iterator<Item = Chunk<'_>> {
    let mut rest = s;
    core::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let is_digit = first.is_ascii_digit();
        let end = rest
            .find(|c: char| c.is_ascii_digit() != is_digit)
            .unwrap_or(rest.len());
        let (head, tail) = rest.split_at(end);
        rest = tail;
        Some(if is_digit {
            Chunk::Digits(head)
        } else {
            Chunk::Text(head)
        })
    })
}

fn cmp_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Natural ("human") string ordering: digit runs compare by numeric value,
/// text runs compare case-insensitively, and a digit run sorts before text.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = chunks(a);
    let mut right = chunks(b);
    loop {
        let ord = match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(Chunk::Digits(x)), Some(Chunk::Digits(y))) => cmp_digits(x, y),
            (Some(Chunk::Digits(_)), Some(Chunk::Text(_))) => Ordering::Less,
            (Some(Chunk::Text(_)), Some(Chunk::Digits(_))) => Ordering::Greater,
            (Some(Chunk::Text(x)), Some(Chunk::Text(y))) => x.to_lowercase().cmp(&y.to_lowercase()),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
}
