//! Search and pagination over lead listings.

use serde::Serialize;
use std::num::IntErrorKind;

use crate::models::Lead;

/// Leads shown per listing page.
pub const PAGE_SIZE: usize = 10;

/// Trims the raw `q` parameter; blank means "no filter".
pub fn normalize_query(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_string)
}

/// Case-insensitive substring match against name, email or company.
pub fn matches(lead: &Lead, query: &str) -> bool {
    let needle = query.to_lowercase();
    lead.name.to_lowercase().contains(&needle)
        || lead.email.to_lowercase().contains(&needle)
        || lead
            .company
            .as_deref()
            .is_some_and(|company| company.to_lowercase().contains(&needle))
}

/// Lenient page parameter: anything that is not a number means page 1.
/// Numbers too large for `usize` saturate, so they clamp to the last page.
pub fn parse_page_number(raw: Option<&str>) -> usize {
    match raw.map(|p| p.trim().parse::<usize>()) {
        Some(Ok(number)) => number,
        Some(Err(e)) if *e.kind() == IntErrorKind::PosOverflow => usize::MAX,
        _ => 1,
    }
}

/// One page of a listing. Page numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: usize,
    pub num_pages: usize,
    pub total: usize,
    pub has_previous: bool,
    pub has_next: bool,
    pub previous_number: Option<usize>,
    pub next_number: Option<usize>,
}

impl<T> Page<T> {
    /// Cuts `page_size` items out of `items`, clamping `requested` into
    /// `1..=num_pages`. An empty listing still has a single empty page.
    pub fn paginate(items: Vec<T>, requested: usize, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        let total = items.len();
        let num_pages = total.div_ceil(page_size).max(1);
        let number = requested.clamp(1, num_pages);

        let items: Vec<T> = items
            .into_iter()
            .skip((number - 1) * page_size)
            .take(page_size)
            .collect();

        Self {
            items,
            number,
            num_pages,
            total,
            has_previous: number > 1,
            has_next: number < num_pages,
            previous_number: (number > 1).then(|| number - 1),
            next_number: (number < num_pages).then(|| number + 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LeadStatus;
    use chrono::Utc;

    fn lead(name: &str, email: &str, company: Option<&str>) -> Lead {
        let now = Utc::now();
        Lead {
            id: 1,
            name: name.to_string(),
            email: email.to_string(),
            phone: None,
            company: company.map(str::to_string),
            role: None,
            status: LeadStatus::New,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query(None), None);
        assert_eq!(normalize_query(Some("   ")), None);
        assert_eq!(
            normalize_query(Some(" Empresa A ")),
            Some("Empresa A".to_string())
        );
    }

    #[test]
    fn test_matches_any_of_three_fields() {
        let joao = lead("João Silva", "joao@teste.com", Some("Empresa A"));
        assert!(matches(&joao, "joão"));
        assert!(matches(&joao, "JOAO@"));
        assert!(matches(&joao, "empresa a"));
        assert!(!matches(&joao, "Empresa B"));

        let sem_empresa = lead("Pedro Costa", "pedro@teste.com", None);
        assert!(!matches(&sem_empresa, "Empresa"));
    }

    #[test]
    fn test_parse_page_number_is_lenient() {
        assert_eq!(parse_page_number(None), 1);
        assert_eq!(parse_page_number(Some("3")), 3);
        assert_eq!(parse_page_number(Some("abc")), 1);
        assert_eq!(parse_page_number(Some("-2")), 1);
        assert_eq!(
            parse_page_number(Some("99999999999999999999999")),
            usize::MAX
        );
    }

    #[test]
    fn test_overflowing_page_number_lands_on_last_page() {
        let requested = parse_page_number(Some("99999999999999999999999"));
        let page = Page::paginate((1..=12).collect::<Vec<i32>>(), requested, PAGE_SIZE);
        assert_eq!(page.number, 2);
        assert_eq!(page.items, vec![11, 12]);
    }

    #[test]
    fn test_paginate_splits_into_pages() {
        let page = Page::paginate((1..=25).collect(), 2, PAGE_SIZE);
        assert_eq!(page.items, (11..=20).collect::<Vec<_>>());
        assert_eq!(page.num_pages, 3);
        assert_eq!(page.total, 25);
        assert!(page.has_previous && page.has_next);
        assert_eq!(page.previous_number, Some(1));
        assert_eq!(page.next_number, Some(3));
    }

    #[test]
    fn test_out_of_range_page_clamps() {
        let last = Page::paginate((1..=25).collect::<Vec<i32>>(), 99, PAGE_SIZE);
        assert_eq!(last.number, 3);
        assert_eq!(last.items, (21..=25).collect::<Vec<_>>());
        assert!(!last.has_next);

        let first = Page::paginate((1..=25).collect::<Vec<i32>>(), 0, PAGE_SIZE);
        assert_eq!(first.number, 1);
        assert!(!first.has_previous);
    }

    #[test]
    fn test_empty_listing_has_one_page() {
        let page = Page::paginate(Vec::<i32>::new(), 5, PAGE_SIZE);
        assert_eq!(page.number, 1);
        assert_eq!(page.num_pages, 1);
        assert!(page.items.is_empty());
    }
}
