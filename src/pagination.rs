use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;

/// Raw page/limit as they arrive on the query string. Missing, zero or negative
/// values are coerced to the defaults rather than rejected.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    pub fn normalize(self) -> PageParams {
        let page = match self.page {
            Some(p) if p >= 1 => p,
            _ => DEFAULT_PAGE,
        };
        let limit = match self.limit {
            Some(l) if l >= 1 => l,
            _ => DEFAULT_LIMIT,
        };
        PageParams { page, limit }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageParams {
    pub page: i64,
    pub limit: i64,
}

impl PageParams {
    pub fn offset(&self) -> i64 {
        // Saturate so an absurd page number degenerates into an empty page
        // instead of overflowing.
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub limit: i64,
    pub total_items: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    /// Assemble a page from one slice of results plus the total count produced
    /// by the same predicate.
    pub fn assemble(items: Vec<T>, params: PageParams, total_items: i64) -> Self {
        let total_pages = if total_items == 0 {
            0
        } else {
            (total_items + params.limit - 1) / params.limit
        };
        Page {
            items,
            page: params.page,
            limit: params.limit,
            total_items,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_values_coerce_to_defaults() {
        let params = PageQuery::default().normalize();
        assert_eq!(params, PageParams { page: 1, limit: 10 });
    }

    #[test]
    fn non_positive_values_coerce_to_defaults() {
        let params = PageQuery {
            page: Some(0),
            limit: Some(-3),
        }
        .normalize();
        assert_eq!(params, PageParams { page: 1, limit: 10 });
    }

    #[test]
    fn offset_skips_prior_pages() {
        let params = PageQuery {
            page: Some(2),
            limit: Some(5),
        }
        .normalize();
        assert_eq!(params.offset(), 5);
        assert_eq!(PageParams { page: 1, limit: 10 }.offset(), 0);
    }

    #[test]
    fn huge_page_number_saturates_instead_of_overflowing() {
        let params = PageQuery {
            page: Some(i64::MAX),
            limit: Some(10),
        }
        .normalize();
        assert_eq!(params.offset(), i64::MAX);
    }

    #[test]
    fn page_two_of_twelve_items() {
        // 12 items, page=2, limit=5 -> items 6..=10, 3 pages total.
        let all: Vec<i64> = (1..=12).collect();
        let params = PageQuery {
            page: Some(2),
            limit: Some(5),
        }
        .normalize();
        let window: Vec<i64> = all
            .iter()
            .skip(params.offset() as usize)
            .take(params.limit as usize)
            .copied()
            .collect();
        let page = Page::assemble(window, params, all.len() as i64);
        assert_eq!(page.items, vec![6, 7, 8, 9, 10]);
        assert_eq!(page.total_items, 12);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn empty_result_has_zero_pages() {
        let page: Page<i64> = Page::assemble(vec![], PageParams { page: 1, limit: 10 }, 0);
        assert_eq!(page.total_pages, 0);
        assert!(page.items.is_empty());
    }

    #[test]
    fn exact_multiple_does_not_round_up() {
        let page: Page<i64> = Page::assemble(vec![], PageParams { page: 1, limit: 5 }, 10);
        assert_eq!(page.total_pages, 2);
    }
}
