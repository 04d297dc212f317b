use serde::Serialize;

/// One page of query results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    /// 1-based
    pub page_number: u64,
    pub page_size: u64,
    pub total_page: u64,
    pub total_row: u64,
    pub records: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(page_number: u64, page_size: u64, total_row: u64, records: Vec<T>) -> Self {
        let total_page = if page_size == 0 {
            0
        } else {
            total_row.div_ceil(page_size)
        };
        Self {
            page_number,
            page_size,
            total_page,
            total_row,
            records,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page_number < self.total_page
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            page_number: self.page_number,
            page_size: self.page_size,
            total_page: self.total_page,
            total_row: self.total_row,
            records: self.records.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages_round_up() {
        assert_eq!(Page::<()>::new(1, 10, 0, vec![]).total_page, 0);
        assert_eq!(Page::<()>::new(1, 10, 10, vec![]).total_page, 1);
        assert_eq!(Page::<()>::new(1, 10, 11, vec![]).total_page, 2);
    }

    #[test]
    fn test_has_next_and_map() {
        let page = Page::new(1, 2, 3, vec![1, 2]);
        assert!(page.has_next());
        let page = page.map(|n| n * 10);
        assert_eq!(page.records, vec![10, 20]);
        assert_eq!(
            serde_json::to_value(&page).unwrap()["total_page"],
            serde_json::json!(2)
        );
    }
}
