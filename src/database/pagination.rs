use serde::Serialize;

use crate::{
    error::{Error, TypeError},
    form::Form,
    MAX_PAGE_SIZE,
};

/// 1-based page number and page size taken from `?page=&limit=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    pub fn from_form(form: &Form, default_limit: i64) -> Result<Self, TypeError> {
        let page = form.get_number::<i64>("page")?.unwrap_or(1);
        let limit = form.get_number::<i64>("limit")?.unwrap_or(default_limit);

        if page < 1 {
            return Err(TypeError::new("page", "Page numbers start at 1"));
        }
        if limit < 1 {
            return Err(TypeError::new("limit", "Limit must be positive"));
        }

        let limit = limit.min(MAX_PAGE_SIZE);
        // the end of the page must fit, not only its start
        if page.checked_mul(limit).is_none() {
            return Err(TypeError::new("page", "Page number is too large"));
        }

        Ok(Self { page, limit })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Only the first page may come back empty.
    pub fn check_in_range(&self, returned: usize) -> Result<(), Error> {
        if returned == 0 && self.page > 1 {
            return Err(Error::NotFound("Invalid page.".to_owned()));
        }
        Ok(())
    }
}

#[derive(Serialize, Debug)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<i64>,
    pub previous: Option<i64>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn from_rows(results: Vec<T>, count: i64, request: &PageRequest) -> Self {
        let next = if request.page.saturating_mul(request.limit) < count {
            Some(request.page + 1)
        } else {
            None
        };
        let previous = if request.page > 1 {
            Some(request.page - 1)
        } else {
            None
        };

        Self {
            count,
            next,
            previous,
            results,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            next: self.next,
            previous: self.previous,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(page: i64, limit: i64) -> PageRequest {
        PageRequest { page, limit }
    }

    #[test]
    fn middle_page_links_both_ways() {
        let page = Page::from_rows(vec![1, 2], 7, &request(2, 2));
        assert_eq!(page.next, Some(3));
        assert_eq!(page.previous, Some(1));
    }

    #[test]
    fn last_page_has_no_next() {
        let page = Page::from_rows(vec![7], 7, &request(4, 2));
        assert_eq!(page.next, None);
        assert_eq!(page.previous, Some(3));

        let exact = Page::from_rows(vec![5, 6], 6, &request(3, 2));
        assert_eq!(exact.next, None);
    }

    #[test]
    fn request_defaults_and_caps() {
        let form = Form::from_query("");
        assert_eq!(PageRequest::from_form(&form, 6).unwrap(), request(1, 6));

        let form = Form::from_query("page=3&limit=1000");
        let parsed = PageRequest::from_form(&form, 6).unwrap();
        assert_eq!(parsed, request(3, MAX_PAGE_SIZE));
        assert_eq!(parsed.offset(), 2 * MAX_PAGE_SIZE);
    }

    #[test]
    fn non_positive_values_are_rejected() {
        assert!(PageRequest::from_form(&Form::from_query("page=0"), 6).is_err());
        assert!(PageRequest::from_form(&Form::from_query("limit=-1"), 6).is_err());
    }

    #[test]
    fn huge_page_numbers_are_rejected() {
        let form = Form::from_query("page=9223372036854775807");
        let error = PageRequest::from_form(&form, 6).unwrap_err();
        assert_eq!(error.to_string(), "page: Page number is too large");

        let largest = i64::MAX / MAX_PAGE_SIZE;
        let form = Form::from_query(&format!("page={largest}&limit={MAX_PAGE_SIZE}"));
        let parsed = PageRequest::from_form(&form, 6).unwrap();
        assert_eq!(parsed.offset(), (largest - 1) * MAX_PAGE_SIZE);
        assert_eq!(Page::<i32>::from_rows(vec![], 10, &parsed).next, None);
    }

    #[test]
    fn empty_pages_past_the_first_are_not_found() {
        assert!(request(1, 6).check_in_range(0).is_ok());
        assert!(request(3, 6).check_in_range(2).is_ok());
        assert!(matches!(
            request(3, 6).check_in_range(0),
            Err(Error::NotFound(_))
        ));
    }
}
