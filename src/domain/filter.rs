use serde::{Deserialize, Serialize};

pub const DEFAULT_SEARCH_LIMIT: usize = 20;

/// The operator-editable filter inputs owned by the controller.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterState {
    pub search_query: String,
    pub selected_category: Option<String>,
}

impl FilterState {
    pub fn to_query(&self, limit: usize) -> ProductQuery {
        ProductQuery::new(&self.search_query, self.selected_category.clone()).with_limit(limit)
    }
}

/// Normalized search request. Blank text or category means "no filter".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuery {
    pub text: Option<String>,
    pub category: Option<String>,
    pub limit: usize,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            text: None,
            category: None,
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

impl ProductQuery {
    pub fn new(text: &str, category: Option<String>) -> Self {
        let text = if text.trim().is_empty() {
            None
        } else {
            Some(text.to_string())
        };
        let category = category.filter(|c| !c.trim().is_empty());

        Self {
            text,
            category,
            limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn is_unfiltered(&self) -> bool {
        self.text.is_none() && self.category.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_inputs_normalize_to_none() {
        let query = ProductQuery::new("   ", Some("  ".to_string()));
        assert_eq!(query.text, None);
        assert_eq!(query.category, None);
        assert!(query.is_unfiltered());
        assert_eq!(query.limit, DEFAULT_SEARCH_LIMIT);
    }

    #[test]
    fn test_query_text_is_not_trimmed() {
        let query = ProductQuery::new(" lat", None);
        assert_eq!(query.text.as_deref(), Some(" lat"));
    }

    #[test]
    fn test_filter_state_carries_both_inputs() {
        let state = FilterState {
            search_query: "mocha".to_string(),
            selected_category: Some("Coffee".to_string()),
        };
        let query = state.to_query(5);
        assert_eq!(query.text.as_deref(), Some("mocha"));
        assert_eq!(query.category.as_deref(), Some("Coffee"));
        assert_eq!(query.limit, 5);
    }
}
