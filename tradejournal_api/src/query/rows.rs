use url::Url;

use super::common::{Query, SortDirection};

/// Row filter for the record store's REST endpoints.
///
/// Filters follow the `column=op.value` convention (`user_id=eq.42`,
/// `trade_id=in.(1,2,3)`), ordering is `order=column.asc`.
#[derive(Clone, Debug, Default)]
pub struct RowQuery {
    pub select: Option<String>,
    pub filters: Vec<(String, String)>,
    pub order: Option<(String, SortDirection)>,
}

impl RowQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the returned columns (comma separated).
    pub fn with_select(mut self, columns: &str) -> Self {
        self.select = Some(columns.to_string());
        self
    }

    /// Adds an equality filter on `column`.
    pub fn with_eq(mut self, column: &str, value: &str) -> Self {
        self.filters
            .push((column.to_string(), format!("eq.{}", value)));
        self
    }

    /// Adds a membership filter on `column`.
    pub fn with_in<S: AsRef<str>>(mut self, column: &str, values: &[S]) -> Self {
        let joined = values
            .iter()
            .map(|v| v.as_ref())
            .collect::<Vec<_>>()
            .join(",");
        self.filters
            .push((column.to_string(), format!("in.({})", joined)));
        self
    }

    /// Orders the result rows by `column`.
    pub fn with_order(mut self, column: &str, direction: SortDirection) -> Self {
        self.order = Some((column.to_string(), direction));
        self
    }
}

impl Query for RowQuery {
    fn add_to_url(&self, url: &Url) -> Url {
        let mut url = url.clone();
        if let Some(select) = &self.select {
            url.query_pairs_mut().append_pair("select", select);
        }
        for (column, filter) in self.filters.iter() {
            url.query_pairs_mut().append_pair(column, filter);
        }
        if let Some((column, direction)) = &self.order {
            url.query_pairs_mut()
                .append_pair("order", format!("{}.{}", column, direction).as_str());
        }
        url
    }
}
