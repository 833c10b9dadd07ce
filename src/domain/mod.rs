//! Typed query vocabulary for the Frappe `/api/resource` endpoints.

use serde::ser::SerializeTuple;
use serde::{Serialize, Serializer};

pub const DEFAULT_OPERATOR: &str = "=";
pub const DEFAULT_LIMIT: u32 = 20;

/// A single `[field, operator, value]` constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterTriple {
    pub field: String,
    pub operator: String,
    pub value: String,
}

impl FilterTriple {
    pub fn new(
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }

    /// Builds a filter only when both `field` and `value` are present.
    /// An empty `value` still counts as present.
    pub fn from_parts(field: Option<&str>, operator: &str, value: Option<&str>) -> Option<Self> {
        match (field, value) {
            (Some(field), Some(value)) => Some(Self::new(field, operator, value)),
            _ => None,
        }
    }
}

impl Serialize for FilterTriple {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut t = serializer.serialize_tuple(3)?;
        t.serialize_element(&self.field)?;
        t.serialize_element(&self.operator)?;
        t.serialize_element(&self.value)?;
        t.end()
    }
}

/// Query string for one outbound request. Keys are only present when set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(&'static str, String)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.0.push(("limit", limit.to_string()));
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.0.push(("offset", offset.to_string()));
        self
    }

    pub fn limit_page_length(mut self, limit: u32) -> Self {
        self.0.push(("limit_page_length", limit.to_string()));
        self
    }

    pub fn filter(mut self, filter: Option<FilterTriple>) -> Self {
        if let Some(f) = filter {
            // Serializing strings and a tuple of strings cannot fail.
            let encoded = serde_json::to_string(&[f]).unwrap_or_default();
            self.0.push(("filters", encoded));
        }
        self
    }

    pub fn fields(mut self, fields: &[String]) -> Self {
        if !fields.is_empty() {
            let encoded = serde_json::to_string(fields).unwrap_or_default();
            self.0.push(("fields", encoded));
        }
        self
    }

    pub fn order_by(mut self, order_by: Option<&str>) -> Self {
        if let Some(o) = order_by {
            self.0.push(("order_by", o.to_owned()));
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn pairs(&self) -> &[(&'static str, String)] {
        &self.0
    }
}

/// Desk route slug: `"Sales Order"` -> `"sales-order"`.
pub fn doctype_slug(doctype: &str) -> String {
    doctype.to_lowercase().replace(' ', "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_requires_field_and_value() {
        assert!(FilterTriple::from_parts(Some("status"), "=", None).is_none());
        assert!(FilterTriple::from_parts(None, "=", Some("Open")).is_none());
        let f = FilterTriple::from_parts(Some("status"), "!=", Some("Open")).unwrap();
        assert_eq!(f, FilterTriple::new("status", "!=", "Open"));
    }

    #[test]
    fn empty_value_still_builds_a_filter() {
        let f = FilterTriple::from_parts(Some("status"), "=", Some("")).unwrap();
        assert_eq!(f.value, "");
    }

    #[test]
    fn filters_encode_as_nested_json_arrays() {
        let q = QueryParams::new().filter(Some(FilterTriple::new("module", "=", "Accounts")));
        assert_eq!(q.get("filters"), Some(r#"[["module","=","Accounts"]]"#));
    }

    #[test]
    fn unset_keys_are_not_sent() {
        let q = QueryParams::new()
            .filter(None)
            .fields(&[])
            .order_by(None);
        assert!(q.is_empty());
    }

    #[test]
    fn keeps_insertion_order() {
        let q = QueryParams::new()
            .limit_page_length(20)
            .order_by(Some("modified desc"))
            .fields(&["subject".to_string()]);
        let keys: Vec<&str> = q.pairs().iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, ["limit_page_length", "order_by", "fields"]);
        assert_eq!(q.get("fields"), Some(r#"["subject"]"#));
    }

    #[test]
    fn slug_lowercases_and_hyphenates() {
        assert_eq!(doctype_slug("Sales Order"), "sales-order");
        assert_eq!(doctype_slug("Purchase Invoice Item"), "purchase-invoice-item");
        assert_eq!(doctype_slug("User"), "user");
    }
}
