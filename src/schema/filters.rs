use serde::{Deserialize, Serialize};

/// One attribute constraint on a catalog product.
///
/// A filter either matches an exact value or a regex, never both, so the
/// match is modelled as an enum and flattened onto the wire as either
/// `"value"` or `"value_regex"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeFilter {
    pub key: String,
    #[serde(flatten)]
    pub matcher: AttributeMatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeMatch {
    #[serde(rename = "value")]
    Value(String),
    /// `/pattern/flags`, the catalog's regex convention.
    #[serde(rename = "value_regex")]
    ValueRegex(String),
}

impl AttributeFilter {
    pub fn value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            matcher: AttributeMatch::Value(value.into()),
        }
    }

    pub fn regex(key: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            matcher: AttributeMatch::ValueRegex(pattern.into()),
        }
    }
}

/// Which catalog products a cost component prices against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attribute_filters: Vec<AttributeFilter>,
}

impl ProductFilter {
    pub fn new(vendor: &str, region: &str, service: &str) -> Self {
        Self {
            vendor_name: Some(vendor.to_string()),
            region: Some(region.to_string()),
            service: Some(service.to_string()),
            ..Self::default()
        }
    }

    pub fn product_family(mut self, family: &str) -> Self {
        self.product_family = Some(family.to_string());
        self
    }

    pub fn attribute(mut self, filter: AttributeFilter) -> Self {
        self.attribute_filters.push(filter);
        self
    }
}

/// Narrows several prices for the same product down to one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_option: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_regex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_usage_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_usage_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term_length: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term_purchase_option: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term_offering_class: Option<String>,
}

impl PriceFilter {
    pub fn on_demand() -> Self {
        Self::purchase_option("on_demand")
    }

    pub fn purchase_option(option: &str) -> Self {
        Self {
            purchase_option: Some(option.to_string()),
            ..Self::default()
        }
    }

    /// Price of the tier that starts at `start` (and optionally ends at `end`).
    pub fn usage_tier(start: impl ToString, end: Option<&str>) -> Self {
        Self {
            start_usage_amount: Some(start.to_string()),
            end_usage_amount: end.map(str::to_string),
            ..Self::default()
        }
    }
}
