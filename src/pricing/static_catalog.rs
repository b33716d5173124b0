use std::collections::HashMap;

use regex::{Regex, RegexBuilder};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::cost::{LookupError, PriceCatalog};
use crate::schema::{AttributeMatch, PriceFilter, ProductFilter};

/// One catalog row: product fields, attributes, price fields and the unit
/// price. Omitted fields match any request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub vendor_name: Option<String>,
    pub region: Option<String>,
    pub service: Option<String>,
    pub product_family: Option<String>,
    pub sku: Option<String>,
    #[serde(default)]
    pub attributes: HashMap<String, String>,

    pub purchase_option: Option<String>,
    pub unit: Option<String>,
    pub description: Option<String>,
    pub start_usage_amount: Option<String>,
    pub end_usage_amount: Option<String>,
    pub term_length: Option<String>,
    pub term_purchase_option: Option<String>,
    pub term_offering_class: Option<String>,

    pub price: Decimal,
}

/// Request `wanted` matches when the entry omits the field or has the same value.
fn field_matches(entry: &Option<String>, wanted: &Option<String>) -> bool {
    match (entry, wanted) {
        (Some(e), Some(w)) => e == w,
        _ => true,
    }
}

/// Compile a `/pattern/flags` regex. A bare string is used as the pattern.
pub(crate) fn compile_pattern(raw: &str) -> Result<Regex, regex::Error> {
    let (pattern, flags) = match raw.strip_prefix('/').and_then(|s| s.rsplit_once('/')) {
        Some((pattern, flags)) => (pattern, flags),
        None => (raw, ""),
    };
    RegexBuilder::new(pattern)
        .case_insensitive(flags.contains('i'))
        .build()
}

fn pattern_matches(raw: &str, haystack: &str) -> bool {
    match compile_pattern(raw) {
        Ok(re) => re.is_match(haystack),
        Err(e) => {
            tracing::warn!("Invalid regex {raw} in filter: {e}");
            false
        }
    }
}

impl CatalogEntry {
    fn matches_product(&self, product: &ProductFilter) -> bool {
        field_matches(&self.vendor_name, &product.vendor_name)
            && field_matches(&self.region, &product.region)
            && field_matches(&self.service, &product.service)
            && field_matches(&self.product_family, &product.product_family)
            && field_matches(&self.sku, &product.sku)
            && product.attribute_filters.iter().all(|f| {
                let actual = self.attributes.get(&f.key).map(String::as_str).unwrap_or("");
                match &f.matcher {
                    AttributeMatch::Value(v) => actual == v,
                    AttributeMatch::ValueRegex(p) => pattern_matches(p, actual),
                }
            })
    }

    fn matches_price(&self, price: &PriceFilter) -> bool {
        let description_ok = match &price.description_regex {
            Some(p) => pattern_matches(p, self.description.as_deref().unwrap_or("")),
            None => true,
        };
        description_ok
            && field_matches(&self.purchase_option, &price.purchase_option)
            && field_matches(&self.unit, &price.unit)
            && field_matches(&self.description, &price.description)
            && field_matches(&self.start_usage_amount, &price.start_usage_amount)
            && field_matches(&self.end_usage_amount, &price.end_usage_amount)
            && field_matches(&self.term_length, &price.term_length)
            && field_matches(&self.term_purchase_option, &price.term_purchase_option)
            && field_matches(&self.term_offering_class, &price.term_offering_class)
    }
}

/// An in-memory price list, loaded from a JSON array of entries.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    entries: Vec<CatalogEntry>,
}

impl StaticCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PriceCatalog for StaticCatalog {
    fn lookup(
        &self,
        product: &ProductFilter,
        price: Option<&PriceFilter>,
    ) -> Result<Decimal, LookupError> {
        let mut matches = self.entries.iter().filter(|e| {
            e.matches_product(product) && price.map_or(true, |p| e.matches_price(p))
        });

        let Some(first) = matches.next() else {
            return Err(LookupError::NoMatch);
        };
        let extra = matches.count();
        if extra > 0 {
            return Err(LookupError::Ambiguous(extra + 1));
        }
        Ok(first.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AttributeFilter;
    use rust_decimal_macros::dec;

    const CATALOG: &str = r#"[
        {
            "vendorName": "aws", "region": "us-east-1", "service": "AmazonEC2",
            "productFamily": "Compute Instance",
            "attributes": {"instanceType": "m5.large", "operatingSystem": "Linux"},
            "purchaseOption": "on_demand", "price": "0.096"
        },
        {
            "vendorName": "aws", "region": "us-east-1", "service": "AmazonEC2",
            "productFamily": "Compute Instance",
            "attributes": {"instanceType": "m5.large", "operatingSystem": "Linux"},
            "purchaseOption": "reserved", "termLength": "1yr",
            "termPurchaseOption": "No Upfront", "termOfferingClass": "standard",
            "price": "0.06"
        },
        {
            "vendorName": "aws", "region": "us-east-1", "service": "AmazonEC2",
            "productFamily": "CPU Credits",
            "attributes": {"usagetype": "USE1-CPUCredits:t3"},
            "price": 0.05
        },
        {
            "vendorName": "aws", "service": "AmazonCloudWatch",
            "attributes": {"group": "Metric"},
            "description": "$0.30 per metric-month for the first 10,000 metrics",
            "price": "0.30"
        },
        {
            "vendorName": "aws", "service": "AmazonCloudWatch",
            "attributes": {"group": "Metric"},
            "description": "$0.10 per metric-month for the next 240,000 metrics",
            "price": "0.10"
        }
    ]"#;

    fn catalog() -> StaticCatalog {
        StaticCatalog::new(serde_json::from_str(CATALOG).unwrap())
    }

    fn m5(os: &str) -> ProductFilter {
        ProductFilter::new("aws", "us-east-1", "AmazonEC2")
            .product_family("Compute Instance")
            .attribute(AttributeFilter::value("instanceType", "m5.large"))
            .attribute(AttributeFilter::value("operatingSystem", os))
    }

    #[test]
    fn test_on_demand_and_reserved() {
        let c = catalog();
        assert_eq!(c.lookup(&m5("Linux"), Some(&PriceFilter::on_demand())), Ok(dec!(0.096)));

        let reserved = PriceFilter {
            purchase_option: Some("reserved".into()),
            term_length: Some("1yr".into()),
            term_purchase_option: Some("No Upfront".into()),
            term_offering_class: Some("standard".into()),
            ..PriceFilter::default()
        };
        assert_eq!(c.lookup(&m5("Linux"), Some(&reserved)), Ok(dec!(0.06)));
    }

    #[test]
    fn test_no_match_and_ambiguous() {
        let c = catalog();
        assert_eq!(
            c.lookup(&m5("Windows"), Some(&PriceFilter::on_demand())),
            Err(LookupError::NoMatch)
        );
        assert_eq!(c.lookup(&m5("Linux"), None), Err(LookupError::Ambiguous(2)));
    }

    #[test]
    fn test_regex_attribute_and_description() {
        let c = catalog();
        let credits = ProductFilter::new("aws", "us-east-1", "AmazonEC2")
            .product_family("CPU Credits")
            .attribute(AttributeFilter::regex("usagetype", "/cpucredits:t3$/i"));
        assert_eq!(c.lookup(&credits, None), Ok(dec!(0.05)));

        let metrics = ProductFilter {
            vendor_name: Some("aws".into()),
            service: Some("AmazonCloudWatch".into()),
            ..ProductFilter::default()
        }
        .attribute(AttributeFilter::value("group", "Metric"));
        let first_tier = PriceFilter {
            description_regex: Some("/first 10,000/".into()),
            ..PriceFilter::default()
        };
        assert_eq!(c.lookup(&metrics, Some(&first_tier)), Ok(dec!(0.30)));
    }

    #[test]
    fn test_compile_pattern_flags() {
        assert!(compile_pattern("/EBSOptimized/").unwrap().is_match("USE1-EBSOptimized:m5"));
        assert!(!compile_pattern("/ebsoptimized/").unwrap().is_match("EBSOptimized"));
        assert!(compile_pattern("/ebsoptimized/i").unwrap().is_match("EBSOptimized"));
        assert!(compile_pattern("plain").unwrap().is_match("a plain string"));
    }
}
