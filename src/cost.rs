use rayon::prelude::*;
use rust_decimal::Decimal;

use crate::schema::{PriceFilter, ProductFilter, Resource};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("no price matches the filters")]
    NoMatch,
    #[error("{0} prices match the filters")]
    Ambiguous(usize),
}

/// Trait for looking up a unit price by product and price filters.
pub trait PriceCatalog: Sync {
    fn lookup(
        &self,
        product: &ProductFilter,
        price: Option<&PriceFilter>,
    ) -> Result<Decimal, LookupError>;

    /// Components in the tree that the catalog cannot price.
    fn unpriced_components(&self, resource: &Resource) -> Vec<String> {
        let mut names = Vec::new();
        collect_unpriced(self, resource, &mut names);
        names
    }
}

fn collect_unpriced<C: PriceCatalog + ?Sized>(catalog: &C, r: &Resource, out: &mut Vec<String>) {
    if r.is_excluded() {
        return;
    }
    for c in &r.cost_components {
        if c.custom_price.is_none()
            && catalog.lookup(&c.product_filter, c.price_filter.as_ref()).is_err()
        {
            out.push(format!("{}: {}", r.name, c.name));
        }
    }
    for sub in &r.sub_resources {
        collect_unpriced(catalog, sub, out);
    }
}

/// Fill in the price of every component in the tree.
///
/// Failed lookups drop components marked `ignore_if_missing_price` and leave
/// the rest price-unknown.
pub fn apply_prices<C: PriceCatalog + ?Sized>(resource: &mut Resource, catalog: &C) {
    if resource.is_excluded() {
        return;
    }

    let name = &resource.name;
    resource.cost_components.retain_mut(|c| {
        if c.custom_price.is_some() {
            return true;
        }
        match catalog.lookup(&c.product_filter, c.price_filter.as_ref()) {
            Ok(price) => c.set_price(price),
            Err(e) if c.ignore_if_missing_price => {
                tracing::debug!("Removing {} from {name}: {e}", c.name);
                return false;
            }
            Err(e) => tracing::warn!("No price for {} in {name}: {e}", c.name),
        }
        true
    });

    for sub in &mut resource.sub_resources {
        apply_prices(sub, catalog);
    }
}

/// Price independent trees in parallel.
pub fn price_resources<C: PriceCatalog + ?Sized>(resources: &mut [Resource], catalog: &C) {
    resources
        .par_iter_mut()
        .for_each(|r| apply_prices(r, catalog));
}
