use crate::error::Error;
use crate::schema::PriceFilter;

const TERM_FIELD: &str = "reserved_instance_term";
const PAYMENT_FIELD: &str = "reserved_instance_payment_option";
const OFFERING_CLASS_FIELD: &str = "reserved_instance_type";

/// Reservation length, as written in usage files (`1_year`, `3_year`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Term {
    OneYear,
    ThreeYear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentOption {
    AllUpfront,
    PartialUpfront,
    NoUpfront,
    HeavyUtilization,
    MediumUtilization,
    LightUtilization,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OfferingClass {
    Standard,
    Convertible,
}

impl Term {
    pub fn key(self) -> &'static str {
        match self {
            Term::OneYear => "1_year",
            Term::ThreeYear => "3_year",
        }
    }
}

impl PaymentOption {
    pub fn key(self) -> &'static str {
        match self {
            PaymentOption::AllUpfront => "all_upfront",
            PaymentOption::PartialUpfront => "partial_upfront",
            PaymentOption::NoUpfront => "no_upfront",
            PaymentOption::HeavyUtilization => "heavy_utilization",
            PaymentOption::MediumUtilization => "medium_utilization",
            PaymentOption::LightUtilization => "light_utilization",
        }
    }

    pub fn is_legacy(self) -> bool {
        matches!(
            self,
            PaymentOption::HeavyUtilization
                | PaymentOption::MediumUtilization
                | PaymentOption::LightUtilization
        )
    }
}

impl OfferingClass {
    pub fn key(self) -> &'static str {
        match self {
            OfferingClass::Standard => "standard",
            OfferingClass::Convertible => "convertible",
        }
    }
}

/// True for the utilization-based payment options older cache node
/// families were sold with. Their prices are missing in many regions.
pub fn is_legacy_payment_option(key: &str) -> bool {
    [
        PaymentOption::HeavyUtilization,
        PaymentOption::MediumUtilization,
        PaymentOption::LightUtilization,
    ]
    .iter()
    .any(|p| p.key() == key)
}

/// Payment vocabulary used instead of the regular one for a set of node families.
#[derive(Debug)]
pub struct LegacyVocabulary {
    pub families: &'static [&'static str],
    pub payment_options: &'static [(PaymentOption, &'static str)],
}

/// Maps reservation choices to the labels one catalog service uses.
///
/// Entry order is the order accepted values are listed in warnings.
#[derive(Debug)]
pub struct ReservationTables {
    pub terms: &'static [(Term, &'static str)],
    pub payment_options: &'static [(PaymentOption, &'static str)],
    /// Empty when the service has no offering classes.
    pub offering_classes: &'static [OfferingClass],
    pub legacy: Option<LegacyVocabulary>,
}

const TERMS: &[(Term, &str)] = &[(Term::OneYear, "1yr"), (Term::ThreeYear, "3yr")];

const SPACED_PAYMENT_OPTIONS: &[(PaymentOption, &str)] = &[
    (PaymentOption::NoUpfront, "No Upfront"),
    (PaymentOption::PartialUpfront, "Partial Upfront"),
    (PaymentOption::AllUpfront, "All Upfront"),
];

static EC2_INSTANCE: ReservationTables = ReservationTables {
    terms: TERMS,
    payment_options: SPACED_PAYMENT_OPTIONS,
    offering_classes: &[OfferingClass::Convertible, OfferingClass::Standard],
    legacy: None,
};

// Dedicated host prices spell the payment option without spaces.
static EC2_HOST: ReservationTables = ReservationTables {
    terms: TERMS,
    payment_options: &[
        (PaymentOption::NoUpfront, "NoUpfront"),
        (PaymentOption::PartialUpfront, "PartialUpfront"),
        (PaymentOption::AllUpfront, "AllUpfront"),
    ],
    offering_classes: &[],
    legacy: None,
};

static RDS: ReservationTables = ReservationTables {
    terms: TERMS,
    payment_options: SPACED_PAYMENT_OPTIONS,
    offering_classes: &[],
    legacy: None,
};

static ELASTICACHE: ReservationTables = ReservationTables {
    terms: TERMS,
    payment_options: SPACED_PAYMENT_OPTIONS,
    offering_classes: &[],
    legacy: Some(LegacyVocabulary {
        families: &["t2", "m3", "m4", "r3", "r4"],
        payment_options: &[
            (PaymentOption::HeavyUtilization, "Heavy Utilization"),
            (PaymentOption::MediumUtilization, "Medium Utilization"),
            (PaymentOption::LightUtilization, "Light Utilization"),
        ],
    }),
};

impl ReservationTables {
    pub fn ec2_instance() -> &'static Self {
        &EC2_INSTANCE
    }

    pub fn ec2_host() -> &'static Self {
        &EC2_HOST
    }

    pub fn rds() -> &'static Self {
        &RDS
    }

    pub fn elasticache() -> &'static Self {
        &ELASTICACHE
    }

    fn requires_offering_class(&self) -> bool {
        !self.offering_classes.is_empty()
    }

    /// Whether `node_type` (`cache.m4.large`, `m4.large`, ...) belongs to a
    /// legacy family.
    pub fn is_legacy_node_type(&self, node_type: &str) -> bool {
        let Some(legacy) = &self.legacy else {
            return false;
        };
        let family = node_type
            .strip_prefix("cache.")
            .or_else(|| node_type.strip_prefix("db."))
            .unwrap_or(node_type)
            .split('.')
            .next()
            .unwrap_or_default();
        legacy.families.contains(&family)
    }
}

/// A rejected reservation: the reason plus the on-demand filter to use instead.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveError {
    pub error: Error,
    pub fallback: PriceFilter,
}

/// Turns user-supplied reservation choices into a reserved [`PriceFilter`].
#[derive(Debug, Clone, Copy)]
pub struct ReservationResolver<'a> {
    tables: &'a ReservationTables,
    node_type: Option<&'a str>,
}

impl<'a> ReservationResolver<'a> {
    pub fn new(tables: &'a ReservationTables) -> Self {
        Self {
            tables,
            node_type: None,
        }
    }

    /// Node type used to pick the legacy payment vocabulary.
    pub fn for_node_type(mut self, node_type: &'a str) -> Self {
        self.node_type = Some(node_type);
        self
    }

    fn uses_legacy_vocabulary(&self) -> bool {
        self.node_type
            .is_some_and(|n| self.tables.is_legacy_node_type(n))
    }

    fn payment_table(&self) -> &'static [(PaymentOption, &'static str)] {
        match &self.tables.legacy {
            Some(legacy) if self.uses_legacy_vocabulary() => legacy.payment_options,
            _ => self.tables.payment_options,
        }
    }

    /// Validate offering class (when the service has them), then term, then
    /// payment option. The first invalid value wins.
    pub fn resolve(
        &self,
        term: &str,
        payment_option: &str,
        offering_class: Option<&str>,
    ) -> Result<PriceFilter, ResolveError> {
        let mut offering_class_label = None;
        if self.tables.requires_offering_class() {
            let value = offering_class.unwrap_or_default();
            let class = self
                .tables
                .offering_classes
                .iter()
                .find(|c| c.key() == value)
                .ok_or_else(|| {
                    rejected(
                        OFFERING_CLASS_FIELD,
                        value,
                        self.tables.offering_classes.iter().map(|c| c.key()).collect(),
                    )
                })?;
            offering_class_label = Some(class.key().to_string());
        }

        let (_, term_label) = self
            .tables
            .terms
            .iter()
            .find(|(t, _)| t.key() == term)
            .ok_or_else(|| {
                rejected(
                    TERM_FIELD,
                    term,
                    self.tables.terms.iter().map(|(t, _)| t.key()).collect(),
                )
            })?;

        let payments = self.payment_table();
        let (_, payment_label) = payments
            .iter()
            .find(|(p, _)| p.key() == payment_option)
            .ok_or_else(|| {
                rejected(
                    PAYMENT_FIELD,
                    payment_option,
                    payments.iter().map(|(p, _)| p.key()).collect(),
                )
            })?;

        Ok(PriceFilter {
            purchase_option: Some("reserved".to_string()),
            start_usage_amount: Some("0".to_string()),
            term_length: Some(term_label.to_string()),
            term_purchase_option: Some(payment_label.to_string()),
            term_offering_class: offering_class_label,
            ..PriceFilter::default()
        })
    }

    /// The region-availability warning for a legacy reservation, if any.
    pub fn legacy_warning(&self, payment_option: &str) -> Option<Error> {
        let node_type = self.node_type?;
        if self.uses_legacy_vocabulary() && is_legacy_payment_option(payment_option) {
            Some(Error::UnsupportedLegacyCombination {
                node_type: node_type.to_string(),
                payment_option: payment_option.to_string(),
            })
        } else {
            None
        }
    }

    /// Resolve and log instead of failing: an invalid combination yields the
    /// on-demand filter, a legacy one yields the reserved filter plus a warning.
    pub fn resolve_or_fallback(
        &self,
        term: &str,
        payment_option: &str,
        offering_class: Option<&str>,
    ) -> PriceFilter {
        match self.resolve(term, payment_option, offering_class) {
            Ok(filter) => {
                if let Some(warning) = self.legacy_warning(payment_option) {
                    tracing::warn!("{warning}");
                }
                filter
            }
            Err(e) => {
                tracing::warn!("{}", e.error);
                e.fallback
            }
        }
    }
}

fn rejected(field: &'static str, value: &str, accepted: Vec<&'static str>) -> ResolveError {
    ResolveError {
        error: Error::InvalidReservationParameter {
            field,
            value: value.to_string(),
            accepted,
        },
        fallback: PriceFilter::on_demand(),
    }
}
