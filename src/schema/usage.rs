use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::quantity::Quantity;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageValueType {
    Int,
    Float,
    String,
    SubResourceUsage,
}

/// A usage override value as it comes out of a usage file or an estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UsageValue {
    Int(i64),
    Float(f64),
    String(String),
    Items(BTreeMap<String, UsageValue>),
}

/// One usage key a resource accepts, with its type and default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageItem {
    pub key: String,
    pub value_type: UsageValueType,
    pub default_value: UsageDefault,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UsageDefault {
    Value(UsageValue),
    Items(Vec<UsageItem>),
}

impl UsageItem {
    pub fn int(key: &str, default: i64) -> Self {
        Self {
            key: key.to_string(),
            value_type: UsageValueType::Int,
            default_value: UsageDefault::Value(UsageValue::Int(default)),
        }
    }

    pub fn float(key: &str, default: f64) -> Self {
        Self {
            key: key.to_string(),
            value_type: UsageValueType::Float,
            default_value: UsageDefault::Value(UsageValue::Float(default)),
        }
    }

    pub fn string(key: &str, default: &str) -> Self {
        Self {
            key: key.to_string(),
            value_type: UsageValueType::String,
            default_value: UsageDefault::Value(UsageValue::String(default.to_string())),
        }
    }

    pub fn sub_resource(key: &str, items: Vec<UsageItem>) -> Self {
        Self {
            key: key.to_string(),
            value_type: UsageValueType::SubResourceUsage,
            default_value: UsageDefault::Items(items),
        }
    }
}

/// Usage overrides for a single resource address.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageData {
    pub address: String,
    pub attributes: HashMap<String, UsageValue>,
}

impl UsageData {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: UsageValue) -> Self {
        self.attributes.insert(key.to_string(), value);
        self
    }

    pub fn set(&mut self, key: &str, value: UsageValue) {
        self.attributes.insert(key.to_string(), value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// Keep every key already present and fill the gaps from `other`.
    pub fn merge(&self, other: &UsageData) -> UsageData {
        let mut merged = self.clone();
        for (k, v) in &other.attributes {
            merged.attributes.entry(k.clone()).or_insert_with(|| v.clone());
        }
        merged
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.attributes.get(key)? {
            UsageValue::Int(v) => Some(*v),
            UsageValue::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn get_float(&self, key: &str) -> Option<f64> {
        match self.attributes.get(key)? {
            UsageValue::Int(v) => Some(*v as f64),
            UsageValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.attributes.get(key)? {
            UsageValue::String(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// A numeric usage value as a quantity; missing or non-numeric keys are
    /// `Unset`, not zero.
    pub fn get_decimal(&self, key: &str) -> Quantity {
        match self.attributes.get(key) {
            Some(UsageValue::Int(v)) => Quantity::Value(Decimal::from(*v)),
            Some(UsageValue::Float(v)) => Decimal::from_f64(*v).into(),
            _ => Quantity::Unset,
        }
    }

    /// Nested usage for a sub-resource, addressed as `parent.key`.
    pub fn get_items(&self, key: &str) -> Option<UsageData> {
        match self.attributes.get(key)? {
            UsageValue::Items(items) => Some(UsageData {
                address: format!("{}.{}", self.address, key),
                attributes: items.clone().into_iter().collect(),
            }),
            _ => None,
        }
    }
}

/// Usage overrides for a whole project, keyed by resource address.
#[derive(Debug, Clone, Default)]
pub struct UsageMap {
    resources: HashMap<String, UsageData>,
}

impl UsageMap {
    pub fn get(&self, address: &str) -> Option<&UsageData> {
        self.resources.get(address)
    }

    pub fn insert(&mut self, usage: UsageData) {
        self.resources.insert(usage.address.clone(), usage);
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Parse a usage file: one TOML table per resource address.
    ///
    /// ```toml
    /// ["aws_instance.web"]
    /// operating_system = "windows"
    /// reserved_instance_term = "1_year"
    /// ```
    pub fn from_toml_str(data: &str) -> std::result::Result<Self, toml::de::Error> {
        let raw: BTreeMap<String, BTreeMap<String, UsageValue>> = toml::from_str(data)?;
        let mut map = UsageMap::default();
        for (address, attributes) in raw {
            map.insert(UsageData {
                address,
                attributes: attributes.into_iter().collect(),
            });
        }
        Ok(map)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_toml_str(&data).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}
