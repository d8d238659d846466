use std::{fmt, sync::Arc};

use geo::MultiPolygon;
use serde::Serialize;

use crate::Value;

/// Stable key for a village across tables.
/// Keeps the original code text (with leading zeros) without repeated owned Strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct UnitCode(pub Arc<str>);

impl UnitCode {
    pub fn new(code: &str) -> Self { Self(Arc::from(code)) }

    #[inline] pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for UnitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Identity of a spatial unit: its code, its own name, and its parent district.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitIdentity {
    pub code: UnitCode,
    pub name: Arc<str>,
    pub district: Arc<str>,
}

impl UnitIdentity {
    pub fn new(code: &str, name: &str, district: &str) -> Self {
        Self { code: UnitCode::new(code), name: Arc::from(name), district: Arc::from(district) }
    }
}

/// The base numeric attributes read from the source table.
/// Income is in thousands of TWD.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaseAttributes {
    pub population: Value,
    pub households: Value,
    pub income: Value,
    pub tertiary: Value,
    pub indigenous: Value,
    pub pop_density: Value,
    pub aging_index: Value,
    pub sex_ratio: Value,
}

/// Which base attribute a schema field feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Population,
    Households,
    Income,
    Tertiary,
    Indigenous,
    PopDensity,
    AgingIndex,
    SexRatio,
}

impl Attribute {
    pub const ALL: [Attribute; 8] = [
        Attribute::Population,
        Attribute::Households,
        Attribute::Income,
        Attribute::Tertiary,
        Attribute::Indigenous,
        Attribute::PopDensity,
        Attribute::AgingIndex,
        Attribute::SexRatio,
    ];

    /// Column name of this attribute in the analysis table.
    pub fn column(self) -> &'static str {
        match self {
            Attribute::Population => "POPULATION",
            Attribute::Households => "HOUSEHOLD",
            Attribute::Income => "INCOME",
            Attribute::Tertiary => "TERTIARY",
            Attribute::Indigenous => "INDIGENOUS",
            Attribute::PopDensity => "POP_DENS",
            Attribute::AgingIndex => "AgingIndex",
            Attribute::SexRatio => "SEX_RATIO",
        }
    }
}

impl BaseAttributes {
    #[inline]
    pub fn get(&self, attribute: Attribute) -> Value {
        match attribute {
            Attribute::Population => self.population,
            Attribute::Households => self.households,
            Attribute::Income => self.income,
            Attribute::Tertiary => self.tertiary,
            Attribute::Indigenous => self.indigenous,
            Attribute::PopDensity => self.pop_density,
            Attribute::AgingIndex => self.aging_index,
            Attribute::SexRatio => self.sex_ratio,
        }
    }

    /// Build from a lookup, attribute by attribute.
    pub fn from_fn(mut f: impl FnMut(Attribute) -> Value) -> Self {
        Self {
            population: f(Attribute::Population),
            households: f(Attribute::Households),
            income: f(Attribute::Income),
            tertiary: f(Attribute::Tertiary),
            indigenous: f(Attribute::Indigenous),
            pop_density: f(Attribute::PopDensity),
            aging_index: f(Attribute::AgingIndex),
            sex_ratio: f(Attribute::SexRatio),
        }
    }
}

/// One administrative village polygon with its attributes.
#[derive(Debug, Clone)]
pub struct SpatialUnit {
    pub identity: UnitIdentity,
    pub geometry: MultiPolygon<f64>,
    pub attributes: BaseAttributes,
}
