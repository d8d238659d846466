use serde::{Deserialize, Serialize};

use crate::{error::DataLoadError, unit::Attribute};

/// The kind of value a field must hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Numeric,
}

/// Required field names of the attribute table, validated once at load time.
///
/// Field names are matched case- and spelling-exact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schema {
    pub code: String,
    pub name: String,
    pub district: String,
    pub population: String,
    pub households: String,
    pub income: String,
    pub tertiary: String,
    pub indigenous: String,
    pub pop_density: String,
    pub aging_index: String,
    pub sex_ratio: String,
}

impl Default for Schema {
    /// Field names of the Hsinchu City village dataset.
    fn default() -> Self {
        Self {
            code: "VILLCODE".into(),
            name: "VILLNAME".into(),
            district: "TOWNNAME".into(),
            population: "POPULATION".into(),
            households: "HOUSEHOLD".into(),
            income: "INCOME".into(),
            tertiary: "TERTIARY".into(),
            indigenous: "INDIGENOUS".into(),
            pop_density: "POP_DENS".into(),
            aging_index: "AgingIndex".into(),
            sex_ratio: "SEX_RATIO".into(),
        }
    }
}

impl Schema {
    /// Source field feeding a base attribute.
    pub fn field(&self, attribute: Attribute) -> &str {
        match attribute {
            Attribute::Population => &self.population,
            Attribute::Households => &self.households,
            Attribute::Income => &self.income,
            Attribute::Tertiary => &self.tertiary,
            Attribute::Indigenous => &self.indigenous,
            Attribute::PopDensity => &self.pop_density,
            Attribute::AgingIndex => &self.aging_index,
            Attribute::SexRatio => &self.sex_ratio,
        }
    }

    /// Every required field with its kind, identity fields first.
    pub fn required_fields(&self) -> Vec<(&str, FieldKind)> {
        [&self.code, &self.name, &self.district].into_iter()
            .map(|f| (f.as_str(), FieldKind::Text))
            .chain(Attribute::ALL.iter().map(|&a| (self.field(a), FieldKind::Numeric)))
            .collect()
    }

    /// Check that every required field is present, reporting all missing fields at once.
    pub fn validate<'a>(&self, present: impl IntoIterator<Item = &'a str>) -> Result<(), DataLoadError> {
        let present = present.into_iter().collect::<ahash::AHashSet<_>>();
        let missing = self.required_fields().into_iter()
            .filter(|(field, _)| !present.contains(field))
            .map(|(field, _)| field.to_string())
            .collect::<Vec<_>>();

        if missing.is_empty() { Ok(()) } else { Err(DataLoadError::MissingFields(missing)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HSINCHU_FIELDS: [&str; 12] = [
        "VILLCODE", "VILLNAME", "TOWNNAME", "COUNTYNAME", "POPULATION", "HOUSEHOLD",
        "INCOME", "TERTIARY", "INDIGENOUS", "POP_DENS", "AgingIndex", "SEX_RATIO",
    ];

    #[test]
    fn accepts_complete_table() {
        assert!(Schema::default().validate(HSINCHU_FIELDS).is_ok());
    }

    #[test]
    fn reports_all_missing_fields() {
        let fields = HSINCHU_FIELDS.iter().copied()
            .filter(|&f| f != "INCOME" && f != "AgingIndex");
        match Schema::default().validate(fields) {
            Err(DataLoadError::MissingFields(missing)) => assert_eq!(missing, vec!["INCOME", "AgingIndex"]),
            other => panic!("expected MissingFields, got {other:?}"),
        }
    }

    #[test]
    fn field_names_are_case_sensitive() {
        let fields = HSINCHU_FIELDS.iter().map(|&f| if f == "AgingIndex" { "AGINGINDEX" } else { f });
        assert!(matches!(
            Schema::default().validate(fields),
            Err(DataLoadError::MissingFields(missing)) if missing == vec!["AgingIndex"]
        ));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let schema: Schema = serde_json::from_str(r#"{ "income": "INC_TOTAL" }"#).unwrap();
        assert_eq!(schema.income, "INC_TOTAL");
        assert_eq!(schema.population, "POPULATION");
    }
}
