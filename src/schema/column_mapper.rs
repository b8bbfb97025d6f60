// src/schema/column_mapper.rs - Heuristic discovery of address columns on foreign tables
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalField {
    Address,
    City,
    State,
    Zip,
}

impl LogicalField {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalField::Address => "address",
            LogicalField::City => "city",
            LogicalField::State => "state",
            LogicalField::Zip => "zip",
        }
    }

    pub fn patterns(&self) -> &'static FieldPatterns {
        match self {
            LogicalField::Address => &ADDRESS_PATTERNS,
            LogicalField::City => &CITY_PATTERNS,
            LogicalField::State => &STATE_PATTERNS,
            LogicalField::Zip => &ZIP_PATTERNS,
        }
    }
}

/// Ordered lookup rules for one logical field. Exact names are tried first,
/// then substrings; every rule is tried against all columns before the next
/// rule is considered, so list order decides ties.
#[derive(Debug)]
pub struct FieldPatterns {
    pub exact: &'static [&'static str],
    pub contains: &'static [&'static str],
    pub exclude: &'static [&'static str],
}

pub static ADDRESS_PATTERNS: FieldPatterns = FieldPatterns {
    exact: &[],
    contains: &["address", "street", "addr", "street_address", "address1", "address_1"],
    exclude: &["email"],
};

pub static CITY_PATTERNS: FieldPatterns = FieldPatterns {
    exact: &[],
    contains: &["city", "town", "municipality"],
    exclude: &["ethnicity", "capacity"],
};

pub static STATE_PATTERNS: FieldPatterns = FieldPatterns {
    exact: &["state", "st", "province"],
    contains: &["state"],
    exclude: &["estate"],
};

pub static ZIP_PATTERNS: FieldPatterns = FieldPatterns {
    exact: &[],
    contains: &["zip", "postal", "postcode"],
    exclude: &[],
};

impl FieldPatterns {
    fn is_excluded(&self, lowered: &str) -> bool {
        self.exclude.iter().any(|x| lowered.contains(x))
    }

    /// First column satisfying the earliest matching rule.
    pub fn find<'a>(&self, columns: &'a [String]) -> Option<&'a String> {
        let lowered: Vec<String> = columns.iter().map(|c| c.trim().to_lowercase()).collect();
        let candidates = || {
            columns
                .iter()
                .zip(lowered.iter())
                .filter(|(_, l)| !self.is_excluded(l))
        };

        for pattern in self.exact {
            if let Some((col, _)) = candidates().find(|(_, l)| l.as_str() == *pattern) {
                return Some(col);
            }
        }
        for pattern in self.contains {
            if let Some((col, _)) = candidates().find(|(_, l)| l.contains(pattern)) {
                return Some(col);
            }
        }
        None
    }
}

/// Lowercases and drops whitespace, underscores and hyphens so that
/// `Zip Code`, `zip_code` and `ZIPCODE` compare equal.
pub fn normalize_column_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Resolved physical columns for the four logical address fields of one table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColumnMapping {
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub columns: Vec<String>,
}

impl ColumnMapping {
    pub fn from_columns(columns: Vec<String>) -> Self {
        let pick = |field: LogicalField| field.patterns().find(&columns).cloned();
        Self {
            address: pick(LogicalField::Address),
            city: pick(LogicalField::City),
            state: pick(LogicalField::State),
            zip: pick(LogicalField::Zip),
            columns,
        }
    }

    pub fn get(&self, field: LogicalField) -> Option<&str> {
        match field {
            LogicalField::Address => self.address.as_deref(),
            LogicalField::City => self.city.as_deref(),
            LogicalField::State => self.state.as_deref(),
            LogicalField::Zip => self.zip.as_deref(),
        }
    }

    /// Required fields (address, state) that could not be resolved.
    pub fn missing_required(&self) -> Vec<LogicalField> {
        [LogicalField::Address, LogicalField::State]
            .into_iter()
            .filter(|f| self.get(*f).is_none())
            .collect()
    }

    pub fn is_matchable(&self) -> bool {
        self.missing_required().is_empty()
    }
}

impl fmt::Display for ColumnMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for field in [
            LogicalField::Address,
            LogicalField::City,
            LogicalField::State,
            LogicalField::Zip,
        ] {
            writeln!(f, "{:<8} -> {}", field.as_str(), self.get(field).unwrap_or("(not found)"))?;
        }
        write!(f, "columns: {}", self.columns.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_pinellas_style_columns() {
        let mapping = ColumnMapping::from_columns(cols(&[
            "ACCOUNT_ID",
            "Address",
            "City",
            "State",
            "Zip Code",
            "Active Customer",
            "Media",
        ]));
        assert_eq!(mapping.address.as_deref(), Some("Address"));
        assert_eq!(mapping.city.as_deref(), Some("City"));
        assert_eq!(mapping.state.as_deref(), Some("State"));
        assert_eq!(mapping.zip.as_deref(), Some("Zip Code"));
        assert!(mapping.is_matchable());
    }

    #[test]
    fn test_pattern_order_beats_column_order() {
        let mapping = ColumnMapping::from_columns(cols(&["street_name", "site_address", "st"]));
        assert_eq!(mapping.address.as_deref(), Some("site_address"));
        assert_eq!(mapping.state.as_deref(), Some("st"));
    }

    #[test]
    fn test_state_skips_estate_columns() {
        let mapping =
            ColumnMapping::from_columns(cols(&["addr", "real_estate_value", "State_Code"]));
        assert_eq!(mapping.state.as_deref(), Some("State_Code"));

        let only_estate = ColumnMapping::from_columns(cols(&["addr", "EstateTax"]));
        assert_eq!(only_estate.state, None);
        assert!(!only_estate.is_matchable());
    }

    #[test]
    fn test_email_column_is_not_an_address() {
        let mapping = ColumnMapping::from_columns(cols(&["email_address", "street1", "state"]));
        assert_eq!(mapping.address.as_deref(), Some("street1"));
    }

    #[test]
    fn test_missing_required_fields_are_reported() {
        let mapping = ColumnMapping::from_columns(cols(&["city", "zip"]));
        assert_eq!(
            mapping.missing_required(),
            vec![LogicalField::Address, LogicalField::State]
        );
    }

    #[test]
    fn test_normalize_column_name() {
        assert_eq!(normalize_column_name("Zip Code"), "zipcode");
        assert_eq!(normalize_column_name("zip_code"), "zipcode");
        assert_eq!(normalize_column_name(" Master-Address "), "masteraddress");
    }
}
