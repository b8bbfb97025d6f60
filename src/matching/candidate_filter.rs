// src/matching/candidate_filter.rs - Bounded golden-source candidate queries from extracted criteria
use serde::{Deserialize, Serialize};

use crate::models::SearchCriteria;
use crate::schema::ColumnMapping;
use crate::store::{ContainsPredicate, FilterQuery, TableRef};

/// Physical names of the five golden-source columns every candidate exposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldenColumns {
    pub address1: String,
    pub address2: String,
    pub city: String,
    pub state: String,
    pub zip: String,
}

impl Default for GoldenColumns {
    fn default() -> Self {
        Self {
            address1: "address1".to_string(),
            address2: "address2".to_string(),
            city: "Mailing City".to_string(),
            state: "state".to_string(),
            zip: "zipcode".to_string(),
        }
    }
}

impl GoldenColumns {
    pub fn all(&self) -> Vec<String> {
        vec![
            self.address1.clone(),
            self.address2.clone(),
            self.city.clone(),
            self.state.clone(),
            self.zip.clone(),
        ]
    }

    /// Mapping used when scoring golden rows; no discovery is needed because
    /// the projection is fixed.
    pub fn mapping(&self) -> ColumnMapping {
        ColumnMapping {
            address: Some(self.address1.clone()),
            city: Some(self.city.clone()),
            state: Some(self.state.clone()),
            zip: Some(self.zip.clone()),
            columns: self.all(),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// State and city narrow the search (AND); street name and street type are
/// alternatives (OR) because extracted abbreviations rarely match verbatim.
pub fn build_candidate_query(
    criteria: &SearchCriteria,
    table: &TableRef,
    columns: &GoldenColumns,
    limit: usize,
) -> FilterQuery {
    let mut all_of = Vec::new();
    if let Some(state) = non_blank(&criteria.state) {
        all_of.push(ContainsPredicate::new(&columns.state, state));
    }
    if let Some(city) = non_blank(&criteria.city) {
        all_of.push(ContainsPredicate::new(&columns.city, city));
    }

    let any_of = [&criteria.street_name, &criteria.street_type]
        .into_iter()
        .filter_map(non_blank)
        .map(|needle| ContainsPredicate::new(&columns.address1, needle))
        .collect();

    FilterQuery {
        table: table.clone(),
        columns: columns.all(),
        all_of,
        any_of,
        limit,
    }
}
