//! State → district filter cascade.
//!
//! A [`RegionFilter`] only ever holds a district that belongs to the selected
//! state. Options are derived from the master facility index, which arrives
//! lazily after the first successful sync cycle; until then no state can be
//! chosen and the district stays `All`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

use crate::api::Facility;
use crate::ALL_REGIONS;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Region {
    #[default]
    All,
    Named(String),
}

impl Region {
    /// Parses a selector value. Blank input and the `"All"` sentinel both
    /// mean no restriction.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value == ALL_REGIONS {
            Self::All
        } else {
            Self::Named(value.to_string())
        }
    }

    #[must_use]
    pub const fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::All => ALL_REGIONS,
            Self::Named(name) => name,
        }
    }
}

impl From<String> for Region {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<Region> for String {
    fn from(region: Region) -> Self {
        match region {
            Region::All => ALL_REGIONS.to_string(),
            Region::Named(name) => name,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionFilter {
    state: Region,
    district: Region,
}

impl RegionFilter {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    pub(crate) fn scoped(state: Region, district: Region) -> Self {
        Self { state, district }
    }

    #[must_use]
    pub const fn state(&self) -> &Region {
        &self.state
    }

    #[must_use]
    pub const fn district(&self) -> &Region {
        &self.district
    }
}

impl fmt::Display for RegionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.state, self.district)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterChange {
    Unchanged,
    Changed,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("unknown state '{0}'")]
    UnknownState(String),

    #[error("district '{district}' is not part of state '{state}'")]
    UnknownDistrict { state: Region, district: String },
}

/// Trims a backend region name, the same way [`Region::parse`] trims a
/// selector value. Blank names and the `"All"` sentinel are not options.
fn usable(name: &str) -> Option<&str> {
    let name = name.trim();
    (!name.is_empty() && name != ALL_REGIONS).then_some(name)
}

/// Sorted distinct states of the master index.
#[must_use]
pub fn derive_states(index: &[Facility]) -> Vec<String> {
    index
        .iter()
        .filter_map(|facility| usable(&facility.state))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Sorted distinct districts of facilities in `state`; empty for `All`.
#[must_use]
pub fn derive_districts(index: &[Facility], state: &Region) -> Vec<String> {
    let Region::Named(state) = state else {
        return Vec::new();
    };

    index
        .iter()
        .filter(|facility| facility.state.trim() == state.as_str())
        .filter_map(|facility| usable(&facility.district))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct FilterCascade {
    filter: RegionFilter,
    master_index: Vec<Facility>,
    state_options: Vec<String>,
    district_options: Vec<String>,
}

impl FilterCascade {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn filter(&self) -> &RegionFilter {
        &self.filter
    }

    #[must_use]
    pub fn state_options(&self) -> &[String] {
        &self.state_options
    }

    #[must_use]
    pub fn district_options(&self) -> &[String] {
        &self.district_options
    }

    #[must_use]
    pub fn master_index_is_empty(&self) -> bool {
        self.master_index.is_empty()
    }

    #[must_use]
    pub fn master_index_len(&self) -> usize {
        self.master_index.len()
    }

    pub fn load_master_index(&mut self, facilities: Vec<Facility>) {
        self.state_options = derive_states(&facilities);
        self.master_index = facilities;
        self.resync();
    }

    pub fn select_state(&mut self, state: Region) -> Result<FilterChange, FilterError> {
        if state == self.filter.state {
            return Ok(FilterChange::Unchanged);
        }
        if let Region::Named(name) = &state {
            if !self.state_options.contains(name) {
                return Err(FilterError::UnknownState(name.clone()));
            }
        }

        self.filter.state = state;
        self.resync();
        Ok(FilterChange::Changed)
    }

    pub fn select_district(&mut self, district: Region) -> Result<FilterChange, FilterError> {
        if district == self.filter.district {
            return Ok(FilterChange::Unchanged);
        }
        if let Region::Named(name) = &district {
            if !self.district_options.contains(name) {
                return Err(FilterError::UnknownDistrict {
                    state: self.filter.state.clone(),
                    district: name.clone(),
                });
            }
        }

        self.filter.district = district;
        Ok(FilterChange::Changed)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn resync(&mut self) {
        self.district_options = derive_districts(&self.master_index, &self.filter.state);
        if let Region::Named(district) = &self.filter.district {
            if !self.district_options.contains(district) {
                self.filter.district = Region::All;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn facility(state: &str, district: &str) -> Facility {
        Facility {
            facility_id: format!("{state}-{district}"),
            state: state.into(),
            district: district.into(),
            ..Facility::default()
        }
    }

    fn sample_index() -> Vec<Facility> {
        vec![
            facility("Kerala", "Kochi"),
            facility("Kerala", "Thrissur"),
            facility("Kerala", "Kochi"),
            facility("Bihar", "Patna"),
            facility("Assam", "Jorhat"),
            facility("Assam", ""),
        ]
    }

    fn named(value: &str) -> Region {
        Region::Named(value.into())
    }

    #[test]
    fn test_region_parse_treats_blank_and_sentinel_as_all() {
        assert_eq!(Region::parse("All"), Region::All);
        assert_eq!(Region::parse("  "), Region::All);
        assert_eq!(Region::parse(" Kerala "), named("Kerala"));
    }

    #[test]
    fn test_region_serializes_as_plain_string() {
        let filter = RegionFilter::scoped(named("Kerala"), Region::All);
        let json = serde_json::to_value(&filter).unwrap();
        assert_eq!(json, serde_json::json!({"state": "Kerala", "district": "All"}));
    }

    #[test]
    fn test_derive_districts_sorted_and_unique() {
        let index = sample_index();
        assert_eq!(
            derive_districts(&index, &named("Kerala")),
            vec!["Kochi".to_string(), "Thrissur".to_string()]
        );
        assert_eq!(derive_districts(&index, &named("Assam")), vec!["Jorhat"]);
        assert!(derive_districts(&index, &Region::All).is_empty());
        assert!(derive_districts(&index, &named("Goa")).is_empty());
    }

    #[test]
    fn test_derive_states_sorted_and_unique() {
        assert_eq!(
            derive_states(&sample_index()),
            vec!["Assam".to_string(), "Bihar".to_string(), "Kerala".to_string()]
        );
    }

    #[test]
    fn test_padded_backend_names_are_selectable() {
        let mut cascade = FilterCascade::new();
        cascade.load_master_index(vec![
            facility(" Kerala ", "Kochi "),
            facility("Kerala", " Thrissur"),
        ]);
        assert_eq!(cascade.state_options(), ["Kerala".to_string()]);

        cascade.select_state(Region::parse(" Kerala ")).unwrap();
        assert_eq!(
            cascade.district_options(),
            ["Kochi".to_string(), "Thrissur".to_string()]
        );
        assert_eq!(
            cascade.select_district(Region::parse("Kochi ")),
            Ok(FilterChange::Changed)
        );
    }

    #[test]
    fn test_state_change_resets_invalid_district() {
        let mut cascade = FilterCascade::new();
        cascade.load_master_index(sample_index());

        cascade.select_state(named("Kerala")).unwrap();
        cascade.select_district(named("Thrissur")).unwrap();
        assert_eq!(cascade.filter().district(), &named("Thrissur"));

        cascade.select_state(named("Bihar")).unwrap();
        assert_eq!(cascade.filter().district(), &Region::All);
        assert_eq!(cascade.district_options(), ["Patna".to_string()]);
    }

    #[test]
    fn test_returning_to_all_states_clears_district() {
        let mut cascade = FilterCascade::new();
        cascade.load_master_index(sample_index());
        cascade.select_state(named("Kerala")).unwrap();
        cascade.select_district(named("Kochi")).unwrap();

        cascade.select_state(Region::All).unwrap();
        assert_eq!(cascade.filter(), &RegionFilter::all());
        assert!(cascade.district_options().is_empty());
    }

    #[test]
    fn test_rejects_unknown_selections() {
        let mut cascade = FilterCascade::new();
        cascade.load_master_index(sample_index());

        assert_eq!(
            cascade.select_state(named("Atlantis")),
            Err(FilterError::UnknownState("Atlantis".into()))
        );
        assert!(matches!(
            cascade.select_district(named("Kochi")),
            Err(FilterError::UnknownDistrict { .. })
        ));
        cascade.select_state(named("Bihar")).unwrap();
        assert!(cascade.select_district(named("Kochi")).is_err());
        assert_eq!(cascade.filter(), &RegionFilter::scoped(named("Bihar"), Region::All));
    }

    #[test]
    fn test_reselecting_is_unchanged() {
        let mut cascade = FilterCascade::new();
        cascade.load_master_index(sample_index());
        assert_eq!(cascade.select_state(Region::All), Ok(FilterChange::Unchanged));
        cascade.select_state(named("Kerala")).unwrap();
        assert_eq!(
            cascade.select_state(named("Kerala")),
            Ok(FilterChange::Unchanged)
        );
    }

    #[test]
    fn test_no_state_selectable_before_master_index() {
        let mut cascade = FilterCascade::new();
        assert!(cascade.master_index_is_empty());
        assert!(cascade.state_options().is_empty());
        assert!(cascade.select_state(named("Kerala")).is_err());
        assert_eq!(cascade.filter(), &RegionFilter::all());
    }

    #[test]
    fn test_reset_drops_index_and_filter() {
        let mut cascade = FilterCascade::new();
        cascade.load_master_index(sample_index());
        cascade.select_state(named("Kerala")).unwrap();
        cascade.reset();
        assert!(cascade.master_index_is_empty());
        assert_eq!(cascade.filter(), &RegionFilter::all());
    }

    #[derive(Debug, Clone)]
    enum Selection {
        State(String),
        District(String),
        AllStates,
        AllDistricts,
    }

    fn region_name() -> impl Strategy<Value = String> {
        prop::sample::select(vec!["North", "South", "East", "West", "Central"])
            .prop_map(str::to_string)
    }

    fn master_index() -> impl Strategy<Value = Vec<Facility>> {
        prop::collection::vec((region_name(), region_name()), 0..24).prop_map(|pairs| {
            pairs
                .into_iter()
                .map(|(state, district)| facility(&state, &format!("{district}-{state}")))
                .collect()
        })
    }

    fn selection() -> impl Strategy<Value = Selection> {
        prop_oneof![
            region_name().prop_map(Selection::State),
            (region_name(), region_name())
                .prop_map(|(district, state)| Selection::District(format!("{district}-{state}"))),
            Just(Selection::AllStates),
            Just(Selection::AllDistricts),
        ]
    }

    proptest! {
        #[test]
        fn prop_filter_never_holds_invalid_district(
            index in master_index(),
            load_after in 0usize..8,
            selections in prop::collection::vec(selection(), 0..32),
        ) {
            let mut cascade = FilterCascade::new();
            for (step, pick) in selections.into_iter().enumerate() {
                if step == load_after {
                    cascade.load_master_index(index.clone());
                }
                let _ = match pick {
                    Selection::State(name) => cascade.select_state(Region::Named(name)),
                    Selection::District(name) => cascade.select_district(Region::Named(name)),
                    Selection::AllStates => cascade.select_state(Region::All),
                    Selection::AllDistricts => cascade.select_district(Region::All),
                };

                let filter = cascade.filter();
                match filter.state() {
                    Region::All => prop_assert_eq!(filter.district(), &Region::All),
                    Region::Named(_) => {
                        if let Region::Named(district) = filter.district() {
                            let valid = derive_districts(&index, filter.state());
                            prop_assert!(valid.contains(district));
                        }
                    }
                }
            }
        }
    }
}
