//! Reference tables consumed by the sampler and the fitting pipeline.
//!
//! The three tables (county metadata, hospital capacity, case observations)
//! are loaded once from CSV into an immutable [`ReferenceData`] that is
//! shared by reference across regions. Nothing mutates it after load, so
//! cross-region parallelism needs no locking.
use crate::error::{Error, Result};
use crate::prelude::{Day, Real};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Per-county demographic reference row.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CountyMetadata {
    pub fips: String,
    pub state: String,
    pub county: String,
    pub total_population: Real,
    pub population_density: Real,
    pub housing_density: Real,
}

/// Hospital capacity aggregated over all facilities of a county.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HospitalCapacity {
    pub num_licensed_beds: Real,
    pub num_staffed_beds: Real,
    pub num_icu_beds: Real,
    pub bed_utilization: Real,
    pub potential_increase_in_bed_capac: Real,
}

#[derive(Debug, Clone, Deserialize)]
struct HospitalRow {
    fips: String,
    #[serde(default)]
    num_licensed_beds: Real,
    #[serde(default)]
    num_staffed_beds: Real,
    #[serde(default)]
    num_icu_beds: Real,
    #[serde(default)]
    bed_utilization: Real,
    #[serde(default)]
    potential_increase_in_bed_capac: Real,
}

/// One cumulative case-count observation.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CaseRow {
    pub fips: String,
    pub date: NaiveDate,
    pub cases: Real,
}

/// County metadata joined with hospital capacity. Counties with no hospital
/// rows keep zeroed capacity; the caller decides how to treat that.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedCounty {
    pub metadata: CountyMetadata,
    pub capacity: HospitalCapacity,
    pub has_hospital_data: bool,
}

/// Read-only, load-once reference cache.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    counties: BTreeMap<String, CountyMetadata>,
    hospitals: BTreeMap<String, HospitalCapacity>,
    cases: BTreeMap<String, Vec<CaseRow>>,
}

impl ReferenceData {
    /// Load all three tables. Hospital rows are summed per fips; case rows
    /// are grouped per fips and sorted by date.
    pub fn load(
        county_path: impl AsRef<Path>,
        hospital_path: impl AsRef<Path>,
        case_path: impl AsRef<Path>,
    ) -> Result<Self> {
        let mut data = ReferenceData::default();

        let mut reader = csv::Reader::from_path(county_path)?;
        for row in reader.deserialize() {
            let row: CountyMetadata = row?;
            data.counties.insert(row.fips.clone(), row);
        }

        let mut reader = csv::Reader::from_path(hospital_path)?;
        for row in reader.deserialize() {
            let row: HospitalRow = row?;
            let entry = data.hospitals.entry(row.fips.clone()).or_default();
            entry.num_licensed_beds += row.num_licensed_beds;
            entry.num_staffed_beds += row.num_staffed_beds;
            entry.num_icu_beds += row.num_icu_beds;
            entry.bed_utilization += row.bed_utilization;
            entry.potential_increase_in_bed_capac += row.potential_increase_in_bed_capac;
        }

        let mut reader = csv::Reader::from_path(case_path)?;
        for row in reader.deserialize() {
            let row: CaseRow = row?;
            data.cases.entry(row.fips.clone()).or_default().push(row);
        }
        for rows in data.cases.values_mut() {
            rows.sort_by_key(|r| r.date);
        }

        Ok(data)
    }

    /// Build directly from rows, mostly for tests and adapters that load
    /// from somewhere other than CSV.
    pub fn from_rows(
        counties: Vec<CountyMetadata>,
        hospitals: Vec<(String, HospitalCapacity)>,
        mut cases: Vec<CaseRow>,
    ) -> Self {
        let mut data = ReferenceData::default();
        for c in counties {
            data.counties.insert(c.fips.clone(), c);
        }
        for (fips, cap) in hospitals {
            let entry = data.hospitals.entry(fips).or_default();
            entry.num_licensed_beds += cap.num_licensed_beds;
            entry.num_staffed_beds += cap.num_staffed_beds;
            entry.num_icu_beds += cap.num_icu_beds;
            entry.bed_utilization += cap.bed_utilization;
            entry.potential_increase_in_bed_capac += cap.potential_increase_in_bed_capac;
        }
        cases.sort_by(|a, b| (&a.fips, a.date).cmp(&(&b.fips, b.date)));
        for row in cases {
            data.cases.entry(row.fips.clone()).or_default().push(row);
        }
        data
    }

    pub fn county(&self, fips: &str) -> Result<&CountyMetadata> {
        self.counties.get(fips).ok_or_else(|| Error::MissingReference {
            fips: fips.to_string(),
        })
    }

    /// All counties of a state, matched case-insensitively.
    pub fn counties_in_state(&self, state: &str) -> Vec<&CountyMetadata> {
        self.counties
            .values()
            .filter(|c| c.state.eq_ignore_ascii_case(state))
            .collect()
    }

    /// County metadata merged with hospital capacity. Missing hospital rows
    /// zero the capacity fields; a missing county is a hard error since a
    /// parameter set without a population is meaningless.
    pub fn merged_county(&self, fips: &str) -> Result<MergedCounty> {
        let metadata = self.county(fips)?.clone();
        let (capacity, has_hospital_data) = match self.hospitals.get(fips) {
            Some(cap) => (cap.clone(), true),
            None => (HospitalCapacity::default(), false),
        };
        Ok(MergedCounty {
            metadata,
            capacity,
            has_hospital_data,
        })
    }

    /// Ordered (date, cumulative cases) observations for one region, possibly
    /// empty.
    pub fn cases(&self, fips: &str) -> &[CaseRow] {
        self.cases.get(fips).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Normalize a region's observations to (days since first observation,
    /// count) pairs, returning the first observation date alongside.
    pub fn case_series(&self, fips: &str) -> Option<(NaiveDate, Vec<(Day, Real)>)> {
        let rows = self.cases.get(fips)?;
        let first = rows.first()?.date;
        let series = rows
            .iter()
            .map(|r| ((r.date - first).num_days(), r.cases))
            .collect();
        Some((first, series))
    }
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use super::*;

    pub fn county(fips: &str, state: &str, name: &str, pop: Real) -> CountyMetadata {
        CountyMetadata {
            fips: fips.to_string(),
            state: state.to_string(),
            county: name.to_string(),
            total_population: pop,
            population_density: 250.0,
            housing_density: 100.0,
        }
    }

    pub fn capacity(licensed: Real, icu: Real) -> HospitalCapacity {
        HospitalCapacity {
            num_licensed_beds: licensed,
            num_staffed_beds: licensed * 0.8,
            num_icu_beds: icu,
            bed_utilization: licensed * 0.5,
            potential_increase_in_bed_capac: licensed * 0.1,
        }
    }
}
