// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Per-municipality participant and incident statistics.
//!
//! The statistics file is semicolon-delimited with one row per municipality.
//! `Lähteneet` and `Selvinneet` hold comma-separated participant names; the
//! counts shown on the dashboard are derived from those lists.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use log::info;
use serde::Deserialize;

use crate::errors::DataError;

const REQUIRED_COLUMNS: [&str; 5] = ["Kunta", "Lähteneet", "Selvinneet", "Selkkaukset", "Kaatumiset"];

/// Row as it appears in the CSV file
#[derive(Debug, Deserialize)]
struct RawStatsRow {
    #[serde(rename = "Kunta")]
    municipality: String,

    #[serde(rename = "Lähteneet")]
    started: String,

    #[serde(rename = "Selvinneet")]
    finished: String,

    #[serde(rename = "Selkkaukset")]
    collisions: Option<u32>,

    #[serde(rename = "Kaatumiset")]
    falls: Option<u32>,
}

fn split_names(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Statistics for a single municipality
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsRow {
    pub municipality: String,
    /// Participants who started in this municipality
    pub started: Vec<String>,
    /// Participants who made it through
    pub finished: Vec<String>,
    pub collisions: u32,
    pub falls: u32,
}

impl StatsRow {
    fn from_raw(raw: RawStatsRow) -> Result<Self, DataError> {
        let row = Self {
            municipality: raw.municipality.trim().to_string(),
            started: split_names(&raw.started),
            finished: split_names(&raw.finished),
            collisions: raw.collisions.unwrap_or(0),
            falls: raw.falls.unwrap_or(0),
        };

        if row.finished.len() > row.started.len() {
            return Err(DataError::InvalidStatsRow {
                municipality: row.municipality,
                reason: format!(
                    "{} finishers but only {} starters",
                    row.finished.len(),
                    row.started.len()
                ),
            });
        }

        Ok(row)
    }

    #[must_use]
    pub fn started_count(&self) -> usize {
        self.started.len()
    }

    #[must_use]
    pub fn finisher_count(&self) -> usize {
        self.finished.len()
    }

    /// Starters minus finishers
    #[must_use]
    pub fn dropout_count(&self) -> usize {
        self.started_count() - self.finisher_count()
    }
}

/// All statistics rows in file order
#[derive(Debug, Default)]
pub struct StatsTable {
    pub rows: Vec<StatsRow>,
}

impl StatsTable {
    /// Load statistics from a semicolon-delimited CSV file
    pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Self, DataError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| DataError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let table = Self::from_reader(BufReader::new(file))?;

        info!("Loaded {} statistics rows from {}", table.rows.len(), path.display());
        Ok(table)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DataError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        // Every column must be present, even when its cells are empty
        let headers = csv_reader.headers()?;
        if let Some(missing) = REQUIRED_COLUMNS
            .iter()
            .find(|column| !headers.iter().any(|header| header == **column))
        {
            return Err(DataError::MissingColumn(*missing));
        }

        let mut rows = Vec::new();
        for result in csv_reader.deserialize() {
            let raw: RawStatsRow = result?;
            rows.push(StatsRow::from_raw(raw)?);
        }

        Ok(Self { rows })
    }

    /// Check whether a municipality appears in the table
    #[must_use]
    pub fn contains(&self, municipality: &str) -> bool {
        self.rows.iter().any(|r| r.municipality == municipality)
    }

    /// Number of municipalities each participant finished.
    ///
    /// Sorted by count descending, ties by name.
    #[must_use]
    pub fn participant_survivals(&self) -> Vec<(String, usize)> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for name in self.rows.iter().flat_map(|r| r.finished.iter()) {
            *counts.entry(name.as_str()).or_insert(0) += 1;
        }

        let mut survivals: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(name, count)| (name.to_string(), count))
            .collect();
        survivals.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        survivals
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE_CSV: &str = "\
Kunta;Lähteneet;Selvinneet;Selkkaukset;Kaatumiset
Kauniainen;Aino,Eero,Ville;Aino,Eero;2;1
Espoo; Aino, Eero ;Eero;0;3
Vantaa;Aino;;1;
";

    pub(crate) fn sample_table() -> StatsTable {
        StatsTable::from_reader(SAMPLE_CSV.as_bytes()).unwrap()
    }

    #[test]
    fn test_parse_rows() {
        let table = sample_table();
        assert_eq!(table.rows.len(), 3);

        let kauniainen = &table.rows[0];
        assert_eq!(kauniainen.municipality, "Kauniainen");
        assert_eq!(kauniainen.started_count(), 3);
        assert_eq!(kauniainen.finisher_count(), 2);
        assert_eq!(kauniainen.collisions, 2);
        assert_eq!(kauniainen.falls, 1);

        let espoo = &table.rows[1];
        assert_eq!(espoo.started, vec!["Aino".to_string(), "Eero".to_string()]);

        let vantaa = &table.rows[2];
        assert_eq!(vantaa.finisher_count(), 0);
        assert_eq!(vantaa.falls, 0);
    }

    #[test]
    fn test_dropout_is_started_minus_finished() {
        let table = sample_table();
        for row in &table.rows {
            assert_eq!(row.dropout_count(), row.started_count() - row.finisher_count());
        }
        assert_eq!(table.rows[0].dropout_count(), 1);
        assert_eq!(table.rows[2].dropout_count(), 1);
    }

    #[test]
    fn test_more_finishers_than_starters_is_rejected() {
        let csv = "Kunta;Lähteneet;Selvinneet;Selkkaukset;Kaatumiset\nEspoo;Aino;Aino,Eero;0;0\n";
        let result = StatsTable::from_reader(csv.as_bytes());
        assert!(matches!(result, Err(DataError::InvalidStatsRow { municipality, .. }) if municipality == "Espoo"));
    }

    #[test]
    fn test_missing_column_is_error() {
        for dropped in REQUIRED_COLUMNS {
            let (header, row): (Vec<&str>, Vec<&str>) = REQUIRED_COLUMNS
                .iter()
                .zip(["Espoo", "Aino,Eero", "Eero", "1", "2"])
                .filter(|(column, _)| **column != dropped)
                .map(|(column, value)| (*column, value))
                .unzip();
            let csv = format!("{}\n{}\n", header.join(";"), row.join(";"));

            let result = StatsTable::from_reader(csv.as_bytes());
            assert!(
                matches!(result, Err(DataError::MissingColumn(column)) if column == dropped),
                "dropping {dropped} was accepted"
            );
        }
    }

    #[test]
    fn test_empty_count_cells_are_zero() {
        let csv = "Kunta;Lähteneet;Selvinneet;Selkkaukset;Kaatumiset\nEspoo;;;;\n";
        let table = StatsTable::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.rows[0].started_count(), 0);
        assert_eq!(table.rows[0].collisions, 0);
        assert_eq!(table.rows[0].falls, 0);
    }

    #[test]
    fn test_participant_survivals() {
        let survivals = sample_table().participant_survivals();
        assert_eq!(survivals, vec![("Eero".to_string(), 2), ("Aino".to_string(), 1)]);
    }

    #[test]
    fn test_contains() {
        let table = sample_table();
        assert!(table.contains("Espoo"));
        assert!(!table.contains("Helsinki"));
    }
}
