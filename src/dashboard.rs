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

//! Static dashboard state: loaded once, transformed once, rendered once.

use log::info;

use crate::charts::{self, Figure};
use crate::config::AppConfig;
use crate::errors::DataError;
use crate::municipalities::{Municipality, MunicipalityData};
use crate::stats::StatsTable;

/// Figures that never change after startup
#[derive(Debug, Clone)]
pub struct StaticFigures {
    pub traversed_map: Figure,
    pub collisions: Figure,
    pub participants: Figure,
    pub falls: Figure,
    pub survivals: Figure,
}

#[derive(Debug)]
pub struct Dashboard {
    pub title: String,
    pub municipalities: MunicipalityData,
    pub figures: StaticFigures,
    tracked_index: usize,
}

impl Dashboard {
    /// Read both data files and prepare every static figure
    pub fn load(config: &AppConfig) -> Result<Self, DataError> {
        info!("Reading data");
        let municipalities = MunicipalityData::load_geojson(config.municipalities_path())?;
        let stats = StatsTable::load_csv(config.stats_path())?;

        Self::from_parts(config.title.clone(), municipalities, &stats, &config.tracked_municipality)
    }

    pub fn from_parts(
        title: String,
        mut municipalities: MunicipalityData,
        stats: &StatsTable,
        tracked_municipality: &str,
    ) -> Result<Self, DataError> {
        info!("Formatting data");
        municipalities.mark_traversed(stats);
        info!(
            "{} of {} municipalities traversed",
            municipalities.traversed_count(),
            municipalities.municipalities.len()
        );

        let tracked_index = municipalities
            .municipalities
            .iter()
            .position(|m| m.name == tracked_municipality)
            .ok_or_else(|| DataError::UnknownMunicipality(tracked_municipality.to_string()))?;

        info!("Creating graphs");
        let figures = StaticFigures {
            traversed_map: charts::traversed_map(&municipalities),
            collisions: charts::collisions_chart(stats),
            participants: charts::participants_chart(stats),
            falls: charts::falls_chart(stats),
            survivals: charts::survivals_chart(stats),
        };

        Ok(Self {
            title,
            municipalities,
            figures,
            tracked_index,
        })
    }

    /// Municipality whose border is overlaid on the live map
    #[must_use]
    pub fn tracked_municipality(&self) -> &Municipality {
        &self.municipalities.municipalities[self.tracked_index]
    }
}
