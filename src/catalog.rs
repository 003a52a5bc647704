// In-memory athlete catalog built from the platform's catalog dump.

use std::collections::HashMap;

use thiserror::Error;

use crate::gateway::CatalogDto;
use crate::squad::{Athlete, AthleteId, Position, Price, TeamId};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error("duplicate athlete id {id} in catalog dump")]
    DuplicateAthlete { id: AthleteId },

    #[error("athlete {athlete} references unknown team {team}")]
    UnknownTeam { athlete: AthleteId, team: TeamId },

    #[error("athlete {athlete} has unknown position code {code}")]
    UnknownPositionCode { athlete: AthleteId, code: u8 },
}

// ---------------------------------------------------------------------------
// AthleteCatalog
// ---------------------------------------------------------------------------

/// The complete selectable-athlete set for the session, indexed by id.
///
/// The provider sends the whole catalog in one response (no pagination), so
/// the engine holds it all in memory and treats it as read-only. Building
/// the catalog joins each athlete to its club record; a dump that fails the
/// join is rejected whole rather than loaded with holes.
#[derive(Debug, Clone)]
pub struct AthleteCatalog {
    athletes: Vec<Athlete>,
    by_id: HashMap<AthleteId, usize>,
}

impl AthleteCatalog {
    /// Build the catalog from the gateway's dump, resolving team names and
    /// position codes.
    pub fn from_dto(dto: CatalogDto) -> Result<Self, CatalogError> {
        let team_names: HashMap<TeamId, String> = dto
            .teams
            .into_iter()
            .map(|t| (t.id, t.short_name))
            .collect();

        let mut athletes = Vec::with_capacity(dto.athletes.len());
        for raw in dto.athletes {
            let position = Position::from_code(raw.position_code).ok_or(
                CatalogError::UnknownPositionCode {
                    athlete: raw.id,
                    code: raw.position_code,
                },
            )?;
            let team_name = team_names
                .get(&raw.team)
                .ok_or(CatalogError::UnknownTeam {
                    athlete: raw.id,
                    team: raw.team,
                })?
                .clone();
            athletes.push(Athlete {
                id: raw.id,
                name: raw.name,
                team: raw.team,
                team_name,
                position,
                cost: Price::from_tenths(raw.cost_tenths),
            });
        }

        Self::from_athletes(athletes)
    }

    /// Build a catalog from already-joined athlete records.
    pub fn from_athletes(athletes: Vec<Athlete>) -> Result<Self, CatalogError> {
        let mut by_id = HashMap::with_capacity(athletes.len());
        for (idx, athlete) in athletes.iter().enumerate() {
            if by_id.insert(athlete.id, idx).is_some() {
                return Err(CatalogError::DuplicateAthlete { id: athlete.id });
            }
        }
        Ok(AthleteCatalog { athletes, by_id })
    }

    pub fn get(&self, id: AthleteId) -> Option<&Athlete> {
        self.by_id.get(&id).map(|idx| &self.athletes[*idx])
    }

    pub fn contains(&self, id: AthleteId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.athletes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.athletes.is_empty()
    }

    /// Athletes in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &Athlete> {
        self.athletes.iter()
    }
}
