// Wire payloads and id-list resolution against the catalog.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::AthleteCatalog;

use super::athlete::{Athlete, AthleteId, GameweekId};
use super::draft::{DraftSquad, EditError};
use super::validate::SquadRules;

// ---------------------------------------------------------------------------
// Payload types
// ---------------------------------------------------------------------------

/// A committed squad as it travels to and from the persistence service:
/// the gameweek, the full id list, the starter subset, and both roles.
/// Roles are required on the wire — an unfinished draft never serializes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SquadPayload {
    pub gameweek: GameweekId,
    pub athlete_ids: Vec<AthleteId>,
    pub starter_ids: Vec<AthleteId>,
    pub captain_id: AthleteId,
    pub vice_captain_id: AthleteId,
}

/// A server-generated candidate roster, expressed purely as id lists.
/// Shaped like [`SquadPayload`] minus the gameweek (the request names it).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateIds {
    pub athlete_ids: Vec<AthleteId>,
    pub starter_ids: Vec<AthleteId>,
    pub captain_id: AthleteId,
    pub vice_captain_id: AthleteId,
}

/// A local autosave of an in-progress draft. Unlike the wire payload the
/// roles may still be unset, since a draft is saved after every edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftSnapshot {
    pub gameweek: GameweekId,
    pub athlete_ids: Vec<AthleteId>,
    pub starter_ids: Vec<AthleteId>,
    pub captain_id: Option<AthleteId>,
    pub vice_captain_id: Option<AthleteId>,
}

impl DraftSnapshot {
    pub fn from_draft(squad: &DraftSquad) -> Self {
        DraftSnapshot {
            gameweek: squad.gameweek(),
            athlete_ids: squad.selected().iter().map(|a| a.id).collect(),
            starter_ids: squad.starters().to_vec(),
            captain_id: squad.captain(),
            vice_captain_id: squad.vice_captain(),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Serializing a draft that is not ready for the wire.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WireError {
    #[error("draft has no captain assigned")]
    MissingCaptain,
    #[error("draft has no vice-captain assigned")]
    MissingViceCaptain,
}

/// Resolving an id list against the catalog failed.
///
/// An unknown id means the catalog copy is missing or stale, not that a
/// rule was broken: callers treat this as a retryable data-availability
/// problem and must not apply the id list partially.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error("athlete {id} is not in the loaded catalog")]
    UnknownAthlete { id: AthleteId },
    #[error("roster ids are malformed: {source}")]
    Malformed {
        #[from]
        source: EditError,
    },
}

impl SquadPayload {
    /// Serialize a draft for the persistence service. Fails if either role
    /// is unassigned — callers validate first, this is the backstop.
    pub fn from_draft(squad: &DraftSquad) -> Result<Self, WireError> {
        let captain_id = squad.captain().ok_or(WireError::MissingCaptain)?;
        let vice_captain_id = squad.vice_captain().ok_or(WireError::MissingViceCaptain)?;
        Ok(SquadPayload {
            gameweek: squad.gameweek(),
            athlete_ids: squad.selected().iter().map(|a| a.id).collect(),
            starter_ids: squad.starters().to_vec(),
            captain_id,
            vice_captain_id,
        })
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Look up every id, all-or-nothing. The first unknown id fails the whole
/// batch so a roster with dangling references can never be materialized.
fn resolve_ids(ids: &[AthleteId], catalog: &AthleteCatalog) -> Result<Vec<Athlete>, ResolveError> {
    ids.iter()
        .map(|id| {
            catalog
                .get(*id)
                .cloned()
                .ok_or(ResolveError::UnknownAthlete { id: *id })
        })
        .collect()
}

/// Rehydrate a committed squad fetched from the persistence service.
pub fn resolve_squad(
    payload: &SquadPayload,
    catalog: &AthleteCatalog,
    rules: &SquadRules,
) -> Result<DraftSquad, ResolveError> {
    let athletes = resolve_ids(&payload.athlete_ids, catalog)?;
    Ok(DraftSquad::from_parts(
        payload.gameweek,
        rules.clone(),
        athletes,
        &payload.starter_ids,
        Some(payload.captain_id),
        Some(payload.vice_captain_id),
    )?)
}

/// Resolve a server-generated candidate for the given gameweek. The result
/// replaces the draft wholesale only after this succeeds; it still goes
/// through [`super::validate::validate`] before being treated as save-ready.
pub fn resolve_candidate(
    candidate: &CandidateIds,
    gameweek: GameweekId,
    catalog: &AthleteCatalog,
    rules: &SquadRules,
) -> Result<DraftSquad, ResolveError> {
    let athletes = resolve_ids(&candidate.athlete_ids, catalog)?;
    Ok(DraftSquad::from_parts(
        gameweek,
        rules.clone(),
        athletes,
        &candidate.starter_ids,
        Some(candidate.captain_id),
        Some(candidate.vice_captain_id),
    )?)
}

/// Rehydrate a local autosave, roles included only where they were set.
pub fn resolve_snapshot(
    snapshot: &DraftSnapshot,
    catalog: &AthleteCatalog,
    rules: &SquadRules,
) -> Result<DraftSquad, ResolveError> {
    let athletes = resolve_ids(&snapshot.athlete_ids, catalog)?;
    Ok(DraftSquad::from_parts(
        snapshot.gameweek,
        rules.clone(),
        athletes,
        &snapshot.starter_ids,
        snapshot.captain_id,
        snapshot.vice_captain_id,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::AthleteCatalog;
    use crate::squad::test_support::{athlete, full_valid_squad};
    use crate::squad::Position;

    /// Catalog holding every athlete the fixture squad uses.
    fn fixture_catalog() -> AthleteCatalog {
        let squad = full_valid_squad();
        AthleteCatalog::from_athletes(squad.selected().to_vec()).unwrap()
    }

    #[test]
    fn payload_requires_both_roles() {
        let mut squad = full_valid_squad();
        let vice = squad.vice_captain().unwrap();
        squad.demote(vice);

        let err = SquadPayload::from_draft(&squad).unwrap_err();
        assert_eq!(err, WireError::MissingViceCaptain);
    }

    #[test]
    fn wire_round_trip_reproduces_the_draft() {
        let squad = full_valid_squad();
        let catalog = fixture_catalog();

        let payload = SquadPayload::from_draft(&squad).unwrap();
        let rehydrated = resolve_squad(&payload, &catalog, squad.rules()).unwrap();
        assert_eq!(rehydrated, squad);
    }

    #[test]
    fn payload_survives_json() {
        let squad = full_valid_squad();
        let payload = SquadPayload::from_draft(&squad).unwrap();
        let json = serde_json::to_string(&payload).unwrap();
        let back: SquadPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn snapshot_round_trip_with_unset_roles() {
        let mut squad = full_valid_squad();
        let captain = squad.captain().unwrap();
        squad.demote(captain);
        squad.promote(captain).unwrap();
        assert_eq!(squad.captain(), None);

        let catalog = fixture_catalog();
        let snapshot = DraftSnapshot::from_draft(&squad);
        assert_eq!(snapshot.captain_id, None);

        let rehydrated = resolve_snapshot(&snapshot, &catalog, squad.rules()).unwrap();
        assert_eq!(rehydrated, squad);
    }

    #[test]
    fn dangling_id_rejects_the_whole_candidate() {
        let catalog = fixture_catalog();
        let candidate = CandidateIds {
            athlete_ids: vec![crate::squad::AthleteId(1), crate::squad::AthleteId(999)],
            starter_ids: vec![crate::squad::AthleteId(1)],
            captain_id: crate::squad::AthleteId(1),
            vice_captain_id: crate::squad::AthleteId(999),
        };

        let err = resolve_candidate(
            &candidate,
            crate::squad::GameweekId(1),
            &catalog,
            &SquadRules::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ResolveError::UnknownAthlete {
                id: crate::squad::AthleteId(999)
            }
        );
    }

    #[test]
    fn malformed_candidate_is_rejected() {
        // Every id resolves, but the starter list names a non-member.
        let catalog = fixture_catalog();
        let candidate = CandidateIds {
            athlete_ids: vec![crate::squad::AthleteId(1), crate::squad::AthleteId(2)],
            starter_ids: vec![crate::squad::AthleteId(3)],
            captain_id: crate::squad::AthleteId(1),
            vice_captain_id: crate::squad::AthleteId(2),
        };

        let err = resolve_candidate(
            &candidate,
            crate::squad::GameweekId(1),
            &catalog,
            &SquadRules::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ResolveError::Malformed { .. }));
    }

    #[test]
    fn resolved_candidate_still_faces_validation() {
        // A structurally sound but rule-breaking candidate resolves fine
        // and is then caught by the validator (here: only 2 athletes).
        let catalog = AthleteCatalog::from_athletes(vec![
            athlete(1, Position::Keeper, 1, 45),
            athlete(2, Position::Forward, 2, 60),
        ])
        .unwrap();
        let candidate = CandidateIds {
            athlete_ids: vec![crate::squad::AthleteId(1), crate::squad::AthleteId(2)],
            starter_ids: vec![crate::squad::AthleteId(1), crate::squad::AthleteId(2)],
            captain_id: crate::squad::AthleteId(1),
            vice_captain_id: crate::squad::AthleteId(2),
        };

        let squad = resolve_candidate(
            &candidate,
            crate::squad::GameweekId(1),
            &catalog,
            &SquadRules::default(),
        )
        .unwrap();
        let report = crate::squad::validate(&squad);
        assert!(!report.is_valid());
    }
}
