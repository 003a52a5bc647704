// The draft squad record and its edit transitions.

use thiserror::Error;

use super::athlete::{Athlete, AthleteId, GameweekId, Position, Price};
use super::validate::SquadRules;

// ---------------------------------------------------------------------------
// Edit rejections
// ---------------------------------------------------------------------------

/// A structurally impossible edit.
///
/// These are immediate single-message rejections: the attempted transition
/// simply does not happen and the draft is left untouched. Aggregate
/// problems (budget, quotas, club limits) are not rejections — they live in
/// [`super::validate::Violation`] and only surface when validation runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditError {
    #[error("squad full ({limit} athletes max)")]
    SquadFull { limit: usize },

    #[error("{name} is already in the squad")]
    DuplicateAthlete { name: String },

    #[error("{limit} starters max")]
    StarterLimit { limit: usize },

    #[error("athlete {id} is not in the squad")]
    NotInSquad { id: AthleteId },

    #[error("{name} is already a starter")]
    AlreadyStarter { name: String },

    #[error("captain must be a starter")]
    CaptainNotStarter,

    #[error("vice-captain must be a starter")]
    ViceCaptainNotStarter,

    #[error("captain and vice-captain must be different athletes")]
    SharedRole,
}

// ---------------------------------------------------------------------------
// DraftSquad
// ---------------------------------------------------------------------------

/// The in-progress roster for one gameweek, owned by a single edit session.
///
/// All mutation goes through the transition methods below; each either
/// applies fully or rejects with an [`EditError`] and changes nothing.
/// The cardinality caps (squad size, starter count) and the role/starter
/// referential rules hold after every transition — they can never be
/// transiently violated. Budget and quota rules are deliberately *not*
/// checked here; a user is free to build through an over-budget state and
/// gets the full picture from [`super::validate::validate`] on demand.
/// Persistence goes through [`super::wire`] id lists rather than direct
/// serialization, so hydrated state re-enters through `from_parts` and the
/// same invariant checks.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftSquad {
    gameweek: GameweekId,
    rules: SquadRules,
    selected: Vec<Athlete>,
    starters: Vec<AthleteId>,
    captain: Option<AthleteId>,
    vice_captain: Option<AthleteId>,
}

impl DraftSquad {
    /// Start an empty draft for `gameweek` under `rules`.
    pub fn new(gameweek: GameweekId, rules: SquadRules) -> Self {
        DraftSquad {
            gameweek,
            rules,
            selected: Vec::new(),
            starters: Vec::new(),
            captain: None,
            vice_captain: None,
        }
    }

    /// Rebuild a draft from resolved parts (a fetched squad, an autosave, or
    /// an accepted server candidate) by replaying the normal transitions, so
    /// the structural invariants hold for hydrated state exactly as they do
    /// for interactively built state.
    pub fn from_parts(
        gameweek: GameweekId,
        rules: SquadRules,
        athletes: Vec<Athlete>,
        starters: &[AthleteId],
        captain: Option<AthleteId>,
        vice_captain: Option<AthleteId>,
    ) -> Result<Self, EditError> {
        if let (Some(c), Some(v)) = (captain, vice_captain) {
            if c == v {
                return Err(EditError::SharedRole);
            }
        }

        let mut squad = DraftSquad::new(gameweek, rules);
        for athlete in athletes {
            squad.add(athlete)?;
        }
        for id in starters {
            squad.promote(*id)?;
        }
        if let Some(id) = captain {
            squad.set_captain(id)?;
        }
        if let Some(id) = vice_captain {
            squad.set_vice_captain(id)?;
        }
        Ok(squad)
    }

    // -- accessors ---------------------------------------------------------

    pub fn gameweek(&self) -> GameweekId {
        self.gameweek
    }

    pub fn rules(&self) -> &SquadRules {
        &self.rules
    }

    /// Selected athletes in selection order.
    pub fn selected(&self) -> &[Athlete] {
        &self.selected
    }

    pub fn starters(&self) -> &[AthleteId] {
        &self.starters
    }

    pub fn captain(&self) -> Option<AthleteId> {
        self.captain
    }

    pub fn vice_captain(&self) -> Option<AthleteId> {
        self.vice_captain
    }

    pub fn contains(&self, id: AthleteId) -> bool {
        self.selected.iter().any(|a| a.id == id)
    }

    pub fn is_starter(&self, id: AthleteId) -> bool {
        self.starters.contains(&id)
    }

    pub fn athlete(&self, id: AthleteId) -> Option<&Athlete> {
        self.selected.iter().find(|a| a.id == id)
    }

    // -- derived summary figures ------------------------------------------

    /// Total cost of the selected athletes.
    pub fn cost_used(&self) -> Price {
        Price::total(self.selected.iter().map(|a| a.cost))
    }

    /// Budget left under the cap; zero when over budget (the overshoot
    /// itself is reported by the validator, not here).
    pub fn budget_remaining(&self) -> Price {
        self.rules.budget_cap.saturating_sub(self.cost_used())
    }

    pub fn starter_count(&self) -> usize {
        self.starters.len()
    }

    /// Squad members holding the given position, bench included.
    pub fn position_count(&self, position: Position) -> usize {
        self.selected.iter().filter(|a| a.position == position).count()
    }

    // -- transitions -------------------------------------------------------

    /// Add an athlete to the squad.
    pub fn add(&mut self, athlete: Athlete) -> Result<(), EditError> {
        if self.contains(athlete.id) {
            return Err(EditError::DuplicateAthlete { name: athlete.name });
        }
        if self.selected.len() >= self.rules.squad_size {
            return Err(EditError::SquadFull {
                limit: self.rules.squad_size,
            });
        }
        self.selected.push(athlete);
        Ok(())
    }

    /// Remove an athlete, cascading out of the starters and clearing any
    /// role the athlete held. Returns `false` (no-op) if not selected.
    pub fn remove(&mut self, id: AthleteId) -> bool {
        let Some(idx) = self.selected.iter().position(|a| a.id == id) else {
            return false;
        };
        self.selected.remove(idx);
        self.starters.retain(|s| *s != id);
        if self.captain == Some(id) {
            self.captain = None;
        }
        if self.vice_captain == Some(id) {
            self.vice_captain = None;
        }
        true
    }

    /// Promote a squad member into the starting lineup.
    pub fn promote(&mut self, id: AthleteId) -> Result<(), EditError> {
        let Some(athlete) = self.athlete(id) else {
            return Err(EditError::NotInSquad { id });
        };
        if self.is_starter(id) {
            return Err(EditError::AlreadyStarter {
                name: athlete.name.clone(),
            });
        }
        if self.starters.len() >= self.rules.starter_count {
            return Err(EditError::StarterLimit {
                limit: self.rules.starter_count,
            });
        }
        self.starters.push(id);
        Ok(())
    }

    /// Drop a starter back to the bench, clearing any role held. Returns
    /// `false` (no-op) if the athlete was not a starter.
    pub fn demote(&mut self, id: AthleteId) -> bool {
        let before = self.starters.len();
        self.starters.retain(|s| *s != id);
        if self.starters.len() == before {
            return false;
        }
        if self.captain == Some(id) {
            self.captain = None;
        }
        if self.vice_captain == Some(id) {
            self.vice_captain = None;
        }
        true
    }

    /// Make a starter the captain. If the athlete currently holds the
    /// vice-captaincy it is cleared — one athlete never holds both roles.
    pub fn set_captain(&mut self, id: AthleteId) -> Result<(), EditError> {
        if !self.is_starter(id) {
            return Err(EditError::CaptainNotStarter);
        }
        self.captain = Some(id);
        if self.vice_captain == Some(id) {
            self.vice_captain = None;
        }
        Ok(())
    }

    /// Make a starter the vice-captain, clearing the captaincy if that same
    /// athlete held it.
    pub fn set_vice_captain(&mut self, id: AthleteId) -> Result<(), EditError> {
        if !self.is_starter(id) {
            return Err(EditError::ViceCaptainNotStarter);
        }
        self.vice_captain = Some(id);
        if self.captain == Some(id) {
            self.captain = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::squad::test_support::{athlete, full_valid_squad};

    fn empty_squad() -> DraftSquad {
        DraftSquad::new(GameweekId(1), SquadRules::default())
    }

    fn invariants_hold(squad: &DraftSquad) {
        let rules = squad.rules();
        assert!(squad.selected().len() <= rules.squad_size);
        assert!(squad.starter_count() <= rules.starter_count);
        assert!(squad.starter_count() <= squad.selected().len());
        for id in squad.starters() {
            assert!(squad.contains(*id));
        }
        if let Some(c) = squad.captain() {
            assert!(squad.is_starter(c));
        }
        if let Some(v) = squad.vice_captain() {
            assert!(squad.is_starter(v));
        }
        if let (Some(c), Some(v)) = (squad.captain(), squad.vice_captain()) {
            assert_ne!(c, v);
        }
    }

    #[test]
    fn add_and_summary_figures() {
        let mut squad = empty_squad();
        squad.add(athlete(1, Position::Keeper, 1, 45)).unwrap();
        squad.add(athlete(2, Position::Forward, 2, 125)).unwrap();

        assert_eq!(squad.selected().len(), 2);
        assert_eq!(squad.cost_used(), Price::from_tenths(170));
        assert_eq!(squad.budget_remaining(), Price::from_tenths(830));
        assert_eq!(squad.position_count(Position::Keeper), 1);
        invariants_hold(&squad);
    }

    #[test]
    fn add_rejects_duplicate() {
        let mut squad = empty_squad();
        squad.add(athlete(1, Position::Keeper, 1, 45)).unwrap();
        let err = squad.add(athlete(1, Position::Keeper, 1, 45)).unwrap_err();
        assert!(matches!(err, EditError::DuplicateAthlete { .. }));
        assert_eq!(squad.selected().len(), 1);
    }

    #[test]
    fn add_rejects_when_full() {
        let mut squad = empty_squad();
        for i in 1..=15 {
            squad.add(athlete(i, Position::Midfielder, i, 50)).unwrap();
        }
        let err = squad.add(athlete(16, Position::Forward, 16, 50)).unwrap_err();
        assert_eq!(err, EditError::SquadFull { limit: 15 });
        assert_eq!(err.to_string(), "squad full (15 athletes max)");
        assert_eq!(squad.selected().len(), 15);
        invariants_hold(&squad);
    }

    #[test]
    fn remove_unknown_is_noop() {
        let mut squad = empty_squad();
        squad.add(athlete(1, Position::Keeper, 1, 45)).unwrap();
        assert!(!squad.remove(AthleteId(99)));
        assert_eq!(squad.selected().len(), 1);
    }

    #[test]
    fn remove_cascades_starter_and_roles() {
        let mut squad = empty_squad();
        for i in 1..=3 {
            squad.add(athlete(i, Position::Midfielder, i, 50)).unwrap();
            squad.promote(AthleteId(i)).unwrap();
        }
        squad.set_captain(AthleteId(1)).unwrap();
        squad.set_vice_captain(AthleteId(2)).unwrap();

        assert!(squad.remove(AthleteId(1)));
        assert!(!squad.contains(AthleteId(1)));
        assert!(!squad.is_starter(AthleteId(1)));
        assert_eq!(squad.captain(), None);
        assert_eq!(squad.vice_captain(), Some(AthleteId(2)));
        invariants_hold(&squad);
    }

    #[test]
    fn remove_non_role_holder_leaves_roles_alone() {
        let mut squad = empty_squad();
        for i in 1..=3 {
            squad.add(athlete(i, Position::Defender, i, 50)).unwrap();
            squad.promote(AthleteId(i)).unwrap();
        }
        squad.set_captain(AthleteId(1)).unwrap();
        squad.set_vice_captain(AthleteId(2)).unwrap();

        assert!(squad.remove(AthleteId(3)));
        assert_eq!(squad.captain(), Some(AthleteId(1)));
        assert_eq!(squad.vice_captain(), Some(AthleteId(2)));
    }

    #[test]
    fn promote_requires_membership() {
        let mut squad = empty_squad();
        let err = squad.promote(AthleteId(5)).unwrap_err();
        assert_eq!(err, EditError::NotInSquad { id: AthleteId(5) });
    }

    #[test]
    fn promote_rejects_second_promotion() {
        let mut squad = empty_squad();
        squad.add(athlete(1, Position::Keeper, 1, 45)).unwrap();
        squad.promote(AthleteId(1)).unwrap();
        let err = squad.promote(AthleteId(1)).unwrap_err();
        assert!(matches!(err, EditError::AlreadyStarter { .. }));
        assert_eq!(squad.starter_count(), 1);
    }

    #[test]
    fn promote_rejects_at_starter_cap() {
        let mut squad = empty_squad();
        for i in 1..=12 {
            squad.add(athlete(i, Position::Midfielder, i, 50)).unwrap();
        }
        for i in 1..=11 {
            squad.promote(AthleteId(i)).unwrap();
        }
        let err = squad.promote(AthleteId(12)).unwrap_err();
        assert_eq!(err, EditError::StarterLimit { limit: 11 });
        assert_eq!(err.to_string(), "11 starters max");
        assert_eq!(squad.starter_count(), 11);
        invariants_hold(&squad);
    }

    #[test]
    fn demote_cascades_roles() {
        let mut squad = empty_squad();
        squad.add(athlete(1, Position::Keeper, 1, 45)).unwrap();
        squad.promote(AthleteId(1)).unwrap();
        squad.set_captain(AthleteId(1)).unwrap();

        assert!(squad.demote(AthleteId(1)));
        assert!(squad.contains(AthleteId(1)), "demote keeps squad membership");
        assert_eq!(squad.captain(), None);
        assert!(!squad.demote(AthleteId(1)), "second demote is a no-op");
    }

    #[test]
    fn roles_require_starter() {
        let mut squad = empty_squad();
        squad.add(athlete(1, Position::Keeper, 1, 45)).unwrap();

        let err = squad.set_captain(AthleteId(1)).unwrap_err();
        assert_eq!(err.to_string(), "captain must be a starter");
        let err = squad.set_vice_captain(AthleteId(1)).unwrap_err();
        assert_eq!(err.to_string(), "vice-captain must be a starter");
        assert_eq!(squad.captain(), None);
        assert_eq!(squad.vice_captain(), None);
    }

    #[test]
    fn roles_are_mutually_exclusive() {
        let mut squad = empty_squad();
        for i in 1..=2 {
            squad.add(athlete(i, Position::Forward, i, 60)).unwrap();
            squad.promote(AthleteId(i)).unwrap();
        }
        squad.set_captain(AthleteId(1)).unwrap();
        squad.set_vice_captain(AthleteId(2)).unwrap();

        // Handing the captaincy to the current vice clears the vice slot.
        squad.set_captain(AthleteId(2)).unwrap();
        assert_eq!(squad.captain(), Some(AthleteId(2)));
        assert_eq!(squad.vice_captain(), None);

        // And the mirror image for the vice-captaincy.
        squad.set_vice_captain(AthleteId(2)).unwrap();
        assert_eq!(squad.captain(), None);
        assert_eq!(squad.vice_captain(), Some(AthleteId(2)));
        invariants_hold(&squad);
    }

    #[test]
    fn invariants_hold_through_an_edit_storm() {
        let mut squad = empty_squad();
        for i in 1..=15 {
            squad.add(athlete(i, Position::Midfielder, (i - 1) % 5 + 1, 50)).unwrap();
            invariants_hold(&squad);
        }
        for i in 1..=11 {
            squad.promote(AthleteId(i)).unwrap();
            invariants_hold(&squad);
        }
        squad.set_captain(AthleteId(3)).unwrap();
        squad.set_vice_captain(AthleteId(4)).unwrap();
        invariants_hold(&squad);

        squad.remove(AthleteId(3));
        invariants_hold(&squad);
        squad.demote(AthleteId(4));
        invariants_hold(&squad);
        squad.promote(AthleteId(12)).unwrap();
        squad.promote(AthleteId(13)).unwrap();
        invariants_hold(&squad);
    }

    // -- from_parts --------------------------------------------------------

    #[test]
    fn from_parts_rebuilds_a_full_squad() {
        let original = full_valid_squad();
        let rebuilt = DraftSquad::from_parts(
            original.gameweek(),
            original.rules().clone(),
            original.selected().to_vec(),
            original.starters(),
            original.captain(),
            original.vice_captain(),
        )
        .unwrap();
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn from_parts_rejects_shared_role() {
        let err = DraftSquad::from_parts(
            GameweekId(1),
            SquadRules::default(),
            vec![athlete(1, Position::Keeper, 1, 45)],
            &[AthleteId(1)],
            Some(AthleteId(1)),
            Some(AthleteId(1)),
        )
        .unwrap_err();
        assert_eq!(err, EditError::SharedRole);
    }

    #[test]
    fn from_parts_rejects_starter_outside_squad() {
        let err = DraftSquad::from_parts(
            GameweekId(1),
            SquadRules::default(),
            vec![athlete(1, Position::Keeper, 1, 45)],
            &[AthleteId(2)],
            None,
            None,
        )
        .unwrap_err();
        assert_eq!(err, EditError::NotInSquad { id: AthleteId(2) });
    }
}
