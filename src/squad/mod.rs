// Squad domain: data model, builder state machine, validator, wire mapping.

pub mod athlete;
pub mod draft;
pub mod validate;
pub mod wire;

pub use athlete::{Athlete, AthleteId, GameweekId, Position, Price, TeamId};
pub use draft::{DraftSquad, EditError};
pub use validate::{validate, SquadRules, ValidationReport, Violation};
pub use wire::{
    resolve_candidate, resolve_snapshot, resolve_squad, CandidateIds, DraftSnapshot,
    ResolveError, SquadPayload, WireError,
};
