// Message types between the session loop and whatever front end drives it.

use serde::Serialize;

use crate::gateway::SquadId;
use crate::squad::{AthleteId, DraftSquad, EditError, GameweekId, Price, ValidationReport};

// ---------------------------------------------------------------------------
// Commands (front end -> session)
// ---------------------------------------------------------------------------

/// One user action. The session loop consumes these serially, so every
/// transition is atomic with respect to the others.
#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    /// Switch the session to a gameweek, discarding the current draft and
    /// loading whatever the platform has committed for it.
    EnterGameweek(GameweekId),
    Add(AthleteId),
    Remove(AthleteId),
    Promote(AthleteId),
    Demote(AthleteId),
    SetCaptain(AthleteId),
    SetViceCaptain(AthleteId),
    /// Run the composition validator and report every violation at once.
    Validate,
    /// Validate, then commit to the platform if the draft passes.
    Save,
    /// Ask the platform for a random candidate roster.
    RequestCandidate,
    Quit,
}

// ---------------------------------------------------------------------------
// Updates (session -> front end)
// ---------------------------------------------------------------------------

/// Severity of a transient notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoticeLevel {
    Info,
    Warn,
    Error,
}

/// A transient, user-visible notification (network failures, resume hints).
/// Notices never imply a draft mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Warn,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Derived summary of the working draft, pushed after every applied edit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SquadSnapshot {
    pub gameweek: GameweekId,
    pub selected: Vec<AthleteId>,
    pub starters: Vec<AthleteId>,
    pub captain: Option<AthleteId>,
    pub vice_captain: Option<AthleteId>,
    pub cost_used: Price,
    pub budget_remaining: Price,
    pub squad_size: usize,
    pub starter_count: usize,
}

impl SquadSnapshot {
    pub fn of(squad: &DraftSquad) -> Self {
        SquadSnapshot {
            gameweek: squad.gameweek(),
            selected: squad.selected().iter().map(|a| a.id).collect(),
            starters: squad.starters().to_vec(),
            captain: squad.captain(),
            vice_captain: squad.vice_captain(),
            cost_used: squad.cost_used(),
            budget_remaining: squad.budget_remaining(),
            squad_size: squad.selected().len(),
            starter_count: squad.starter_count(),
        }
    }
}

/// One update from the session loop.
#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    /// The catalog finished loading; athletes can now be browsed and added.
    CatalogReady { athletes: usize },
    /// The draft changed (edit applied, squad loaded, or candidate accepted).
    SquadChanged(SquadSnapshot),
    /// A structurally impossible edit was refused; the draft is unchanged.
    EditRejected(EditError),
    /// Result of an explicit or save-triggered validation pass.
    ValidationFinished(ValidationReport),
    /// The platform accepted the squad.
    Saved { squad_id: SquadId },
    Notice(Notice),
}
