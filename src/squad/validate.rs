// Composition rules and the exhaustive squad validator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::athlete::{AthleteId, Position, Price, TeamId};
use super::draft::DraftSquad;

// ---------------------------------------------------------------------------
// SquadRules
// ---------------------------------------------------------------------------

/// The composition rules a committed squad must satisfy.
///
/// The position quotas are minimums over the full squad (bench included, not
/// just the starting lineup) and their sum must equal `squad_size` exactly:
/// with 2+5+5+3 = 15 the minimums leave no slack, so they pin the position
/// distribution outright. `crate::config` rejects any rule set where the sum
/// and the squad size disagree, since the minimums would then silently stop
/// implying the corresponding maximums.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SquadRules {
    /// Exact number of athletes a committed squad holds.
    pub squad_size: usize,
    /// Exact number of starters within the squad.
    pub starter_count: usize,
    pub min_keepers: usize,
    pub min_defenders: usize,
    pub min_midfielders: usize,
    pub min_forwards: usize,
    /// Cap on athletes drawn from any single club.
    pub max_from_team: usize,
    pub budget_cap: Price,
}

impl SquadRules {
    /// Minimum quota for one position class.
    pub fn min_for(&self, position: Position) -> usize {
        match position {
            Position::Keeper => self.min_keepers,
            Position::Defender => self.min_defenders,
            Position::Midfielder => self.min_midfielders,
            Position::Forward => self.min_forwards,
        }
    }

    /// Sum of the four position minimums.
    pub fn quota_sum(&self) -> usize {
        self.min_keepers + self.min_defenders + self.min_midfielders + self.min_forwards
    }
}

impl Default for SquadRules {
    /// The standard ruleset: 15 athletes, 11 starters, 2/5/5/3 position
    /// minimums, at most 3 per club, 100.0 budget.
    fn default() -> Self {
        SquadRules {
            squad_size: 15,
            starter_count: 11,
            min_keepers: 2,
            min_defenders: 5,
            min_midfielders: 5,
            min_forwards: 3,
            max_from_team: 3,
            budget_cap: Price::from_tenths(1000),
        }
    }
}

// ---------------------------------------------------------------------------
// Violations
// ---------------------------------------------------------------------------

/// One reason a draft squad is not ready to commit.
///
/// Violations are aggregate findings, distinct from the structural edit
/// rejections in [`super::draft::EditError`]: a draft can carry any number
/// of these and still accept further edits.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Violation {
    #[error("squad has {found} athletes, needs exactly {expected}")]
    SquadSize { found: usize, expected: usize },

    #[error("{found} starters picked, needs exactly {expected}")]
    StarterCount { found: usize, expected: usize },

    #[error("starter {id} is not in the squad")]
    UnknownStarter { id: AthleteId },

    #[error("total cost {total} exceeds the budget cap {cap}")]
    OverBudget { total: Price, cap: Price },

    #[error("need at least {required} {label}s, squad has {found}")]
    PositionShortfall {
        position: Position,
        label: &'static str,
        found: usize,
        required: usize,
    },

    #[error("{team_name} supplies {found} athletes, limit is {limit}")]
    TeamConcentration {
        team: TeamId,
        team_name: String,
        found: usize,
        limit: usize,
    },

    #[error("no captain assigned")]
    MissingCaptain,

    #[error("no vice-captain assigned")]
    MissingViceCaptain,
}

/// The outcome of one validation pass: a verdict plus every violation found.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Rendered violation messages, in evaluation order.
    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(|v| v.to_string()).collect()
    }
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

/// Check a draft squad against its rules.
///
/// Pure and deterministic: no side effects, no catalog access (the draft
/// already carries full athlete records). Every check runs — the report
/// lists all problems at once rather than stopping at the first, so one
/// pass tells the user everything that blocks a save.
pub fn validate(squad: &DraftSquad) -> ValidationReport {
    let rules = squad.rules();
    let mut violations = Vec::new();

    // 1. Exact squad size.
    let selected = squad.selected();
    if selected.len() != rules.squad_size {
        violations.push(Violation::SquadSize {
            found: selected.len(),
            expected: rules.squad_size,
        });
    }

    // 2. Exact starter count.
    let starters = squad.starters();
    if starters.len() != rules.starter_count {
        violations.push(Violation::StarterCount {
            found: starters.len(),
            expected: rules.starter_count,
        });
    }

    // 3. Every starter must be a squad member.
    for id in starters {
        if !squad.contains(*id) {
            violations.push(Violation::UnknownStarter { id: *id });
        }
    }

    // 4. Budget, with both figures in the message.
    let total = squad.cost_used();
    if total > rules.budget_cap {
        violations.push(Violation::OverBudget {
            total,
            cap: rules.budget_cap,
        });
    }

    // 5. Position minimums, counted over the full squad (bench included).
    for position in Position::all() {
        let found = squad.position_count(position);
        let required = rules.min_for(position);
        if found < required {
            violations.push(Violation::PositionShortfall {
                position,
                label: position.label(),
                found,
                required,
            });
        }
    }

    // 6. Club concentration. BTreeMap keeps the violation order stable.
    let mut per_team: BTreeMap<TeamId, (usize, &str)> = BTreeMap::new();
    for athlete in selected {
        let entry = per_team
            .entry(athlete.team)
            .or_insert((0, athlete.team_name.as_str()));
        entry.0 += 1;
    }
    for (team, (found, team_name)) in per_team {
        if found > rules.max_from_team {
            violations.push(Violation::TeamConcentration {
                team,
                team_name: team_name.to_string(),
                found,
                limit: rules.max_from_team,
            });
        }
    }

    // 7. Both special roles must be assigned before a save.
    if squad.captain().is_none() {
        violations.push(Violation::MissingCaptain);
    }
    if squad.vice_captain().is_none() {
        violations.push(Violation::MissingViceCaptain);
    }

    ValidationReport { violations }
}
