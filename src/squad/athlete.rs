// Athlete identity, position classes, and money representation.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Position codes (from the platform catalog API)
// ---------------------------------------------------------------------------

pub const CODE_KEEPER: u8 = 1;
pub const CODE_DEFENDER: u8 = 2;
pub const CODE_MIDFIELDER: u8 = 3;
pub const CODE_FORWARD: u8 = 4;

/// The four mutually exclusive position classes an athlete can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    Keeper,
    Defender,
    Midfielder,
    Forward,
}

impl Position {
    /// Map a catalog position code to a Position.
    ///
    /// The codes are fixed by the catalog API: 1=keeper, 2=defender,
    /// 3=midfielder, 4=forward. Anything else is unknown.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            CODE_KEEPER => Some(Position::Keeper),
            CODE_DEFENDER => Some(Position::Defender),
            CODE_MIDFIELDER => Some(Position::Midfielder),
            CODE_FORWARD => Some(Position::Forward),
            _ => None,
        }
    }

    /// The catalog code for this position.
    pub fn code(&self) -> u8 {
        match self {
            Position::Keeper => CODE_KEEPER,
            Position::Defender => CODE_DEFENDER,
            Position::Midfielder => CODE_MIDFIELDER,
            Position::Forward => CODE_FORWARD,
        }
    }

    /// Short display string (shirt-list style).
    pub fn display_str(&self) -> &'static str {
        match self {
            Position::Keeper => "GK",
            Position::Defender => "DEF",
            Position::Midfielder => "MID",
            Position::Forward => "FWD",
        }
    }

    /// Lowercase singular noun, for building sentences.
    pub fn label(&self) -> &'static str {
        match self {
            Position::Keeper => "keeper",
            Position::Defender => "defender",
            Position::Midfielder => "midfielder",
            Position::Forward => "forward",
        }
    }

    /// All positions in catalog-code order.
    pub fn all() -> [Position; 4] {
        [
            Position::Keeper,
            Position::Defender,
            Position::Midfielder,
            Position::Forward,
        ]
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

// ---------------------------------------------------------------------------
// Identifier newtypes
// ---------------------------------------------------------------------------

/// Catalog-wide athlete identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AthleteId(pub u32);

/// Real-world club the athlete plays for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TeamId(pub u32);

/// Scoring period identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct GameweekId(pub u32);

impl fmt::Display for AthleteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for GameweekId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Price
// ---------------------------------------------------------------------------

/// Monetary value in tenths of a unit, as the catalog reports costs.
///
/// Stored as integer tenths so that sums are exact; displayed with one
/// decimal place (`1012` tenths renders as `101.2`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Price(pub u32);

impl Price {
    pub const ZERO: Price = Price(0);

    pub fn from_tenths(tenths: u32) -> Self {
        Price(tenths)
    }

    pub fn tenths(&self) -> u32 {
        self.0
    }

    /// Sum a sequence of prices. Saturates rather than wrapping; catalog
    /// costs are small enough that saturation is unreachable in practice.
    pub fn total<I: IntoIterator<Item = Price>>(prices: I) -> Price {
        Price(
            prices
                .into_iter()
                .fold(0u32, |acc, p| acc.saturating_add(p.0)),
        )
    }

    pub fn saturating_sub(&self, other: Price) -> Price {
        Price(self.0.saturating_sub(other.0))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0 / 10, self.0 % 10)
    }
}

// ---------------------------------------------------------------------------
// Athlete
// ---------------------------------------------------------------------------

/// One selectable athlete from the catalog.
///
/// Immutable once built from catalog data; every other component refers to
/// athletes by [`AthleteId`] and looks the record up when it needs the
/// position, cost, or club.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Athlete {
    pub id: AthleteId,
    pub name: String,
    pub team: TeamId,
    /// Club display name, denormalized from the catalog team list so
    /// user-facing messages can name the club without another lookup.
    pub team_name: String,
    pub position: Position,
    pub cost: Price,
}
