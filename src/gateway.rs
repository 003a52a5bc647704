// Persistence gateway: the platform API the engine reads and writes.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::squad::{AthleteId, GameweekId, TeamId};
use crate::squad::{CandidateIds, SquadPayload};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Account identifier on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

/// Server-side identifier of a committed squad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SquadId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SquadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Wire DTOs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamDto {
    pub id: TeamId,
    pub name: String,
    pub short_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteDto {
    pub id: AthleteId,
    pub name: String,
    pub team: TeamId,
    /// 1=keeper, 2=defender, 3=midfielder, 4=forward.
    pub position_code: u8,
    pub cost_tenths: u32,
}

/// The full catalog dump: club list plus every selectable athlete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogDto {
    pub teams: Vec<TeamDto>,
    pub athletes: Vec<AthleteDto>,
}

/// A committed squad as stored by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSquad {
    pub id: SquadId,
    #[serde(flatten)]
    pub payload: SquadPayload,
    /// When the platform last wrote this squad. Informational only; the
    /// save path does not use it for conflict detection.
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize)]
struct CreatedResponse {
    id: SquadId,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {status} from {endpoint}")]
    Status { endpoint: String, status: u16 },
}

// ---------------------------------------------------------------------------
// Gateway trait
// ---------------------------------------------------------------------------

/// The persistence service contract the session loop depends on.
///
/// A trait so the app loop and integration tests run against an in-memory
/// implementation; production wires in [`HttpGateway`].
#[async_trait]
pub trait SquadGateway: Send + Sync {
    /// The complete catalog. No pagination; one response holds everything.
    async fn list_athletes(&self) -> Result<CatalogDto, GatewayError>;

    /// The committed squad for a user and gameweek, if one exists.
    async fn fetch_squad(
        &self,
        user: UserId,
        gameweek: GameweekId,
    ) -> Result<Option<PersistedSquad>, GatewayError>;

    /// Commit a first squad for the payload's gameweek.
    async fn create_squad(
        &self,
        user: UserId,
        payload: &SquadPayload,
    ) -> Result<SquadId, GatewayError>;

    /// Overwrite an existing committed squad. Last writer wins; the service
    /// exposes no version token to detect concurrent editors.
    async fn update_squad(
        &self,
        squad_id: SquadId,
        payload: &SquadPayload,
    ) -> Result<(), GatewayError>;

    /// Ask the platform to propose a random roster for the gameweek. The
    /// result is id lists only and is re-validated locally before use.
    async fn generate_candidate(
        &self,
        user: UserId,
        gameweek: GameweekId,
    ) -> Result<CandidateIds, GatewayError>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// reqwest-backed gateway against the platform's JSON API.
pub struct HttpGateway {
    http: reqwest::Client,
    base_url: String,
}

impl HttpGateway {
    /// Build a gateway for `base_url` (no trailing slash) with the given
    /// request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpGateway {
            http,
            base_url: base_url.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Map a non-success response to a typed status error.
    fn check_status(endpoint: &str, response: &reqwest::Response) -> Result<(), GatewayError> {
        if response.status().is_success() {
            return Ok(());
        }
        Err(GatewayError::Status {
            endpoint: endpoint.to_string(),
            status: response.status().as_u16(),
        })
    }
}

#[async_trait]
impl SquadGateway for HttpGateway {
    async fn list_athletes(&self) -> Result<CatalogDto, GatewayError> {
        let endpoint = self.url("athletes");
        let response = self.http.get(&endpoint).send().await?;
        Self::check_status(&endpoint, &response)?;
        Ok(response.json().await?)
    }

    async fn fetch_squad(
        &self,
        user: UserId,
        gameweek: GameweekId,
    ) -> Result<Option<PersistedSquad>, GatewayError> {
        let endpoint = self.url(&format!("users/{user}/squads/{gameweek}"));
        let response = self.http.get(&endpoint).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::check_status(&endpoint, &response)?;
        Ok(Some(response.json().await?))
    }

    async fn create_squad(
        &self,
        user: UserId,
        payload: &SquadPayload,
    ) -> Result<SquadId, GatewayError> {
        let endpoint = self.url(&format!("users/{user}/squads"));
        let response = self.http.post(&endpoint).json(payload).send().await?;
        Self::check_status(&endpoint, &response)?;
        let created: CreatedResponse = response.json().await?;
        Ok(created.id)
    }

    async fn update_squad(
        &self,
        squad_id: SquadId,
        payload: &SquadPayload,
    ) -> Result<(), GatewayError> {
        let endpoint = self.url(&format!("squads/{squad_id}"));
        let response = self.http.put(&endpoint).json(payload).send().await?;
        Self::check_status(&endpoint, &response)
    }

    async fn generate_candidate(
        &self,
        user: UserId,
        gameweek: GameweekId,
    ) -> Result<CandidateIds, GatewayError> {
        let endpoint = self.url(&format!("users/{user}/squads/{gameweek}/random"));
        let response = self.http.post(&endpoint).send().await?;
        Self::check_status(&endpoint, &response)?;
        Ok(response.json().await?)
    }
}
