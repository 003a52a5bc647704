// Session orchestration logic.
//
// The central event loop that coordinates user commands from the front end
// with gateway I/O. Gateway calls run as spawned tasks that report back over
// an internal channel; every spawned task is tagged with the session
// generation so responses that arrive after a gameweek switch are discarded
// instead of clobbering the new session's state.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::catalog::AthleteCatalog;
use crate::config::Config;
use crate::db::Database;
use crate::gateway::{CatalogDto, GatewayError, PersistedSquad, SquadGateway, SquadId, UserId};
use crate::protocol::{Notice, SquadSnapshot, UiUpdate, UserCommand};
use crate::squad::{
    resolve_candidate, resolve_snapshot, resolve_squad, validate, CandidateIds, DraftSnapshot,
    DraftSquad, GameweekId, SquadPayload,
};

// ---------------------------------------------------------------------------
// Gateway events
// ---------------------------------------------------------------------------

/// A completed gateway call, reported back to the session loop.
#[derive(Debug)]
pub enum GatewayEvent {
    CatalogLoaded(Result<CatalogDto, GatewayError>),
    SquadFetched {
        generation: u64,
        gameweek: GameweekId,
        result: Result<Option<PersistedSquad>, GatewayError>,
    },
    CandidateReady {
        generation: u64,
        gameweek: GameweekId,
        result: Result<CandidateIds, GatewayError>,
    },
    SaveFinished {
        gameweek: GameweekId,
        result: Result<SquadId, GatewayError>,
    },
}

enum Flow {
    Continue,
    Quit,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// The complete session state: one user, one gameweek, one working draft.
pub struct AppState {
    config: Config,
    db: Database,
    gateway: Arc<dyn SquadGateway>,
    catalog: Option<AthleteCatalog>,
    draft: Option<DraftSquad>,
    gameweek: GameweekId,
    /// Monotonically increasing counter identifying the current gameweek
    /// session. Incremented on every gameweek switch; gateway responses
    /// carrying an older generation are dropped in `handle_gateway_event`.
    generation: u64,
    gw_tx: mpsc::Sender<GatewayEvent>,
}

impl AppState {
    /// Create the session state and the internal gateway-event channel.
    /// The returned receiver is handed to [`run`] alongside the state.
    pub fn new(
        config: Config,
        db: Database,
        gateway: Arc<dyn SquadGateway>,
    ) -> (Self, mpsc::Receiver<GatewayEvent>) {
        let (gw_tx, gw_rx) = mpsc::channel(64);
        let gameweek = db
            .last_gameweek()
            .ok()
            .flatten()
            .unwrap_or(config.session.gameweek);

        let state = AppState {
            config,
            db,
            gateway,
            catalog: None,
            draft: None,
            gameweek,
            generation: 0,
            gw_tx,
        };
        (state, gw_rx)
    }

    fn user(&self) -> UserId {
        self.config.session.user_id
    }

    // ------------------------------------------------------------------
    // Spawned gateway calls
    // ------------------------------------------------------------------

    fn spawn_catalog_load(&self) {
        let gateway = Arc::clone(&self.gateway);
        let tx = self.gw_tx.clone();
        tokio::spawn(async move {
            let result = gateway.list_athletes().await;
            let _ = tx.send(GatewayEvent::CatalogLoaded(result)).await;
        });
    }

    fn spawn_squad_fetch(&self) {
        let gateway = Arc::clone(&self.gateway);
        let tx = self.gw_tx.clone();
        let user = self.user();
        let gameweek = self.gameweek;
        let generation = self.generation;
        tokio::spawn(async move {
            let result = gateway.fetch_squad(user, gameweek).await;
            let _ = tx
                .send(GatewayEvent::SquadFetched {
                    generation,
                    gameweek,
                    result,
                })
                .await;
        });
    }

    fn spawn_candidate_request(&self) {
        let gateway = Arc::clone(&self.gateway);
        let tx = self.gw_tx.clone();
        let user = self.user();
        let gameweek = self.gameweek;
        let generation = self.generation;
        tokio::spawn(async move {
            let result = gateway.generate_candidate(user, gameweek).await;
            let _ = tx
                .send(GatewayEvent::CandidateReady {
                    generation,
                    gameweek,
                    result,
                })
                .await;
        });
    }

    /// Commit the payload: probe for an existing squad, then create or
    /// overwrite. The overwrite is blind — the platform offers no version
    /// token, so the last writer wins across concurrent sessions.
    fn spawn_save(&self, payload: SquadPayload) {
        let gateway = Arc::clone(&self.gateway);
        let tx = self.gw_tx.clone();
        let user = self.user();
        let gameweek = payload.gameweek;
        tokio::spawn(async move {
            let result = match gateway.fetch_squad(user, gameweek).await {
                Ok(Some(existing)) => gateway
                    .update_squad(existing.id, &payload)
                    .await
                    .map(|()| existing.id),
                Ok(None) => gateway.create_squad(user, &payload).await,
                Err(e) => Err(e),
            };
            let _ = tx
                .send(GatewayEvent::SaveFinished { gameweek, result })
                .await;
        });
    }

    // ------------------------------------------------------------------
    // Draft helpers
    // ------------------------------------------------------------------

    /// Persist the working draft so a crash or restart can resume it.
    fn autosave(&self) {
        if let Some(draft) = &self.draft {
            if let Err(e) = self.db.save_draft(&DraftSnapshot::from_draft(draft)) {
                warn!("failed to autosave draft: {e}");
            }
        }
    }

    async fn push_snapshot(&self, ui_tx: &mpsc::Sender<UiUpdate>) {
        if let Some(draft) = &self.draft {
            let _ = ui_tx
                .send(UiUpdate::SquadChanged(SquadSnapshot::of(draft)))
                .await;
        }
    }

    async fn notice(&self, ui_tx: &mpsc::Sender<UiUpdate>, notice: Notice) {
        let _ = ui_tx.send(UiUpdate::Notice(notice)).await;
    }

    /// Start a fresh empty draft for the current gameweek.
    fn fresh_draft(&mut self) {
        self.draft = Some(DraftSquad::new(self.gameweek, self.config.rules.clone()));
    }

    async fn enter_gameweek(&mut self, gameweek: GameweekId, ui_tx: &mpsc::Sender<UiUpdate>) {
        self.generation += 1;
        self.gameweek = gameweek;
        self.draft = None;
        if let Err(e) = self.db.set_last_gameweek(gameweek) {
            warn!("failed to record last gameweek: {e}");
        }
        if self.catalog.is_none() {
            // Catalog load failed or hasn't happened; retry it so the
            // squad fetch that follows has something to resolve against.
            self.spawn_catalog_load();
        }
        self.notice(ui_tx, Notice::info(format!("loading gameweek {gameweek}")))
            .await;
        self.spawn_squad_fetch();
    }

    // ------------------------------------------------------------------
    // Command handling
    // ------------------------------------------------------------------

    async fn handle_command(&mut self, cmd: UserCommand, ui_tx: &mpsc::Sender<UiUpdate>) -> Flow {
        match cmd {
            UserCommand::EnterGameweek(gameweek) => {
                self.enter_gameweek(gameweek, ui_tx).await;
            }

            UserCommand::Add(id) => {
                let Some(catalog) = &self.catalog else {
                    self.notice(ui_tx, Notice::warn("catalog not loaded yet")).await;
                    return Flow::Continue;
                };
                let Some(athlete) = catalog.get(id).cloned() else {
                    self.notice(ui_tx, Notice::warn(format!("no athlete {id} in the catalog")))
                        .await;
                    return Flow::Continue;
                };
                let Some(draft) = self.draft.as_mut() else {
                    self.notice(ui_tx, Notice::warn("no gameweek loaded")).await;
                    return Flow::Continue;
                };
                match draft.add(athlete) {
                    Ok(()) => {
                        self.autosave();
                        self.push_snapshot(ui_tx).await;
                    }
                    Err(e) => {
                        let _ = ui_tx.send(UiUpdate::EditRejected(e)).await;
                    }
                }
            }

            UserCommand::Remove(id) => {
                let Some(draft) = self.draft.as_mut() else {
                    self.notice(ui_tx, Notice::warn("no gameweek loaded")).await;
                    return Flow::Continue;
                };
                if draft.remove(id) {
                    self.autosave();
                    self.push_snapshot(ui_tx).await;
                }
            }

            UserCommand::Promote(id) => {
                let Some(draft) = self.draft.as_mut() else {
                    self.notice(ui_tx, Notice::warn("no gameweek loaded")).await;
                    return Flow::Continue;
                };
                match draft.promote(id) {
                    Ok(()) => {
                        self.autosave();
                        self.push_snapshot(ui_tx).await;
                    }
                    Err(e) => {
                        let _ = ui_tx.send(UiUpdate::EditRejected(e)).await;
                    }
                }
            }

            UserCommand::Demote(id) => {
                let Some(draft) = self.draft.as_mut() else {
                    self.notice(ui_tx, Notice::warn("no gameweek loaded")).await;
                    return Flow::Continue;
                };
                if draft.demote(id) {
                    self.autosave();
                    self.push_snapshot(ui_tx).await;
                }
            }

            UserCommand::SetCaptain(id) => {
                let Some(draft) = self.draft.as_mut() else {
                    self.notice(ui_tx, Notice::warn("no gameweek loaded")).await;
                    return Flow::Continue;
                };
                match draft.set_captain(id) {
                    Ok(()) => {
                        self.autosave();
                        self.push_snapshot(ui_tx).await;
                    }
                    Err(e) => {
                        let _ = ui_tx.send(UiUpdate::EditRejected(e)).await;
                    }
                }
            }

            UserCommand::SetViceCaptain(id) => {
                let Some(draft) = self.draft.as_mut() else {
                    self.notice(ui_tx, Notice::warn("no gameweek loaded")).await;
                    return Flow::Continue;
                };
                match draft.set_vice_captain(id) {
                    Ok(()) => {
                        self.autosave();
                        self.push_snapshot(ui_tx).await;
                    }
                    Err(e) => {
                        let _ = ui_tx.send(UiUpdate::EditRejected(e)).await;
                    }
                }
            }

            UserCommand::Validate => {
                let Some(draft) = &self.draft else {
                    self.notice(ui_tx, Notice::warn("no gameweek loaded")).await;
                    return Flow::Continue;
                };
                let _ = ui_tx
                    .send(UiUpdate::ValidationFinished(validate(draft)))
                    .await;
            }

            UserCommand::Save => {
                let Some(draft) = &self.draft else {
                    self.notice(ui_tx, Notice::warn("no gameweek loaded")).await;
                    return Flow::Continue;
                };
                let report = validate(draft);
                if !report.is_valid() {
                    let _ = ui_tx.send(UiUpdate::ValidationFinished(report)).await;
                    self.notice(
                        ui_tx,
                        Notice::warn("draft has violations; fix them before saving"),
                    )
                    .await;
                    return Flow::Continue;
                }
                match SquadPayload::from_draft(draft) {
                    Ok(payload) => {
                        info!(
                            "saving squad for gameweek {}: {} athletes, cost {}",
                            payload.gameweek,
                            payload.athlete_ids.len(),
                            draft.cost_used()
                        );
                        self.spawn_save(payload);
                        self.notice(ui_tx, Notice::info("saving squad")).await;
                    }
                    Err(e) => {
                        // A passing report implies both roles are set.
                        self.notice(ui_tx, Notice::error(e.to_string())).await;
                    }
                }
            }

            UserCommand::RequestCandidate => {
                if self.catalog.is_none() {
                    self.notice(ui_tx, Notice::warn("catalog not loaded yet")).await;
                    return Flow::Continue;
                }
                self.notice(ui_tx, Notice::info("requesting a generated squad"))
                    .await;
                self.spawn_candidate_request();
            }

            UserCommand::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    // ------------------------------------------------------------------
    // Gateway event handling
    // ------------------------------------------------------------------

    async fn handle_gateway_event(&mut self, event: GatewayEvent, ui_tx: &mpsc::Sender<UiUpdate>) {
        match event {
            GatewayEvent::CatalogLoaded(Ok(dto)) => match AthleteCatalog::from_dto(dto) {
                Ok(catalog) => {
                    info!("catalog loaded: {} athletes", catalog.len());
                    let _ = ui_tx
                        .send(UiUpdate::CatalogReady {
                            athletes: catalog.len(),
                        })
                        .await;
                    self.catalog = Some(catalog);
                    if self.draft.is_none() {
                        // First load of the session: bring up the current
                        // gameweek now that ids can be resolved.
                        self.spawn_squad_fetch();
                    }
                }
                Err(e) => {
                    warn!("catalog dump rejected: {e}");
                    self.notice(ui_tx, Notice::error(format!("catalog rejected: {e}")))
                        .await;
                }
            },

            GatewayEvent::CatalogLoaded(Err(e)) => {
                warn!("catalog load failed: {e}");
                self.notice(
                    ui_tx,
                    Notice::error(format!("failed to load catalog: {e}")),
                )
                .await;
            }

            GatewayEvent::SquadFetched {
                generation,
                gameweek,
                result,
            } => {
                if generation != self.generation {
                    debug!("dropping stale squad fetch for gameweek {gameweek}");
                    return;
                }
                let Some(catalog) = &self.catalog else {
                    self.notice(
                        ui_tx,
                        Notice::error("catalog not loaded; re-enter the gameweek to retry"),
                    )
                    .await;
                    return;
                };
                match result {
                    Ok(Some(persisted)) => {
                        match resolve_squad(&persisted.payload, catalog, &self.config.rules) {
                            Ok(squad) => {
                                info!("loaded committed squad for gameweek {gameweek}");
                                self.draft = Some(squad);
                                self.push_snapshot(ui_tx).await;
                            }
                            Err(e) => {
                                warn!("committed squad failed to resolve: {e}");
                                self.notice(
                                    ui_tx,
                                    Notice::error(format!(
                                        "committed squad could not be resolved: {e}"
                                    )),
                                )
                                .await;
                            }
                        }
                    }
                    Ok(None) => {
                        match self.db.load_draft(gameweek) {
                            Ok(Some(snapshot)) => {
                                match resolve_snapshot(&snapshot, catalog, &self.config.rules) {
                                    Ok(squad) => {
                                        self.draft = Some(squad);
                                        self.notice(
                                            ui_tx,
                                            Notice::info("restored unsaved draft"),
                                        )
                                        .await;
                                    }
                                    Err(e) => {
                                        warn!("autosaved draft failed to resolve: {e}");
                                        self.fresh_draft();
                                    }
                                }
                            }
                            Ok(None) => self.fresh_draft(),
                            Err(e) => {
                                warn!("failed to read autosave: {e}");
                                self.fresh_draft();
                            }
                        }
                        self.push_snapshot(ui_tx).await;
                    }
                    Err(e) => {
                        warn!("squad fetch failed: {e}");
                        self.notice(
                            ui_tx,
                            Notice::error(format!("failed to fetch squad: {e}")),
                        )
                        .await;
                    }
                }
            }

            GatewayEvent::CandidateReady {
                generation,
                gameweek,
                result,
            } => {
                if generation != self.generation {
                    debug!("dropping stale candidate for gameweek {gameweek}");
                    return;
                }
                let Some(catalog) = &self.catalog else {
                    return;
                };
                match result {
                    Ok(candidate) => {
                        match resolve_candidate(&candidate, gameweek, catalog, &self.config.rules)
                        {
                            Ok(squad) => {
                                info!("accepted generated candidate for gameweek {gameweek}");
                                // The generator usually produces a legal
                                // roster, but it is not trusted: validate
                                // immediately and show the result.
                                let report = validate(&squad);
                                self.draft = Some(squad);
                                self.autosave();
                                self.push_snapshot(ui_tx).await;
                                let _ = ui_tx.send(UiUpdate::ValidationFinished(report)).await;
                            }
                            Err(e) => {
                                warn!("generated candidate rejected: {e}");
                                self.notice(
                                    ui_tx,
                                    Notice::warn(format!(
                                        "generated squad was incomplete ({e}); try again"
                                    )),
                                )
                                .await;
                            }
                        }
                    }
                    Err(e) => {
                        warn!("candidate request failed: {e}");
                        self.notice(
                            ui_tx,
                            Notice::error(format!("failed to generate squad: {e}")),
                        )
                        .await;
                    }
                }
            }

            GatewayEvent::SaveFinished { gameweek, result } => match result {
                Ok(squad_id) => {
                    info!("squad {squad_id} saved for gameweek {gameweek}");
                    if let Err(e) = self.db.clear_draft(gameweek) {
                        warn!("failed to clear autosave after save: {e}");
                    }
                    let _ = ui_tx.send(UiUpdate::Saved { squad_id }).await;
                    self.notice(ui_tx, Notice::info("squad saved")).await;
                }
                Err(e) => {
                    warn!("save failed: {e}");
                    self.notice(
                        ui_tx,
                        Notice::error(format!("save failed: {e}; your draft is unchanged")),
                    )
                    .await;
                }
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

/// Run the session loop until the front end disconnects or sends `Quit`.
///
/// `gw_rx` is the receiver returned by [`AppState::new`]. Commands and
/// gateway events are interleaved on one task, so draft transitions are
/// serial and atomic with respect to each other.
pub async fn run(
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut gw_rx: mpsc::Receiver<GatewayEvent>,
    mut state: AppState,
) -> anyhow::Result<()> {
    state.spawn_catalog_load();

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(cmd) => {
                        if let Flow::Quit = state.handle_command(cmd, &ui_tx).await {
                            info!("session ended by user");
                            break;
                        }
                    }
                    None => {
                        info!("command channel closed; session ending");
                        break;
                    }
                }
            }
            Some(event) = gw_rx.recv() => {
                state.handle_gateway_event(event, &ui_tx).await;
            }
        }
    }

    Ok(())
}
