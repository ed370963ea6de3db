use crate::{
    maze::{
        Maze,
        MazeGame,
    },
    profiles::{
        self,
        ProfileSession,
    },
    ui,
};
use cheddar_maze::{
    ApplyOutcome,
    ContainerConfig,
    ContainerView,
    EligibilityResult,
    GameboardContainer,
    MazeClient,
    MazeClientConfig,
    Outcome,
    QueryTicket,
    SeedId,
    Verdict,
    engine::GameEngine,
    error::{
        NearError,
        QueryError,
    },
    near::{
        CheddarToken,
        NearViewClient,
        NftOwnership,
        PowerUpContract,
        TokenBalance,
    },
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use std::{
    path::PathBuf,
    time::{
        Duration,
        Instant,
    },
};
use tokio::{
    sync::mpsc,
    task::JoinSet,
    time,
};
use tracing::{
    info,
    warn,
};

const TICK_INTERVAL: Duration = Duration::from_millis(250);
const MAX_ERRORS: usize = 3;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: MazeClientConfig,
    pub near_rpc_url: String,
    pub nft_contract: String,
    pub token_contract: String,
    pub profiles_dir: PathBuf,
    pub account: Option<String>,
    pub container: ContainerConfig,
}

#[derive(Clone, Debug)]
pub struct AppSnapshot {
    pub view: ContainerView,
    pub maze: Maze,
    pub player: (usize, usize),
    pub profiles: Vec<String>,
    pub status: String,
    pub errors: Vec<String>,
}

#[derive(Clone)]
struct Clients {
    maze: MazeClient,
    power_ups: PowerUpContract,
    cheddar: CheddarToken,
}

impl Clients {
    fn new(config: &AppConfig) -> Result<Self> {
        let maze = MazeClient::new(config.api.clone()).wrap_err("building maze api client")?;
        let view = NearViewClient::new(config.near_rpc_url.clone(), config.api.timeout)
            .wrap_err("building NEAR rpc client")?;
        Ok(Self {
            maze,
            power_ups: PowerUpContract::new(view.clone(), config.nft_contract.clone()),
            cheddar: CheddarToken::new(view, config.token_contract.clone()),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkerCommand {
    CheckEligibility {
        ticket: QueryTicket,
        account_id: String,
    },
    FetchSeed {
        account_id: String,
    },
    RefreshWallet {
        account_id: String,
    },
    Shutdown,
}

#[derive(Debug)]
pub enum WorkerEvent {
    Eligibility {
        ticket: QueryTicket,
        result: Result<EligibilityResult, QueryError>,
    },
    Seed {
        account_id: String,
        result: Result<SeedId, QueryError>,
    },
    PowerUp {
        account_id: String,
        result: Result<bool, NearError>,
    },
    Balance {
        account_id: String,
        result: Result<u128, NearError>,
    },
}

pub struct AppController {
    container: GameboardContainer<ProfileSession, MazeGame>,
    status: String,
    errors: Vec<String>,
}

impl AppController {
    pub fn new(
        config: ContainerConfig,
        accounts: Vec<String>,
        preselected: Option<String>,
        seed: u64,
    ) -> Self {
        let session = ProfileSession::new(accounts, preselected);
        Self {
            container: GameboardContainer::new(session, MazeGame::new(seed), config),
            status: String::new(),
            errors: Vec::new(),
        }
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn container(&self) -> &GameboardContainer<ProfileSession, MazeGame> {
        &self.container
    }

    fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
        self.errors.clear();
    }

    fn push_error(&mut self, error: impl Into<String>) {
        let error = error.into();
        warn!(%error, "surfacing error");
        self.errors.push(error);
        if self.errors.len() > MAX_ERRORS {
            self.errors.remove(0);
        }
    }

    pub fn snapshot(&self) -> AppSnapshot {
        let engine = self.container.engine();
        AppSnapshot {
            view: self.container.view(),
            maze: engine.maze().clone(),
            player: engine.player(),
            profiles: self.container.session().accounts().to_vec(),
            status: self.status.clone(),
            errors: self.errors.clone(),
        }
    }

    /// True once after the session asked for a login prompt.
    pub fn take_login_request(&mut self) -> bool {
        self.container.session_mut().take_prompt_request()
    }

    /// Commands to issue right after an account becomes active.
    pub fn on_signed_in(&mut self) -> Vec<WorkerCommand> {
        let Some((ticket, account_id)) = self.container.begin_eligibility_check() else {
            return Vec::new();
        };
        info!(%account_id, %ticket, "checking eligibility");
        self.set_status(format!("Signed in as {account_id}"));
        vec![
            WorkerCommand::CheckEligibility {
                ticket,
                account_id: account_id.clone(),
            },
            WorkerCommand::RefreshWallet {
                account_id: account_id.clone(),
            },
            WorkerCommand::FetchSeed { account_id },
        ]
    }

    pub async fn handle_user_event(&mut self, event: ui::UserEvent) -> Vec<WorkerCommand> {
        let outcome = match event {
            ui::UserEvent::Quit | ui::UserEvent::Redraw => return Vec::new(),
            ui::UserEvent::Move(direction) => self.container.key_press(direction),
            ui::UserEvent::Drag(drag) => self.container.touch_move(drag),
            ui::UserEvent::Start => {
                let outcome = self.container.press_start();
                if outcome == Outcome::Gated(Verdict::Execute) {
                    self.set_status("Game started");
                    // the seed for the following round
                    return match self.container.account_id() {
                        Some(account_id) => vec![WorkerCommand::FetchSeed {
                            account_id: account_id.to_owned(),
                        }],
                        None => Vec::new(),
                    };
                }
                outcome
            }
            ui::UserEvent::PowerUp => self.container.power_up_click(),
            ui::UserEvent::Buy => self.container.buy_click(),
            ui::UserEvent::Rules => self.container.open_rules(),
            ui::UserEvent::Login => self.container.login_click(),
            ui::UserEvent::CloseOverlays => {
                self.container.close_all_overlays();
                return Vec::new();
            }
            ui::UserEvent::LogOut => {
                match self.container.log_out().await {
                    Ok(()) => self.set_status("Signed out"),
                    Err(err) => self.push_error(format!("Log out failed: {err}")),
                }
                return Vec::new();
            }
            ui::UserEvent::SelectProfile(idx) => {
                if self.container.session_mut().sign_in_index(idx).is_none() {
                    self.push_error(format!("No profile at position {}", idx + 1));
                    return Vec::new();
                }
                return self.on_signed_in();
            }
        };
        self.report(outcome);
        Vec::new()
    }

    fn report(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Ignored | Outcome::Opened(_) | Outcome::Gated(Verdict::Execute) => {}
            Outcome::LoginPrompted | Outcome::Gated(Verdict::PromptSignIn) => {
                self.set_status("Sign in to play")
            }
            Outcome::Gated(Verdict::AwaitingEligibility) => {
                self.set_status("Still checking whether you can play...")
            }
            Outcome::Gated(Verdict::ShowNotAllowed(reasons)) => {
                self.set_status(format!("Not allowed to play ({} reasons)", reasons.len()))
            }
        }
    }

    fn is_current_account(&self, account_id: &str) -> bool {
        self.container.account_id() == Some(account_id)
    }

    pub fn apply_worker_event(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Eligibility { ticket, result } => {
                if let Err(err) = &result {
                    self.push_error(format!("Eligibility check failed: {err}"));
                }
                let allowed = matches!(&result, Ok(r) if r.ok);
                match self.container.complete_eligibility_check(ticket, result) {
                    ApplyOutcome::Applied if allowed => self.set_status("You can play"),
                    ApplyOutcome::Applied => {}
                    ApplyOutcome::Stale | ApplyOutcome::Disposed => {
                        info!(%ticket, "dropping eligibility result");
                    }
                }
            }
            WorkerEvent::Seed { account_id, result } => {
                if !self.is_current_account(&account_id) {
                    return;
                }
                match result {
                    Ok(seed) => self.container.engine_mut().load_seed(&seed),
                    Err(err) => self.push_error(format!("Seed request failed: {err}")),
                }
            }
            WorkerEvent::PowerUp { account_id, result } => {
                if !self.is_current_account(&account_id) {
                    return;
                }
                match result {
                    Ok(has_power_up) => self.container.set_power_up(has_power_up),
                    Err(err) => self.push_error(format!("Power-up lookup failed: {err}")),
                }
            }
            WorkerEvent::Balance { account_id, result } => {
                if !self.is_current_account(&account_id) {
                    return;
                }
                match result {
                    Ok(balance) => self.container.set_balance(Some(balance)),
                    Err(err) => self.push_error(format!("Balance lookup failed: {err}")),
                }
            }
        }
    }

    /// Returns true when the frame needs redrawing.
    pub fn tick(&mut self, elapsed: Duration) -> bool {
        let running = self.container.engine().status().timer_started;
        if self.container.engine_mut().tick(elapsed) {
            let message = self.container.engine().status().game_over_message;
            self.set_status(message);
        }
        running
    }

    pub fn dispose(&mut self) {
        self.container.dispose();
    }
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let clients = Clients::new(&config)?;
    let accounts = profiles::load_accounts(&config.profiles_dir)
        .wrap_err("loading account profiles")?;
    info!(profiles = accounts.len(), dir = ?config.profiles_dir, "profiles loaded");
    let seed = rand::random();
    let controller =
        AppController::new(config.container.clone(), accounts, config.account.clone(), seed);
    let mut ui_state = ui::UiState::default();
    let mut input_events = ui::input_event_stream();

    ui::terminal_enter(&mut ui_state)?;
    info!("UI ready");
    let res = run_loop(controller, clients, &mut ui_state, &mut input_events).await;
    ui::terminal_exit()?;
    res
}

async fn query_worker(
    clients: Clients,
    mut cmd_rx: mpsc::UnboundedReceiver<WorkerCommand>,
    event_tx: mpsc::UnboundedSender<WorkerEvent>,
) -> Result<()> {
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else {
                    break;
                };
                let clients = clients.clone();
                let tx = event_tx.clone();
                match cmd {
                    WorkerCommand::CheckEligibility { ticket, account_id } => {
                        in_flight.spawn(async move {
                            let result = clients.maze.check_allowed(&account_id).await;
                            let _ = tx.send(WorkerEvent::Eligibility { ticket, result });
                        });
                    }
                    WorkerCommand::FetchSeed { account_id } => {
                        in_flight.spawn(async move {
                            let result = clients.maze.fetch_seed(&account_id).await;
                            let _ = tx.send(WorkerEvent::Seed { account_id, result });
                        });
                    }
                    WorkerCommand::RefreshWallet { account_id } => {
                        in_flight.spawn(async move {
                            let result = clients
                                .power_ups
                                .owned_nfts(&account_id)
                                .await
                                .map(|owned| !owned.is_empty());
                            let _ = tx.send(WorkerEvent::PowerUp {
                                account_id: account_id.clone(),
                                result,
                            });
                            let result = clients.cheddar.balance_of(&account_id).await;
                            let _ = tx.send(WorkerEvent::Balance { account_id, result });
                        });
                    }
                    WorkerCommand::Shutdown => break,
                }
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(err) = joined {
                    warn!(?err, "query task failed");
                }
            }
        }
    }
    in_flight.abort_all();
    Ok(())
}

fn send_all(cmd_tx: &mpsc::UnboundedSender<WorkerCommand>, commands: Vec<WorkerCommand>) {
    for cmd in commands {
        if cmd_tx.send(cmd).is_err() {
            warn!("query worker is gone");
        }
    }
}

async fn run_loop(
    mut controller: AppController,
    clients: Clients,
    ui_state: &mut ui::UiState,
    input_events: &mut ui::InputEventReceiver,
) -> Result<()> {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let worker_handle = tokio::spawn(query_worker(clients, cmd_rx, event_tx));

    send_all(&cmd_tx, controller.on_signed_in());
    ui::draw(ui_state, &controller.snapshot()).wrap_err("initial draw failed")?;

    let mut ticker = time::interval(TICK_INTERVAL);
    let mut last_tick = Instant::now();

    loop {
        tokio::select! {
            maybe_event = event_rx.recv() => {
                let Some(event) = maybe_event else {
                    warn!("query worker channel closed");
                    break;
                };
                controller.apply_worker_event(event);
                ui::draw(ui_state, &controller.snapshot())
                    .wrap_err("draw after query result failed")?;
            }
            _ = ticker.tick() => {
                let now = Instant::now();
                let elapsed = now.duration_since(last_tick);
                last_tick = now;
                if controller.tick(elapsed) {
                    ui::draw(ui_state, &controller.snapshot())
                        .wrap_err("draw after clock tick failed")?;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
            raw_ev = ui::next_raw_event(input_events) => {
                let event = raw_ev?;
                let Some(ev) = ui::interpret_event(ui_state, event) else {
                    continue;
                };
                if ev == ui::UserEvent::Quit {
                    break;
                }
                let commands = controller.handle_user_event(ev).await;
                send_all(&cmd_tx, commands);
                if controller.take_login_request() {
                    ui_state.open_profile_picker();
                }
                ui::draw(ui_state, &controller.snapshot())
                    .wrap_err("draw after input failed")?;
            }
        }
    }

    controller.dispose();
    let _ = cmd_tx.send(WorkerCommand::Shutdown);
    match worker_handle.await {
        Ok(result) => result.wrap_err("query worker failed"),
        Err(err) => Err(eyre!(err)).wrap_err("query worker panicked"),
    }
}
