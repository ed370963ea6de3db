use crate::{
    container::{
        ContainerConfig,
        GameboardContainer,
    },
    engine::{
        Direction,
        EngineStatus,
        GameEngine,
        TouchDrag,
    },
    error::{
        NearError,
        SessionError,
    },
    maze_client::{
        MazeClient,
        MazeClientConfig,
    },
    near::{
        Nft,
        NftOwnership,
        TokenBalance,
    },
    session::WalletSession,
};
use actix_web::{
    App,
    HttpRequest,
    HttpResponse,
    HttpServer,
    dev::ServerHandle,
    http::StatusCode,
    web,
};
use std::{
    collections::HashMap,
    net::TcpListener,
    sync::Mutex,
    thread::JoinHandle,
    time::Duration,
};

#[derive(Clone, Debug)]
pub struct CannedResponse {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl CannedResponse {
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordedRequest {
    IsAllowed {
        account_id: String,
    },
    GetSeedId {
        content_type: Option<String>,
        body: serde_json::Value,
    },
    Rpc {
        body: serde_json::Value,
    },
}

struct BackendState {
    is_allowed: Mutex<CannedResponse>,
    seed: Mutex<CannedResponse>,
    rpc: Mutex<CannedResponse>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl Default for BackendState {
    fn default() -> Self {
        Self {
            is_allowed: Mutex::new(CannedResponse::json(200, r#"{"ok":true,"errors":[]}"#)),
            seed: Mutex::new(CannedResponse::json(200, "1")),
            rpc: Mutex::new(CannedResponse::json(200, "null")),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl BackendState {
    fn record(&self, request: RecordedRequest) {
        self.requests.lock().unwrap().push(request);
    }
}

/// In-process stand-in for the maze backend and a NEAR RPC node, bound to an
/// ephemeral local port.
pub struct FakeBackend {
    base_url: String,
    state: web::Data<BackendState>,
    server_handle: ServerHandle,
    server_thread: Option<JoinHandle<()>>,
}

impl FakeBackend {
    pub fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0))?;
        let address = listener.local_addr()?;
        let base_url = format!("http://{address}");
        let state = web::Data::new(BackendState::default());

        let server_state = state.clone();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(server_state.clone())
                .route("/api/maze/isAllowed", web::get().to(handle_is_allowed))
                .route("/api/maze/getSeedId", web::post().to(handle_get_seed_id))
                .route("/rpc", web::post().to(handle_rpc))
        })
        .workers(1)
        .listen(listener)?
        .run();

        let server_handle = server.handle();
        let server_thread = std::thread::spawn(move || {
            let sys = actix_web::rt::System::new();
            let _ = sys.block_on(server);
        });

        Ok(Self {
            base_url,
            state,
            server_handle,
            server_thread: Some(server_thread),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn rpc_url(&self) -> String {
        format!("{}/rpc", self.base_url)
    }

    pub fn set_is_allowed(&self, response: CannedResponse) {
        *self.state.is_allowed.lock().unwrap() = response;
    }

    pub fn set_seed(&self, response: CannedResponse) {
        *self.state.seed.lock().unwrap() = response;
    }

    pub fn set_rpc(&self, response: CannedResponse) {
        *self.state.rpc.lock().unwrap() = response;
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        let _ = self.server_handle.stop(false);
        if let Some(thread) = self.server_thread.take() {
            let _ = thread.join();
        }
    }
}

async fn respond(canned: CannedResponse) -> HttpResponse {
    if !canned.delay.is_zero() {
        actix_web::rt::time::sleep(canned.delay).await;
    }
    let status =
        StatusCode::from_u16(canned.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    HttpResponse::build(status)
        .content_type("application/json")
        .body(canned.body)
}

async fn handle_is_allowed(
    state: web::Data<BackendState>,
    query: web::Query<HashMap<String, String>>,
) -> HttpResponse {
    let account_id = query.get("accountId").cloned().unwrap_or_default();
    state.record(RecordedRequest::IsAllowed { account_id });
    let canned = state.is_allowed.lock().unwrap().clone();
    respond(canned).await
}

async fn handle_get_seed_id(
    state: web::Data<BackendState>,
    req: HttpRequest,
    body: web::Bytes,
) -> HttpResponse {
    let content_type = req
        .headers()
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let body = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    state.record(RecordedRequest::GetSeedId { content_type, body });
    let canned = state.seed.lock().unwrap().clone();
    respond(canned).await
}

async fn handle_rpc(state: web::Data<BackendState>, body: web::Bytes) -> HttpResponse {
    let body = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    state.record(RecordedRequest::Rpc { body });
    let canned = state.rpc.lock().unwrap().clone();
    respond(canned).await
}

#[derive(Debug, Default)]
pub struct FakeSession {
    account_id: Option<String>,
    signed_in: bool,
    login_prompts: usize,
    sign_outs: usize,
}

impl FakeSession {
    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn signed_in(account_id: &str) -> Self {
        Self {
            account_id: Some(account_id.to_string()),
            signed_in: true,
            ..Self::default()
        }
    }

    pub fn with_account(mut self, account_id: &str) -> Self {
        self.account_id = Some(account_id.to_string());
        self
    }

    /// Completes a login the way a wallet would after its prompt.
    pub fn sign_in(&mut self, account_id: &str) {
        self.account_id = Some(account_id.to_string());
        self.signed_in = true;
    }

    pub fn login_prompts(&self) -> usize {
        self.login_prompts
    }

    pub fn sign_outs(&self) -> usize {
        self.sign_outs
    }
}

impl WalletSession for FakeSession {
    fn account_id(&self) -> Option<&str> {
        self.account_id.as_deref()
    }

    fn is_signed_in(&self) -> bool {
        self.signed_in
    }

    fn show_login_prompt(&mut self) {
        self.login_prompts += 1;
    }

    async fn sign_out(&mut self) -> Result<(), SessionError> {
        self.sign_outs += 1;
        self.signed_in = false;
        self.account_id = None;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineCall {
    KeyPress(Direction),
    TouchMove(TouchDrag),
    Restart,
    TogglePowerUp,
}

#[derive(Debug, Default)]
pub struct FakeEngine {
    status: EngineStatus,
    calls: Vec<EngineCall>,
}

impl FakeEngine {
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.clone()
    }

    pub fn set_timer_started(&mut self, started: bool) {
        self.status.timer_started = started;
    }

    pub fn finish(&mut self, message: &str) {
        self.status.timer_started = false;
        self.status.game_over = true;
        self.status.game_over_message = message.to_string();
    }
}

impl GameEngine for FakeEngine {
    fn status(&self) -> EngineStatus {
        self.status.clone()
    }

    fn handle_key_press(&mut self, direction: Direction) {
        self.calls.push(EngineCall::KeyPress(direction));
    }

    fn handle_touch_move(&mut self, drag: TouchDrag) {
        self.calls.push(EngineCall::TouchMove(drag));
    }

    fn restart_game(&mut self) {
        self.calls.push(EngineCall::Restart);
        self.status = EngineStatus {
            timer_started: true,
            power_up_on: self.status.power_up_on,
            ..EngineStatus::default()
        };
    }

    fn toggle_power_up(&mut self) {
        self.calls.push(EngineCall::TogglePowerUp);
        self.status.power_up_on = !self.status.power_up_on;
    }
}

#[derive(Debug, Default)]
pub struct FakeNfts {
    nfts: Vec<Nft>,
    queried_owners: Mutex<Vec<String>>,
}

impl FakeNfts {
    pub fn owning<I, S>(token_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let nfts = token_ids
            .into_iter()
            .map(|token_id| Nft {
                token_id: token_id.into(),
                owner_id: String::new(),
                metadata: None,
            })
            .collect();
        Self {
            nfts,
            queried_owners: Mutex::new(Vec::new()),
        }
    }

    pub fn queried_owners(&self) -> Vec<String> {
        self.queried_owners.lock().unwrap().clone()
    }
}

impl NftOwnership for FakeNfts {
    async fn owned_nfts(&self, owner: &str) -> Result<Vec<Nft>, NearError> {
        self.queried_owners.lock().unwrap().push(owner.to_string());
        Ok(self
            .nfts
            .iter()
            .cloned()
            .map(|nft| Nft {
                owner_id: owner.to_string(),
                ..nft
            })
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct FakeBalance {
    balance: u128,
}

impl FakeBalance {
    pub fn new(balance: u128) -> Self {
        Self { balance }
    }
}

impl TokenBalance for FakeBalance {
    async fn balance_of(&self, _account: &str) -> Result<u128, NearError> {
        Ok(self.balance)
    }
}

/// A running fake backend plus a client pointed at it.
pub struct TestContext {
    backend: FakeBackend,
    client: MazeClient,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(5))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let backend = FakeBackend::start().unwrap();
        let client = MazeClient::new(MazeClientConfig {
            base_url: backend.base_url().to_string(),
            timeout,
        })
        .unwrap();
        Self { backend, client }
    }

    pub fn backend(&self) -> &FakeBackend {
        &self.backend
    }

    pub fn client(&self) -> &MazeClient {
        &self.client
    }

    pub fn container(&self, session: FakeSession) -> GameboardContainer<FakeSession, FakeEngine> {
        GameboardContainer::new(session, FakeEngine::default(), ContainerConfig::default())
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
