//! View model for the top-level game screen.
//!
//! Owns the gate, the eligibility cell, the overlays and the engine, and
//! derives everything a front-end needs to draw one frame.

use crate::{
    eligibility::{
        ApplyOutcome,
        Eligibility,
        EligibilityResult,
        EligibilityState,
        QueryTicket,
    },
    engine::{
        Direction,
        GameEngine,
        TouchDrag,
    },
    error::{
        GateError,
        NearError,
        QueryError,
        SessionError,
    },
    gate::{
        Action,
        HandlerRegistry,
        InteractionGate,
        Verdict,
    },
    maze_client::MazeClient,
    near::{
        NftOwnership,
        TokenBalance,
        whole_cheddar,
    },
    overlays::{
        Overlay,
        OverlayVisibility,
    },
    session::{
        WalletSession,
        signed_in_account,
    },
};
use std::time::Duration;

pub const TITLE: &str = "Cheddar Maze";
pub const DEFAULT_MIN_CHEDDAR_REQUIRED: u64 = 100;

/// Whether the maze board is drawn while the account is allowed to play.
///
/// The two screens this view model replaces disagreed here, so the choice
/// is left to the host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BoardVisibility {
    #[default]
    Always,
    HiddenWhenAllowed,
}

#[derive(Clone, Debug)]
pub struct ContainerConfig {
    pub min_cheddar_required: u64,
    pub board_visibility: BoardVisibility,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            min_cheddar_required: DEFAULT_MIN_CHEDDAR_REQUIRED,
            board_visibility: BoardVisibility::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The control is hidden or disabled in the current state.
    Ignored,
    Gated(Verdict),
    LoginPrompted,
    Opened(Overlay),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthButton {
    Login,
    LogOut,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerView {
    pub title: &'static str,
    pub account_id: Option<String>,
    pub auth_button: AuthButton,
    pub balance_warning: Option<String>,
    pub score_label: String,
    pub time_label: String,
    pub game_over_message: String,
    /// `None` while the start button is hidden.
    pub start_button: Option<&'static str>,
    pub power_up_enabled: bool,
    pub power_up_on: bool,
    pub buy_button_visible: bool,
    pub board_visible: bool,
    pub awaiting_eligibility: bool,
    pub rules_open: bool,
    pub buy_panel_open: bool,
    /// Reasons to list in the not-allowed overlay, when it is showing.
    pub not_allowed_reasons: Option<Vec<String>>,
}

/// Formats the remaining time as zero-padded `MM:SS`.
pub fn format_clock(remaining: Duration) -> String {
    let total = remaining.as_secs();
    format!("{:02}:{:02}", total / 60, total % 60)
}

pub fn balance_warning(min_cheddar_required: u64) -> String {
    format!("You have to hold at least {min_cheddar_required} Cheddar to earn.")
}

pub struct GameboardContainer<S, E> {
    gate: InteractionGate<S, E>,
    eligibility: EligibilityState,
    overlays: OverlayVisibility,
    engine: E,
    config: ContainerConfig,
    has_enough_balance: Option<bool>,
    /// Account the power-up and balance flags were loaded for.
    wallet_account: Option<String>,
}

impl<S: WalletSession, E: GameEngine> GameboardContainer<S, E> {
    pub fn new(session: S, engine: E, config: ContainerConfig) -> Self {
        Self::with_handlers(session, engine, config, HandlerRegistry::standard())
    }

    pub fn with_handlers(
        session: S,
        engine: E,
        config: ContainerConfig,
        handlers: HandlerRegistry<E>,
    ) -> Self {
        Self {
            gate: InteractionGate::new(session, handlers),
            eligibility: EligibilityState::new(),
            overlays: OverlayVisibility::new(),
            engine,
            config,
            has_enough_balance: None,
            wallet_account: None,
        }
    }

    pub fn session(&self) -> &S {
        self.gate.session()
    }

    pub fn session_mut(&mut self) -> &mut S {
        self.gate.session_mut()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn eligibility(&self) -> &Eligibility {
        self.eligibility.current()
    }

    pub fn overlays(&self) -> &OverlayVisibility {
        &self.overlays
    }

    pub fn account_id(&self) -> Option<&str> {
        signed_in_account(self.gate.session())
    }

    /// Start/restart button. Hidden once the timer runs.
    pub fn press_start(&mut self) -> Outcome {
        if self.engine.status().timer_started {
            return Outcome::Ignored;
        }
        self.request(Action::Restart)
    }

    /// Keyboard movement. Keys do nothing until the timer started.
    pub fn key_press(&mut self, direction: Direction) -> Outcome {
        if !self.engine.status().timer_started {
            return Outcome::Ignored;
        }
        self.request(Action::Move(direction))
    }

    pub fn touch_move(&mut self, drag: TouchDrag) -> Outcome {
        self.request(Action::TouchDrag(drag))
    }

    /// Power-up toggle. Disabled unless the account owns a power-up NFT.
    pub fn power_up_click(&mut self) -> Outcome {
        if !self.eligibility.has_power_up() {
            return Outcome::Ignored;
        }
        self.request(Action::PowerUp)
    }

    pub fn buy_click(&mut self) -> Outcome {
        if self.eligibility.has_power_up() {
            return Outcome::Ignored;
        }
        if self.gate.signed_in() {
            self.overlays.open(Overlay::BuyPanel);
            Outcome::Opened(Overlay::BuyPanel)
        } else {
            self.gate.session_mut().show_login_prompt();
            Outcome::LoginPrompted
        }
    }

    pub fn login_click(&mut self) -> Outcome {
        if self.gate.signed_in() {
            return Outcome::Ignored;
        }
        self.gate.session_mut().show_login_prompt();
        Outcome::LoginPrompted
    }

    pub fn open_rules(&mut self) -> Outcome {
        self.overlays.open(Overlay::Rules);
        Outcome::Opened(Overlay::Rules)
    }

    pub fn close_overlay(&mut self, overlay: Overlay) {
        self.overlays.close(overlay);
    }

    pub fn close_all_overlays(&mut self) {
        self.overlays.close_all();
    }

    pub async fn log_out(&mut self) -> Result<(), SessionError> {
        if !self.gate.signed_in() {
            return Err(SessionError::NotSignedIn);
        }
        self.gate.session_mut().sign_out().await?;
        tracing::info!("signed out");
        self.eligibility.forget();
        self.has_enough_balance = None;
        self.wallet_account = None;
        self.overlays.close(Overlay::NotAllowed);
        self.overlays.close(Overlay::BuyPanel);
        Ok(())
    }

    /// Issues a ticket for a new eligibility query, or clears the verdict
    /// when nobody is signed in. A different account than last time also
    /// drops the power-up and balance flags loaded for the previous one.
    pub fn begin_eligibility_check(&mut self) -> Option<(QueryTicket, String)> {
        let Some(account_id) = self.current_account() else {
            self.eligibility.forget();
            self.has_enough_balance = None;
            self.wallet_account = None;
            return None;
        };
        self.switch_wallet_account(&account_id);
        Some((self.eligibility.begin_query(), account_id))
    }

    pub fn complete_eligibility_check(
        &mut self,
        ticket: QueryTicket,
        result: Result<EligibilityResult, QueryError>,
    ) -> ApplyOutcome {
        self.eligibility.complete(ticket, result)
    }

    pub async fn refresh_eligibility(&mut self, client: &MazeClient) -> Option<ApplyOutcome> {
        let (ticket, account_id) = self.begin_eligibility_check()?;
        let result = client.check_allowed(&account_id).await;
        Some(self.complete_eligibility_check(ticket, result))
    }

    pub fn set_power_up(&mut self, has_power_up: bool) {
        self.eligibility.set_power_up(has_power_up);
    }

    pub async fn refresh_power_up<N: NftOwnership>(
        &mut self,
        nfts: &N,
    ) -> Result<bool, NearError> {
        let Some(account_id) = self.current_account() else {
            self.set_power_up(false);
            return Ok(false);
        };
        self.switch_wallet_account(&account_id);
        let owned = nfts.owned_nfts(&account_id).await?;
        tracing::debug!(%account_id, owned = owned.len(), "power-up ownership refreshed");
        let has_power_up = !owned.is_empty();
        self.set_power_up(has_power_up);
        Ok(has_power_up)
    }

    pub fn set_balance(&mut self, balance: Option<u128>) {
        self.has_enough_balance =
            balance.map(|b| b >= whole_cheddar(self.config.min_cheddar_required));
    }

    pub async fn refresh_balance<B: TokenBalance>(
        &mut self,
        balances: &B,
    ) -> Result<Option<bool>, NearError> {
        let Some(account_id) = self.current_account() else {
            self.set_balance(None);
            return Ok(None);
        };
        self.switch_wallet_account(&account_id);
        let balance = balances.balance_of(&account_id).await?;
        self.set_balance(Some(balance));
        Ok(self.has_enough_balance)
    }

    /// Drops every pending completion; call when the screen goes away.
    pub fn dispose(&mut self) {
        self.eligibility.dispose();
    }

    pub fn view(&self) -> ContainerView {
        let status = self.engine.status();
        let account_id = self.account_id().map(str::to_owned);
        let signed_in = account_id.is_some();
        let eligibility = self.eligibility.current();
        let has_power_up = self.eligibility.has_power_up();

        let balance_warning = (signed_in && self.has_enough_balance == Some(false))
            .then(|| balance_warning(self.config.min_cheddar_required));
        let start_button = (!status.timer_started).then_some(if status.game_over {
            "Restart Game"
        } else {
            "Start Game"
        });
        let board_visible = match self.config.board_visibility {
            BoardVisibility::Always => true,
            BoardVisibility::HiddenWhenAllowed => !(signed_in && eligibility.is_allowed()),
        };
        let not_allowed_reasons = match eligibility {
            Eligibility::Known(result)
                if signed_in && !result.ok && self.overlays.is_open(Overlay::NotAllowed) =>
            {
                Some(result.reasons.clone())
            }
            _ => None,
        };

        ContainerView {
            title: TITLE,
            auth_button: if signed_in {
                AuthButton::LogOut
            } else {
                AuthButton::Login
            },
            account_id,
            balance_warning,
            score_label: format!("Score: {}", status.score),
            time_label: format!("Time: {}", format_clock(status.remaining)),
            game_over_message: status.game_over_message,
            start_button,
            power_up_enabled: has_power_up,
            power_up_on: status.power_up_on,
            buy_button_visible: !has_power_up,
            board_visible,
            awaiting_eligibility: signed_in && !eligibility.is_known(),
            rules_open: self.overlays.is_open(Overlay::Rules),
            buy_panel_open: self.overlays.is_open(Overlay::BuyPanel),
            not_allowed_reasons,
        }
    }

    fn current_account(&self) -> Option<String> {
        match self.gate.require_account() {
            Ok(account_id) => Some(account_id.to_owned()),
            Err(GateError::Unauthenticated) => None,
        }
    }

    fn switch_wallet_account(&mut self, account_id: &str) {
        if self.wallet_account.as_deref() == Some(account_id) {
            return;
        }
        if self.wallet_account.is_some() {
            tracing::debug!(%account_id, "account changed, dropping wallet state");
        }
        self.eligibility.set_power_up(false);
        self.has_enough_balance = None;
        self.wallet_account = Some(account_id.to_owned());
    }

    fn request(&mut self, action: Action) -> Outcome {
        let verdict = self.gate.request(
            action,
            self.eligibility.current(),
            &mut self.engine,
            &mut self.overlays,
        );
        Outcome::Gated(verdict)
    }
}

#[allow(non_snake_case)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        EngineCall,
        FakeBalance,
        FakeEngine,
        FakeNfts,
        FakeSession,
    };

    type TestContainer = GameboardContainer<FakeSession, FakeEngine>;

    fn signed_in_container() -> TestContainer {
        GameboardContainer::new(
            FakeSession::signed_in("alice.testnet"),
            FakeEngine::default(),
            ContainerConfig::default(),
        )
    }

    fn allow(container: &mut TestContainer, result: EligibilityResult) {
        let (ticket, _) = container.begin_eligibility_check().unwrap();
        assert_eq!(
            ApplyOutcome::Applied,
            container.complete_eligibility_check(ticket, Ok(result))
        );
    }

    #[test]
    fn format_clock__zero_pads_minutes_and_seconds() {
        assert_eq!("00:00", format_clock(Duration::ZERO));
        assert_eq!("01:05", format_clock(Duration::from_secs(65)));
        assert_eq!("12:30", format_clock(Duration::from_millis(750_900)));
    }

    #[test]
    fn press_start__signed_out_prompts_login() {
        // given
        let mut container = GameboardContainer::new(
            FakeSession::signed_out(),
            FakeEngine::default(),
            ContainerConfig::default(),
        );

        // when
        let outcome = container.press_start();

        // then
        assert_eq!(Outcome::Gated(Verdict::PromptSignIn), outcome);
        assert_eq!(1, container.session().login_prompts());
        assert!(container.engine().calls().is_empty());
    }

    #[test]
    fn press_start__hidden_while_timer_runs() {
        // given
        let mut container = signed_in_container();
        allow(&mut container, EligibilityResult::allowed());
        container.engine_mut().set_timer_started(true);

        // when
        let outcome = container.press_start();

        // then
        assert_eq!(Outcome::Ignored, outcome);
        assert_eq!(None, container.view().start_button);
    }

    #[test]
    fn key_press__ignored_before_timer_starts() {
        // given
        let mut container = signed_in_container();
        allow(&mut container, EligibilityResult::allowed());

        // when
        let outcome = container.key_press(Direction::Down);

        // then
        assert_eq!(Outcome::Ignored, outcome);
        assert!(container.engine().calls().is_empty());
    }

    #[test]
    fn key_press__allowed_moves_once_timer_runs() {
        // given
        let mut container = signed_in_container();
        allow(&mut container, EligibilityResult::allowed());
        container.engine_mut().set_timer_started(true);

        // when
        let outcome = container.key_press(Direction::Down);

        // then
        assert_eq!(Outcome::Gated(Verdict::Execute), outcome);
        assert_eq!(vec![EngineCall::KeyPress(Direction::Down)], container.engine().calls());
    }

    #[test]
    fn touch_move__denied_shows_reasons_in_view() {
        // given
        let mut container = signed_in_container();
        allow(&mut container, EligibilityResult::denied(["low balance", "cooldown"]));

        // when
        let outcome = container.touch_move(TouchDrag::new(1, 0));

        // then
        assert_eq!(
            Outcome::Gated(Verdict::ShowNotAllowed(vec![
                "low balance".to_string(),
                "cooldown".to_string()
            ])),
            outcome
        );
        assert_eq!(
            Some(vec!["low balance".to_string(), "cooldown".to_string()]),
            container.view().not_allowed_reasons
        );
    }

    #[test]
    fn view__not_allowed_reasons_hidden_when_overlay_closed() {
        // given
        let mut container = signed_in_container();
        allow(&mut container, EligibilityResult::denied(["low balance"]));
        container.touch_move(TouchDrag::new(1, 0));

        // when
        container.close_overlay(Overlay::NotAllowed);

        // then
        assert_eq!(None, container.view().not_allowed_reasons);
    }

    #[test]
    fn buy_click__signed_in_opens_buy_panel() {
        // given
        let mut container = signed_in_container();

        // when
        let outcome = container.buy_click();

        // then
        assert_eq!(Outcome::Opened(Overlay::BuyPanel), outcome);
        assert!(container.view().buy_panel_open);
        assert_eq!(0, container.session().login_prompts());
    }

    #[test]
    fn buy_click__signed_out_prompts_login() {
        // given
        let mut container = GameboardContainer::new(
            FakeSession::signed_out(),
            FakeEngine::default(),
            ContainerConfig::default(),
        );

        // when
        let outcome = container.buy_click();

        // then
        assert_eq!(Outcome::LoginPrompted, outcome);
        assert!(!container.overlays().is_open(Overlay::BuyPanel));
        assert_eq!(1, container.session().login_prompts());
    }

    #[test]
    fn power_up_click__disabled_without_power_up() {
        // given
        let mut container = signed_in_container();
        allow(&mut container, EligibilityResult::allowed());

        // when
        let outcome = container.power_up_click();

        // then
        assert_eq!(Outcome::Ignored, outcome);
        assert!(!container.view().power_up_enabled);
        assert!(container.view().buy_button_visible);
    }

    #[tokio::test]
    async fn refresh_power_up__owned_nft_enables_power_up() {
        // given
        let mut container = signed_in_container();
        allow(&mut container, EligibilityResult::allowed());
        let nfts = FakeNfts::owning(["1"]);

        // when
        let has_power_up = container.refresh_power_up(&nfts).await.unwrap();
        let outcome = container.power_up_click();

        // then
        assert!(has_power_up);
        assert_eq!(vec!["alice.testnet".to_string()], nfts.queried_owners());
        assert_eq!(Outcome::Gated(Verdict::Execute), outcome);
        assert_eq!(vec![EngineCall::TogglePowerUp], container.engine().calls());
        assert!(!container.view().buy_button_visible);
    }

    #[tokio::test]
    async fn refresh_power_up__signed_out_clears_flag_without_query() {
        // given
        let mut container = GameboardContainer::new(
            FakeSession::signed_out(),
            FakeEngine::default(),
            ContainerConfig::default(),
        );
        container.set_power_up(true);
        let nfts = FakeNfts::owning(["1"]);

        // when
        let has_power_up = container.refresh_power_up(&nfts).await.unwrap();

        // then
        assert!(!has_power_up);
        assert!(nfts.queried_owners().is_empty());
    }

    #[tokio::test]
    async fn refresh_balance__below_minimum_shows_warning() {
        // given
        let mut container = signed_in_container();
        let balances = FakeBalance::new(whole_cheddar(DEFAULT_MIN_CHEDDAR_REQUIRED) - 1);

        // when
        let enough = container.refresh_balance(&balances).await.unwrap();

        // then
        assert_eq!(Some(false), enough);
        assert_eq!(
            Some(balance_warning(DEFAULT_MIN_CHEDDAR_REQUIRED)),
            container.view().balance_warning
        );
    }

    #[test]
    fn set_balance__minimum_beyond_token_range_is_never_met() {
        // given
        let mut container = GameboardContainer::new(
            FakeSession::signed_in("alice.testnet"),
            FakeEngine::default(),
            ContainerConfig {
                min_cheddar_required: 1_000_000_000_000_000,
                ..ContainerConfig::default()
            },
        );

        // when
        container.set_balance(Some(5));

        // then
        assert_eq!(
            Some(balance_warning(1_000_000_000_000_000)),
            container.view().balance_warning
        );
    }

    #[test]
    fn begin_eligibility_check__other_account_drops_wallet_state() {
        // given
        let mut container = signed_in_container();
        allow(&mut container, EligibilityResult::allowed());
        container.set_power_up(true);
        container.set_balance(Some(0));
        assert!(container.view().power_up_enabled);
        assert!(container.view().balance_warning.is_some());

        // when
        container.session_mut().sign_in("bob.testnet");
        let (_, account) = container.begin_eligibility_check().unwrap();

        // then
        let view = container.view();
        assert_eq!("bob.testnet", account);
        assert!(!view.power_up_enabled);
        assert!(view.buy_button_visible);
        assert_eq!(None, view.balance_warning);
        assert_eq!(Outcome::Ignored, container.power_up_click());
    }

    #[test]
    fn begin_eligibility_check__same_account_keeps_wallet_state() {
        // given
        let mut container = signed_in_container();
        allow(&mut container, EligibilityResult::allowed());
        container.set_power_up(true);
        container.set_balance(Some(0));

        // when
        container.begin_eligibility_check().unwrap();

        // then
        let view = container.view();
        assert!(view.power_up_enabled);
        assert_eq!(
            Some(balance_warning(DEFAULT_MIN_CHEDDAR_REQUIRED)),
            view.balance_warning
        );
    }

    #[test]
    fn view__unknown_balance_shows_no_warning() {
        let container = signed_in_container();
        assert_eq!(None, container.view().balance_warning);
    }

    #[test]
    fn view__start_label_follows_game_over() {
        // given
        let mut container = signed_in_container();
        assert_eq!(Some("Start Game"), container.view().start_button);

        // when
        container.engine_mut().finish("Time is up!");

        // then
        let view = container.view();
        assert_eq!(Some("Restart Game"), view.start_button);
        assert_eq!("Time is up!", view.game_over_message);
    }

    #[test]
    fn view__board_visibility_policy() {
        // given
        let mut always = signed_in_container();
        allow(&mut always, EligibilityResult::allowed());
        let mut hidden = GameboardContainer::new(
            FakeSession::signed_in("alice.testnet"),
            FakeEngine::default(),
            ContainerConfig {
                board_visibility: BoardVisibility::HiddenWhenAllowed,
                ..ContainerConfig::default()
            },
        );
        allow(&mut hidden, EligibilityResult::allowed());

        // then
        assert!(always.view().board_visible);
        assert!(!hidden.view().board_visible);
    }

    #[test]
    fn view__awaiting_flag_tracks_outstanding_query() {
        // given
        let mut container = signed_in_container();

        // when
        let (ticket, account) = container.begin_eligibility_check().unwrap();

        // then
        assert_eq!("alice.testnet", account);
        assert!(container.view().awaiting_eligibility);
        container.complete_eligibility_check(ticket, Ok(EligibilityResult::allowed()));
        assert!(!container.view().awaiting_eligibility);
    }

    #[tokio::test]
    async fn log_out__forgets_account_state() {
        // given
        let mut container = signed_in_container();
        allow(&mut container, EligibilityResult::denied(["no"]));
        container.set_power_up(true);
        container.touch_move(TouchDrag::new(0, 1));

        // when
        container.log_out().await.unwrap();

        // then
        let view = container.view();
        assert_eq!(AuthButton::Login, view.auth_button);
        assert_eq!(None, view.not_allowed_reasons);
        assert_eq!(&Eligibility::Unknown, container.eligibility());
        assert!(!view.power_up_enabled);
        assert_eq!(1, container.session().sign_outs());
    }

    #[tokio::test]
    async fn log_out__signed_out_is_error() {
        let mut container = GameboardContainer::new(
            FakeSession::signed_out(),
            FakeEngine::default(),
            ContainerConfig::default(),
        );
        assert!(matches!(
            container.log_out().await,
            Err(SessionError::NotSignedIn)
        ));
    }

    #[test]
    fn begin_eligibility_check__signed_out_issues_nothing() {
        let mut container = GameboardContainer::new(
            FakeSession::signed_out(),
            FakeEngine::default(),
            ContainerConfig::default(),
        );
        assert_eq!(None, container.begin_eligibility_check());
    }

    #[test]
    fn complete_eligibility_check__after_dispose_is_dropped() {
        // given
        let mut container = signed_in_container();
        let (ticket, _) = container.begin_eligibility_check().unwrap();

        // when
        container.dispose();
        let outcome =
            container.complete_eligibility_check(ticket, Ok(EligibilityResult::allowed()));

        // then
        assert_eq!(ApplyOutcome::Disposed, outcome);
        assert_eq!(&Eligibility::Unknown, container.eligibility());
    }
}
