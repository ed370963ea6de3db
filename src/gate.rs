use crate::{
    eligibility::Eligibility,
    engine::{
        Direction,
        GameEngine,
        TouchDrag,
    },
    error::GateError,
    overlays::{
        Overlay,
        OverlayVisibility,
    },
    session::{
        WalletSession,
        signed_in_account,
    },
};
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Move,
    Restart,
    TouchDrag,
    PowerUp,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [
        ActionKind::Move,
        ActionKind::Restart,
        ActionKind::TouchDrag,
        ActionKind::PowerUp,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Move(Direction),
    Restart,
    TouchDrag(TouchDrag),
    PowerUp,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Move(_) => ActionKind::Move,
            Action::Restart => ActionKind::Restart,
            Action::TouchDrag(_) => ActionKind::TouchDrag,
            Action::PowerUp => ActionKind::PowerUp,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    PromptSignIn,
    /// Signed in, but the backend has not answered yet.
    AwaitingEligibility,
    ShowNotAllowed(Vec<String>),
    Execute,
}

/// Decides what happens to a requested action.
///
/// Sign-in is checked first; an unauthenticated user has no verdict to
/// evaluate. A missing verdict never permits the action.
pub fn evaluate(signed_in: bool, eligibility: &Eligibility, action: ActionKind) -> Verdict {
    let verdict = if !signed_in {
        Verdict::PromptSignIn
    } else {
        match eligibility {
            Eligibility::Unknown => Verdict::AwaitingEligibility,
            Eligibility::Known(result) if !result.ok => {
                Verdict::ShowNotAllowed(result.reasons.clone())
            }
            Eligibility::Known(_) => Verdict::Execute,
        }
    };
    tracing::trace!(?action, signed_in, ?verdict, "gate evaluated");
    verdict
}

pub type Handler<E> = fn(&mut E, &Action);

/// Action handlers, registered once per action kind.
pub struct HandlerRegistry<E> {
    handlers: HashMap<ActionKind, Handler<E>>,
}

impl<E> Default for HandlerRegistry<E> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<E> HandlerRegistry<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, kind: ActionKind, handler: Handler<E>) -> Self {
        if self.handlers.insert(kind, handler).is_some() {
            tracing::warn!(?kind, "replacing registered action handler");
        }
        self
    }

    /// Runs the handler for `action`, returning whether one was registered.
    pub fn dispatch(&self, engine: &mut E, action: &Action) -> bool {
        match self.handlers.get(&action.kind()) {
            Some(handler) => {
                handler(engine, action);
                true
            }
            None => false,
        }
    }
}

impl<E: GameEngine> HandlerRegistry<E> {
    /// Maps every action kind onto the matching engine callback.
    pub fn standard() -> Self {
        Self::new()
            .register(ActionKind::Move, |engine: &mut E, action: &Action| {
                if let Action::Move(direction) = action {
                    engine.handle_key_press(*direction);
                }
            })
            .register(ActionKind::TouchDrag, |engine: &mut E, action: &Action| {
                if let Action::TouchDrag(drag) = action {
                    engine.handle_touch_move(*drag);
                }
            })
            .register(ActionKind::Restart, |engine: &mut E, _: &Action| {
                engine.restart_game();
            })
            .register(ActionKind::PowerUp, |engine: &mut E, _: &Action| {
                engine.toggle_power_up();
            })
    }
}

/// Wraps the registered handlers with the sign-in and eligibility check.
pub struct InteractionGate<S, E> {
    session: S,
    handlers: HandlerRegistry<E>,
}

impl<S: WalletSession, E> InteractionGate<S, E> {
    pub fn new(session: S, handlers: HandlerRegistry<E>) -> Self {
        Self { session, handlers }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    pub fn signed_in(&self) -> bool {
        signed_in_account(&self.session).is_some()
    }

    pub fn require_account(&self) -> Result<&str, GateError> {
        signed_in_account(&self.session).ok_or(GateError::Unauthenticated)
    }

    pub fn decide(&self, action: &Action, eligibility: &Eligibility) -> Verdict {
        evaluate(self.signed_in(), eligibility, action.kind())
    }

    /// Evaluates `action` and carries out the verdict: the login prompt, the
    /// not-allowed overlay, or exactly one handler call.
    pub fn request(
        &mut self,
        action: Action,
        eligibility: &Eligibility,
        engine: &mut E,
        overlays: &mut OverlayVisibility,
    ) -> Verdict {
        let verdict = self.decide(&action, eligibility);
        match &verdict {
            Verdict::PromptSignIn => {
                tracing::info!(?action, "action requires sign-in");
                self.session.show_login_prompt();
            }
            Verdict::AwaitingEligibility => {
                tracing::debug!(?action, "action held until eligibility is known");
            }
            Verdict::ShowNotAllowed(reasons) => {
                tracing::info!(?action, ?reasons, "account not allowed to play");
                overlays.open(Overlay::NotAllowed);
            }
            Verdict::Execute => {
                if !self.handlers.dispatch(engine, &action) {
                    tracing::warn!(kind = ?action.kind(), "no handler registered for action");
                }
            }
        }
        verdict
    }
}
