use crate::error::QueryError;
use std::fmt;

/// Backend verdict on whether an account may play.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EligibilityResult {
    pub ok: bool,
    pub reasons: Vec<String>,
}

impl EligibilityResult {
    pub fn allowed() -> Self {
        Self {
            ok: true,
            reasons: Vec::new(),
        }
    }

    pub fn denied<I, S>(reasons: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ok: false,
            reasons: reasons.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Eligibility {
    #[default]
    Unknown,
    Known(EligibilityResult),
}

impl Eligibility {
    pub fn is_known(&self) -> bool {
        matches!(self, Eligibility::Known(_))
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Eligibility::Known(result) if result.ok)
    }
}

/// Identifies one in-flight eligibility query. Only the most recently issued
/// ticket may write its result into the state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueryTicket(u64);

impl fmt::Display for QueryTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    Stale,
    Disposed,
}

/// Holds the latest eligibility verdict and power-up ownership for the
/// signed-in account.
#[derive(Debug, Default)]
pub struct EligibilityState {
    current: Eligibility,
    latest_issued: u64,
    disposed: bool,
    has_power_up: bool,
}

impl EligibilityState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &Eligibility {
        &self.current
    }

    pub fn has_power_up(&self) -> bool {
        self.has_power_up
    }

    pub fn set_power_up(&mut self, has_power_up: bool) {
        self.has_power_up = has_power_up;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Overwrites the verdict without any staleness check.
    pub fn set_result(&mut self, result: EligibilityResult) {
        self.current = Eligibility::Known(result);
    }

    /// Starts a new query. The cell reads `Unknown` until the query resolves
    /// and every previously issued ticket becomes stale.
    pub fn begin_query(&mut self) -> QueryTicket {
        self.latest_issued += 1;
        self.current = Eligibility::Unknown;
        let ticket = QueryTicket(self.latest_issued);
        tracing::debug!(%ticket, "eligibility query issued");
        ticket
    }

    pub fn is_latest(&self, ticket: QueryTicket) -> bool {
        ticket.0 == self.latest_issued
    }

    pub fn apply(&mut self, ticket: QueryTicket, result: EligibilityResult) -> ApplyOutcome {
        let outcome = self.admit(ticket);
        if outcome == ApplyOutcome::Applied {
            tracing::info!(%ticket, ok = result.ok, reasons = result.reasons.len(), "eligibility updated");
            self.set_result(result);
        }
        outcome
    }

    /// Records a failed query. The verdict stays `Unknown`: a failure is
    /// never read as permission to play.
    pub fn fail(&mut self, ticket: QueryTicket, err: &QueryError) -> ApplyOutcome {
        let outcome = self.admit(ticket);
        if outcome == ApplyOutcome::Applied {
            tracing::warn!(%ticket, error = %err, "eligibility query failed");
            self.current = Eligibility::Unknown;
        }
        outcome
    }

    /// Completes a query with whatever the client returned.
    pub fn complete(
        &mut self,
        ticket: QueryTicket,
        result: Result<EligibilityResult, QueryError>,
    ) -> ApplyOutcome {
        match result {
            Ok(result) => self.apply(ticket, result),
            Err(err) => self.fail(ticket, &err),
        }
    }

    /// Clears everything known about the previous account.
    pub fn forget(&mut self) {
        self.latest_issued += 1;
        self.current = Eligibility::Unknown;
        self.has_power_up = false;
    }

    /// Marks the owner as torn down; pending completions are dropped.
    pub fn dispose(&mut self) {
        self.disposed = true;
    }

    fn admit(&self, ticket: QueryTicket) -> ApplyOutcome {
        if self.disposed {
            tracing::debug!(%ticket, "eligibility completion after dispose discarded");
            return ApplyOutcome::Disposed;
        }
        if !self.is_latest(ticket) {
            tracing::debug!(
                %ticket,
                latest = self.latest_issued,
                "stale eligibility completion discarded"
            );
            return ApplyOutcome::Stale;
        }
        ApplyOutcome::Applied
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn current__is_unknown_before_any_query() {
        // given
        let state = EligibilityState::new();

        // then
        assert_eq!(&Eligibility::Unknown, state.current());
        assert!(!state.has_power_up());
    }

    #[test]
    fn apply__latest_ticket_replaces_verdict_wholesale() {
        // given
        let mut state = EligibilityState::new();
        state.set_result(EligibilityResult::denied(["a", "b"]));
        let ticket = state.begin_query();

        // when
        let outcome = state.apply(ticket, EligibilityResult::denied(["c"]));

        // then
        assert_eq!(ApplyOutcome::Applied, outcome);
        assert_eq!(
            &Eligibility::Known(EligibilityResult::denied(["c"])),
            state.current()
        );
    }

    #[test]
    fn begin_query__resets_verdict_to_unknown() {
        // given
        let mut state = EligibilityState::new();
        state.set_result(EligibilityResult::allowed());

        // when
        let _ticket = state.begin_query();

        // then
        assert_eq!(&Eligibility::Unknown, state.current());
    }

    #[test]
    fn apply__older_ticket_resolving_last_is_discarded() {
        // given
        let mut state = EligibilityState::new();
        let older = state.begin_query();
        let newer = state.begin_query();
        state.apply(newer, EligibilityResult::denied(["insufficient balance"]));

        // when
        let outcome = state.apply(older, EligibilityResult::allowed());

        // then
        assert_eq!(ApplyOutcome::Stale, outcome);
        assert!(!state.current().is_allowed());
    }

    #[test]
    fn apply__after_dispose_is_discarded() {
        // given
        let mut state = EligibilityState::new();
        let ticket = state.begin_query();
        state.dispose();

        // when
        let outcome = state.apply(ticket, EligibilityResult::allowed());

        // then
        assert_eq!(ApplyOutcome::Disposed, outcome);
        assert_eq!(&Eligibility::Unknown, state.current());
    }

    #[test]
    fn forget__invalidates_outstanding_ticket_and_power_up() {
        // given
        let mut state = EligibilityState::new();
        state.set_power_up(true);
        let ticket = state.begin_query();

        // when
        state.forget();
        let outcome = state.apply(ticket, EligibilityResult::allowed());

        // then
        assert_eq!(ApplyOutcome::Stale, outcome);
        assert!(!state.has_power_up());
        assert_eq!(&Eligibility::Unknown, state.current());
    }

    #[test]
    fn set_result__overwrites_without_ticket() {
        // given
        let mut state = EligibilityState::new();
        let _ticket = state.begin_query();

        // when
        state.set_result(EligibilityResult::allowed());

        // then
        assert!(state.current().is_allowed());
    }
}
