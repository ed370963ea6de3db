#![allow(non_snake_case)]

use cheddar_maze::{
    ApplyOutcome,
    Eligibility,
    Outcome,
    Overlay,
    Verdict,
    engine::Direction,
    test_helpers::{
        CannedResponse,
        EngineCall,
        FakeSession,
        RecordedRequest,
        TestContext,
    },
};
use proptest::prelude::*;
use tokio::runtime::Runtime;

#[tokio::test]
async fn press_start__signed_out_prompts_login_without_querying() {
    let ctx = TestContext::new();
    let mut container = ctx.container(FakeSession::signed_out());

    // given
    assert_eq!(None, container.refresh_eligibility(ctx.client()).await);

    // when
    let outcome = container.press_start();

    // then
    assert_eq!(Outcome::Gated(Verdict::PromptSignIn), outcome);
    assert_eq!(1, container.session().login_prompts());
    assert!(container.engine().calls().is_empty());
    assert!(ctx.backend().requests().is_empty());
}

#[tokio::test]
async fn press_start__eligible_account_starts_game_and_moves() {
    let ctx = TestContext::new();
    let mut container = ctx.container(FakeSession::signed_in("alice.testnet"));

    // given
    let applied = container.refresh_eligibility(ctx.client()).await;
    assert_eq!(Some(ApplyOutcome::Applied), applied);

    // when
    let start = container.press_start();
    let step = container.key_press(Direction::Right);

    // then
    assert_eq!(Outcome::Gated(Verdict::Execute), start);
    assert_eq!(Outcome::Gated(Verdict::Execute), step);
    assert_eq!(
        vec![EngineCall::Restart, EngineCall::KeyPress(Direction::Right)],
        container.engine().calls()
    );
    assert_eq!(
        vec![RecordedRequest::IsAllowed {
            account_id: "alice.testnet".to_string()
        }],
        ctx.backend().requests()
    );
}

#[tokio::test]
async fn press_start__ineligible_account_sees_every_reason_in_order() {
    let ctx = TestContext::new();
    ctx.backend().set_is_allowed(CannedResponse::json(
        200,
        r#"{"ok":false,"errors":["Not enough Cheddar","Daily limit reached"]}"#,
    ));
    let mut container = ctx.container(FakeSession::signed_in("bob.testnet"));

    // given
    container.refresh_eligibility(ctx.client()).await;

    // when
    let outcome = container.press_start();

    // then
    let reasons = vec![
        "Not enough Cheddar".to_string(),
        "Daily limit reached".to_string(),
    ];
    assert_eq!(Outcome::Gated(Verdict::ShowNotAllowed(reasons.clone())), outcome);
    assert!(container.overlays().is_open(Overlay::NotAllowed));
    assert_eq!(Some(reasons), container.view().not_allowed_reasons);
    assert!(container.engine().calls().is_empty());
}

#[tokio::test]
async fn press_start__backend_failure_leaves_player_waiting() {
    let ctx = TestContext::new();
    ctx.backend()
        .set_is_allowed(CannedResponse::json(500, "<html>Internal Server Error</html>"));
    let mut container = ctx.container(FakeSession::signed_in("carol.testnet"));

    // given
    container.refresh_eligibility(ctx.client()).await;
    assert_eq!(&Eligibility::Unknown, container.eligibility());

    // when
    let outcome = container.press_start();

    // then
    assert_eq!(Outcome::Gated(Verdict::AwaitingEligibility), outcome);
    assert!(!container.overlays().any_open());
    assert!(container.engine().calls().is_empty());
    assert!(container.view().awaiting_eligibility);
}

#[tokio::test]
async fn log_out__clears_verdict_and_reprompts() {
    let ctx = TestContext::new();
    let mut container = ctx.container(FakeSession::signed_in("dave.testnet"));
    container.refresh_eligibility(ctx.client()).await;

    // given
    container.log_out().await.unwrap();

    // when
    let outcome = container.press_start();

    // then
    assert_eq!(Outcome::Gated(Verdict::PromptSignIn), outcome);
    assert_eq!(1, container.session().sign_outs());
    assert_eq!(&Eligibility::Unknown, container.eligibility());
}

#[tokio::test]
async fn fetch_seed__game_start_seed_is_requested_for_account() {
    let ctx = TestContext::new();
    ctx.backend()
        .set_seed(CannedResponse::json(200, r#"{"seedId":"31337"}"#));

    // when
    let seed = ctx.client().fetch_seed("erin.testnet").await.unwrap();

    // then
    assert_eq!("31337", seed.as_str());
    assert_eq!(
        vec![RecordedRequest::GetSeedId {
            content_type: Some("application/json".to_string()),
            body: serde_json::json!({ "accountId": "erin.testnet" }),
        }],
        ctx.backend().requests()
    );
}

prop_compose! {
    fn reasons()(reasons in prop::collection::vec("[A-Za-z ]{1,24}", 1..6)) -> Vec<String> {
        reasons
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 10, .. ProptestConfig::default() })]
    #[test]
    fn press_start__not_allowed_overlay_preserves_backend_order(reasons in reasons()) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            _press_start__not_allowed_overlay_preserves_backend_order(reasons).await
        })?;
    }
}

async fn _press_start__not_allowed_overlay_preserves_backend_order(
    reasons: Vec<String>,
) -> Result<(), TestCaseError> {
    let ctx = TestContext::new();
    let body = serde_json::json!({ "ok": false, "errors": reasons });
    ctx.backend()
        .set_is_allowed(CannedResponse::json(200, body.to_string()));
    let mut container = ctx.container(FakeSession::signed_in("frank.testnet"));

    // given
    container.refresh_eligibility(ctx.client()).await;

    // when
    let outcome = container.press_start();

    // then
    prop_assert_eq!(Outcome::Gated(Verdict::ShowNotAllowed(reasons.clone())), outcome);
    prop_assert_eq!(Some(reasons), container.view().not_allowed_reasons);
    Ok(())
}
