//! End-to-end scenario tests across the engine's components: conservation,
//! idempotence, determinism and the worked numeric examples.

use verdict_core::test_utils::{
    constants::*, create_engine_with_market, first_claim_instant, register_verified_sources,
    submit_reports,
};
use verdict_core::{EngineError, MarketState, Outcome, TransferReason};

#[test]
fn spec_scenario_resolves_and_pays_out() {
    // minStake=1, maxStake=1000; A stakes 100 YES, B stakes 300 NO;
    // sources report YES, YES, NO.
    let (mut engine, market) = create_engine_with_market();
    engine.stake(market, "alice", Outcome::Yes, 100, 10).unwrap();
    engine.stake(market, "bob", Outcome::No, 300, 20).unwrap();

    let sources = register_verified_sources(&mut engine, 3);
    submit_reports(
        &mut engine,
        market,
        &[
            (sources[0], Outcome::Yes),
            (sources[1], Outcome::Yes),
            (sources[2], Outcome::No),
        ],
    );

    assert_eq!(engine.market(market).unwrap().state, MarketState::Resolved);
    let resolution = engine.resolution(market).unwrap();
    assert_eq!(resolution.outcome, Some(Outcome::Yes));
    assert_eq!(resolution.confidence_bps, 6667);

    let transfer = engine
        .claim_reward(market, "alice", first_claim_instant(&engine))
        .unwrap();
    assert_eq!(transfer.reason, TransferReason::Payout);
    // A's reward = 100 + 100*300/100 = 400, minus the 2% protocol fee.
    assert_eq!(transfer.amount, 392);
}

#[test]
fn conservation_across_many_holders() {
    let (mut engine, market) = create_engine_with_market();
    let yes_stakes: [(&str, u64); 4] = [("a", 137), ("b", 260), ("c", 3), ("d", 999)];
    let no_stakes: [(&str, u64); 3] = [("e", 451), ("f", 17), ("g", 800)];
    for (holder, amount) in yes_stakes {
        engine.stake(market, holder, Outcome::Yes, amount, 10).unwrap();
    }
    for (holder, amount) in no_stakes {
        engine.stake(market, holder, Outcome::No, amount, 10).unwrap();
    }
    let total_staked = engine.stake_pool(market).unwrap().total();

    let sources = register_verified_sources(&mut engine, 3);
    submit_reports(
        &mut engine,
        market,
        &[
            (sources[0], Outcome::Yes),
            (sources[1], Outcome::Yes),
            (sources[2], Outcome::Yes),
        ],
    );

    let claim_at = first_claim_instant(&engine);
    let mut paid = 0u64;
    for (holder, _) in yes_stakes {
        paid += engine.claim_reward(market, holder, claim_at).unwrap().amount;
    }

    // Every winner claimed: payouts + fees + residual dust account for the
    // entire pool, and the dust never exceeds one unit per winner.
    let ledger = engine.settlement(market).unwrap();
    assert_eq!(ledger.paid_out, paid);
    assert_eq!(
        ledger.paid_out + ledger.fees_accrued + ledger.residual(total_staked),
        total_staked
    );
    assert!(ledger.residual(total_staked) < yes_stakes.len() as u64 + 1);
    assert_eq!(engine.treasury(), ledger.fees_accrued);
}

#[test]
fn second_claim_changes_nothing() {
    let (mut engine, market) = create_engine_with_market();
    engine.stake(market, "alice", Outcome::Yes, 100, 10).unwrap();
    engine.stake(market, "bob", Outcome::No, 300, 20).unwrap();
    let sources = register_verified_sources(&mut engine, 3);
    submit_reports(
        &mut engine,
        market,
        &[
            (sources[0], Outcome::Yes),
            (sources[1], Outcome::Yes),
            (sources[2], Outcome::Yes),
        ],
    );

    let claim_at = first_claim_instant(&engine);
    engine.claim_reward(market, "alice", claim_at).unwrap();
    let snapshot = serde_json::to_string(&engine).unwrap();

    let err = engine.claim_reward(market, "alice", claim_at + 5).unwrap_err();
    assert!(matches!(err, EngineError::AlreadyClaimed { .. }));
    // byte-for-byte unchanged state after the rejected call
    assert_eq!(serde_json::to_string(&engine).unwrap(), snapshot);
}

#[test]
fn finalization_is_order_independent() {
    let votes = [Outcome::Yes, Outcome::No, Outcome::Yes, Outcome::No, Outcome::Yes];
    let orders: [[usize; 5]; 3] = [[0, 1, 2, 3, 4], [4, 3, 2, 1, 0], [2, 0, 4, 1, 3]];

    let mut outcomes = Vec::new();
    for order in orders {
        let (mut engine, market) = create_engine_with_market();
        let mut params = *engine.params();
        params.min_sources = 5;
        engine.update_params(TEST_GOVERNANCE, params).unwrap();
        let sources = register_verified_sources(&mut engine, 5);
        let sequence: Vec<_> = order.iter().map(|&i| (sources[i], votes[i])).collect();
        submit_reports(&mut engine, market, &sequence);

        let resolution = engine.resolution(market).unwrap();
        outcomes.push((resolution.outcome, resolution.confidence_bps));
    }
    assert!(outcomes.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(outcomes[0].0, Some(Outcome::Yes));
    assert_eq!(outcomes[0].1, 6000);
}

#[test]
fn one_sided_market_resolving_that_side() {
    // All stakes on YES, market resolves YES: there is no losing pool and
    // no reward, so every stake is a push with zero fee.
    let (mut engine, market) = create_engine_with_market();
    engine.stake(market, "alice", Outcome::Yes, 500, 10).unwrap();
    engine.stake(market, "bob", Outcome::Yes, 250, 20).unwrap();

    let sources = register_verified_sources(&mut engine, 3);
    submit_reports(
        &mut engine,
        market,
        &[
            (sources[0], Outcome::Yes),
            (sources[1], Outcome::Yes),
            (sources[2], Outcome::Yes),
        ],
    );

    let claim_at = first_claim_instant(&engine);
    let a = engine.claim_reward(market, "alice", claim_at).unwrap();
    let b = engine.claim_reward(market, "bob", claim_at).unwrap();
    assert_eq!(a.amount, 500);
    assert_eq!(b.amount, 250);
    assert_eq!(engine.treasury(), 0);
}

#[test]
fn amm_product_monotonic_across_long_sequence() {
    let (mut engine, market) = create_engine_with_market();
    engine.amm_add_liquidity(market, "lp", 100_000, 80_000).unwrap();

    let mut product = engine.amm(market).unwrap().product();
    // Deterministic pseudo-varied swap sizes on alternating sides.
    for step in 1u64..=60 {
        let side = if step % 2 == 0 { Outcome::Yes } else { Outcome::No };
        let amount = (step * 773) % 4_000 + 1;
        engine.amm_swap(market, side, amount, 0).unwrap();
        let next = engine.amm(market).unwrap().product();
        assert!(next >= product, "product shrank at step {step}");
        product = next;
    }
}

#[test]
fn dispute_override_flips_claims() {
    let (mut engine, market) = create_engine_with_market();
    engine.stake(market, "alice", Outcome::Yes, 100, 10).unwrap();
    engine.stake(market, "bob", Outcome::No, 300, 20).unwrap();
    let sources = register_verified_sources(&mut engine, 3);
    submit_reports(
        &mut engine,
        market,
        &[
            (sources[0], Outcome::Yes),
            (sources[1], Outcome::Yes),
            (sources[2], Outcome::No),
        ],
    );

    engine
        .raise_dispute(market, "carol", Outcome::No, "beef", 100, TEST_EXPIRY + 100)
        .unwrap();
    let refund = engine
        .resolve_dispute(TEST_GOVERNANCE, market, 0, true, TEST_EXPIRY + 200)
        .unwrap()
        .unwrap();
    assert_eq!(refund.to, "carol");

    let claim_at = first_claim_instant(&engine);
    let err = engine.claim_reward(market, "alice", claim_at).unwrap_err();
    assert!(matches!(err, EngineError::NoWinningStake { .. }));
    let transfer = engine.claim_reward(market, "bob", claim_at).unwrap();
    assert_eq!(transfer.amount, 392);

    // History stays queryable after settlement.
    assert!(engine.resolution(market).unwrap().overridden);
    assert_eq!(engine.disputes(market).len(), 1);
}

#[test]
fn sub_quorum_market_waits_forever_without_corruption() {
    let (mut engine, market) = create_engine_with_market();
    engine.stake(market, "alice", Outcome::Yes, 100, 10).unwrap();
    let sources = register_verified_sources(&mut engine, 2);
    submit_reports(
        &mut engine,
        market,
        &[(sources[0], Outcome::Yes), (sources[1], Outcome::No)],
    );

    // Far in the future the market still awaits resolution.
    let far = TEST_EXPIRY + 10_000_000;
    assert_eq!(
        engine.market_state(market, far).unwrap(),
        MarketState::AwaitingResolution
    );
    assert_eq!(engine.stake_pool(market).unwrap().total(), 100);
    let err = engine.claim_reward(market, "alice", far).unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
}
