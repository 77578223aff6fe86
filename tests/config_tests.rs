use std::sync::Arc;

use wayfarer_mcts::{MCTSConfig, MCTSError, OutputStrategy, RewardReducer, SimulateStrategy};

#[test]
fn default_values() {
    let config = MCTSConfig::default();

    assert_eq!(config.w_exp, 1.0);
    assert_eq!(config.depth_limit, 5);
    assert_eq!(config.n_iters, 10);
    assert!(matches!(config.cum_reward, RewardReducer::Sum));
    assert!(matches!(config.calc_q, RewardReducer::Mean));
    assert!(matches!(config.simulate_strategy, SimulateStrategy::Random));
    assert_eq!(config.output_strategy, OutputStrategy::MaxReward);
    assert!(config.uct_with_fast_reward);
    assert!(!config.output_trace_in_each_iter);
}

#[test]
fn builder_methods_set_their_fields() {
    let config = MCTSConfig::default()
        .with_w_exp(1.414)
        .with_depth_limit(12)
        .with_n_iters(500)
        .with_cum_reward(RewardReducer::Mean)
        .with_calc_q(RewardReducer::Sum)
        .with_simulate_strategy(SimulateStrategy::Max)
        .with_output_strategy(OutputStrategy::FollowMax)
        .with_uct_with_fast_reward(false)
        .with_output_trace_in_each_iter(true);

    assert_eq!(config.w_exp, 1.414);
    assert_eq!(config.depth_limit, 12);
    assert_eq!(config.n_iters, 500);
    assert!(matches!(config.cum_reward, RewardReducer::Mean));
    assert!(matches!(config.calc_q, RewardReducer::Sum));
    assert!(matches!(config.simulate_strategy, SimulateStrategy::Max));
    assert_eq!(config.output_strategy, OutputStrategy::FollowMax);
    assert!(!config.uct_with_fast_reward);
    assert!(config.output_trace_in_each_iter);
}

#[test]
fn output_strategy_names_parse() {
    let cases = [
        ("max_reward", OutputStrategy::MaxReward),
        ("follow_max", OutputStrategy::FollowMax),
        ("max_visit", OutputStrategy::MaxVisit),
        ("max_iter", OutputStrategy::MaxIter),
        ("last_iter", OutputStrategy::LastIter),
        ("last_terminal_iter", OutputStrategy::LastTerminalIter),
    ];
    for (name, expected) in cases {
        assert_eq!(name.parse::<OutputStrategy>().unwrap(), expected);
    }
}

#[test]
fn unknown_output_strategy_is_rejected() {
    let err = "best_guess".parse::<OutputStrategy>().unwrap_err();
    assert!(matches!(err, MCTSError::InvalidConfiguration(_)));
    assert!(err.to_string().contains("invalid configuration"));
    assert!(err.to_string().contains("best_guess"));
}

#[test]
fn reward_reducers_reduce() {
    let rewards = [0.5, 0.25, 0.25];

    assert_eq!(RewardReducer::Sum.reduce(&rewards), 1.0);
    assert!((RewardReducer::Mean.reduce(&rewards) - 1.0 / 3.0).abs() < 1e-12);

    let max = RewardReducer::Custom(Arc::new(|values: &[f64]| {
        values.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
    }));
    assert_eq!(max.reduce(&rewards), 0.5);
}

#[test]
fn reward_reducers_are_zero_on_empty_input() {
    assert_eq!(RewardReducer::Sum.reduce(&[]), 0.0);
    assert_eq!(RewardReducer::Mean.reduce(&[]), 0.0);
}
