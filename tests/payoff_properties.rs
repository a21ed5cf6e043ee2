use std::collections::BTreeMap;

use proptest::prelude::*;
use public_goods_sim::config::{PublicGoodsConfig, Strategies};
use public_goods_sim::payoff::{PayoffRule, PublicGoodsPayoff};

fn rule(cost: f64, factor: f64, num_agents: usize) -> PublicGoodsPayoff {
    let labels = BTreeMap::from([
        ("strategy1".to_string(), "Contribute".to_string()),
        ("strategy2".to_string(), "Free-ride".to_string()),
    ]);
    PublicGoodsPayoff::new(
        PublicGoodsConfig {
            contribution_cost: cost,
            multiplication_factor: factor,
            num_agents,
        },
        Strategies::new(&labels),
    )
    .unwrap()
}

fn choices(contributed: &[bool]) -> Vec<String> {
    contributed
        .iter()
        .map(|c| if *c { "strategy1" } else { "strategy2" }.to_string())
        .collect()
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * (1.0 + a.abs().max(b.abs()))
}

proptest! {
    #[test]
    fn payoffs_are_conserved(
        contributed in prop::collection::vec(any::<bool>(), 1..12),
        cost in 0.01f64..1000.0,
        factor in 0.0f64..10.0,
    ) {
        let rule = rule(cost, factor, contributed.len());
        let payoffs = rule.payoffs(&choices(&contributed)).unwrap();
        let c = contributed.iter().filter(|c| **c).count() as f64;

        prop_assert_eq!(payoffs.len(), contributed.len());
        let total: f64 = payoffs.iter().sum();
        prop_assert!(close(total, c * cost * (factor - 1.0)), "{} vs {}", total, c * cost * (factor - 1.0));
    }

    #[test]
    fn nobody_contributing_pays_nothing(
        n in 1usize..20,
        cost in 0.01f64..1000.0,
        factor in 0.0f64..10.0,
    ) {
        prop_assert_eq!(rule(cost, factor, n).calculate_payoff(false, 0), 0.0);
    }

    #[test]
    fn key_ignores_agent_order(
        mut contributed in prop::collection::vec(any::<bool>(), 1..12),
    ) {
        let rule = rule(10.0, 2.0, contributed.len());
        let before = rule.combination_key(&choices(&contributed)).unwrap();
        contributed.reverse();
        prop_assert_eq!(before, rule.combination_key(&choices(&contributed)).unwrap());
    }

    #[test]
    fn free_riders_never_earn_less(
        contributed in prop::collection::vec(any::<bool>(), 2..12),
        cost in 0.01f64..1000.0,
        factor in 0.0f64..10.0,
    ) {
        let rule = rule(cost, factor, contributed.len());
        let payoffs = rule.payoffs(&choices(&contributed)).unwrap();
        let best_contributor = contributed.iter().zip(&payoffs).filter(|(c, _)| **c).map(|(_, p)| *p).fold(f64::MIN, f64::max);
        let worst_free_rider = contributed.iter().zip(&payoffs).filter(|(c, _)| !**c).map(|(_, p)| *p).fold(f64::MAX, f64::min);
        prop_assert!(best_contributor <= worst_free_rider);
    }
}

#[test]
fn worked_examples() {
    let rule = rule(10.0, 2.0, 4);
    assert_eq!(rule.calculate_payoff(true, 1), -5.0);
    assert_eq!(rule.calculate_payoff(false, 1), 5.0);
    assert_eq!(rule.calculate_payoff(true, 4), 10.0);
    assert_eq!(rule.calculate_payoff(true, 2), 0.0);
    assert_eq!(rule.calculate_payoff(false, 2), 10.0);
}
