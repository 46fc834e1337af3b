use warroom::combat::{
    classify_outcome, compute_defense, compute_power, BattleSetup, CombinedDefense,
    DefenseConfig, FortificationInputs, FortificationSnapshot, Outcome, PowerVariance,
    ResolvedBattle, Rng, SimulationConfig, DECISIVE_RATIO,
};
use warroom::data::{Composition, ResourceKind, ResourceStock, UnitCatalog, UnitDefinition, UnitStats, UnitTypeId};
use warroom::EngineError;

fn approx_eq(a: f64, b: f64, tol: f64) {
    assert!((a - b).abs() <= tol, "expected {b}, got {a}");
}

fn catalog() -> UnitCatalog {
    UnitCatalog::new([
        UnitDefinition {
            id: UnitTypeId::new("legionnaire"),
            stats: UnitStats::new(40, 35, 50, 6.0, 50),
        },
        UnitDefinition {
            id: UnitTypeId::new("praetorian"),
            stats: UnitStats::new(30, 65, 35, 5.0, 20),
        },
        UnitDefinition {
            id: UnitTypeId::new("militia"),
            stats: UnitStats::new(10, 10, 5, 7.0, 20),
        },
    ])
    .expect("catalog should build")
}

#[test]
fn outcome_rule_is_strict_at_the_decisive_ratio() {
    assert_eq!(DECISIVE_RATIO, 1.1);
    assert_eq!(classify_outcome(110.0, 100.0), Outcome::Draw);
    assert_eq!(classify_outcome(110.000001, 100.0), Outcome::AttackerWins);
    assert_eq!(classify_outcome(100.0, 110.0), Outcome::Draw);
    assert_eq!(classify_outcome(100.0, 110.000001), Outcome::DefenderWins);
    assert_eq!(classify_outcome(100.0, 100.0), Outcome::Draw);
}

#[test]
fn outcome_rule_handles_empty_sides() {
    assert_eq!(classify_outcome(0.0, 0.0), Outcome::Draw);
    assert_eq!(classify_outcome(5.0, 0.0), Outcome::AttackerWins);
    assert_eq!(classify_outcome(0.0, 5.0), Outcome::DefenderWins);
}

#[test]
fn compute_power_sums_attack_and_both_defenses() {
    let composition =
        Composition::from_counts([("legionnaire", 10), ("praetorian", 4)]).expect("valid");
    let (attack, defense) = compute_power(&composition, &catalog()).expect("known units");
    approx_eq(attack, 10.0 * 40.0 + 4.0 * 30.0, 1e-12);
    approx_eq(defense, 10.0 * (35.0 + 50.0) + 4.0 * (65.0 + 35.0), 1e-12);
}

#[test]
fn compute_power_of_empty_army_is_zero() {
    let (attack, defense) = compute_power(&Composition::empty(), &catalog()).expect("empty");
    assert_eq!((attack, defense), (0.0, 0.0));
}

#[test]
fn compute_power_rejects_unknown_unit() {
    let composition = Composition::from_counts([("hoplite", 3)]).expect("valid");
    let err = compute_power(&composition, &catalog()).expect_err("unknown unit");
    assert_eq!(err, EngineError::UnknownUnitType(UnitTypeId::new("hoplite")));
}

#[test]
fn defense_combines_wall_garrison_and_effects() {
    let inputs = FortificationInputs {
        wall_level: 4,
        residence_level: 5,
        garrison_levels: vec![3, 2],
        watchtower_level: 2,
        effect_bonus_pct: 10.0,
        base_spy_defense_pct: 5.0,
    };
    let snapshot = compute_defense(&inputs, &DefenseConfig::default()).expect("valid");
    approx_eq(snapshot.defensive_bonus, 1.03f64.powi(4) * 1.05 * 1.10, 1e-9);
    approx_eq(snapshot.flat_defense, 50.0, 1e-12);
    approx_eq(snapshot.spy_defense, 5.0 + 10.0 + 10.0, 1e-12);
}

#[test]
fn spy_defense_is_clamped_to_one_hundred() {
    let inputs = FortificationInputs {
        watchtower_level: 30,
        ..FortificationInputs::default()
    };
    let snapshot = compute_defense(&inputs, &DefenseConfig::default()).expect("valid");
    assert_eq!(snapshot.spy_defense, 100.0);
}

#[test]
fn negative_levels_are_invalid_fortification() {
    let inputs = FortificationInputs {
        residence_level: -1,
        ..FortificationInputs::default()
    };
    let err = compute_defense(&inputs, &DefenseConfig::default()).expect_err("negative level");
    assert!(matches!(err, EngineError::InvalidFortification(_)), "{err}");
}

#[test]
fn snapshot_rejects_negative_bonus() {
    let err = FortificationSnapshot::new(-0.5, 0.0, 0.0).expect_err("negative bonus");
    assert!(matches!(err, EngineError::InvalidFortification(_)), "{err}");
}

#[test]
fn fixed_variance_trial_applies_flat_defense_before_the_multiplier() {
    let catalog = catalog();
    let setup = BattleSetup::new(
        Composition::from_counts([("legionnaire", 10)]).expect("valid"),
        Composition::from_counts([("militia", 10)]).expect("valid"),
        FortificationSnapshot::new(1.5, 20.0, 0.0).expect("valid"),
    );
    let battle = ResolvedBattle::new(&setup, &catalog, &CombinedDefense).expect("resolves");
    let config = SimulationConfig {
        variance: PowerVariance::fixed(1.0),
        ..SimulationConfig::default()
    };
    let trial = battle.run_trial(&config, &mut Rng::new(1));
    approx_eq(trial.attacker_power, 400.0, 1e-12);
    approx_eq(trial.defender_power, (150.0 + 20.0) * 1.5, 1e-12);
    assert_eq!(trial.outcome, Outcome::AttackerWins);
}

#[test]
fn losses_never_exceed_troops_present() {
    let catalog = catalog();
    let setup = BattleSetup::new(
        Composition::from_counts([("legionnaire", 7), ("militia", 3)]).expect("valid"),
        Composition::from_counts([("praetorian", 9), ("militia", 0)]).expect("valid"),
        FortificationSnapshot::neutral(),
    );
    let battle = ResolvedBattle::new(&setup, &catalog, &CombinedDefense).expect("resolves");
    let config = SimulationConfig::default();
    let mut rng = Rng::new(99);
    for _ in 0..500 {
        let trial = battle.run_trial(&config, &mut rng);
        for (id, lost) in &trial.attacker_losses {
            assert!(*lost <= setup.attacker.count_of(id), "{id}: {lost}");
        }
        for (id, lost) in &trial.defender_losses {
            assert!(*lost <= setup.defender.count_of(id), "{id}: {lost}");
        }
        assert!(!trial.defender_losses.contains_key(&UnitTypeId::new("militia")));
    }
}

#[test]
fn loot_is_taken_only_on_attacker_wins_and_capped_by_carry_capacity() {
    let catalog = catalog();
    let setup = BattleSetup::new(
        Composition::from_counts([("militia", 10)]).expect("valid"),
        Composition::empty(),
        FortificationSnapshot::neutral(),
    )
    .with_resources(ResourceStock::new([
        (ResourceKind::Lumber, 1000),
        (ResourceKind::Iron, 1000),
    ]));
    let battle = ResolvedBattle::new(&setup, &catalog, &CombinedDefense).expect("resolves");
    let trial = battle.run_trial(&SimulationConfig::default(), &mut Rng::new(5));

    assert_eq!(trial.outcome, Outcome::AttackerWins);
    assert!(trial.attacker_losses.is_empty());
    // 10 militia carry 200 in total, half of each stock is wanted.
    let looted: u64 = trial.resources_looted.values().sum();
    assert_eq!(looted, 200);
    assert_eq!(trial.resources_looted.get(&ResourceKind::Lumber), Some(&100));
    assert_eq!(trial.resources_looted.get(&ResourceKind::Iron), Some(&100));
}
