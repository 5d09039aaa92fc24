use fire_sensor_core::core_types::{FireState, FireStatus, Grid, GridShape, SensorPlacement, SensorPosition, SimRng};
use fire_sensor_core::deployment::{
    DeploymentStrategy, GeneticStrategy, GreedyStrategy, PlacementContext, ReinforcementStrategy,
};
use fire_sensor_core::{
    evaluate_detection, BurnProbabilityMap, EvidenceRule, GeneticParams, ReinforcementParams,
    SignalWeights,
};
use proptest::prelude::*;

const ROWS: usize = 5;
const COLS: usize = 6;

fn shape() -> GridShape {
    GridShape::new(ROWS, COLS)
}

prop_compose! {
    fn arb_fire()(
        burning in prop::collection::vec(any::<bool>(), ROWS * COLS),
        intensity in prop::collection::vec(0.0f64..3.0, ROWS * COLS)
    ) -> FireState {
        let status = burning
            .into_iter()
            .map(|b| if b { FireStatus::Burning } else { FireStatus::Unburned })
            .collect();
        FireState::new(
            Grid::from_vec(shape(), status).unwrap(),
            Grid::from_vec(shape(), intensity).unwrap(),
        )
        .unwrap()
    }
}

prop_compose! {
    fn arb_burn_map()(
        values in prop::collection::vec(-0.5f64..1.5, ROWS * COLS),
        decay in 0.01f64..0.99
    ) -> BurnProbabilityMap {
        BurnProbabilityMap::from_seed(
            Grid::from_vec(shape(), values).unwrap(),
            decay,
            EvidenceRule::Reset,
        )
    }
}

prop_compose! {
    fn arb_evidence()(reset in any::<bool>(), weight in 0.01f64..=1.0) -> EvidenceRule {
        if reset { EvidenceRule::Reset } else { EvidenceRule::Blend { weight } }
    }
}

prop_compose! {
    fn arb_placement()(
        cells in prop::collection::vec((0..ROWS, 0..COLS), 0..8),
        radius in 0.5f64..3.0
    ) -> SensorPlacement {
        SensorPlacement::new(
            cells.into_iter().map(SensorPosition::from).collect(),
            radius,
        )
    }
}

fn context<'a>(
    map: &'a BurnProbabilityMap,
    fire: &'a FireState,
    num_sensors: usize,
    radius: f64,
) -> PlacementContext<'a> {
    PlacementContext {
        burn_map: map,
        fire,
        step: 0,
        num_sensors,
        sensor_radius: radius,
        weights: SignalWeights::new(0.5, 0.5),
        previous: None,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_coverage_fraction_in_unit_range(
        fire in arb_fire(),
        map in arb_burn_map(),
        placement in arb_placement(),
        threshold in 0.0f64..=1.0
    ) {
        let detection =
            evaluate_detection(0, &fire, &map, &placement, SignalWeights::default(), threshold)
                .unwrap();
        let coverage = detection.coverage_fraction();
        prop_assert!((0.0..=1.0).contains(&coverage), "coverage {} out of range", coverage);
        prop_assert!(detection.detected_cells <= detection.burning_cells);
        prop_assert_eq!(detection.events.len(), detection.detected_cells);
    }

    #[test]
    fn test_burn_probability_stays_in_unit_range(
        fires in prop::collection::vec(arb_fire(), 1..12),
        start in 0.0f64..=1.0,
        decay in 0.01f64..0.99,
        evidence in arb_evidence(),
        sensor in (0..ROWS, 0..COLS),
        radius in 0.5f64..3.0
    ) {
        let mut map = BurnProbabilityMap::uniform(shape(), start, decay, evidence);
        for fire in &fires {
            map.update(fire).unwrap();
            map.raise_around(sensor.into(), radius);
            prop_assert!(
                map.grid().as_slice().iter().all(|p| (0.0..=1.0).contains(p)),
                "burn probability left [0, 1]"
            );
        }
    }

    #[test]
    fn test_greedy_is_deterministic(
        fire in arb_fire(),
        map in arb_burn_map(),
        num_sensors in 1usize..6,
        radius in 0.5f64..2.5
    ) {
        let ctx = context(&map, &fire, num_sensors, radius);
        let a = GreedyStrategy::default().place_sensors(&ctx).unwrap();
        let b = GreedyStrategy::default().place_sensors(&ctx).unwrap();
        prop_assert!(a.len() <= num_sensors);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn test_genetic_seeded_runs_match(
        fire in arb_fire(),
        map in arb_burn_map(),
        num_sensors in 1usize..5,
        seed in any::<u64>()
    ) {
        let params = GeneticParams {
            population_size: 6,
            num_generations: 4,
            mutation_rate: 0.5,
            tournament_size: 2,
        };
        let ctx = context(&map, &fire, num_sensors, 1.0);
        let a = GeneticStrategy::new(params.clone(), SimRng::from_seed_u64(seed)).evolve(&ctx).unwrap();
        let b = GeneticStrategy::new(params, SimRng::from_seed_u64(seed)).evolve(&ctx).unwrap();
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(a.best.positions.len(), num_sensors);
        for pair in a.best_fitness_history.windows(2) {
            prop_assert!(pair[1] >= pair[0]);
        }
    }

    #[test]
    fn test_reinforcement_estimate_converges(
        fire in arb_fire(),
        map in arb_burn_map(),
        cell in (0..ROWS, 0..COLS)
    ) {
        let params = ReinforcementParams { epsilon: 0.5, learning_rate: 0.25 };
        let mut strategy = ReinforcementStrategy::new(params, 1.0, SimRng::from_seed_u64(9));
        let ctx = context(&map, &fire, 2, 1.0);
        for _ in 0..80 {
            strategy.place_sensors(&ctx).unwrap();
        }
        let pos = SensorPosition::from(cell);
        let observed = SignalWeights::new(0.5, 0.5).signal(map.value_at(pos), fire.intensity_at(pos));
        let estimate = strategy.value_table().value(pos);
        prop_assert!((estimate - observed).abs() < 1e-6, "{} vs {}", estimate, observed);
    }

    #[test]
    fn test_oversized_request_never_partial(extra in 1usize..10) {
        let fire = FireState::quiet(shape());
        let map = BurnProbabilityMap::uniform(shape(), 0.5, 0.9, EvidenceRule::Reset);
        let ctx = context(&map, &fire, ROWS * COLS + extra, 1.0);
        prop_assert!(GreedyStrategy::default().place_sensors(&ctx).is_err());
    }
}
