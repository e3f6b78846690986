use std::collections::HashSet;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use rustymtree::{
    AbsoluteDifference, CountingDistance, DistanceMetric, EditDistance, MTree, PromotionPolicy,
};

// Scenario: capacity 2, integers 0/10/20/30, distance = absolute difference.
#[test]
fn integer_scenario_k1() {
    let tree = MTree::from_values([0i64, 10, 20, 30], 2, Arc::new(AbsoluteDifference)).unwrap();
    assert_eq!(tree.knn(&11, 1), vec![10]);
}

#[test]
fn integer_scenario_k2() {
    let tree = MTree::from_values([0i64, 10, 20, 30], 2, Arc::new(AbsoluteDifference)).unwrap();
    let result: HashSet<i64> = tree.knn(&11, 2).into_iter().collect();
    assert_eq!(result, HashSet::from([10, 20]));
}

// Scenario: capacity 2, strings "a", "b", "c" in order, edit distance.
#[test]
fn string_scenario_splits_into_two_levels() {
    let mut tree = MTree::with_node_capacity(2, Arc::new(EditDistance)).unwrap();
    tree.insert("a".to_string());
    tree.insert("b".to_string());

    let before = tree.metrics();
    assert_eq!(before.routers, 1);
    assert_eq!(before.leaves, 2);

    tree.insert("c".to_string());

    let after = tree.metrics();
    assert_eq!(after.leaves, 3);
    assert!(after.routers > 1, "third insert must split the root");
    assert!(after.max_depth > before.max_depth, "split grows the height");
    for s in ["a", "b", "c"] {
        assert!(tree.contains(&s.to_string()));
    }
}

#[test]
fn knn_ordering_is_a_set_contract() {
    let tree = MTree::from_values([5i64, 15, 25], 2, Arc::new(AbsoluteDifference)).unwrap();
    // 20 ties between 15 and 25; either is an acceptable single answer
    let result = tree.knn(&20, 1);
    assert_eq!(result.len(), 1);
    assert!(result[0] == 15 || result[0] == 25);
}

#[test]
fn large_random_trees_match_brute_force() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for cap in [2usize, 3, 8] {
        let values: Vec<i64> = (0..400).map(|_| rng.gen_range(0..100_000)).collect();
        let tree =
            MTree::from_values(values.iter().copied(), cap, Arc::new(AbsoluteDifference)).unwrap();

        for _ in 0..20 {
            let query: i64 = rng.gen_range(0..100_000);
            let k = rng.gen_range(1..30);

            let mut sorted = values.clone();
            sorted.sort_by_key(|v| (v - query).abs());

            let result = tree.knn(&query, k);
            assert_eq!(result.len(), k.min(values.len()));

            let worst = result.iter().map(|v| (v - query).abs()).max().unwrap();
            let expected_worst = (sorted[k - 1] - query).abs();
            assert_eq!(worst, expected_worst, "cap={} k={} query={}", cap, k, query);
        }
    }
}

#[test]
fn promotion_policies_agree_on_results() {
    let mut rng = StdRng::seed_from_u64(42);
    let values: Vec<i64> = (0..200).map(|_| rng.gen_range(0..10_000)).collect();

    let default_tree =
        MTree::from_values(values.iter().copied(), 4, Arc::new(AbsoluteDifference)).unwrap();
    let mut spread_tree = MTree::with_node_capacity(4, Arc::new(AbsoluteDifference)).unwrap();
    spread_tree.set_promotion_policy(PromotionPolicy::MaxSpread);
    for &v in &values {
        spread_tree.insert(v);
    }

    for query in [0i64, 777, 5_000, 9_999] {
        let a = default_tree.knn(&query, 3);
        let b = spread_tree.knn(&query, 3);
        let worst_a = a.iter().map(|v| (v - query).abs()).max();
        let worst_b = b.iter().map(|v| (v - query).abs()).max();
        assert_eq!(worst_a, worst_b, "policies disagree at query {}", query);
    }
}

#[test]
fn counting_distance_sees_fewer_calls_than_brute_force() {
    let counted: Arc<CountingDistance<i64, i64>> =
        Arc::new(CountingDistance::new(Arc::new(AbsoluteDifference)));
    let values: Vec<i64> = (0..128).map(|v| v * 37 % 1009).collect();
    let n = values.len();

    let tree = MTree::from_values(values, 8, counted.clone()).unwrap();

    counted.reset_counter();
    let result = tree.knn(&500, 3);
    assert_eq!(result.len(), 3);
    // pruning must beat comparing the query against every stored value
    // plus every router pair
    assert!(
        counted.call_count() < n * n,
        "search used {} distinct distance calls",
        counted.call_count()
    );

    counted.reset_counter();
    assert_eq!(counted.call_count(), 0);
}

#[test]
fn counted_metric_answers_like_the_plain_one() {
    let plain = AbsoluteDifference;
    let counted = CountingDistance::<i64, i64>::new(Arc::new(AbsoluteDifference));
    for (a, b) in [(0i64, 0), (3, 11), (11, 3), (500, 123)] {
        assert_eq!(counted.distance(&a, &b), plain.distance(&a, &b));
    }
}
