//! End-to-end tests: composition, pruning, evaluation, control chains.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use weave_core::{EngineError, Operation, Value, ValueMap};
use weave_graph::{compose, ControlNode, Network, Outputs};

/// Integer addition: provides = needs[0] + needs[1].
fn add_op(name: &str, needs: [&str; 2], provides: &str) -> Operation {
    add_op_counted(name, needs, provides, Arc::new(AtomicUsize::new(0)))
}

/// Like [`add_op`], but counts invocations so tests can assert which
/// operations actually ran.
fn add_op_counted(
    name: &str,
    needs: [&str; 2],
    provides: &str,
    calls: Arc<AtomicUsize>,
) -> Operation {
    let (lhs, rhs) = (needs[0].to_string(), needs[1].to_string());
    let out = provides.to_string();
    Operation::builder(name)
        .needs(needs)
        .provides([provides])
        .body(move |inputs: &ValueMap, _| {
            calls.fetch_add(1, Ordering::SeqCst);
            let a = inputs[&lhs].as_int().ok_or("expected int")?;
            let b = inputs[&rhs].as_int().ok_or("expected int")?;
            Ok(ValueMap::from([(out.clone(), Value::Int(a + b))]))
        })
        .build()
        .unwrap()
}

fn mul_op(name: &str, needs: [&str; 2], provides: &str) -> Operation {
    let (lhs, rhs) = (needs[0].to_string(), needs[1].to_string());
    let out = provides.to_string();
    Operation::builder(name)
        .needs(needs)
        .provides([provides])
        .body(move |inputs: &ValueMap, _| {
            let a = inputs[&lhs].as_int().ok_or("expected int")?;
            let b = inputs[&rhs].as_int().ok_or("expected int")?;
            Ok(ValueMap::from([(out.clone(), Value::Int(a * b))]))
        })
        .build()
        .unwrap()
}

fn inputs<const N: usize>(pairs: [(&str, i64); N]) -> ValueMap {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), Value::Int(v)))
        .collect()
}

#[test]
fn basic_network_all_and_specific_outputs() {
    let pow = Operation::builder("pow_op1")
        .needs(["sum_ab"])
        .provides(["sum_ab_p1", "sum_ab_p2", "sum_ab_p3"])
        .param("exponent", 3i64)
        .body(|inputs: &ValueMap, params| {
            let base = inputs["sum_ab"].as_int().ok_or("expected int")?;
            let exponent = params["exponent"].as_int().ok_or("expected int")?;
            let mut out = ValueMap::new();
            for y in 1..=exponent {
                out.insert(format!("sum_ab_p{y}"), Value::Int(base.pow(y as u32)));
            }
            Ok(out)
        })
        .build()
        .unwrap();

    let net = compose("my network")
        .op(add_op("sum_op1", ["a", "b"], "sum_ab"))
        .op(mul_op("mul_op1", ["sum_ab", "b"], "sum_ab_times_b"))
        .op(pow)
        .op(add_op("sum_op2", ["sum_ab_p1", "sum_ab_p2"], "p1_plus_p2"))
        .build()
        .unwrap();

    // All outputs.
    let results = net.run(inputs([("a", 1), ("b", 2)])).unwrap();
    assert_eq!(results["sum_ab"], Value::Int(3));
    assert_eq!(results["sum_ab_times_b"], Value::Int(6));
    assert_eq!(results["sum_ab_p3"], Value::Int(27));
    assert_eq!(results["p1_plus_p2"], Value::Int(12));
    assert!(!results.contains_key("a"));

    // Specific outputs.
    let results = net
        .compute(Outputs::named(["sum_ab_times_b"]), inputs([("a", 1), ("b", 2)]), None)
        .unwrap();
    assert_eq!(results, inputs([("sum_ab_times_b", 6)]));

    // Start with an intermediate already computed.
    let results = net
        .compute(
            Outputs::named(["sum_ab_times_b"]),
            inputs([("sum_ab", 1), ("b", 2)]),
            None,
        )
        .unwrap();
    assert_eq!(results, inputs([("sum_ab_times_b", 2)]));
}

#[test]
fn input_based_pruning_skips_satisfied_ops() {
    let sum1_calls = Arc::new(AtomicUsize::new(0));
    let sum2_calls = Arc::new(AtomicUsize::new(0));
    let net = compose("test_net")
        .op(add_op_counted("sum_op1", ["a", "b"], "sum1", sum1_calls.clone()))
        .op(add_op_counted("sum_op2", ["a", "b"], "sum2", sum2_calls.clone()))
        .op(add_op("sum_op3", ["sum1", "sum2"], "sum3"))
        .build()
        .unwrap();

    let results = net.run(inputs([("sum1", 2), ("sum2", 5)])).unwrap();

    assert_eq!(results["sum3"], Value::Int(7));
    assert_eq!(sum1_calls.load(Ordering::SeqCst), 0);
    assert_eq!(sum2_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn output_based_pruning_skips_unneeded_ops() {
    let sum1_calls = Arc::new(AtomicUsize::new(0));
    let net = compose("test_net")
        .op(add_op_counted("sum_op1", ["a", "b"], "sum1", sum1_calls.clone()))
        .op(add_op("sum_op2", ["c", "d"], "sum2"))
        .op(add_op("sum_op3", ["c", "sum2"], "sum3"))
        .build()
        .unwrap();

    let results = net
        .compute(Outputs::named(["sum3"]), inputs([("c", 2), ("d", 3)]), None)
        .unwrap();

    // sum3 = c + (c + d), with a and b never supplied.
    assert_eq!(results, inputs([("sum3", 7)]));
    assert_eq!(sum1_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn input_and_output_based_pruning_combine() {
    let net = compose("test_net")
        .op(add_op("sum_op1", ["a", "b"], "sum1"))
        .op(add_op("sum_op2", ["c", "d"], "sum2"))
        .op(add_op("sum_op3", ["c", "sum2"], "sum3"))
        .build()
        .unwrap();

    let results = net
        .compute(Outputs::named(["sum3"]), inputs([("c", 2), ("sum2", 5)]), None)
        .unwrap();

    assert_eq!(results, inputs([("sum3", 7)]));
}

#[test]
fn unknown_output_is_rejected() {
    let net = compose("test_net")
        .op(add_op("sum_op1", ["a", "b"], "sum1"))
        .op(add_op("sum_op2", ["c", "d"], "sum2"))
        .op(add_op("sum_op3", ["c", "sum2"], "sum3"))
        .build()
        .unwrap();

    let err = net
        .compute(
            Outputs::named(["sum1", "sum3", "sum4"]),
            inputs([("a", 1), ("b", 2), ("c", 3), ("d", 4)]),
            None,
        )
        .unwrap_err();
    match err {
        EngineError::UnknownOutput(name) => assert_eq!(name, "sum4"),
        other => panic!("expected UnknownOutput, got {other:?}"),
    }
}

#[test]
fn shallow_merge_binds_subnets_by_name() {
    let net1 = compose("net one")
        .op(add_op("sum_op1", ["a", "b"], "sum1"))
        .op(add_op("sum_op2", ["a", "b"], "sum2"))
        .op(add_op("sum_op3", ["sum1", "c"], "sum3"))
        .build()
        .unwrap();

    let net2 = compose("net two")
        .op(add_op("sum_op1", ["d", "e"], "a"))
        .op(add_op("sum_op2", ["a", "f"], "b"))
        .build()
        .unwrap();

    let merged = compose("merged").network(net1).network(net2).build().unwrap();

    let results = merged
        .run(inputs([("c", 5), ("d", 1), ("e", 2), ("f", 4)]))
        .unwrap();

    // net two feeds a and b into net one.
    assert_eq!(results["a"], Value::Int(3));
    assert_eq!(results["b"], Value::Int(7));
    assert_eq!(results["sum1"], Value::Int(10));
    assert_eq!(results["sum3"], Value::Int(15));
}

#[test]
fn deep_merge_keeps_later_duplicate() {
    let net1 = compose("net one")
        .op(add_op("sum_op1", ["a", "b"], "sum1"))
        .op(add_op("sum_op2", ["a", "b"], "sum2"))
        .op(add_op("sum_op3", ["sum1", "c"], "sum3"))
        .build()
        .unwrap();

    let net2 = compose("net two")
        .op(add_op("sum_op1", ["a", "b"], "sum1"))
        .op(add_op("sum_op4", ["sum1", "b"], "sum2"))
        .build()
        .unwrap();

    let merged = compose("merged")
        .merge(true)
        .network(net1)
        .network(net2)
        .build()
        .unwrap();

    // One sum_op1 layer survives.
    let sum_op1_layers = merged
        .list_layers()
        .unwrap()
        .into_iter()
        .filter(|(name, _)| name == "sum_op1")
        .count();
    assert_eq!(sum_op1_layers, 1);

    let results = merged.run(inputs([("a", 1), ("b", 2), ("c", 4)])).unwrap();
    assert_eq!(results["sum1"], Value::Int(3));
    assert_eq!(results["sum3"], Value::Int(7));
    // sum2 is produced twice; sum_op4 runs later in the plan and wins.
    assert_eq!(results["sum2"], Value::Int(5));
}

#[test]
fn disjoint_composition_unions_outputs() {
    let double = |name: &str, from: &str, to: &str| {
        let from = from.to_string();
        let to_owned = to.to_string();
        Operation::builder(name)
            .needs([from.as_str()])
            .provides([to_owned.as_str()])
            .body(move |inputs: &ValueMap, _| {
                let v = inputs[&from].as_int().ok_or("expected int")?;
                Ok(ValueMap::from([(to_owned.clone(), Value::Int(v * 2))]))
            })
            .build()
            .unwrap()
    };

    let left = compose("left").op(double("dbl_x", "a", "x")).build().unwrap();
    let right = compose("right").op(double("dbl_z", "b", "z")).build().unwrap();

    let separate_left = left.run(inputs([("a", 2)])).unwrap();
    let separate_right = right.run(inputs([("b", 3)])).unwrap();

    let joint = compose("joint").network(left).network(right).build().unwrap();
    let combined = joint.run(inputs([("a", 2), ("b", 3)])).unwrap();

    assert_eq!(combined["x"], separate_left["x"]);
    assert_eq!(combined["z"], separate_right["z"]);
}

#[test]
fn requested_intermediate_survives_release() {
    let net = compose("sums")
        .op(add_op("sum", ["a", "b"], "ab"))
        .op(mul_op("mul", ["ab", "b"], "ab_b"))
        .build()
        .unwrap();

    let results = net
        .compute(Outputs::named(["ab", "ab_b"]), inputs([("a", 1), ("b", 2)]), None)
        .unwrap();
    assert_eq!(results, inputs([("ab", 3), ("ab_b", 6)]));
}

#[test]
fn color_filter_scopes_execution() {
    let tag = |name: &str, from: &'static str, to: &'static str, color: Option<&str>| {
        let mut builder = Operation::builder(name)
            .needs([from])
            .provides([to])
            .body(move |inputs: &ValueMap, _| {
                let v = inputs[from].as_int().ok_or("expected int")?;
                Ok(ValueMap::from([(to.to_string(), Value::Int(v + 1))]))
            });
        if let Some(color) = color {
            builder = builder.color(color);
        }
        builder.build().unwrap()
    };

    let net = compose("colored")
        .op(tag("red_op", "a", "r", Some("red")))
        .op(tag("blue_op", "a", "bl", Some("blue")))
        .op(tag("plain_op", "a", "p", None))
        .build()
        .unwrap();

    let results = net
        .compute(Outputs::All, inputs([("a", 1)]), Some("red"))
        .unwrap();
    assert_eq!(results["r"], Value::Int(2));
    assert_eq!(results["p"], Value::Int(2));
    assert!(!results.contains_key("bl"));
}

#[test]
fn compute_is_deterministic() {
    let net = compose("sums")
        .op(add_op("sum", ["a", "b"], "ab"))
        .op(mul_op("mul", ["ab", "b"], "ab_b"))
        .build()
        .unwrap();

    let first = net.run(inputs([("a", 1), ("b", 2)])).unwrap();
    let second = net.run(inputs([("a", 1), ("b", 2)])).unwrap();
    assert_eq!(first, second);
}

#[test]
fn timings_are_recorded_per_layer() {
    let net = compose("sums")
        .op(add_op("sum", ["a", "b"], "ab"))
        .op(mul_op("mul", ["ab", "b"], "ab_b"))
        .build()
        .unwrap();

    net.run(inputs([("a", 1), ("b", 2)])).unwrap();
    let times = net.last_run_times();
    assert!(times.contains_key("sum"));
    assert!(times.contains_key("mul"));
}

// =============================================================================
// Control chains
// =============================================================================

/// A single-op branch network providing `label`.
fn label_branch(name: &str, label: &'static str, calls: Arc<AtomicUsize>) -> Network {
    let op = Operation::builder(format!("{name}_op"))
        .needs(["x"])
        .provides(["label"])
        .body(move |_, _| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(ValueMap::from([("label".to_string(), Value::from(label))]))
        })
        .build()
        .unwrap();
    compose(name).op(op).build().unwrap()
}

#[test]
fn if_else_takes_exactly_one_branch() {
    let pos_calls = Arc::new(AtomicUsize::new(0));
    let neg_calls = Arc::new(AtomicUsize::new(0));

    let build = |pos: Arc<AtomicUsize>, neg: Arc<AtomicUsize>| {
        compose("main")
            .control(ControlNode::if_branch(
                "positive",
                ["x"],
                |cache: &ValueMap| cache["x"].as_int().unwrap_or(0) > 0,
                label_branch("pos", "positive", pos),
            ))
            .control(ControlNode::else_branch(
                "fallback",
                label_branch("neg", "negative", neg),
            ))
            .build()
            .unwrap()
    };

    let net = build(pos_calls.clone(), neg_calls.clone());
    let results = net.run(inputs([("x", 3)])).unwrap();
    assert_eq!(results["label"], Value::from("positive"));
    assert_eq!(pos_calls.load(Ordering::SeqCst), 1);
    assert_eq!(neg_calls.load(Ordering::SeqCst), 0);

    let results = net.run(inputs([("x", -1)])).unwrap();
    assert_eq!(results["label"], Value::from("negative"));
    assert_eq!(pos_calls.load(Ordering::SeqCst), 1);
    assert_eq!(neg_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn else_if_chain_selects_by_order() {
    let mk = |x: i64| {
        let net = compose("chain")
            .control(ControlNode::if_branch(
                "big",
                ["x"],
                |cache: &ValueMap| cache["x"].as_int().unwrap_or(0) > 10,
                label_branch("big_branch", "big", Arc::new(AtomicUsize::new(0))),
            ))
            .control(ControlNode::else_if_branch(
                "mid",
                ["x"],
                |cache: &ValueMap| {
                    let x = cache["x"].as_int().unwrap_or(0);
                    x > 5 && x <= 10
                },
                label_branch("mid_branch", "mid", Arc::new(AtomicUsize::new(0))),
            ))
            .control(ControlNode::else_branch(
                "small",
                label_branch("small_branch", "small", Arc::new(AtomicUsize::new(0))),
            ))
            .build()
            .unwrap();
        net.run(inputs([("x", x)])).unwrap()["label"].clone()
    };

    assert_eq!(mk(12), Value::from("big"));
    assert_eq!(mk(7), Value::from("mid"));
    assert_eq!(mk(2), Value::from("small"));
}

#[test]
fn missing_condition_inputs_short_circuit_the_branch() {
    let pos_calls = Arc::new(AtomicUsize::new(0));
    let neg_calls = Arc::new(AtomicUsize::new(0));

    // The guard reads `threshold`, which the caller never provides and no
    // operation produces; the branch runs unconditionally and the else is
    // skipped.
    let net = compose("main")
        .control(ControlNode::if_branch(
            "guarded",
            ["threshold"],
            |cache: &ValueMap| cache["threshold"].as_int().unwrap_or(0) > 0,
            label_branch("pos", "taken", pos_calls.clone()),
        ))
        .control(ControlNode::else_branch(
            "fallback",
            label_branch("neg", "skipped", neg_calls.clone()),
        ))
        .build()
        .unwrap();

    let results = net.run(inputs([("x", 1)])).unwrap();
    assert_eq!(results["label"], Value::from("taken"));
    assert_eq!(pos_calls.load(Ordering::SeqCst), 1);
    assert_eq!(neg_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn subnet_reentered_with_midstream_input() {
    let stage1_calls = Arc::new(AtomicUsize::new(0));
    let stage1 = {
        let calls = stage1_calls.clone();
        Operation::builder("stage1")
            .needs(["a"])
            .provides(["m"])
            .body(move |inputs: &ValueMap, _| {
                calls.fetch_add(1, Ordering::SeqCst);
                let a = inputs["a"].as_int().ok_or("expected int")?;
                Ok(ValueMap::from([("m".to_string(), Value::Int(a + 1))]))
            })
            .build()
            .unwrap()
    };
    let stage2 = mul_op("stage2", ["m", "m"], "z");

    let inner = compose("stages").op(stage1).op(stage2).build().unwrap();
    let outer = compose("outer").network(inner).build().unwrap();

    // Supplying the mid-stream value re-enters the embedded network and
    // skips its first stage.
    let results = outer.run(inputs([("m", 5)])).unwrap();
    assert_eq!(results["z"], Value::Int(25));
    assert_eq!(stage1_calls.load(Ordering::SeqCst), 0);
}
