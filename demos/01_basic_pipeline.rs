//! Demo 1: Basic Pipeline
//!
//! This demo shows the core network workflow:
//! - Declaring operations with named needs and provides
//! - Composing them into a network
//! - Computing all outputs, then a specific subset
//! - Inspecting compiled layers and per-layer timings
//!
//! Run with: `cargo run --example 01_basic_pipeline`

use weave_core::{Operation, Value, ValueMap};
use weave_graph::{compose, Outputs};

fn add(name: &str, needs: [&'static str; 2], out: &'static str) -> Operation {
    Operation::builder(name)
        .needs(needs)
        .provides([out])
        .body(move |inputs: &ValueMap, _| {
            let a = inputs[needs[0]].as_int().ok_or("expected int")?;
            let b = inputs[needs[1]].as_int().ok_or("expected int")?;
            Ok(ValueMap::from([(out.to_string(), Value::Int(a + b))]))
        })
        .build()
        .unwrap()
}

fn mul(name: &str, needs: [&'static str; 2], out: &'static str) -> Operation {
    Operation::builder(name)
        .needs(needs)
        .provides([out])
        .body(move |inputs: &ValueMap, _| {
            let a = inputs[needs[0]].as_int().ok_or("expected int")?;
            let b = inputs[needs[1]].as_int().ok_or("expected int")?;
            Ok(ValueMap::from([(out.to_string(), Value::Int(a * b))]))
        })
        .build()
        .unwrap()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Demo 1: Basic Pipeline ===\n");

    // sum_ab = a + b, then sum_ab_times_b = sum_ab * b
    //
    //  a ──┐
    //      ├──▶ sum ──▶ sum_ab ──┐
    //  b ──┤                     ├──▶ mul ──▶ sum_ab_times_b
    //      └─────────────────────┘
    //
    let net = compose("demo")
        .op(add("sum", ["a", "b"], "sum_ab"))
        .op(mul("mul", ["sum_ab", "b"], "sum_ab_times_b"))
        .build()
        .expect("compose demo network");

    println!("{net}");

    let inputs = ValueMap::from([
        ("a".to_string(), Value::Int(1)),
        ("b".to_string(), Value::Int(2)),
    ]);

    println!("--- All outputs ---");
    let results = net.run(inputs.clone()).expect("compute all outputs");
    println!("{results:?}\n");

    println!("--- Just sum_ab_times_b ---");
    let results = net
        .compute(Outputs::named(["sum_ab_times_b"]), inputs, None)
        .expect("compute specific output");
    println!("{results:?}\n");

    println!("--- Resuming from an intermediate ---");
    let resumed = ValueMap::from([
        ("sum_ab".to_string(), Value::Int(1)),
        ("b".to_string(), Value::Int(2)),
    ]);
    let results = net
        .compute(Outputs::named(["sum_ab_times_b"]), resumed, None)
        .expect("compute from intermediate");
    println!("{results:?}\n");

    println!("--- Layer timings ---");
    for (name, duration) in net.last_run_times() {
        println!("  {name}: {duration:?}");
    }
}
