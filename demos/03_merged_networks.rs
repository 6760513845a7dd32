//! Demo 3: Merged Networks
//!
//! Two ways to combine pre-built networks:
//! - Shallow merge keeps each network as an opaque node, wired by name
//! - Deep merge dissolves them into one graph; on a name clash the later
//!   operation wins
//!
//! Run with: `cargo run --example 03_merged_networks`

use weave_core::{Operation, Value, ValueMap};
use weave_graph::compose;

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

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Demo 3: Merged Networks ===\n");

    // upstream produces the a and b that downstream consumes.
    let downstream = compose("downstream")
        .op(add("sum1", ["a", "b"], "s1"))
        .op(add("sum2", ["s1", "c"], "s2"))
        .build()
        .expect("compose downstream");

    let upstream = compose("upstream")
        .op(add("make_a", ["d", "e"], "a"))
        .op(add("make_b", ["a", "f"], "b"))
        .build()
        .expect("compose upstream");

    println!("--- Shallow merge: sub-networks bind by name ---");
    let merged = compose("merged")
        .network(downstream)
        .network(upstream)
        .build()
        .expect("compose merged network");
    println!("{merged}");

    let inputs = ValueMap::from([
        ("c".to_string(), Value::Int(5)),
        ("d".to_string(), Value::Int(1)),
        ("e".to_string(), Value::Int(2)),
        ("f".to_string(), Value::Int(4)),
    ]);
    let results = merged.run(inputs).expect("compute merged network");
    println!("{results:?}\n");

    println!("--- Deep merge: later duplicate wins ---");
    let first = compose("first").op(add("combine", ["x", "y"], "out")).build().unwrap();
    let second = {
        let op = Operation::builder("combine")
            .needs(["x", "y"])
            .provides(["out"])
            .body(|inputs: &ValueMap, _| {
                let x = inputs["x"].as_int().ok_or("expected int")?;
                let y = inputs["y"].as_int().ok_or("expected int")?;
                Ok(ValueMap::from([("out".to_string(), Value::Int(x * y))]))
            })
            .build()
            .unwrap();
        compose("second").op(op).build().unwrap()
    };

    let deep = compose("deep")
        .merge(true)
        .network(first)
        .network(second)
        .build()
        .expect("compose deep merge");

    let inputs = ValueMap::from([
        ("x".to_string(), Value::Int(3)),
        ("y".to_string(), Value::Int(4)),
    ]);
    let results = deep.run(inputs).expect("compute deep merge");
    println!("combine resolves to the multiplying version: {results:?}");
}
