//! Demo 2: Pruned Outputs
//!
//! Networks only run the operations a call actually needs:
//! - Providing a value deeper in the graph skips its producers
//! - Requesting a subset of outputs skips unrelated branches
//! - A colour filter restricts execution to a labelled subgraph
//!
//! Run with: `cargo run --example 02_pruned_outputs`

use weave_core::{Operation, Value, ValueMap};
use weave_graph::{compose, Outputs};

fn add(name: &str, needs: [&'static str; 2], out: &'static str) -> Operation {
    let label = name.to_string();
    Operation::builder(name)
        .needs(needs)
        .provides([out])
        .body(move |inputs: &ValueMap, _| {
            println!("  running {label}");
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

    println!("=== Demo 2: Pruned Outputs ===\n");

    let net = compose("pruned")
        .op(add("sum1", ["a", "b"], "s1"))
        .op(add("sum2", ["c", "d"], "s2"))
        .op(add("sum3", ["c", "s2"], "s3"))
        .build()
        .expect("compose network");

    println!("--- Only s3 requested; sum1 never runs ---");
    let inputs = ValueMap::from([
        ("c".to_string(), Value::Int(2)),
        ("d".to_string(), Value::Int(3)),
    ]);
    let results = net
        .compute(Outputs::named(["s3"]), inputs, None)
        .expect("compute s3");
    println!("{results:?}\n");

    println!("--- s2 supplied directly; sum2 never runs ---");
    let inputs = ValueMap::from([
        ("c".to_string(), Value::Int(2)),
        ("s2".to_string(), Value::Int(5)),
    ]);
    let results = net
        .compute(Outputs::named(["s3"]), inputs, None)
        .expect("compute s3 from s2");
    println!("{results:?}\n");

    println!("--- Graph description ---");
    let json = net.describe().to_json().expect("serialize description");
    println!("{json}");
}
