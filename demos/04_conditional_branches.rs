//! Demo 4: Conditional Branches
//!
//! If / ElseIf / Else nodes wrap sub-networks; exactly one branch of a
//! chain contributes its outputs to the cache per run.
//!
//! Run with: `cargo run --example 04_conditional_branches`

use weave_core::{Operation, Value, ValueMap};
use weave_graph::{compose, ControlNode, Network};

fn label_branch(name: &str, label: &'static str) -> Network {
    let op = Operation::builder(format!("{name}_op"))
        .needs(["x"])
        .provides(["label"])
        .body(move |_, _| Ok(ValueMap::from([("label".to_string(), Value::from(label))])))
        .build()
        .unwrap();
    compose(name).op(op).build().expect("compose branch")
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Demo 4: Conditional Branches ===\n");

    let net = compose("classify")
        .control(ControlNode::if_branch(
            "big",
            ["x"],
            |cache: &ValueMap| cache["x"].as_int().unwrap_or(0) > 10,
            label_branch("big_branch", "big"),
        ))
        .control(ControlNode::else_if_branch(
            "mid",
            ["x"],
            |cache: &ValueMap| {
                let x = cache["x"].as_int().unwrap_or(0);
                x > 5 && x <= 10
            },
            label_branch("mid_branch", "mid"),
        ))
        .control(ControlNode::else_branch(
            "small",
            label_branch("small_branch", "small"),
        ))
        .build()
        .expect("compose classifier");

    for x in [12, 7, 2] {
        let inputs = ValueMap::from([("x".to_string(), Value::Int(x))]);
        let results = net.run(inputs).expect("classify");
        println!("x = {x:>2} -> {:?}", results["label"]);
    }
}
