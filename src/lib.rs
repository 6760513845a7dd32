//! Weave Demos - This crate exists solely to build the demos.
//!
//! The actual Weave library is split into:
//! - `weave-core` - Core types (Id, Value, DataPort, Operation, errors)
//! - `weave-graph` - Graph assembly, compilation, pruning, evaluation
