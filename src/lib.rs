//! A state-space exploration engine: declarative transition rules compile
//! into an executable system that generates a state's neighbors on demand,
//! assembles them into a Markov graph as it goes, and feeds a handful of
//! pluggable pathfinding studies (shortest path, any path, cycle detection,
//! bounded expansion).
//!
//! Modules follow the dependency order they're built in: [`state`] and
//! [`path`] are the data model; [`schema`] and [`codex`] describe and
//! identify states; [`constraint`] and [`effect`] compile a rule's clauses;
//! [`evaluate`] runs the eight-step transition algorithm; [`neighbor`],
//! [`graph`], and [`explore`] climb the state space; [`study`] answers
//! questions about the result; [`compile`] ties a declarative system
//! together.

pub mod codex;
pub mod compile;
pub mod constraint;
pub mod effect;
pub mod error;
pub mod evaluate;
pub mod explore;
pub mod graph;
pub mod neighbor;
pub mod path;
pub mod rule;
pub mod schema;
pub mod state;
pub mod study;

pub mod prelude {
    pub use crate::codex::{Codex, DefaultCodex, Hash};
    pub use crate::compile::{compile, CompiledSystem, DeclarativeSystem};
    pub use crate::constraint::{ConstraintKind, Phase};
    pub use crate::effect::{EffectOp, NamedTransform};
    pub use crate::error::WayfinderError;
    pub use crate::explore::{ExitReason, ExploreHooks, ExploreProfile, Explorer, HookControl, Limits, NoHooks};
    pub use crate::graph::MarkovGraph;
    pub use crate::path::Path;
    pub use crate::rule::{Cost, FailureReason, TransitionOutcome, TransitionRule};
    pub use crate::schema::{Validation, Validator};
    pub use crate::state::State;
    pub use crate::study::cheaper;
}
