#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Formation content and difficulty-budgeted wave planning.
//!
//! Formations are authored as text, compiled once into immutable
//! [`Formation`](formation_defence_core::Formation) records and then bought
//! against each wave's difficulty budget by the [`FormationManager`].

pub mod expression;
pub mod parser;
pub mod planner;
pub mod probability;
pub mod weighted;

pub use expression::{Bindings, Expression, ExpressionError};
pub use parser::{
    parse_formation_text, slugify, FormationDefaults, FormationDraft, FormationParser,
    DEFAULT_FORMATION_GAP,
};
pub use planner::{FormationManager, FormationManagerConfig, PlanOptions, DEFAULT_ITERATION_LIMIT};
pub use probability::compile_probability;
pub use weighted::weighted_random_choice;
