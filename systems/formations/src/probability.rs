//! Compilation of authored probability expressions into weight functions.

use formation_defence_core::{FormationId, WeightFn};

use crate::expression::{Bindings, Expression};

/// Builds the selection weight of a formation from its authored expression.
///
/// Blank expressions weigh every wave equally. Expressions that fail to
/// compile, and evaluations that are non-finite or not positive, yield
/// `minimum_weight`.
#[must_use]
pub fn compile_probability(
    formation: &FormationId,
    expression: &str,
    minimum_weight: f64,
) -> WeightFn {
    let expression = expression.trim();
    if expression.is_empty() {
        return WeightFn::constant(1.0);
    }

    match Expression::compile(expression) {
        Ok(compiled) => WeightFn::new(move |wave, formation| {
            let value = compiled.evaluate(&Bindings::for_formation(wave, formation));
            if value.is_finite() && value > 0.0 {
                value
            } else {
                minimum_weight
            }
        }),
        Err(error) => {
            tracing::warn!(
                formation = %formation,
                expression,
                %error,
                "probability expression rejected, using minimum weight"
            );
            WeightFn::constant(minimum_weight)
        }
    }
}
