//! Dice rolling.
//!
//! The command pipeline only depends on [`DiceEngine`]; [`StandardDiceEngine`]
//! is the implementation the bot runs with.

pub mod engine;
pub mod expression;

use serenity::async_trait;

use crate::common::error::EvaluationError;

pub use engine::StandardDiceEngine;

/// Structured outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollResult {
    /// What was rolled, e.g. the normalized expression.
    pub description: String,
    /// Breakdown, headline first. Each entry is rendered on its own line.
    pub lines: Vec<String>,
    /// Free text the user attached to the roll.
    pub reason: Option<String>,
}

/// Evaluates dice commands.
#[async_trait]
pub trait DiceEngine: Send + Sync {
    /// Evaluate the raw command text, command token included.
    async fn evaluate(&self, expression: &str) -> Result<RollResult, EvaluationError>;
}
