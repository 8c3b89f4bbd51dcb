//! Standard dice engine.
//!
//! Rolls parsed expressions with a shared random number generator and
//! produces the breakdown shown to users.

use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serenity::async_trait;
use tokio::task;
use tracing::debug;

use crate::common::error::EvaluationError;
use crate::dice::expression::{DiceTerm, ExpressionParser, Selection, Sides, Sign, Term};
use crate::dice::{DiceEngine, RollResult};

/// Largest die accepted.
pub const MAX_SIDES: u32 = 1_000_000;

/// Extra dice one term may gain from exploding.
const MAX_EXPLOSIONS: usize = 100;

/// Dice listed per breakdown line before the rest is summarized.
const MAX_LISTED_DICE: usize = 100;

/// Dice engine backed by [`ExpressionParser`] and `rand`.
///
/// Rolling is CPU work, so [`DiceEngine::evaluate`] runs it on the blocking
/// pool; a caller's timeout then bounds the wait even for large rolls.
pub struct StandardDiceEngine {
    roller: Arc<Roller>,
}

struct Roller {
    parser: ExpressionParser,
    max_dice: u32,
    rng: Mutex<StdRng>,
}

/// Outcome of rolling one dice term.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TermRoll {
    kept: Vec<i64>,
    dropped: Vec<i64>,
}

impl TermRoll {
    fn total(&self) -> i64 {
        self.kept.iter().sum()
    }
}

impl StandardDiceEngine {
    pub fn new(max_dice: u32) -> Self {
        Self::with_rng(max_dice, StdRng::from_entropy())
    }

    /// Engine with a fixed seed, for reproducible rolls.
    pub fn with_seed(max_dice: u32, seed: u64) -> Self {
        Self::with_rng(max_dice, StdRng::seed_from_u64(seed))
    }

    fn with_rng(max_dice: u32, rng: StdRng) -> Self {
        Self {
            roller: Arc::new(Roller {
                parser: ExpressionParser::new(),
                max_dice,
                rng: Mutex::new(rng),
            }),
        }
    }

    /// Parse and roll the first dice expression in `input`.
    pub fn roll(&self, input: &str) -> Result<RollResult, EvaluationError> {
        self.roller.roll(input)
    }
}

impl Roller {
    fn roll(&self, input: &str) -> Result<RollResult, EvaluationError> {
        let expression = self.parser.parse(input)?;

        let requested: u64 = expression
            .terms
            .iter()
            .filter_map(|(_, term)| match term {
                Term::Dice(dice) => Some(u64::from(dice.count)),
                Term::Constant(_) => None,
            })
            .sum();
        if requested > u64::from(self.max_dice) {
            return Err(EvaluationError::TooManyDice {
                requested,
                limit: self.max_dice,
            });
        }

        let dice_terms: Vec<&DiceTerm> = expression
            .terms
            .iter()
            .filter_map(|(_, term)| match term {
                Term::Dice(dice) => Some(dice),
                Term::Constant(_) => None,
            })
            .collect();
        for dice in &dice_terms {
            validate_term(dice, input)?;
        }

        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut total: i64 = 0;
        let mut breakdown = Vec::new();
        for (sign, term) in &expression.terms {
            let value = match term {
                Term::Constant(value) => i64::from(*value),
                Term::Dice(dice) => {
                    let rolled = roll_term(dice, &mut *rng);
                    breakdown.push(describe_roll(dice, &rolled));
                    rolled.total()
                }
            };
            total += match sign {
                Sign::Plus => value,
                Sign::Minus => -value,
            };
        }
        drop(rng);

        let mut lines = vec![total.to_string()];
        if !is_single_plain_die(&expression.terms) {
            lines.extend(breakdown);
        }

        let description = expression.to_string();
        debug!("Rolled {} = {}", description, total);

        Ok(RollResult {
            description,
            lines,
            reason: expression.reason,
        })
    }
}

#[async_trait]
impl DiceEngine for StandardDiceEngine {
    async fn evaluate(&self, expression: &str) -> Result<RollResult, EvaluationError> {
        let roller = Arc::clone(&self.roller);
        let input = expression.to_string();

        task::spawn_blocking(move || roller.roll(&input))
            .await
            .map_err(|e| EvaluationError::Aborted {
                message: e.to_string(),
            })?
    }
}

fn validate_term(dice: &DiceTerm, input: &str) -> Result<(), EvaluationError> {
    if dice.count == 0 {
        return Err(EvaluationError::Syntax {
            expression: input.to_string(),
            message: "at least one die must be rolled".to_string(),
        });
    }

    if let Sides::Number(sides) = dice.sides {
        if sides == 0 || sides > MAX_SIDES {
            return Err(EvaluationError::InvalidSides {
                sides: u64::from(sides),
                limit: MAX_SIDES,
            });
        }
    }

    if dice.explode && !matches!(dice.sides, Sides::Number(sides) if sides > 1) {
        return Err(EvaluationError::Syntax {
            expression: input.to_string(),
            message: format!("{} cannot explode", dice),
        });
    }

    if let Some(selection) = dice.selection {
        if selection.amount() > dice.count {
            return Err(EvaluationError::InvalidSelection {
                action: selection.action(),
                amount: selection.amount(),
                count: dice.count,
            });
        }
    }

    Ok(())
}

fn roll_die(sides: Sides, rng: &mut impl Rng) -> i64 {
    match sides {
        Sides::Number(sides) => i64::from(rng.gen_range(1..=sides)),
        Sides::Fudge => rng.gen_range(-1..=1),
    }
}

fn roll_term(dice: &DiceTerm, rng: &mut impl Rng) -> TermRoll {
    let mut rolls: Vec<i64> = (0..dice.count).map(|_| roll_die(dice.sides, rng)).collect();

    if let (true, Sides::Number(sides)) = (dice.explode, dice.sides) {
        let max = i64::from(sides);
        let mut pending = rolls.iter().filter(|&&r| r == max).count();
        let mut explosions = 0;
        while pending > 0 && explosions < MAX_EXPLOSIONS {
            pending -= 1;
            explosions += 1;
            let extra = roll_die(dice.sides, rng);
            if extra == max {
                pending += 1;
            }
            rolls.push(extra);
        }
    }

    select(rolls, dice.selection)
}

/// Split rolls into kept and dropped dice, both in roll order.
fn select(rolls: Vec<i64>, selection: Option<Selection>) -> TermRoll {
    let Some(selection) = selection else {
        return TermRoll {
            kept: rolls,
            dropped: Vec::new(),
        };
    };

    // Ascending by value; ties resolved by roll order.
    let mut order: Vec<usize> = (0..rolls.len()).collect();
    order.sort_by_key(|&i| (rolls[i], i));

    let n = (selection.amount() as usize).min(rolls.len());
    let dropped_indices: Vec<usize> = match selection {
        Selection::KeepHighest(_) => order[..rolls.len() - n].to_vec(),
        Selection::KeepLowest(_) => order[n..].to_vec(),
        Selection::DropHighest(_) => order[rolls.len() - n..].to_vec(),
        Selection::DropLowest(_) => order[..n].to_vec(),
    };

    let mut kept = Vec::new();
    let mut dropped = Vec::new();
    for (i, roll) in rolls.into_iter().enumerate() {
        if dropped_indices.contains(&i) {
            dropped.push(roll);
        } else {
            kept.push(roll);
        }
    }
    TermRoll { kept, dropped }
}

fn describe_roll(dice: &DiceTerm, rolled: &TermRoll) -> String {
    let mut line = format!("{}: [{}]", dice, list_dice(dice.sides, &rolled.kept));
    if !rolled.dropped.is_empty() {
        line.push_str(&format!(" dropped [{}]", list_dice(dice.sides, &rolled.dropped)));
    }
    line
}

fn list_dice(sides: Sides, values: &[i64]) -> String {
    let mut shown: Vec<String> = values
        .iter()
        .take(MAX_LISTED_DICE)
        .map(|&value| match sides {
            Sides::Fudge => match value {
                v if v > 0 => "+".to_string(),
                v if v < 0 => "-".to_string(),
                _ => "0".to_string(),
            },
            Sides::Number(_) => value.to_string(),
        })
        .collect();
    if values.len() > MAX_LISTED_DICE {
        shown.push(format!("… +{} more", values.len() - MAX_LISTED_DICE));
    }
    shown.join(", ")
}

/// `1dN` on its own needs no breakdown; the total says it all.
fn is_single_plain_die(terms: &[(Sign, Term)]) -> bool {
    matches!(
        terms,
        [(_, Term::Dice(DiceTerm {
            count: 1,
            explode: false,
            selection: None,
            ..
        }))]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> StandardDiceEngine {
        StandardDiceEngine::with_seed(1000, 7)
    }

    fn parse_list(line: &str, label: &str) -> Vec<i64> {
        let start = line.find(label).unwrap() + label.len();
        let end = start + line[start..].find(']').unwrap();
        line[start..end]
            .split(", ")
            .map(|v| v.parse().unwrap())
            .collect()
    }

    #[test]
    fn test_single_die_has_only_total() {
        let result = engine().roll("!roll d20").unwrap();
        assert_eq!(result.description, "1d20");
        assert_eq!(result.lines.len(), 1);
        let total: i64 = result.lines[0].parse().unwrap();
        assert!((1..=20).contains(&total));
        assert_eq!(result.reason, None);
    }

    #[test]
    fn test_total_matches_breakdown() {
        let result = engine().roll("!roll 3d6+2 fireball").unwrap();
        assert_eq!(result.description, "3d6+2");
        assert_eq!(result.reason.as_deref(), Some("fireball"));
        assert_eq!(result.lines.len(), 2);

        let dice = parse_list(&result.lines[1], "3d6: [");
        assert_eq!(dice.len(), 3);
        assert!(dice.iter().all(|d| (1..=6).contains(d)));

        let total: i64 = result.lines[0].parse().unwrap();
        assert_eq!(total, dice.iter().sum::<i64>() + 2);
    }

    #[test]
    fn test_subtraction() {
        let result = engine().roll("!roll 1d4-10").unwrap();
        let total: i64 = result.lines[0].parse().unwrap();
        assert!((-9..=-6).contains(&total));
    }

    #[test]
    fn test_keep_highest_drops_lowest_values() {
        let result = engine().roll("!roll 4d6k3").unwrap();
        let kept = parse_list(&result.lines[1], "4d6kh3: [");
        let dropped = parse_list(&result.lines[1], "dropped [");
        assert_eq!(kept.len(), 3);
        assert_eq!(dropped.len(), 1);
        assert!(kept.iter().all(|k| *k >= dropped[0]));

        let total: i64 = result.lines[0].parse().unwrap();
        assert_eq!(total, kept.iter().sum::<i64>());
    }

    #[test]
    fn test_select_keeps_roll_order_and_breaks_ties_by_position() {
        let rolled = select(vec![3, 1, 3, 6], Some(Selection::KeepHighest(2)));
        assert_eq!(rolled.kept, vec![3, 6]);
        assert_eq!(rolled.dropped, vec![3, 1]);

        let rolled = select(vec![3, 1, 3, 6], Some(Selection::KeepLowest(1)));
        assert_eq!(rolled.kept, vec![1]);

        let rolled = select(vec![3, 1, 3, 6], Some(Selection::DropHighest(1)));
        assert_eq!(rolled.dropped, vec![6]);

        let rolled = select(vec![3, 1, 3, 6], Some(Selection::DropLowest(2)));
        assert_eq!(rolled.kept, vec![3, 6]);
    }

    #[test]
    fn test_fudge_dice_range() {
        let result = engine().roll("!roll 4dF").unwrap();
        let total: i64 = result.lines[0].parse().unwrap();
        assert!((-4..=4).contains(&total));
        assert!(result.lines[1].starts_with("4dF: ["));
    }

    #[test]
    fn test_exploding_dice_are_bounded() {
        // A d2 explodes half the time; the pool can never exceed count + limit.
        let dice = DiceTerm {
            count: 50,
            sides: Sides::Number(2),
            explode: true,
            selection: None,
        };
        let mut rng = StdRng::seed_from_u64(1);
        let rolled = roll_term(&dice, &mut rng);
        assert!(rolled.kept.len() > 50);
        assert!(rolled.kept.len() <= 50 + MAX_EXPLOSIONS);
    }

    #[test]
    fn test_same_seed_same_result() {
        let a = StandardDiceEngine::with_seed(1000, 42).roll("!roll 10d10").unwrap();
        let b = StandardDiceEngine::with_seed(1000, 42).roll("!roll 10d10").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_limits() {
        let engine = StandardDiceEngine::with_seed(10, 1);
        assert_eq!(
            engine.roll("!roll 6d6+5d6"),
            Err(EvaluationError::TooManyDice {
                requested: 11,
                limit: 10
            })
        );
        assert!(matches!(
            engine.roll("!roll 1d0"),
            Err(EvaluationError::InvalidSides { sides: 0, .. })
        ));
        assert!(matches!(
            engine.roll("!roll 1d2000000"),
            Err(EvaluationError::InvalidSides { .. })
        ));
        assert!(matches!(
            engine.roll("!roll 0d6"),
            Err(EvaluationError::Syntax { .. })
        ));
        assert!(matches!(
            engine.roll("!roll 2d6k3"),
            Err(EvaluationError::InvalidSelection { action: "keep", .. })
        ));
        assert!(matches!(
            engine.roll("!roll 2d1!"),
            Err(EvaluationError::Syntax { .. })
        ));
    }

    #[test]
    fn test_long_pools_are_summarized() {
        let result = engine().roll("!roll 150d6").unwrap();
        assert!(result.lines[1].ends_with("… +50 more]"));
    }

    #[test]
    fn test_evaluate_delegates_to_roll() {
        let engine = engine();
        let result = tokio_test::block_on(engine.evaluate("!roll 2d6+1")).unwrap();
        assert_eq!(result.description, "2d6+1");

        let error = tokio_test::block_on(engine.evaluate("!roll")).unwrap_err();
        assert!(matches!(error, EvaluationError::NoExpression { .. }));
    }

    #[tokio::test]
    async fn test_stalled_roll_does_not_block_the_runtime() {
        let engine = engine();
        let rng = engine.roller.rng.lock().unwrap();

        let result = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            engine.evaluate("!roll 2d6"),
        )
        .await;

        assert!(result.is_err());
        drop(rng);
        assert!(engine.evaluate("!roll 2d6").await.is_ok());
    }
}
