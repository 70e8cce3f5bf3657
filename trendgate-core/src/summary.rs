//! Human-readable summary lines rendered by the operator console.

use crate::aggregate::Alignment;
use crate::config::LevelConfig;
use crate::domain::Direction;
use crate::engine::Outcome;
use crate::fractal::FractalPattern;
use crate::level::LevelResult;
use crate::pullback::{PullbackFlag, PullbackStatus};

/// Effectiveness at or above this is a strong signal.
pub const STRONG_VERDICT: f64 = 80.0;
/// Effectiveness at or above this is a valid signal.
pub const VALID_VERDICT: f64 = 60.0;

fn level_line(level: &LevelConfig, result: &LevelResult) -> String {
    let d = &result.detail;
    match (d.error, d.angle_degrees) {
        (Some(issue), None) => format!("{}: {} ({issue})", level.label, result.direction),
        (_, angle) => format!(
            "{}: {} | angle {} ({:.1} deg) | strength {:.1} | impulse {}",
            level.label,
            result.direction,
            d.angle_classification.as_str(),
            angle.unwrap_or(0.0),
            result.strength,
            d.impulse_strength.as_str()
        ),
    }
}

fn alignment_line(alignment: &Alignment, levels: usize) -> String {
    let grade = match alignment.agreeing {
        n if n >= 3 => "high",
        2 => "moderate",
        _ => "low",
    };
    format!(
        "alignment {grade}: {}/{levels} levels {} (bonus {:+.0})",
        alignment.agreeing, alignment.predominant, alignment.bonus
    )
}

fn flag_list(flags: &[PullbackFlag]) -> String {
    if flags.is_empty() {
        return String::new();
    }
    let names: Vec<&str> = flags.iter().map(PullbackFlag::as_str).collect();
    format!(" [{}]", names.join(", "))
}

fn pullback_line(status: &PullbackStatus) -> String {
    let reading = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |v| format!("{v:.1}"));
    match status {
        PullbackStatus::NotEvaluated => "pullback: not evaluated (score below gate)".to_string(),
        PullbackStatus::Confirmed { detail } => format!(
            "pullback confirmed: RSI {}, ADX {}{}",
            reading(detail.rsi),
            reading(detail.adx),
            flag_list(&detail.flags)
        ),
        PullbackStatus::Rejected { rejection, .. } => format!("pullback rejected: {rejection}"),
    }
}

fn verdict_line(effectiveness: f64, direction: Direction) -> String {
    let grade = if effectiveness >= STRONG_VERDICT {
        "strong"
    } else if effectiveness >= VALID_VERDICT {
        "valid"
    } else {
        "weak"
    };
    format!("verdict: {grade} {direction} signal ({effectiveness:.2})")
}

/// Summary lines in a fixed order: one per level (plus a fractal line when a
/// pattern was found), alignment, pullback, verdict. A vetoed assessment has a
/// single line.
pub fn build_summary(
    levels: &[(&LevelConfig, &LevelResult)],
    alignment: &Alignment,
    outcome: &Outcome,
    effectiveness: f64,
    direction: Direction,
) -> Vec<String> {
    let pullback = match outcome {
        Outcome::Vetoed { reason } => return vec![format!("VETO: {reason}")],
        Outcome::Scored { pullback } => pullback,
    };

    let mut lines = Vec::with_capacity(levels.len() * 2 + 3);
    for (level, result) in levels {
        lines.push(level_line(level, result));
        if matches!(
            result.detail.fractal_pattern,
            FractalPattern::ImpulsoRetroceso | FractalPattern::ImpulsoContinuo
        ) {
            lines.push(format!(
                "{}: fractal {}",
                level.label,
                result.detail.fractal_pattern.as_str()
            ));
        }
    }
    lines.push(alignment_line(alignment, levels.len()));
    lines.push(pullback_line(pullback));
    lines.push(verdict_line(effectiveness, direction));
    lines
}
