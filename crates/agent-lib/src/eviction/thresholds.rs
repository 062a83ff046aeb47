//! Threshold configuration parsing, signal observation, and violation
//! bookkeeping
//!
//! Pure helpers the manager composes each cycle: project a summary into
//! per-signal observations, compute the violated set, and maintain the
//! first-observed and last-observed timestamp maps that drive grace periods
//! and transition dampening.

use super::types::{NodeCondition, Operator, Signal, Threshold};
use crate::quantity::Quantity;
use crate::stats::{FsStats, Summary};
use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Observed values per signal for one cycle. A signal absent from the map
/// was unobservable and is skipped, never treated as zero.
pub type SignalObservations = HashMap<Signal, Quantity>;

/// Parse the operator-facing threshold flags into the threshold set.
///
/// `eviction_hard` and `eviction_soft` hold comma-separated statements like
/// `memory.available<1Gi`; `eviction_soft_grace_period` holds statements
/// like `memory.available=2m`. Every soft threshold must carry a positive
/// grace period, and every grace period must match a soft threshold.
pub fn parse_threshold_config(
    eviction_hard: &str,
    eviction_soft: &str,
    eviction_soft_grace_period: &str,
) -> Result<Vec<Threshold>> {
    let mut thresholds = parse_statements(eviction_hard, None)?;

    let grace_periods = parse_grace_periods(eviction_soft_grace_period)?;
    let soft = parse_statements(eviction_soft, Some(&grace_periods))?;
    for signal in grace_periods.keys() {
        if !soft.iter().any(|t| t.signal == *signal) {
            bail!(
                "grace period configured for {} but no matching soft threshold",
                signal
            );
        }
    }
    thresholds.extend(soft);

    for (i, a) in thresholds.iter().enumerate() {
        for b in &thresholds[i + 1..] {
            if a.signal == b.signal && a.grace_period == b.grace_period {
                bail!("duplicate eviction threshold for {}", a.signal);
            }
        }
    }

    Ok(thresholds)
}

/// Parse comma-separated `SIGNAL<QUANTITY` statements. `grace_periods` is
/// `None` for hard thresholds; for soft thresholds it must supply a period
/// per signal.
fn parse_statements(
    expression: &str,
    grace_periods: Option<&HashMap<Signal, Duration>>,
) -> Result<Vec<Threshold>> {
    let mut thresholds = Vec::new();

    for statement in expression.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (signal_name, value_text) = statement.split_once('<').with_context(|| {
            format!(
                "invalid eviction threshold {:?}: expected SIGNAL<QUANTITY",
                statement
            )
        })?;
        let signal_name = signal_name.trim();
        let signal = Signal::parse(signal_name)
            .with_context(|| format!("unknown eviction signal {:?}", signal_name))?;

        let value: Quantity = value_text
            .trim()
            .parse()
            .with_context(|| format!("invalid eviction threshold {:?}", statement))?;
        if value.millis() <= 0 {
            bail!("eviction threshold {:?} must be positive", statement);
        }

        let grace_period = match grace_periods {
            None => Duration::ZERO,
            Some(periods) => *periods.get(&signal).with_context(|| {
                format!("soft eviction threshold for {} has no grace period", signal)
            })?,
        };

        thresholds.push(Threshold {
            signal,
            operator: Operator::LessThan,
            value,
            grace_period,
        });
    }

    Ok(thresholds)
}

/// Parse comma-separated `SIGNAL=DURATION` grace period statements.
fn parse_grace_periods(expression: &str) -> Result<HashMap<Signal, Duration>> {
    let mut periods = HashMap::new();

    for statement in expression.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (signal_name, duration_text) = statement.split_once('=').with_context(|| {
            format!(
                "invalid grace period {:?}: expected SIGNAL=DURATION",
                statement
            )
        })?;
        let signal_name = signal_name.trim();
        let signal = Signal::parse(signal_name)
            .with_context(|| format!("unknown eviction signal {:?}", signal_name))?;

        let duration = parse_duration(duration_text.trim())
            .with_context(|| format!("invalid grace period {:?}", statement))?;
        if duration.is_zero() {
            bail!("grace period for {} must be positive", signal);
        }

        if periods.insert(signal, duration).is_some() {
            bail!("duplicate grace period for {}", signal);
        }
    }

    Ok(periods)
}

/// Parse durations like `90s`, `2m`, `1h30m`.
pub fn parse_duration(text: &str) -> Result<Duration> {
    if text.is_empty() {
        bail!("empty duration");
    }

    let mut total = Duration::ZERO;
    let mut digits = String::new();
    for c in text.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        if digits.is_empty() {
            bail!("invalid duration {:?}", text);
        }
        let amount: u64 = digits.parse().context("duration amount out of range")?;
        digits.clear();
        let seconds = match c {
            's' => amount,
            'm' => amount * 60,
            'h' => amount * 3600,
            other => bail!("invalid duration unit {:?}", other),
        };
        total += Duration::from_secs(seconds);
    }
    if !digits.is_empty() {
        bail!("duration {:?} is missing a unit", text);
    }

    Ok(total)
}

/// Project a summary snapshot into per-signal observations.
///
/// Without a dedicated image filesystem the image-fs signals are evaluated
/// against the node filesystem.
pub fn signal_observations(summary: &Summary, has_dedicated_image_fs: bool) -> SignalObservations {
    let mut observations = SignalObservations::new();
    let node = &summary.node;

    if let Some(available) = node.memory.as_ref().and_then(|m| m.available_bytes) {
        observations.insert(Signal::MemoryAvailable, Quantity::from_bytes(available));
    }

    if let Some(fs) = &node.fs {
        observe_fs(
            &mut observations,
            fs,
            Signal::NodeFsAvailable,
            Signal::NodeFsInodesFree,
        );
    }

    let image_fs = if has_dedicated_image_fs {
        node.runtime.as_ref().and_then(|r| r.image_fs.as_ref())
    } else {
        node.fs.as_ref()
    };
    if let Some(fs) = image_fs {
        observe_fs(
            &mut observations,
            fs,
            Signal::ImageFsAvailable,
            Signal::ImageFsInodesFree,
        );
    }

    observations
}

fn observe_fs(
    observations: &mut SignalObservations,
    fs: &FsStats,
    available_signal: Signal,
    inodes_signal: Signal,
) {
    if let Some(available) = fs.available_bytes {
        observations.insert(available_signal, Quantity::from_bytes(available));
    }
    if let Some(inodes_free) = fs.inodes_free {
        observations.insert(
            inodes_signal,
            Quantity::from_value(i64::try_from(inodes_free).unwrap_or(i64::MAX)),
        );
    }
}

/// The subset of thresholds violated by the given observations.
pub fn thresholds_met(
    thresholds: &[Threshold],
    observations: &SignalObservations,
) -> Vec<Threshold> {
    thresholds
        .iter()
        .filter(|t| {
            observations
                .get(&t.signal)
                .map(|observed| match t.operator {
                    Operator::LessThan => *observed < t.value,
                })
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// Update the first-observed map for this cycle.
///
/// A violated threshold keeps (or gains) its timestamp; an observed
/// non-violation drops it; an unobservable signal preserves whatever run
/// was in progress.
pub fn thresholds_first_observed_at(
    violated: &[Threshold],
    all: &[Threshold],
    observations: &SignalObservations,
    previous: &HashMap<Threshold, Instant>,
    now: Instant,
) -> HashMap<Threshold, Instant> {
    let mut result = HashMap::new();
    for threshold in all {
        if violated.contains(threshold) {
            let at = previous.get(threshold).copied().unwrap_or(now);
            result.insert(threshold.clone(), at);
        } else if !observations.contains_key(&threshold.signal) {
            if let Some(at) = previous.get(threshold) {
                result.insert(threshold.clone(), *at);
            }
        }
    }
    result
}

/// Violated thresholds whose grace period has fully elapsed.
pub fn thresholds_met_grace_period(
    violated: &[Threshold],
    first_observed: &HashMap<Threshold, Instant>,
    now: Instant,
) -> Vec<Threshold> {
    violated
        .iter()
        .filter(|t| {
            first_observed
                .get(*t)
                .map(|at| now.duration_since(*at) >= t.grace_period)
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// The distinct node conditions implied by a set of violated thresholds.
pub fn node_conditions(thresholds: &[Threshold]) -> Vec<NodeCondition> {
    let mut conditions = Vec::new();
    for threshold in thresholds {
        let condition = threshold.signal.condition();
        if !conditions.contains(&condition) {
            conditions.push(condition);
        }
    }
    conditions
}

/// Refresh the last-observed timestamp for every currently-raw condition.
pub fn node_conditions_last_observed_at(
    conditions: &[NodeCondition],
    previous: &HashMap<NodeCondition, Instant>,
    now: Instant,
) -> HashMap<NodeCondition, Instant> {
    let mut result = previous.clone();
    for condition in conditions {
        result.insert(*condition, now);
    }
    result
}

/// Conditions observed within the transition period. A condition raw-true
/// this cycle was stamped `now` and therefore always reports true.
pub fn node_conditions_observed_since(
    last_observed: &HashMap<NodeCondition, Instant>,
    period: Duration,
    now: Instant,
) -> Vec<NodeCondition> {
    last_observed
        .iter()
        .filter(|(_, at)| now.duration_since(**at) < period)
        .map(|(condition, _)| *condition)
        .collect()
}
