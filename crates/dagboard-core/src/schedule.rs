//! Next-run evaluation boundary.
//!
//! The table never computes schedules itself; it asks a `ScheduleEvaluator`
//! once per render pass and keeps the answers in a `NextRunIndex`.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;

use crate::model::DagLeaf;

/// Sort position for leaves without a next run.
pub const NO_NEXT_RUN: i64 = i64::MAX;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("no schedule expressions")]
    Empty,
    #[error("invalid cron expression {expression:?}: {message}")]
    InvalidExpression { expression: String, message: String },
    #[error("no upcoming run for {expression:?}")]
    NoUpcoming { expression: String },
}

pub trait ScheduleEvaluator {
    /// Earliest upcoming run (epoch seconds) across `expressions`, after `reference`.
    fn next_run_epoch(
        &self,
        expressions: &[String],
        reference: DateTime<Utc>,
    ) -> Result<i64, ScheduleError>;
}

/// Cron-backed evaluator accepting 5-field or 6-field expressions.
#[derive(Debug, Default, Clone, Copy)]
pub struct CronEvaluator;

impl ScheduleEvaluator for CronEvaluator {
    fn next_run_epoch(
        &self,
        expressions: &[String],
        reference: DateTime<Utc>,
    ) -> Result<i64, ScheduleError> {
        if expressions.is_empty() {
            return Err(ScheduleError::Empty);
        }
        let mut earliest: Option<i64> = None;
        for expression in expressions {
            let schedule = Schedule::from_str(&normalize_cron_expr(expression)).map_err(|err| {
                ScheduleError::InvalidExpression {
                    expression: expression.clone(),
                    message: err.to_string(),
                }
            })?;
            let next = schedule
                .after(&reference)
                .next()
                .ok_or_else(|| ScheduleError::NoUpcoming {
                    expression: expression.clone(),
                })?;
            let epoch = next.timestamp();
            earliest = Some(earliest.map_or(epoch, |current| current.min(epoch)));
        }
        earliest.ok_or(ScheduleError::Empty)
    }
}

/// The `cron` crate wants a leading seconds field.
fn normalize_cron_expr(expression: &str) -> String {
    let trimmed = expression.trim();
    if trimmed.split_whitespace().count() == 5 {
        format!("0 {trimmed}")
    } else {
        trimmed.to_owned()
    }
}

/// Next-run epochs for one render pass, keyed by leaf key.
///
/// Suspended and unscheduled leaves are absent, as are leaves whose schedule
/// failed to evaluate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NextRunIndex {
    epochs: HashMap<String, i64>,
}

impl NextRunIndex {
    #[must_use]
    pub fn compute(
        leaves: &[DagLeaf],
        evaluator: &dyn ScheduleEvaluator,
        now: DateTime<Utc>,
    ) -> Self {
        let mut epochs = HashMap::new();
        for leaf in leaves.iter().filter(|leaf| leaf.is_scheduled()) {
            match evaluator.next_run_epoch(&leaf.schedule_expressions, now) {
                Ok(epoch) if epoch != NO_NEXT_RUN && epoch >= 0 => {
                    epochs.insert(leaf.key().to_owned(), epoch);
                }
                Ok(epoch) => {
                    tracing::debug!(dag = %leaf.name, epoch, "discarding out-of-range next run");
                }
                Err(err) => {
                    tracing::warn!(dag = %leaf.name, error = %err, "schedule evaluation failed");
                }
            }
        }
        Self { epochs }
    }

    #[must_use]
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, i64)>,
    {
        Self {
            epochs: pairs.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn get(&self, leaf: &DagLeaf) -> Option<i64> {
        self.epochs.get(leaf.key()).copied()
    }

    /// Epoch used for ordering; missing entries sort last ascending.
    #[must_use]
    pub fn sort_epoch(&self, leaf: &DagLeaf) -> i64 {
        self.get(leaf).unwrap_or(NO_NEXT_RUN)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::{
        normalize_cron_expr, CronEvaluator, NextRunIndex, ScheduleError, ScheduleEvaluator,
        NO_NEXT_RUN,
    };
    use crate::model::DagLeaf;
    use chrono::{DateTime, TimeZone, Utc};

    struct FailingEvaluator;

    impl ScheduleEvaluator for FailingEvaluator {
        fn next_run_epoch(
            &self,
            expressions: &[String],
            _reference: DateTime<Utc>,
        ) -> Result<i64, ScheduleError> {
            Err(ScheduleError::InvalidExpression {
                expression: expressions.join(","),
                message: "boom".to_owned(),
            })
        }
    }

    fn scheduled(name: &str, expr: &str) -> DagLeaf {
        DagLeaf {
            schedule_expressions: vec![expr.to_owned()],
            ..DagLeaf::new(name)
        }
    }

    #[test]
    fn normalizes_five_field_expressions() {
        assert_eq!(normalize_cron_expr("* * * * *"), "0 * * * * *");
        assert_eq!(normalize_cron_expr("0 0 * * * *"), "0 0 * * * *");
    }

    #[test]
    fn cron_evaluator_picks_earliest_expression() {
        let now = Utc.with_ymd_and_hms(2026, 2, 10, 12, 0, 30).unwrap();
        let expressions = vec!["0 * * * *".to_owned(), "*/5 * * * *".to_owned()];
        let epoch = CronEvaluator.next_run_epoch(&expressions, now).unwrap();
        let expected = Utc.with_ymd_and_hms(2026, 2, 10, 12, 5, 0).unwrap();
        assert_eq!(epoch, expected.timestamp());
    }

    #[test]
    fn cron_evaluator_rejects_garbage() {
        let now = Utc.with_ymd_and_hms(2026, 2, 10, 12, 0, 0).unwrap();
        let err = CronEvaluator
            .next_run_epoch(&["not a cron".to_owned()], now)
            .unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidExpression { .. }));
        assert_eq!(
            CronEvaluator.next_run_epoch(&[], now),
            Err(ScheduleError::Empty)
        );
    }

    #[test]
    fn index_skips_suspended_and_failed_leaves() {
        let now = Utc.with_ymd_and_hms(2026, 2, 10, 12, 0, 0).unwrap();
        let mut suspended = scheduled("paused", "* * * * *");
        suspended.suspended = true;
        let leaves = vec![
            scheduled("every-minute", "* * * * *"),
            suspended,
            DagLeaf::new("manual"),
        ];
        let index = NextRunIndex::compute(&leaves, &CronEvaluator, now);
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(&leaves[0]), Some(now.timestamp() + 60));
        assert_eq!(index.sort_epoch(&leaves[1]), NO_NEXT_RUN);

        let failed = NextRunIndex::compute(&leaves, &FailingEvaluator, now);
        assert!(failed.is_empty());
    }
}
