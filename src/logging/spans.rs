//! Structured span for one registration run
//!
//! Carries the run's correlation id and records each composed step and the
//! final outcome.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{span, Level, Span};
use uuid::Uuid;

use crate::numeric::Matrix3;
use crate::transform::TransformFamily;

pub struct RegistrationSpan {
    span: Span,
    start_time: Instant,
    steps: AtomicUsize,
}

impl RegistrationSpan {
    pub fn new(
        family: TransformFamily,
        reference_index: usize,
        slices: usize,
        correlation_id: Option<Uuid>,
    ) -> Self {
        let correlation_id = correlation_id.or_else(super::get_correlation_id);
        let span = span!(
            Level::INFO,
            "registration",
            family = %family,
            reference = reference_index,
            slices = slices,
            correlation_id = correlation_id.map(|id| id.to_string()),
            success = tracing::field::Empty,
            execution_time_ms = tracing::field::Empty
        );
        Self {
            span,
            start_time: Instant::now(),
            steps: AtomicUsize::new(0),
        }
    }

    /// One composed step; logs the translation part of the global transform.
    pub fn record_step(&self, source_index: usize, target_index: usize, global: &Matrix3) {
        self.steps.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            parent: &self.span,
            source = source_index,
            target = target_index,
            dx = global[(0, 2)],
            dy = global[(1, 2)],
            "step composed"
        );
    }

    pub fn record_result(&self, success: bool, description: &str) {
        let duration = self.start_time.elapsed();
        self.span.record("success", success);
        self.span.record("execution_time_ms", duration.as_millis() as u64);
        if success {
            tracing::info!(
                parent: &self.span,
                steps = self.steps(),
                execution_time_ms = duration.as_millis() as u64,
                description,
                "registration completed"
            );
        } else {
            tracing::error!(
                parent: &self.span,
                steps = self.steps(),
                execution_time_ms = duration.as_millis() as u64,
                description,
                "registration aborted"
            );
        }
    }

    pub fn steps(&self) -> usize {
        self.steps.load(Ordering::Relaxed)
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_counts_steps() {
        let span = RegistrationSpan::new(TransformFamily::Affine, 1, 3, Some(Uuid::new_v4()));
        span.record_step(0, 1, &Matrix3::identity());
        span.record_step(2, 1, &Matrix3::translation(1.0, 2.0));
        span.record_result(true, "ok");
        assert_eq!(span.steps(), 2);
    }
}
