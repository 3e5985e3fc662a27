//! Bidirectional chain composition around a reference slice.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::GenericImageView;
use serde::{Deserialize, Serialize};

use super::correspondence::{Correspondence, CorrespondenceRequest};
use super::log::TransformLogEntry;
use crate::error::RegistrationError;
use crate::logging::RegistrationSpan;
use crate::numeric::Matrix3;
use crate::transform::{AnchorSet, TransformFamily};
use crate::Result;

/// Transforms of one slice: the step that reached it and the accumulated
/// map from reference coordinates into the slice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChainStep {
    pub local: Matrix3,
    pub global: Matrix3,
}

impl ChainStep {
    pub const IDENTITY: ChainStep = ChainStep {
        local: Matrix3::identity(),
        global: Matrix3::identity(),
    };
}

/// Completed registration of a slice sequence.
///
/// The step at the reference index is the identity; every other step's
/// global transform is `local ∘ global` of its sweep predecessor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformChain {
    family: TransformFamily,
    reference_index: usize,
    steps: Vec<ChainStep>,
    entries: Vec<TransformLogEntry>,
}

impl TransformChain {
    pub fn family(&self) -> TransformFamily {
        self.family
    }

    pub fn reference_index(&self) -> usize {
        self.reference_index
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Per-slice steps, indexed like the input sequence.
    pub fn steps(&self) -> &[ChainStep] {
        &self.steps
    }

    pub fn global(&self, index: usize) -> Option<&Matrix3> {
        self.steps.get(index).map(|step| &step.global)
    }

    pub fn local(&self, index: usize) -> Option<&Matrix3> {
        self.steps.get(index).map(|step| &step.local)
    }

    /// Log entries in traversal order: the backward sweep, then the forward one.
    pub fn entries(&self) -> &[TransformLogEntry] {
        &self.entries
    }
}

struct SweepStep {
    index: usize,
    step: ChainStep,
    entry: TransformLogEntry,
}

/// Drives registration of a slice sequence against a reference index.
#[derive(Debug, Clone)]
pub struct ChainComposer {
    family: TransformFamily,
    cancel: Option<Arc<AtomicBool>>,
}

impl ChainComposer {
    pub fn new(family: TransformFamily) -> Self {
        Self { family, cancel: None }
    }

    /// Checked before every step; once set, the run stops with
    /// [`RegistrationError::Cancelled`].
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn family(&self) -> TransformFamily {
        self.family
    }

    /// Registers every slice, sweeping backward then forward from `reference`.
    ///
    /// Each slice is matched against the slice visited just before it (the
    /// reference for the first step of a sweep). Any failure aborts the run;
    /// no partial chain is returned.
    pub fn register<I, C>(
        &self,
        images: &[I],
        reference: usize,
        correspondence: &mut C,
    ) -> Result<TransformChain>
    where
        I: GenericImageView,
        C: Correspondence<I> + ?Sized,
    {
        let canonical = self.validate(images, reference)?;
        let span = RegistrationSpan::new(self.family, reference, images.len(), None);
        let _enter = span.span().enter();
        let stop = AtomicBool::new(false);

        let backward = (0..reference).rev();
        let run = self
            .sweep(images, reference, backward, &canonical, correspondence, &span, &stop)
            .and_then(|backward| {
                let forward = self.sweep(
                    images,
                    reference,
                    reference + 1..images.len(),
                    &canonical,
                    correspondence,
                    &span,
                    &stop,
                )?;
                Ok((backward, forward))
            });
        self.finish(images.len(), reference, run, &span)
    }

    /// Like [`register`](Self::register), but runs the two sweeps concurrently
    /// with one collaborator each.
    ///
    /// The first sweep to fail stops its sibling before the sibling's next
    /// step, and its error is the one returned.
    pub fn register_parallel<I, B, F>(
        &self,
        images: &[I],
        reference: usize,
        backward: &mut B,
        forward: &mut F,
    ) -> Result<TransformChain>
    where
        I: GenericImageView + Sync,
        B: Correspondence<I> + Send + ?Sized,
        F: Correspondence<I> + Send + ?Sized,
    {
        let canonical = self.validate(images, reference)?;
        let span = RegistrationSpan::new(self.family, reference, images.len(), None);
        let stop = AtomicBool::new(false);
        let halt_on_error = |result: Result<Vec<SweepStep>>| {
            if result.is_err() {
                stop.store(true, Ordering::Relaxed);
            }
            result
        };

        let (back, fwd) = rayon::join(
            || {
                let indices = (0..reference).rev();
                halt_on_error(self.sweep(
                    images, reference, indices, &canonical, backward, &span, &stop,
                ))
            },
            || {
                let indices = reference + 1..images.len();
                halt_on_error(self.sweep(
                    images, reference, indices, &canonical, forward, &span, &stop,
                ))
            },
        );
        let run = match (back, fwd) {
            (Ok(b), Ok(f)) => Ok((b, f)),
            (Err(err), Ok(_)) | (Ok(_), Err(err)) => Err(err),
            // a sweep halted by its sibling reports Cancelled; keep the cause
            (Err(b), Err(f)) => match b {
                RegistrationError::Cancelled(_) => Err(f),
                b => Err(b),
            },
        };
        self.finish(images.len(), reference, run, &span)
    }

    fn validate<I: GenericImageView>(&self, images: &[I], reference: usize) -> Result<AnchorSet> {
        if images.is_empty() {
            return Err(RegistrationError::EmptySequence);
        }
        let Some(reference_image) = images.get(reference) else {
            return Err(RegistrationError::InvalidReference {
                reference,
                len: images.len(),
            });
        };
        let expected = reference_image.dimensions();
        for (index, image) in images.iter().enumerate() {
            if image.dimensions() != expected {
                return Err(RegistrationError::DimensionMismatch {
                    index,
                    expected,
                    actual: image.dimensions(),
                });
            }
        }
        Ok(self.family.canonical_anchors(expected.0, expected.1))
    }

    #[allow(clippy::too_many_arguments)]
    fn sweep<I, C>(
        &self,
        images: &[I],
        reference: usize,
        indices: impl Iterator<Item = usize>,
        canonical: &AnchorSet,
        correspondence: &mut C,
        span: &RegistrationSpan,
        stop: &AtomicBool,
    ) -> Result<Vec<SweepStep>>
    where
        I: GenericImageView,
        C: Correspondence<I> + ?Sized,
    {
        let mut global = Matrix3::identity();
        let mut partner = reference;
        let mut steps = Vec::new();

        for index in indices {
            if self.is_cancelled() {
                tracing::warn!(index, "registration cancelled");
                return Err(RegistrationError::Cancelled(index));
            }
            if stop.load(Ordering::Relaxed) {
                tracing::debug!(index, "other sweep failed, stopping");
                return Err(RegistrationError::Cancelled(index));
            }

            let seeded = canonical.warped(&global);
            let pair = correspondence.refine(CorrespondenceRequest {
                source_index: index,
                target_index: partner,
                source: &images[index],
                target: &images[partner],
                family: self.family,
                seeded_source: &seeded,
                seeded_target: &seeded,
            })?;

            let local = self.family.estimate(&pair.target, &pair.source)?;
            global = local.compose(&global);
            span.record_step(index, partner, &global);

            steps.push(SweepStep {
                index,
                step: ChainStep { local, global },
                entry: TransformLogEntry {
                    family: self.family,
                    source_index: index,
                    target_index: reference,
                    source: pair.source,
                    target: pair.target,
                },
            });
            partner = index;
        }
        Ok(steps)
    }

    fn finish(
        &self,
        len: usize,
        reference: usize,
        run: Result<(Vec<SweepStep>, Vec<SweepStep>)>,
        span: &RegistrationSpan,
    ) -> Result<TransformChain> {
        let (backward, forward) = match run {
            Ok(sweeps) => sweeps,
            Err(err) => {
                span.record_result(false, &err.to_string());
                return Err(err);
            }
        };

        let mut steps = vec![ChainStep::IDENTITY; len];
        let mut entries = Vec::with_capacity(len.saturating_sub(1));
        for sweep_step in backward.into_iter().chain(forward) {
            steps[sweep_step.index] = sweep_step.step;
            entries.push(sweep_step.entry);
        }
        span.record_result(true, "all slices registered");

        Ok(TransformChain {
            family: self.family,
            reference_index: reference,
            steps,
            entries,
        })
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}
