use crate::transform::{AnchorSet, TransformFamily};
use crate::Result;

/// Input to one correspondence lookup between two slices.
#[derive(Debug)]
pub struct CorrespondenceRequest<'a, I> {
    /// Slice being registered.
    pub source_index: usize,
    /// Slice it is registered against.
    pub target_index: usize,
    pub source: &'a I,
    pub target: &'a I,
    pub family: TransformFamily,
    /// Anchor guess in the source slice.
    pub seeded_source: &'a AnchorSet,
    /// Anchor guess in the target slice.
    pub seeded_target: &'a AnchorSet,
}

impl<I> Clone for CorrespondenceRequest<'_, I> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<I> Copy for CorrespondenceRequest<'_, I> {}

/// Refined matching anchors in the source and target slices.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorPair {
    pub source: AnchorSet,
    pub target: AnchorSet,
}

/// Finds matching anchor points between two slices.
///
/// Implementations own all image-similarity logic; chain composition only
/// consumes the refined pairs. A failure aborts the whole chain, so return
/// [`RegistrationError::Correspondence`](crate::error::RegistrationError::Correspondence)
/// rather than a guess.
pub trait Correspondence<I> {
    fn refine(&mut self, request: CorrespondenceRequest<'_, I>) -> Result<AnchorPair>;
}

impl<I, C: Correspondence<I> + ?Sized> Correspondence<I> for &mut C {
    fn refine(&mut self, request: CorrespondenceRequest<'_, I>) -> Result<AnchorPair> {
        (**self).refine(request)
    }
}

impl<I, C: Correspondence<I> + ?Sized> Correspondence<I> for Box<C> {
    fn refine(&mut self, request: CorrespondenceRequest<'_, I>) -> Result<AnchorPair> {
        (**self).refine(request)
    }
}

/// Returns the seeded anchors unchanged.
///
/// Suitable for sequences that are already aligned, and as a baseline in
/// tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeededAnchors;

impl<I> Correspondence<I> for SeededAnchors {
    fn refine(&mut self, request: CorrespondenceRequest<'_, I>) -> Result<AnchorPair> {
        Ok(AnchorPair {
            source: request.seeded_source.clone(),
            target: request.seeded_target.clone(),
        })
    }
}

/// Wraps a closure as a [`Correspondence`].
pub struct CorrespondenceFn<F>(pub F);

impl<I, F> Correspondence<I> for CorrespondenceFn<F>
where
    F: FnMut(CorrespondenceRequest<'_, I>) -> Result<AnchorPair>,
{
    fn refine(&mut self, request: CorrespondenceRequest<'_, I>) -> Result<AnchorPair> {
        (self.0)(request)
    }
}
