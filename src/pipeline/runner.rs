//! End-to-end runs: reduce, register, log, replay and warp.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use crate::color::{project, reduce, ColorStack, ColorWeights, GrayPlane, Reduction};
use crate::config::{ColorConfig, ColorWeighting, Config, LogMode, RegistrationConfig};
use crate::data::ImageTransformer;
use crate::logging::{get_correlation_id, new_correlation_id};
use crate::registration::{
    ChainComposer, Correspondence, LogReplay, TransformChain, TransformLogWriter,
};
use crate::Result;

/// Registration result for one channel.
#[derive(Debug, Clone)]
pub struct AlignedSequence {
    pub chain: TransformChain,
    pub planes: Vec<GrayPlane>,
}

/// Registration of a color stack through its scalar reduction.
#[derive(Debug, Clone)]
pub struct AlignedColorStack {
    pub weights: ColorWeights,
    pub aligned: AlignedSequence,
}

pub struct RegistrationPipeline {
    registration: RegistrationConfig,
    color: ColorConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl RegistrationPipeline {
    pub fn new(config: &Config) -> Self {
        Self {
            registration: config.registration.clone(),
            color: config.color.clone(),
            cancel: None,
        }
    }

    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn config(&self) -> &RegistrationConfig {
        &self.registration
    }

    fn composer(&self) -> ChainComposer {
        let composer = ChainComposer::new(self.registration.family);
        match &self.cancel {
            Some(flag) => composer.with_cancellation(Arc::clone(flag)),
            None => composer,
        }
    }

    /// Scalar planes under the configured color weighting.
    pub fn reduce(&self, stack: &ColorStack) -> Reduction {
        match self.color.weighting {
            ColorWeighting::PrincipalComponent => reduce(stack),
            ColorWeighting::Bt601 => {
                let weights = ColorWeights::bt601();
                Reduction {
                    planes: project(stack, &weights),
                    weights,
                }
            }
        }
    }

    /// Registers `planes`, writes the transform log and warps every slice.
    ///
    /// The log is created only once the whole chain has succeeded. In
    /// [`LogMode::Replay`] the chain comes from the configured log instead;
    /// `correspondence` is not consulted and the log is left untouched.
    pub fn register<C>(
        &self,
        planes: &[GrayPlane],
        correspondence: &mut C,
    ) -> Result<AlignedSequence>
    where
        C: Correspondence<GrayPlane> + ?Sized,
    {
        if self.registration.log_mode == LogMode::Replay {
            return self.replay(planes);
        }
        let correlation_id = get_correlation_id().unwrap_or_else(new_correlation_id);
        let start = Instant::now();
        let reference = self.registration.reference_for(planes.len());
        info!(
            family = %self.registration.family,
            reference,
            slices = planes.len(),
            correlation_id = %correlation_id,
            "starting registration"
        );

        let chain = self.composer().register(planes, reference, correspondence)?;
        self.finish(planes, chain, start)
    }

    /// [`register`](Self::register) with the two sweeps run concurrently.
    pub fn register_parallel<B, F>(
        &self,
        planes: &[GrayPlane],
        backward: &mut B,
        forward: &mut F,
    ) -> Result<AlignedSequence>
    where
        B: Correspondence<GrayPlane> + Send + ?Sized,
        F: Correspondence<GrayPlane> + Send + ?Sized,
    {
        if self.registration.log_mode == LogMode::Replay {
            return self.replay(planes);
        }
        let start = Instant::now();
        let reference = self.registration.reference_for(planes.len());
        let chain = self
            .composer()
            .register_parallel(planes, reference, backward, forward)?;
        self.finish(planes, chain, start)
    }

    fn finish(
        &self,
        planes: &[GrayPlane],
        chain: TransformChain,
        start: Instant,
    ) -> Result<AlignedSequence> {
        let writer = TransformLogWriter::create(&self.registration.log_path)?;
        writer.append_chain(&chain)?;
        let planes = ImageTransformer::apply_chain(planes, &chain)?;
        info!(
            entries = chain.entries().len(),
            log = %writer.path().display(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "registration finished"
        );
        Ok(AlignedSequence { chain, planes })
    }

    /// Rebuilds the chain for `planes` from the configured log and warps them.
    pub fn replay(&self, planes: &[GrayPlane]) -> Result<AlignedSequence> {
        let mut log = LogReplay::open(&self.registration.log_path)?;
        self.replay_with(&mut log, planes)
    }

    /// Replays from the start of `log`, resetting its cursor first.
    ///
    /// With parallel sweeps, the forward sweep reads from a second cursor
    /// positioned after the backward entries.
    pub fn replay_with(
        &self,
        log: &mut LogReplay,
        planes: &[GrayPlane],
    ) -> Result<AlignedSequence> {
        log.reset();
        let reference = self.registration.reference_for(planes.len());
        let chain = if self.registration.parallel_sweeps {
            let mut forward = log.clone();
            forward.seek(reference);
            self.composer().register_parallel(planes, reference, log, &mut forward)?
        } else {
            self.composer().register(planes, reference, log)?
        };
        let planes = ImageTransformer::apply_chain(planes, &chain)?;
        debug!(entries = chain.entries().len(), "replayed transform log");
        Ok(AlignedSequence { chain, planes })
    }

    /// Reduces a color stack and registers the reduction, writing or
    /// replaying the log according to the configured [`LogMode`].
    pub fn run<C>(&self, stack: &ColorStack, correspondence: &mut C) -> Result<AlignedColorStack>
    where
        C: Correspondence<GrayPlane> + ?Sized,
    {
        let reduction = self.reduce(stack);
        info!(
            weights = ?reduction.weights.weights,
            fallback = ?reduction.weights.fallback,
            "color reduced"
        );
        let aligned = self.register(&reduction.planes, correspondence)?;
        Ok(AlignedColorStack {
            weights: reduction.weights,
            aligned,
        })
    }

    /// Registers `registration_channel`, then applies the logged transforms
    /// to every channel by replaying the log once per channel.
    pub fn align_channels<C>(
        &self,
        registration_channel: &[GrayPlane],
        channels: &[Vec<GrayPlane>],
        correspondence: &mut C,
    ) -> Result<(TransformChain, Vec<Vec<GrayPlane>>)>
    where
        C: Correspondence<GrayPlane> + ?Sized,
    {
        let registered = self.register(registration_channel, correspondence)?;
        let mut log = LogReplay::open(&self.registration.log_path)?;
        let mut aligned = Vec::with_capacity(channels.len());
        for (channel, planes) in channels.iter().enumerate() {
            debug!(channel, "replaying transform log");
            aligned.push(self.replay_with(&mut log, planes)?.planes);
        }
        Ok((registered.chain, aligned))
    }
}
