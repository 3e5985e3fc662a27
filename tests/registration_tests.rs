use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::{Luma, Rgb, RgbImage};
use stack_registration::config::{Config, LogMode};
use stack_registration::*;
use tempfile::TempDir;

type Refined = stack_registration::Result<AnchorPair>;

fn planes(n: usize, width: u32, height: u32) -> Vec<GrayPlane> {
    (0..n)
        .map(|s| {
            GrayPlane::from_fn(width, height, |x, y| {
                Luma([(x * 3 + y * 5 + s as u32) as f32])
            })
        })
        .collect()
}

/// Source anchors are the target anchors moved by a fixed offset.
fn shifting(dx: f64, dy: f64) -> impl FnMut(CorrespondenceRequest<'_, GrayPlane>) -> Refined {
    move |request| {
        Ok(AnchorPair {
            source: request.seeded_target.warped(&Matrix3::translation(dx, dy)),
            target: request.seeded_target.clone(),
        })
    }
}

/// Deterministic per-slice perturbation of the seeded anchors.
fn wobbling(request: CorrespondenceRequest<'_, GrayPlane>) -> Refined {
    let s = request.source_index as f64;
    let source = AnchorSet::new(
        request
            .seeded_target
            .points()
            .iter()
            .enumerate()
            .map(|(k, p)| {
                let k = k as f64;
                [p[0] + 0.37 * s - 0.11 * k, p[1] - 0.23 * s + 0.07 * k]
            })
            .collect(),
    );
    Ok(AnchorPair {
        source,
        target: request.seeded_target.clone(),
    })
}

#[test]
fn test_identical_slices_give_identity_everywhere() {
    let slices = planes(5, 32, 24);
    for family in TransformFamily::ALL {
        let chain = ChainComposer::new(family)
            .register(&slices, 2, &mut SeededAnchors)
            .unwrap();
        assert_eq!(chain.len(), 5);
        for step in chain.steps() {
            assert!(step.global.max_abs_diff(&Matrix3::identity()) < 1e-9, "{family}: {step:?}");
        }
    }
}

#[test]
fn test_translations_accumulate_outward_in_both_sweeps() {
    let slices = planes(6, 40, 40);
    let mut correspondence = CorrespondenceFn(shifting(1.0, 2.0));
    let chain = ChainComposer::new(TransformFamily::Translation)
        .register(&slices, 2, &mut correspondence)
        .unwrap();

    for (index, step) in chain.steps().iter().enumerate() {
        let distance = (index as f64 - 2.0).abs();
        assert_eq!(step.global, Matrix3::translation(distance, 2.0 * distance), "slice {index}");
    }
    assert_eq!(chain.global(2), Some(&Matrix3::identity()));

    let order: Vec<usize> = chain.entries().iter().map(|e| e.source_index).collect();
    assert_eq!(order, vec![1, 0, 3, 4, 5]);
    assert!(chain.entries().iter().all(|e| e.target_index == 2));
}

#[test]
fn test_correspondence_failure_aborts_whole_chain() {
    let slices = planes(4, 16, 16);
    let mut calls = 0;
    let mut failing = CorrespondenceFn(|request: CorrespondenceRequest<'_, GrayPlane>| {
        calls += 1;
        if request.source_index == 3 {
            let (source, target) = (request.source_index, request.target_index);
            Err(RegistrationError::correspondence(source, target, "no overlap"))
        } else {
            SeededAnchors.refine(request)
        }
    });
    let err = ChainComposer::new(TransformFamily::RigidBody)
        .register(&slices, 1, &mut failing)
        .unwrap_err();
    assert!(matches!(
        err,
        RegistrationError::Correspondence {
            source_index: 3,
            target_index: 2,
            ..
        }
    ));
    assert_eq!(calls, 3);
}

#[test]
fn test_failed_pipeline_run_writes_no_log() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.registration.log_path = dir.path().join("transforms.txt");
    let pipeline = RegistrationPipeline::new(&config);

    let mut failing = CorrespondenceFn(|request: CorrespondenceRequest<'_, GrayPlane>| -> Refined {
        let (source, target) = (request.source_index, request.target_index);
        Err(RegistrationError::correspondence(source, target, "blank slice"))
    });
    assert!(pipeline.register(&planes(3, 16, 16), &mut failing).is_err());
    assert!(!config.registration.log_path.exists());
}

#[test]
fn test_cancellation_stops_before_next_step() {
    let slices = planes(5, 16, 16);
    let flag = Arc::new(AtomicBool::new(false));
    let composer =
        ChainComposer::new(TransformFamily::Translation).with_cancellation(Arc::clone(&flag));

    let cancel = Arc::clone(&flag);
    let mut cancelling = CorrespondenceFn(move |request: CorrespondenceRequest<'_, GrayPlane>| {
        if request.source_index == 0 {
            cancel.store(true, Ordering::Relaxed);
        }
        SeededAnchors.refine(request)
    });
    let err = composer.register(&slices, 2, &mut cancelling).unwrap_err();
    assert!(matches!(err, RegistrationError::Cancelled(3)), "{err}");

    flag.store(true, Ordering::Relaxed);
    assert!(matches!(
        composer.register(&slices, 2, &mut SeededAnchors),
        Err(RegistrationError::Cancelled(1))
    ));
}

#[test]
fn test_log_round_trip_preserves_points() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log.txt");
    let slices = planes(5, 50, 30);

    for family in TransformFamily::ALL {
        let chain = ChainComposer::new(family)
            .register(&slices, 1, &mut CorrespondenceFn(wobbling))
            .unwrap();
        let writer = TransformLogWriter::create(&path).unwrap();
        writer.append_chain(&chain).unwrap();

        let replay = LogReplay::open(&path).unwrap();
        assert_eq!(replay.len(), chain.entries().len());
        assert_eq!(replay.entries().unwrap(), chain.entries().to_vec(), "{family}");
    }
}

#[test]
fn test_replay_reproduces_chain_per_channel() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log.txt");
    let slices = planes(6, 64, 48);

    let composer = ChainComposer::new(TransformFamily::Affine);
    let chain = composer.register(&slices, 3, &mut CorrespondenceFn(wobbling)).unwrap();
    let writer = TransformLogWriter::create(&path).unwrap();
    writer.append_chain(&chain).unwrap();

    let mut replay = LogReplay::open(&path).unwrap();
    for _channel in 0..2 {
        replay.reset();
        let replayed = composer.register(&slices, 3, &mut replay).unwrap();
        assert_eq!(replayed.steps(), chain.steps());
        assert_eq!(replay.cursor(), chain.entries().len());
    }
}

#[test]
fn test_replay_with_wrong_family_is_malformed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("log.txt");
    let slices = planes(3, 20, 20);

    let chain = ChainComposer::new(TransformFamily::Affine)
        .register(&slices, 0, &mut SeededAnchors)
        .unwrap();
    TransformLogWriter::create(&path).unwrap().append_chain(&chain).unwrap();

    let mut replay = LogReplay::open(&path).unwrap();
    let err = ChainComposer::new(TransformFamily::Translation)
        .register(&slices, 0, &mut replay)
        .unwrap_err();
    assert!(matches!(err, RegistrationError::MalformedLog { .. }), "{err}");

    // a longer sequence runs past the end of the log
    let mut replay = LogReplay::open(&path).unwrap();
    let err = ChainComposer::new(TransformFamily::Affine)
        .register(&planes(4, 20, 20), 0, &mut replay)
        .unwrap_err();
    assert!(matches!(err, RegistrationError::MalformedLog { .. }), "{err}");

    assert!(matches!(
        LogReplay::open(dir.path().join("missing.txt")),
        Err(RegistrationError::MalformedLog { .. })
    ));
}

#[test]
fn test_parallel_sweeps_match_sequential() {
    let slices = planes(7, 40, 30);
    let composer = ChainComposer::new(TransformFamily::ScaledRotation);
    let sequential = composer
        .register(&slices, 4, &mut CorrespondenceFn(wobbling))
        .unwrap();
    let mut backward = CorrespondenceFn(wobbling);
    let mut forward = CorrespondenceFn(wobbling);
    let parallel = composer
        .register_parallel(&slices, 4, &mut backward, &mut forward)
        .unwrap();
    assert_eq!(parallel, sequential);
}

#[test]
fn test_pipeline_aligns_every_channel_from_one_log() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.registration.family = TransformFamily::Translation;
    config.registration.log_path = dir.path().join("transforms.txt");
    config.registration.reference_index = Some(1);
    let pipeline = RegistrationPipeline::new(&config);

    let registration_channel = planes(3, 12, 10);
    let channels = vec![planes(3, 12, 10), planes(3, 12, 10)];
    let mut correspondence = CorrespondenceFn(shifting(1.0, 0.0));
    let (chain, aligned) = pipeline
        .align_channels(&registration_channel, &channels, &mut correspondence)
        .unwrap();

    assert_eq!(chain.global(0), Some(&Matrix3::translation(1.0, 0.0)));
    assert_eq!(aligned.len(), 2);
    for (channel, warped) in channels.iter().zip(&aligned) {
        // reference slice is untouched
        assert_eq!(warped[1], channel[1]);
        // slice 0 is shifted left by one pixel
        assert_eq!(warped[0].get_pixel(0, 0)[0], channel[0].get_pixel(1, 0)[0]);
        assert_eq!(warped[0].get_pixel(11, 0)[0], 0.0);
    }

    let mut replay_config = config.clone();
    replay_config.registration.log_mode = LogMode::Replay;
    replay_config.registration.parallel_sweeps = true;
    let replayed = RegistrationPipeline::new(&replay_config)
        .replay(&channels[0])
        .unwrap();
    assert_eq!(replayed.chain, chain);
}

#[test]
fn test_replay_mode_run_reads_existing_log_without_rewriting_it() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("transforms.txt");
    let chain = ChainComposer::new(TransformFamily::RigidBody)
        .register(&planes(3, 16, 16), 1, &mut CorrespondenceFn(wobbling))
        .unwrap();
    TransformLogWriter::create(&path).unwrap().append_chain(&chain).unwrap();
    // a hand-edited header must survive the run
    let original = std::fs::read_to_string(&path).unwrap();
    let edited = original.replacen(original.lines().next().unwrap(), "KEEP ME", 1);
    std::fs::write(&path, &edited).unwrap();

    let mut config = Config::default();
    config.registration.log_path = path.clone();
    config.registration.log_mode = LogMode::Replay;
    let pipeline = RegistrationPipeline::new(&config);

    let images: Vec<RgbImage> = (0..3u8)
        .map(|s| RgbImage::from_fn(16, 16, |x, y| Rgb([x as u8 * 9, y as u8 * 7, s * 40])))
        .collect();
    let stack = ColorStack::from_rgb_images(&images).unwrap();
    let mut calls = 0;
    let mut counting = CorrespondenceFn(|request: CorrespondenceRequest<'_, GrayPlane>| -> Refined {
        calls += 1;
        SeededAnchors.refine(request)
    });
    let aligned = pipeline.run(&stack, &mut counting).unwrap();

    assert_eq!(calls, 0);
    assert_eq!(aligned.aligned.chain, chain);
    assert_eq!(aligned.aligned.planes.len(), 3);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), edited);
    assert!(edited.starts_with("KEEP ME\n"));
}
