use std::sync::Mutex;
use burn_ndarray::NdArray;
use neuroprep_core::image::{Image, ImageMetadata};
use neuroprep_core::transform::TransformChain;
use neuroprep_registration::{
    MomentsDemonsEngine, ProgressiveRegistration, RegistrationConfig, RegistrationEngine,
    RegistrationError, RegistrationOutput, Result, TransformKind,
};

type B = NdArray<f32>;

fn create_test_image(data: Vec<f32>, shape: [usize; 3]) -> Image<B, 3> {
    Image::from_values(data, shape, ImageMetadata::default(), &Default::default()).unwrap()
}

fn blob(n: usize, center: [f64; 3]) -> Image<B, 3> {
    let mut data = Vec::with_capacity(n * n * n);
    for z in 0..n {
        for y in 0..n {
            for x in 0..n {
                let d = ((x as f64 - center[0]) / 2.5).powi(2)
                    + ((y as f64 - center[1]) / 1.8).powi(2)
                    + ((z as f64 - center[2]) / 2.1).powi(2);
                data.push((-d).exp() as f32);
            }
        }
    }
    create_test_image(data, [n, n, n])
}

/// Records each call and tags the warped image with the stage index.
struct RecordingEngine {
    calls: Mutex<Vec<(TransformKind, f32)>>,
    fail_on: Option<TransformKind>,
}

impl RecordingEngine {
    fn new(fail_on: Option<TransformKind>) -> Self {
        Self { calls: Mutex::new(Vec::new()), fail_on }
    }
}

impl RegistrationEngine<B> for RecordingEngine {
    fn register(&self, _fixed: &Image<B, 3>, moving: &Image<B, 3>, kind: TransformKind) -> Result<RegistrationOutput<B>> {
        let first = moving.to_values()?[0];
        self.calls.lock().unwrap().push((kind, first));
        if self.fail_on == Some(kind) {
            return Err(RegistrationError::engine("synthetic failure"));
        }
        Ok(RegistrationOutput {
            warped_moving: moving.with_data(moving.data().clone().add_scalar(1.0)),
            forward_transforms: TransformChain::identity(),
        })
    }
}

#[test]
fn stages_run_in_order_on_previous_output() {
    let engine = RecordingEngine::new(None);
    let fixed = create_test_image(vec![0.0; 8], [2, 2, 2]);
    let moving = create_test_image(vec![0.0; 8], [2, 2, 2]);

    let aligned = ProgressiveRegistration::new(&engine).run(&fixed, &moving).unwrap();
    let calls = engine.calls.lock().unwrap().clone();

    assert_eq!(
        calls,
        vec![
            (TransformKind::Translation, 0.0),
            (TransformKind::Rigid, 1.0),
            (TransformKind::Affine, 2.0),
            (TransformKind::SyN, 3.0),
        ]
    );
    assert_eq!(aligned.image.to_values().unwrap()[0], 4.0);
}

#[test]
fn failing_stage_is_tagged_and_stops_the_run() {
    let engine = RecordingEngine::new(Some(TransformKind::Affine));
    let image = create_test_image(vec![0.0; 8], [2, 2, 2]);

    let err = ProgressiveRegistration::new(&engine).run(&image, &image).unwrap_err();

    assert_eq!(err.failed_stage(), Some(TransformKind::Affine));
    assert_eq!(engine.calls.lock().unwrap().len(), 3);
}

#[test]
fn builtin_engine_aligns_shifted_blob() {
    let n = 14;
    let fixed = blob(n, [6.5, 6.5, 6.5]);
    let moving = blob(n, [8.0, 5.5, 6.5]);
    let engine = MomentsDemonsEngine::new(RegistrationConfig::default().with_demons_iterations(10)).unwrap();

    let sse = |image: &Image<B, 3>| -> f32 {
        let a = fixed.to_values().unwrap();
        let b = image.to_values().unwrap();
        a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
    };

    let aligned = ProgressiveRegistration::new(&engine).run(&fixed, &moving).unwrap();

    assert_eq!(aligned.image.shape(), fixed.shape());
    assert!(aligned.image.same_grid(&fixed));
    assert!(sse(&aligned.image) < sse(&moving));
    assert_eq!(aligned.final_transforms.len(), 2);
}
