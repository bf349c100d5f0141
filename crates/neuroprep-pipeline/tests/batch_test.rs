use std::fs;
use std::path::{Path, PathBuf};
use burn::tensor::Tensor;
use burn_ndarray::NdArray;
use neuroprep_core::filter::apply_transforms;
use neuroprep_core::image::{Image, ImageMetadata};
use neuroprep_core::interpolation::Interpolation;
use neuroprep_core::spatial::{Direction3, Point3, Spacing3};
use neuroprep_core::transform::TransformChain;
use neuroprep_io::{read_nifti, write_nifti};
use neuroprep_pipeline::{
    BatchExecutor, BatchReport, BiasCorrectionError, BiasFieldCorrector, FailureKind, HistoryProgress,
    NiftiReader, NiftiWriter, PipelineConfig, ReferenceAtlas, VolumePipeline,
};
use neuroprep_registration::{RegistrationEngine, RegistrationOutput, TransformKind};
use tempfile::TempDir;

type B = NdArray<f32>;

struct IdentityEngine;

impl RegistrationEngine<B> for IdentityEngine {
    fn register(
        &self,
        fixed: &Image<B, 3>,
        moving: &Image<B, 3>,
        _kind: TransformKind,
    ) -> neuroprep_registration::Result<RegistrationOutput<B>> {
        Ok(RegistrationOutput {
            warped_moving: apply_transforms(moving, fixed, TransformChain::identity(), Interpolation::Linear),
            forward_transforms: TransformChain::identity(),
        })
    }
}

struct IdentityCorrector;

impl BiasFieldCorrector<B> for IdentityCorrector {
    fn correct(&self, image: &Image<B, 3>, _shrink: usize) -> Result<Tensor<B, 3>, BiasCorrectionError> {
        Ok(image.data().clone())
    }
}

const N: usize = 6;

fn metadata() -> ImageMetadata<3> {
    ImageMetadata::new(Point3::new(-2.5, -2.5, -2.5), Spacing3::new(1.0, 1.0, 1.0), Direction3::identity())
}

fn subject(seed: usize) -> Image<B, 3> {
    let mut values = Vec::with_capacity(N * N * N);
    for z in 0..N {
        for y in 0..N {
            for x in 0..N {
                values.push(((x * (seed + 1) + 2 * y + 3 * z + seed) % 17) as f32);
            }
        }
    }
    Image::from_values(values, [N, N, N], metadata(), &Default::default()).unwrap()
}

fn atlas() -> ReferenceAtlas<B> {
    let device = Default::default();
    let template = Image::from_values(vec![1.0; N * N * N], [N, N, N], metadata(), &device).unwrap();
    let mut mask = vec![0.0; N * N * N];
    mask[(2 * N + 2) * N + 2] = 1.0;
    let mask = Image::from_values(mask, [N, N, N], metadata(), &device).unwrap();
    ReferenceAtlas::new(template, mask).unwrap()
}

/// Three readable volumes and one corrupt file, in that order.
fn inputs(dir: &Path) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for seed in 0..3 {
        let path = dir.join(format!("sub-{seed:02}.nii"));
        write_nifti(&path, &subject(seed)).unwrap();
        paths.push(path);
    }
    let corrupt = dir.join("sub-99.nii");
    fs::write(&corrupt, b"definitely not a volume").unwrap();
    paths.insert(1, corrupt);
    paths
}

fn run_batch(items: &[PathBuf], output_dir: &Path, workers: usize) -> BatchReport {
    let atlas = atlas();
    let pipeline = VolumePipeline::new(PipelineConfig::default(), &atlas, &IdentityEngine, &IdentityCorrector);
    BatchExecutor::new(pipeline, workers)
        .run(items, &NiftiReader::<B>::default(), &NiftiWriter::<B>::new(), output_dir)
        .unwrap()
}

fn written_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_corrupt_item_is_isolated() {
    let raw = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let items = inputs(raw.path());

    let report = run_batch(&items, out.path(), 2);

    assert_eq!(report.success_count(), 3);
    assert_eq!(report.failure_count(), 1);
    assert_eq!(report.failed[0].item, items[1]);
    assert_eq!(report.failed[0].kind, FailureKind::InputRead);
    assert_eq!(written_files(out.path()), vec!["sub-00.nii", "sub-01.nii", "sub-02.nii"]);
}

#[test]
fn test_report_follows_input_order() {
    let raw = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let items = inputs(raw.path());

    let report = run_batch(&items, out.path(), 3);
    let inputs: Vec<&PathBuf> = report.succeeded.iter().map(|r| &r.input).collect();

    assert_eq!(inputs, vec![&items[0], &items[2], &items[3]]);
    for record in &report.succeeded {
        assert_eq!(record.output, out.path().join(record.input.file_name().unwrap()));
    }
}

#[test]
fn test_shuffled_inputs_give_identical_outputs() {
    let raw = TempDir::new().unwrap();
    let forward_out = TempDir::new().unwrap();
    let reversed_out = TempDir::new().unwrap();
    let items = inputs(raw.path());
    let mut reversed = items.clone();
    reversed.reverse();

    run_batch(&items, forward_out.path(), 2);
    run_batch(&reversed, reversed_out.path(), 3);

    let device = Default::default();
    for name in written_files(forward_out.path()) {
        let a = read_nifti::<B, _>(forward_out.path().join(&name), &device).unwrap();
        let b = read_nifti::<B, _>(reversed_out.path().join(&name), &device).unwrap();
        assert_eq!(a.to_values().unwrap(), b.to_values().unwrap(), "{name} differs");
    }
}

#[test]
fn test_outputs_are_normalized_and_keep_geometry() {
    let raw = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let items = inputs(raw.path());

    let report = run_batch(&items, out.path(), 2);

    for record in &report.succeeded {
        let image = read_nifti::<B, _>(&record.output, &Default::default()).unwrap();
        let values = image.to_values().unwrap();
        assert!(image.metadata().approx_eq(&metadata(), 1e-4));
        assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(values.iter().any(|&v| v == 1.0));
    }
}

#[test]
fn test_existing_outputs_are_overwritten() {
    let raw = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let items = inputs(raw.path());
    fs::write(out.path().join("sub-00.nii"), b"stale").unwrap();

    let report = run_batch(&items, out.path(), 1);

    assert_eq!(report.success_count(), 3);
    assert!(read_nifti::<B, _>(out.path().join("sub-00.nii"), &Default::default()).is_ok());
}

#[test]
fn test_progress_sees_every_item() {
    let raw = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let items = inputs(raw.path());
    let atlas = atlas();
    let history = HistoryProgress::new();
    let pipeline = VolumePipeline::new(PipelineConfig::default(), &atlas, &IdentityEngine, &IdentityCorrector);

    BatchExecutor::new(pipeline, 2)
        .with_progress(&history)
        .run(&items, &NiftiReader::<B>::default(), &NiftiWriter::<B>::new(), out.path())
        .unwrap();

    let events = history.history();
    assert_eq!(events.len(), items.len());
    assert_eq!(events.iter().filter(|e| !e.succeeded).count(), 1);
    assert!(events.iter().any(|e| e.completed == items.len()));
}
