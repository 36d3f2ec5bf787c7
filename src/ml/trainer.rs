// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Fine-tunes the LoRA adapters on top of a frozen GPT-2 using
// Burn's DataLoader and AdamW.
//
//   - Only AdapterStack parameters require gradients; the base
//     model is frozen with no_grad(), so AdamW never touches it
//   - Gradient clipping by norm is configured on the optimiser
//   - Learning rate decays linearly from `learning_rate` at
//     step 0 to zero after the last step
//   - The DataLoader reshuffles every epoch from the seeded RNG
//
// Per `logging_steps` the mean loss of the window goes to the
// log and to training_log.csv; per `save_steps` the adapters
// are written to checkpoint-<step>/.
//
// Reference: Burn Book §5, Loshchilov & Hutter (2019) AdamW

use anyhow::Result;
use burn::{
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    grad_clipping::GradientClippingConfig,
    optim::{AdamWConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::path::Path;

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::LmBatcher, dataset::LmDataset};
use crate::domain::adapter::AdapterConfig;
use crate::infra::{
    checkpoint::{AdapterCheckpoint, StepCheckpoints},
    metrics::{MetricsLogger, StepMetrics},
};
use crate::ml::{
    lora::{LoraConfig, LoraGpt, LoraTargets},
    model::GptConfig,
    weights::load_gpt2,
};

type MyBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

#[derive(Debug, Clone)]
pub struct TrainSummary {
    pub steps:            usize,
    /// Mean training loss of every epoch, in order
    pub epoch_losses:     Vec<f64>,
    pub trainable_params: usize,
    pub total_params:     usize,
}

impl TrainSummary {
    pub fn final_loss(&self) -> Option<f64> {
        self.epoch_losses.last().copied()
    }
}

/// Everything the loop needs besides the hyperparameters
pub struct TrainJob<'a> {
    pub gpt:     GptConfig,
    pub weights: &'a Path,
    pub adapter: AdapterConfig,
    pub dataset: LmDataset,
    pub pad_id:  u32,
}

pub fn run_training(cfg: &TrainConfig, job: TrainJob<'_>) -> Result<TrainSummary> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    MyBackend::seed(cfg.seed);

    let base = load_gpt2::<MyBackend>(&job.gpt, job.weights, &device)?;
    let targets = LoraTargets::from_names(&job.adapter.target_modules)?;
    tracing::info!("LoRA on {} projections per block", targets.count());
    let adapters = LoraConfig::from_adapter_config(&job.adapter).init_stack(&job.gpt, &targets, &device);
    let model = LoraGpt::new(base, adapters);

    train_loop(cfg, model, job.dataset, job.pad_id, &job.adapter, device)
}

/// lr at optimiser step `step` (0-based) of `total`
pub fn linear_decay(base_lr: f64, step: usize, total: usize) -> f64 {
    if total == 0 {
        return base_lr;
    }
    base_lr * (total.saturating_sub(step)) as f64 / total as f64
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:         &TrainConfig,
    mut model:   LoraGpt<B>,
    dataset:     LmDataset,
    pad_id:      u32,
    adapter_cfg: &AdapterConfig,
    device:      B::Device,
) -> Result<TrainSummary> {
    let output = Path::new(&cfg.output_dir);

    let trainable_params = model.trainable_params();
    let total_params     = model.num_params();
    tracing::info!(
        "trainable params: {} || all params: {} || trainable%: {:.4}",
        trainable_params,
        total_params,
        100.0 * trainable_params as f64 / total_params.max(1) as f64,
    );

    // ── AdamW with per-parameter norm clipping ────────────────────────────────
    let optim_cfg = AdamWConfig::new()
        .with_weight_decay(cfg.weight_decay as f32)
        .with_grad_clipping(Some(GradientClippingConfig::Norm(cfg.max_grad_norm as f32)));
    let mut optim = optim_cfg.init();

    let steps_per_epoch = dataset.len().div_ceil(cfg.batch_size);
    let total_steps     = steps_per_epoch * cfg.epochs;
    tracing::info!(
        "{} samples, {} steps per epoch, {} steps total",
        dataset.len(),
        steps_per_epoch,
        total_steps
    );

    let batcher = LmBatcher::<B>::new(device.clone(), pad_id);
    let loader  = DataLoaderBuilder::new(batcher)
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(dataset);

    let metrics     = MetricsLogger::create(output)?;
    let checkpoints = StepCheckpoints::new(output, cfg.save_total_limit);

    let mut step = 0usize;
    let mut window_loss  = 0.0f64;
    let mut window_steps = 0usize;
    let mut epoch_losses = Vec::with_capacity(cfg.epochs);

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {
        let mut epoch_loss    = 0.0f64;
        let mut epoch_batches = 0usize;

        for batch in loader.iter() {
            let lr   = linear_decay(cfg.learning_rate, step, total_steps);
            let loss = model.forward_loss(batch.inputs, batch.targets, batch.target_mask);

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            epoch_loss    += loss_val;
            epoch_batches += 1;
            window_loss   += loss_val;
            window_steps  += 1;

            // Backward pass + AdamW update (adapters only)
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(lr, model, grads);
            step += 1;

            if cfg.logging_steps > 0 && step % cfg.logging_steps == 0 {
                let row = StepMetrics {
                    step,
                    epoch,
                    loss: window_loss / window_steps as f64,
                    learning_rate: linear_decay(cfg.learning_rate, step, total_steps),
                };
                tracing::info!(
                    "step {:>6}/{} | epoch {} | loss {:.4} | lr {:.3e}",
                    row.step, total_steps, row.epoch, row.loss, row.learning_rate
                );
                metrics.log(&row)?;
                window_loss  = 0.0;
                window_steps = 0;
            }

            if cfg.save_steps > 0 && step % cfg.save_steps == 0 {
                checkpoints.save(step, &model.adapters, adapter_cfg)?;
            }
        }

        let avg = if epoch_batches > 0 { epoch_loss / epoch_batches as f64 } else { f64::NAN };
        tracing::info!("Epoch {:>3}/{} | train_loss={:.4}", epoch, cfg.epochs, avg);
        epoch_losses.push(avg);
    }

    AdapterCheckpoint::new(output).save(&model.adapters, adapter_cfg)?;
    tracing::info!(
        "Adapter saved to '{}', training log at '{}'",
        output.display(),
        metrics.csv_path().display()
    );

    Ok(TrainSummary { steps: step, epoch_losses, trainable_params, total_params })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::LmSample;
    use crate::ml::tiny_config;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray>;

    #[test]
    fn test_linear_decay() {
        assert!((linear_decay(1e-4, 0, 10) - 1e-4).abs() < 1e-12);
        assert!((linear_decay(1e-4, 5, 10) - 5e-5).abs() < 1e-12);
        assert_eq!(linear_decay(1e-4, 10, 10), 0.0);
        assert_eq!(linear_decay(1e-4, 0, 0), 1e-4);
    }

    #[test]
    fn test_tiny_model_learns_and_saves() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        TestBackend::seed(3);

        let cfg = TrainConfig {
            output_dir:       dir.path().to_string_lossy().into_owned(),
            epochs:           15,
            batch_size:       2,
            learning_rate:    1e-2,
            logging_steps:    4,
            save_steps:       10,
            save_total_limit: 2,
            lora_r:           4,
            lora_alpha:       8.0,
            lora_dropout:     0.0,
            ..TrainConfig::default()
        };
        let adapter_cfg = cfg.adapter_config();

        let gpt      = tiny_config();
        let targets  = LoraTargets::from_names(&adapter_cfg.target_modules).unwrap();
        let adapters = LoraConfig::from_adapter_config(&adapter_cfg).init_stack(&gpt, &targets, &device);
        let model    = LoraGpt::<TestBackend>::new(gpt.init(&device), adapters);

        let dataset = LmDataset::new(vec![
            LmSample { token_ids: vec![1, 2, 3, 4, 5, 6] },
            LmSample { token_ids: vec![7, 8, 9, 10] },
            LmSample { token_ids: vec![1, 2, 3, 4, 5, 6] },
            LmSample { token_ids: vec![11, 12, 13] },
        ]);

        let summary = train_loop(&cfg, model, dataset, 0, &adapter_cfg, device).unwrap();

        assert_eq!(summary.steps, 30);
        assert_eq!(summary.epoch_losses.len(), 15);
        assert!(summary.final_loss().unwrap() < summary.epoch_losses[0]);
        assert!(summary.trainable_params < summary.total_params);

        assert!(dir.path().join("adapter_model.mpk.gz").is_file());
        assert!(dir.path().join("adapter_config.json").is_file());
        assert!(dir.path().join("checkpoint-30").is_dir());
        assert!(dir.path().join("checkpoint-20").is_dir());
        assert!(!dir.path().join("checkpoint-10").exists());

        let log = std::fs::read_to_string(dir.path().join("training_log.csv")).unwrap();
        // header + steps 4, 8, ..., 28
        assert_eq!(log.lines().count(), 1 + 7);
    }
}
