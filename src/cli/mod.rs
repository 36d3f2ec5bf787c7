// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Parses arguments with
// clap, hands a config to the matching use case, and prints
// what comes back. Nothing here computes.
//
//   1. `prepare`  — download, clean and chunk the books
//   2. `inspect`  — corpus statistics before training
//   3. `train`    — LoRA fine-tuning of GPT-2
//   4. `generate` — continue a prompt with the adapter

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, GenerateArgs, InspectArgs, PrepareArgs, TrainArgs};

use crate::domain::traits::TextGenerator;

#[derive(Parser, Debug)]
#[command(
    name = "sherlock-lora",
    version,
    about = "Fine-tune GPT-2 with LoRA on the Sherlock Holmes stories, then generate text."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Prepare(args)  => run_prepare(args),
            Commands::Inspect(args)  => run_inspect(args),
            Commands::Train(args)    => run_train(args),
            Commands::Generate(args) => run_generate(args),
        }
    }
}

fn run_prepare(args: PrepareArgs) -> Result<()> {
    use crate::application::prepare_use_case::PrepareUseCase;

    let report = PrepareUseCase::new(args.into()).execute()?;
    println!(
        "Prepared {} chunks from {} books ({} downloaded, {} already present).",
        report.total_chunks(),
        report.books.len(),
        report.downloaded,
        report.already_present,
    );
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    use crate::application::inspect_use_case::InspectUseCase;

    let report = InspectUseCase::new(args.into()).execute()?;
    print!("{report}");
    Ok(())
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Fine-tuning '{}' on chunks in: {}", args.model_name, args.chunks_dir);
    let output_dir = args.output_dir.clone();

    let summary = TrainUseCase::new(args.into()).execute()?;
    println!(
        "Trainable parameters: {} of {}.",
        summary.trainable_params, summary.total_params
    );
    match summary.final_loss() {
        Some(loss) => println!(
            "Training complete: {} steps, final epoch loss {:.4}. Adapter saved to '{}'.",
            summary.steps, loss, output_dir
        ),
        None => println!("Training complete. Adapter saved to '{}'.", output_dir),
    }
    Ok(())
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    use crate::application::generate_use_case::GenerateUseCase;

    let prompt = args.prompt.clone();
    let mut generator = GenerateUseCase::new(args.into())?;
    let text = generator.generate(&prompt)?;
    println!("\n{text}");
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
