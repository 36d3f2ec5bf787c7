// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the four subcommands, run in pipeline order:
// `prepare` → `inspect` → `train` → `generate`.
//
// Each *Args struct converts into its application-layer config
// with From, so the use cases never see clap types.

use clap::{Args, Subcommand};

use crate::application::{
    generate_use_case::GenerateConfig,
    inspect_use_case::InspectConfig,
    prepare_use_case::PrepareConfig,
    train_use_case::TrainConfig,
};
use crate::ml::sampling::SamplingConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download the books, strip Gutenberg boilerplate and chunk them
    Prepare(PrepareArgs),

    /// Report statistics on the cleaned corpus
    Inspect(InspectArgs),

    /// Fine-tune GPT-2 with LoRA on the cleaned corpus
    Train(TrainArgs),

    /// Continue a prompt with the fine-tuned model
    Generate(GenerateArgs),
}

#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// Where raw .txt books are downloaded to and read from
    #[arg(long, default_value = "data/raw")]
    pub raw_dir: String,

    /// Output directory for per-book chunk JSON files
    #[arg(long, default_value = "data/cleaned")]
    pub clean_dir: String,

    /// Output directory for manifest.json
    #[arg(long, default_value = "data/manifests")]
    pub manifest_dir: String,

    /// Use only the .txt files already in --raw-dir
    #[arg(long)]
    pub skip_download: bool,

    /// Words per chunk
    #[arg(long, default_value_t = 200)]
    pub max_words: usize,

    /// Words shared by consecutive chunks
    #[arg(long, default_value_t = 20)]
    pub overlap: usize,

    /// Shorter chunks are dropped
    #[arg(long, default_value_t = 30)]
    pub min_words: usize,
}

impl From<PrepareArgs> for PrepareConfig {
    fn from(a: PrepareArgs) -> Self {
        PrepareConfig {
            raw_dir:       a.raw_dir,
            clean_dir:     a.clean_dir,
            manifest_dir:  a.manifest_dir,
            skip_download: a.skip_download,
            max_words:     a.max_words,
            overlap:       a.overlap,
            min_words:     a.min_words,
        }
    }
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    #[arg(long, default_value = "data/cleaned")]
    pub clean_dir: String,

    /// Number of sample chunks to print
    #[arg(short = 'n', long, default_value_t = 5)]
    pub samples: usize,

    /// Number of duplicate chunks to print
    #[arg(long, default_value_t = 5)]
    pub top_n: usize,
}

impl From<InspectArgs> for InspectConfig {
    fn from(a: InspectArgs) -> Self {
        InspectConfig {
            clean_dir: a.clean_dir,
            samples:   a.samples,
            top_n:     a.top_n,
            ..InspectConfig::default()
        }
    }
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory with the chunk JSON files written by `prepare`
    #[arg(long, default_value = "data/cleaned")]
    pub chunks_dir: String,

    /// Where the adapter, tokenizer, configs and log are written
    #[arg(long, default_value = "experiments/sherlock_lora")]
    pub output_dir: String,

    /// Hugging Face model id, or a local directory with
    /// config.json, model.safetensors and tokenizer.json
    #[arg(long, default_value = "gpt2")]
    pub model_name: String,

    /// Tokens per training sequence
    #[arg(long, default_value_t = 512)]
    pub max_length: usize,

    #[arg(long, default_value_t = 3)]
    pub epochs: usize,

    #[arg(long, default_value_t = 4)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 1e-4)]
    pub learning_rate: f64,

    #[arg(long, default_value_t = 0.01)]
    pub weight_decay: f64,

    #[arg(long, default_value_t = 1.0)]
    pub max_grad_norm: f64,

    #[arg(long, default_value_t = 50)]
    pub logging_steps: usize,

    /// Steps between intermediate checkpoints (0 disables them)
    #[arg(long, default_value_t = 200)]
    pub save_steps: usize,

    /// Intermediate checkpoints kept on disk (0 keeps all)
    #[arg(long, default_value_t = 2)]
    pub save_total_limit: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// LoRA rank
    #[arg(long, default_value_t = 8)]
    pub lora_r: usize,

    #[arg(long, default_value_t = 16.0)]
    pub lora_alpha: f64,

    #[arg(long, default_value_t = 0.1)]
    pub lora_dropout: f64,

    /// Projections to adapt (c_attn, c_proj, c_fc, attn.c_proj, mlp.c_proj)
    #[arg(long, value_delimiter = ',', default_value = "c_attn,c_proj")]
    pub target_modules: Vec<String>,
}

impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            chunks_dir:       a.chunks_dir,
            output_dir:       a.output_dir,
            base_model:       a.model_name,
            max_length:       a.max_length,
            epochs:           a.epochs,
            batch_size:       a.batch_size,
            learning_rate:    a.learning_rate,
            weight_decay:     a.weight_decay,
            max_grad_norm:    a.max_grad_norm,
            logging_steps:    a.logging_steps,
            save_steps:       a.save_steps,
            save_total_limit: a.save_total_limit,
            seed:             a.seed,
            lora_r:           a.lora_r,
            lora_alpha:       a.lora_alpha,
            lora_dropout:     a.lora_dropout,
            target_modules:   a.target_modules,
        }
    }
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Text to continue
    #[arg(long)]
    pub prompt: String,

    /// Output directory of `train`
    #[arg(long, default_value = "experiments/sherlock_lora")]
    pub model_dir: String,

    #[arg(long, default_value_t = 180)]
    pub max_new_tokens: usize,

    /// 0 or below means greedy decoding
    #[arg(long, default_value_t = 0.7, allow_negative_numbers = true)]
    pub temperature: f64,

    #[arg(long, default_value_t = 0.92)]
    pub top_p: f64,

    /// 0 disables top-k filtering
    #[arg(long, default_value_t = 50)]
    pub top_k: usize,

    #[arg(long, default_value_t = 1.3)]
    pub repetition_penalty: f32,

    /// Always pick the most likely token
    #[arg(long)]
    pub greedy: bool,

    /// Seed for reproducible sampling
    #[arg(long)]
    pub seed: Option<u64>,
}

impl From<GenerateArgs> for GenerateConfig {
    fn from(a: GenerateArgs) -> Self {
        let temperature = if a.greedy { 0.0 } else { a.temperature };
        GenerateConfig {
            model_dir:      a.model_dir,
            max_new_tokens: a.max_new_tokens,
            sampling: SamplingConfig {
                temperature,
                top_k:              a.top_k,
                top_p:              a.top_p,
                repetition_penalty: a.repetition_penalty,
            },
            seed: a.seed,
        }
    }
}
