// ============================================================
// Layer 3 — Adapter Configuration Record
// ============================================================
// Saved as `adapter_config.json` next to the adapter weights.
// Field names follow the PEFT schema so the record reads the
// same as any other LoRA adapter directory:
//
//   {
//     "peft_type": "LORA",
//     "base_model_name_or_path": "gpt2",
//     "r": 8,
//     "lora_alpha": 16.0,
//     "lora_dropout": 0.1,
//     "target_modules": ["c_attn", "c_proj"],
//     "bias": "none",
//     "task_type": "CAUSAL_LM",
//     "fan_in_fan_out": true,
//     "inference_mode": true
//   }
//
// At inference time this record tells us which base model to
// fetch and which projections carry an adapter, so the adapter
// module can be rebuilt before its weights are loaded.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    pub peft_type: String,
    pub base_model_name_or_path: String,
    pub r: usize,
    pub lora_alpha: f64,
    pub lora_dropout: f64,
    pub target_modules: Vec<String>,
    pub bias: String,
    pub task_type: String,
    /// GPT-2 stores projections as `[in, out]` (Conv1D layout)
    #[serde(default)]
    pub fan_in_fan_out: bool,
    #[serde(default)]
    pub inference_mode: bool,
}

impl AdapterConfig {
    pub fn lora(
        base_model:     impl Into<String>,
        r:              usize,
        lora_alpha:     f64,
        lora_dropout:   f64,
        target_modules: Vec<String>,
    ) -> Self {
        Self {
            peft_type: "LORA".to_string(),
            base_model_name_or_path: base_model.into(),
            r,
            lora_alpha,
            lora_dropout,
            target_modules,
            bias: "none".to_string(),
            task_type: "CAUSAL_LM".to_string(),
            fan_in_fan_out: true,
            inference_mode: true,
        }
    }

    /// The factor applied to every low-rank update: alpha / r
    pub fn scaling(&self) -> f64 {
        self.lora_alpha / self.r as f64
    }
}
