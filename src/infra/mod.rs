// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Filesystem and network concerns shared by the use cases:
//
//   checkpoint.rs      — Adapter weights + adapter_config.json
//                        via Burn's gzipped MessagePack recorder, the
//                        checkpoint-<step> directories and their
//                        rotation, and small JSON helpers.
//
//   tokenizer_store.rs — Loading the base tokenizer, copying it
//                        next to the adapter, EOS lookup and
//                        encode/decode wrappers.
//
//   hub.rs             — Resolves a base model id to local files,
//                        downloading from the Hugging Face Hub
//                        when the id is not a local directory.
//
//   metrics.rs         — training_log.csv writer.

/// Adapter checkpoint saving and loading
pub mod checkpoint;

/// Tokenizer loading, saving and helpers
pub mod tokenizer_store;

/// Base model file resolution
pub mod hub;

/// Training log CSV writer
pub mod metrics;
