// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs and traits describing what the pipeline
// works on: raw books, text chunks, the corpus manifest and the
// adapter configuration record.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O or network calls
//   - Only plain Rust structs, enums, and traits

// A raw book loaded from disk
pub mod document;

// A cleaned, word-windowed passage and the per-book manifest row
pub mod chunk;

// The LoRA adapter configuration record saved next to the weights
pub mod adapter;

// Core abstractions (traits) that other layers implement
pub mod traits;
