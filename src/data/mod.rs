// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from Gutenberg downloads to tensor batches:
//
//   catalog + BookDownloader → data/raw/*.txt
//       │
//       ▼
//   RawTextLoader     → reads files into Documents
//       │
//       ▼
//   Preprocessor      → strips Gutenberg boilerplate, flattens text
//       │
//       ▼
//   Chunker           → overlapping word windows
//       │
//       ▼
//   CorpusStore       → data/cleaned/*.json + manifest
//       │
//       ▼
//   LmDataset         → tokenised samples (Burn Dataset)
//       │
//       ▼
//   LmBatcher         → shifted, padded tensor batches
//
// `stats` reads the same corpus files for the `inspect` report.

/// The Sherlock Holmes books on Project Gutenberg
pub mod catalog;

/// Fetches catalogue books over HTTP
pub mod downloader;

/// Loads raw `.txt` files from a directory
pub mod loader;

/// Strips Gutenberg header/footer and normalises whitespace
pub mod preprocessor;

/// Splits cleaned text into overlapping word windows
pub mod chunker;

/// Reads and writes chunk JSON files and the manifest
pub mod corpus;

/// Word statistics, duplicates and snippets for `inspect`
pub mod stats;

/// Implements Burn's Dataset trait for tokenised chunks
pub mod dataset;

/// Implements Burn's Batcher trait for next-token batches
pub mod batcher;
