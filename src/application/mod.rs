// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// One use case per subcommand. Each takes a plain config
// struct, coordinates the data, ml and infra layers, and
// returns a result for the CLI layer to print.
//
// Rules for this layer:
//   - No tensor code here (that's Layer 5)
//   - No printing here (that's Layer 1)
//   - Only workflow coordination

// Download, clean and chunk the books
pub mod prepare_use_case;

// Corpus readiness report
pub mod inspect_use_case;

// LoRA fine-tuning
pub mod train_use_case;

// Text generation from a trained adapter
pub mod generate_use_case;
