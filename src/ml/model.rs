use burn::{
    nn::{
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::{activation::{log_softmax, softmax}, TensorData},
};

use crate::ml::lora::{AdapterStack, BlockAdapters, LoraLinear};

/// Added to attention scores above the diagonal
const MASK_VALUE: f32 = -1.0e9;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct GptConfig {
    pub vocab_size:  usize,
    pub n_positions: usize,
    pub n_embd:      usize,
    pub n_layer:     usize,
    pub n_head:      usize,
    #[config(default = 1e-5)]
    pub layer_norm_epsilon: f64,
    /// Shared by the embedding, attention and residual dropouts
    #[config(default = 0.1)]
    pub dropout: f64,
}

impl GptConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> GptModel<B> {
        let wte  = EmbeddingConfig::new(self.vocab_size, self.n_embd).init(device);
        let wpe  = EmbeddingConfig::new(self.n_positions, self.n_embd).init(device);
        let blocks = (0..self.n_layer).map(|_| self.build_block(device)).collect();
        let ln_f = self.layer_norm(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        GptModel { wte, wpe, blocks, ln_f, dropout, n_positions: self.n_positions }
    }

    fn layer_norm<B: Backend>(&self, device: &B::Device) -> LayerNorm<B> {
        LayerNormConfig::new(self.n_embd)
            .with_epsilon(self.layer_norm_epsilon)
            .init(device)
    }

    fn build_block<B: Backend>(&self, device: &B::Device) -> GptBlock<B> {
        let d = self.n_embd;
        let attn = CausalSelfAttention {
            c_attn:        LinearConfig::new(d, 3 * d).init(device),
            c_proj:        LinearConfig::new(d, d).init(device),
            attn_dropout:  DropoutConfig::new(self.dropout).init(),
            resid_dropout: DropoutConfig::new(self.dropout).init(),
            n_head:        self.n_head,
        };
        let mlp = Mlp {
            c_fc:    LinearConfig::new(d, 4 * d).init(device),
            c_proj:  LinearConfig::new(4 * d, d).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
        };
        GptBlock { ln_1: self.layer_norm(device), attn, ln_2: self.layer_norm(device), mlp }
    }
}

/// Base projection plus the low-rank update, if this projection is adapted
fn project<B: Backend>(
    linear: &Linear<B>,
    lora:   Option<&LoraLinear<B>>,
    x:      Tensor<B, 3>,
) -> Tensor<B, 3> {
    match lora {
        Some(lora) => linear.forward(x.clone()) + lora.forward(x),
        None       => linear.forward(x),
    }
}

/// GPT-2's "gelu_new": the tanh approximation of GELU
fn gelu_new<B: Backend>(x: Tensor<B, 3>) -> Tensor<B, 3> {
    let coeff = (2.0 / std::f64::consts::PI).sqrt();
    let inner = (x.clone() + x.clone().powf_scalar(3.0).mul_scalar(0.044715)).mul_scalar(coeff);
    x.mul_scalar(0.5) * inner.tanh().add_scalar(1.0)
}

/// Additive mask [1, 1, seq, seq]: 0 on and below the diagonal
fn causal_mask<B: Backend>(seq_len: usize, device: &B::Device) -> Tensor<B, 4> {
    let data: Vec<f32> = (0..seq_len)
        .flat_map(|i| (0..seq_len).map(move |j| if j > i { MASK_VALUE } else { 0.0 }))
        .collect();
    Tensor::<B, 2>::from_data(TensorData::new(data, [seq_len, seq_len]), device)
        .reshape([1, 1, seq_len, seq_len])
}

#[derive(Module, Debug)]
pub struct CausalSelfAttention<B: Backend> {
    /// Fused query/key/value projection: d → 3d
    pub c_attn:        Linear<B>,
    pub c_proj:        Linear<B>,
    pub attn_dropout:  Dropout,
    pub resid_dropout: Dropout,
    pub n_head:        usize,
}

impl<B: Backend> CausalSelfAttention<B> {
    pub fn forward(
        &self,
        x:       Tensor<B, 3>,
        mask:    &Tensor<B, 4>,
        c_attn:  Option<&LoraLinear<B>>,
        c_proj:  Option<&LoraLinear<B>>,
    ) -> Tensor<B, 3> {
        let [batch, seq_len, d] = x.dims();
        let n_head   = self.n_head;
        let head_dim = d / n_head;

        let qkv = project(&self.c_attn, c_attn, x);
        let heads = |t: Tensor<B, 3>| t.reshape([batch, seq_len, n_head, head_dim]).swap_dims(1, 2);
        let q = heads(qkv.clone().slice([0..batch, 0..seq_len, 0..d]));
        let k = heads(qkv.clone().slice([0..batch, 0..seq_len, d..2 * d]));
        let v = heads(qkv.slice([0..batch, 0..seq_len, 2 * d..3 * d]));

        // [batch, n_head, seq, seq]
        let scores = q.matmul(k.swap_dims(2, 3)).div_scalar((head_dim as f64).sqrt())
            + mask.clone().expand([batch, n_head, seq_len, seq_len]);
        let weights = self.attn_dropout.forward(softmax(scores, 3));

        let context = weights.matmul(v).swap_dims(1, 2).reshape([batch, seq_len, d]);
        self.resid_dropout.forward(project(&self.c_proj, c_proj, context))
    }
}

#[derive(Module, Debug)]
pub struct Mlp<B: Backend> {
    pub c_fc:    Linear<B>,
    pub c_proj:  Linear<B>,
    pub dropout: Dropout,
}

impl<B: Backend> Mlp<B> {
    pub fn forward(
        &self,
        x:      Tensor<B, 3>,
        c_fc:   Option<&LoraLinear<B>>,
        c_proj: Option<&LoraLinear<B>>,
    ) -> Tensor<B, 3> {
        let h = gelu_new(project(&self.c_fc, c_fc, x));
        self.dropout.forward(project(&self.c_proj, c_proj, h))
    }
}

#[derive(Module, Debug)]
pub struct GptBlock<B: Backend> {
    pub ln_1: LayerNorm<B>,
    pub attn: CausalSelfAttention<B>,
    pub ln_2: LayerNorm<B>,
    pub mlp:  Mlp<B>,
}

impl<B: Backend> GptBlock<B> {
    pub fn forward(
        &self,
        x:        Tensor<B, 3>,
        mask:     &Tensor<B, 4>,
        adapters: Option<&BlockAdapters<B>>,
    ) -> Tensor<B, 3> {
        let attn_c_attn = adapters.and_then(|a| a.attn_c_attn.as_ref());
        let attn_c_proj = adapters.and_then(|a| a.attn_c_proj.as_ref());
        let mlp_c_fc    = adapters.and_then(|a| a.mlp_c_fc.as_ref());
        let mlp_c_proj  = adapters.and_then(|a| a.mlp_c_proj.as_ref());

        let h = x.clone() + self.attn.forward(self.ln_1.forward(x), mask, attn_c_attn, attn_c_proj);
        h.clone() + self.mlp.forward(self.ln_2.forward(h), mlp_c_fc, mlp_c_proj)
    }
}

/// GPT-2 decoder stack. The LM head shares the token embedding matrix.
#[derive(Module, Debug)]
pub struct GptModel<B: Backend> {
    pub wte:         Embedding<B>,
    pub wpe:         Embedding<B>,
    pub blocks:      Vec<GptBlock<B>>,
    pub ln_f:        LayerNorm<B>,
    pub dropout:     Dropout,
    pub n_positions: usize,
}

impl<B: Backend> GptModel<B> {
    /// input_ids: [batch, seq_len] → logits: [batch, seq_len, vocab]
    pub fn forward(
        &self,
        input_ids: Tensor<B, 2, Int>,
        adapters:  Option<&AdapterStack<B>>,
    ) -> Tensor<B, 3> {
        let [batch_size, seq_len] = input_ids.dims();
        let device = input_ids.device();

        let tok_emb = self.wte.forward(input_ids);
        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &device)
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        let pos_emb = self.wpe.forward(positions);

        let mask  = causal_mask::<B>(seq_len, &device);
        let mut x = self.dropout.forward(tok_emb + pos_emb);
        for (i, block) in self.blocks.iter().enumerate() {
            let block_adapters = adapters.and_then(|a| a.blocks.get(i));
            x = block.forward(x, &mask, block_adapters);
        }
        let x = self.ln_f.forward(x);

        let [_, _, d] = x.dims();
        let wte = self.wte.weight.val(); // [vocab, d]
        let vocab = wte.dims()[0];
        x.reshape([batch_size * seq_len, d])
            .matmul(wte.transpose())
            .reshape([batch_size, seq_len, vocab])
    }

    pub fn num_layers(&self) -> usize {
        self.blocks.len()
    }
}

/// Mean next-token cross-entropy over positions where `mask` is 1.
///
/// logits [batch, seq, vocab], targets [batch, seq], mask [batch, seq]
pub fn masked_lm_loss<B: Backend>(
    logits:  Tensor<B, 3>,
    targets: Tensor<B, 2, Int>,
    mask:    Tensor<B, 2>,
) -> Tensor<B, 1> {
    let [batch, seq_len, vocab] = logits.dims();
    let n = batch * seq_len;

    let log_probs = log_softmax(logits.reshape([n, vocab]), 1);
    let picked = log_probs.gather(1, targets.reshape([n, 1])).reshape([n]);
    let mask   = mask.reshape([n]);
    let count  = mask.clone().sum().clamp_min(1.0);

    (picked * mask).sum().neg() / count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::tiny_config;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn ids(tokens: &[i32]) -> Tensor<TestBackend, 2, Int> {
        Tensor::<TestBackend, 1, Int>::from_ints(tokens, &Default::default())
            .reshape([1, tokens.len()])
    }

    #[test]
    fn test_forward_shape() {
        let model: GptModel<TestBackend> = tiny_config().init(&Default::default());
        let input = Tensor::<TestBackend, 1, Int>::from_ints([1, 2, 3, 4, 5, 6], &Default::default())
            .reshape([2, 3]);
        assert_eq!(model.forward(input, None).dims(), [2, 3, 32]);
    }

    #[test]
    fn test_attention_is_causal() {
        let model: GptModel<TestBackend> = tiny_config().init(&Default::default());

        let a = model.forward(ids(&[3, 9, 4, 1]), None);
        let b = model.forward(ids(&[3, 9, 20, 7]), None);

        // Positions 0 and 1 cannot see tokens 2 and 3
        let prefix = |t: Tensor<TestBackend, 3>| -> Vec<f32> {
            t.slice([0..1, 0..2, 0..32]).into_data().to_vec().unwrap()
        };
        let (pa, pb) = (prefix(a.clone()), prefix(b.clone()));
        for (x, y) in pa.iter().zip(&pb) {
            assert!((x - y).abs() < 1e-5);
        }

        let last = |t: Tensor<TestBackend, 3>| -> Vec<f32> {
            t.slice([0..1, 3..4, 0..32]).into_data().to_vec().unwrap()
        };
        assert_ne!(last(a), last(b));
    }

    #[test]
    fn test_masked_loss_ignores_padding() {
        let device = Default::default();
        // Two positions, vocab 2. Position 1 is padding with a terrible prediction.
        let logits = Tensor::<TestBackend, 1>::from_floats([0.0, 0.0, 10.0, -10.0], &device)
            .reshape([1, 2, 2]);
        let targets = Tensor::<TestBackend, 1, Int>::from_ints([0, 1], &device).reshape([1, 2]);
        let mask = Tensor::<TestBackend, 1>::from_floats([1.0, 0.0], &device).reshape([1, 2]);

        let loss: f32 = masked_lm_loss(logits, targets, mask).into_scalar();
        assert!((loss - std::f32::consts::LN_2).abs() < 1e-5);
    }
}
