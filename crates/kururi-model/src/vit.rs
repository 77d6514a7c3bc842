//! Vision transformer classifier with timm parameter naming.
//!
//! ```text
//! (B,3,H,W) ─patch conv─▶ (B,N,D) ─[cls ‖ ·] + pos─▶ blocks × depth ─norm─▶ cls token ─head─▶ (B,4)
//! ```
//!
//! Each block is pre-norm: `x + attn(norm1(x))` then `x + mlp(norm2(x))`.
//! Layer norms use `eps = 1e-6` and the MLP uses exact (erf) GELU.

use candle_core::{IndexOp, Module, Tensor};
use candle_nn::{
    Conv2d, Conv2dConfig, LayerNorm, Linear, VarBuilder, conv2d, layer_norm, linear,
};
use kururi_core::NUM_CLASSES;

use crate::error::ModelError;

const LAYER_NORM_EPS: f64 = 1e-6;

/// Architecture hyper-parameters of one vision transformer variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VitConfig {
    pub image_size: usize,
    pub patch_size: usize,
    pub in_channels: usize,
    pub embed_dim: usize,
    pub depth: usize,
    pub num_heads: usize,
    /// Hidden width of each MLP, usually `4 * embed_dim`.
    pub mlp_dim: usize,
    pub num_classes: usize,
}

/// Names accepted by [`VitConfig::from_name`].
pub const ARCHITECTURES: &[&str] = &[
    "vit_tiny_patch16_224",
    "vit_small_patch16_224",
    "vit_base_patch16_224",
    "vit_base_patch32_224",
    "vit_large_patch16_224",
    "vit_large_patch32_224",
];

impl VitConfig {
    const fn variant(patch_size: usize, embed_dim: usize, depth: usize, num_heads: usize) -> Self {
        Self {
            image_size: 224,
            patch_size,
            in_channels: 3,
            embed_dim,
            depth,
            num_heads,
            mlp_dim: embed_dim * 4,
            num_classes: NUM_CLASSES,
        }
    }

    /// Look up a registered architecture by its timm name.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownArchitecture`] for names not in [`ARCHITECTURES`].
    pub fn from_name(name: &str) -> Result<Self, ModelError> {
        let config = match name {
            "vit_tiny_patch16_224" => Self::variant(16, 192, 12, 3),
            "vit_small_patch16_224" => Self::variant(16, 384, 12, 6),
            "vit_base_patch16_224" => Self::variant(16, 768, 12, 12),
            "vit_base_patch32_224" => Self::variant(32, 768, 12, 12),
            "vit_large_patch16_224" => Self::variant(16, 1024, 24, 16),
            "vit_large_patch32_224" => Self::variant(32, 1024, 24, 16),
            _ => {
                return Err(ModelError::UnknownArchitecture {
                    name: name.to_string(),
                    known: ARCHITECTURES.join(", "),
                });
            }
        };
        Ok(config)
    }

    #[must_use]
    pub const fn num_patches(&self) -> usize {
        let per_side = self.image_size / self.patch_size;
        per_side * per_side
    }

    #[must_use]
    pub const fn head_dim(&self) -> usize {
        self.embed_dim / self.num_heads
    }

    /// Every parameter the model reads, in timm order, with its shape.
    #[must_use]
    pub fn parameter_shapes(&self) -> Vec<(String, Vec<usize>)> {
        let d = self.embed_dim;
        let mut shapes = vec![
            ("cls_token".to_string(), vec![1, 1, d]),
            ("pos_embed".to_string(), vec![1, self.num_patches() + 1, d]),
            (
                "patch_embed.proj.weight".to_string(),
                vec![d, self.in_channels, self.patch_size, self.patch_size],
            ),
            ("patch_embed.proj.bias".to_string(), vec![d]),
        ];

        for i in 0..self.depth {
            let block = |name: &str| format!("blocks.{i}.{name}");
            shapes.extend([
                (block("norm1.weight"), vec![d]),
                (block("norm1.bias"), vec![d]),
                (block("attn.qkv.weight"), vec![3 * d, d]),
                (block("attn.qkv.bias"), vec![3 * d]),
                (block("attn.proj.weight"), vec![d, d]),
                (block("attn.proj.bias"), vec![d]),
                (block("norm2.weight"), vec![d]),
                (block("norm2.bias"), vec![d]),
                (block("mlp.fc1.weight"), vec![self.mlp_dim, d]),
                (block("mlp.fc1.bias"), vec![self.mlp_dim]),
                (block("mlp.fc2.weight"), vec![d, self.mlp_dim]),
                (block("mlp.fc2.bias"), vec![d]),
            ]);
        }

        shapes.extend([
            ("norm.weight".to_string(), vec![d]),
            ("norm.bias".to_string(), vec![d]),
            ("head.weight".to_string(), vec![self.num_classes, d]),
            ("head.bias".to_string(), vec![self.num_classes]),
        ]);
        shapes
    }

    /// Parameter names only, see [`Self::parameter_shapes`].
    #[must_use]
    pub fn expected_keys(&self) -> Vec<String> {
        self.parameter_shapes()
            .into_iter()
            .map(|(name, _)| name)
            .collect()
    }
}

#[derive(Debug, Clone)]
struct Attention {
    qkv: Linear,
    proj: Linear,
    num_heads: usize,
    head_dim: usize,
    scale: f64,
}

impl Attention {
    fn new(config: &VitConfig, vb: VarBuilder) -> candle_core::Result<Self> {
        let d = config.embed_dim;
        let head_dim = config.head_dim();
        #[allow(clippy::cast_precision_loss)]
        let scale = 1.0 / (head_dim as f64).sqrt();
        Ok(Self {
            qkv: linear(d, 3 * d, vb.pp("qkv"))?,
            proj: linear(d, d, vb.pp("proj"))?,
            num_heads: config.num_heads,
            head_dim,
            scale,
        })
    }
}

impl Module for Attention {
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let (b, n, c) = xs.dims3()?;
        let qkv = self
            .qkv
            .forward(xs)?
            .reshape((b, n, 3, self.num_heads, self.head_dim))?
            .permute((2, 0, 3, 1, 4))?;
        let q = qkv.i(0)?.contiguous()?;
        let k = qkv.i(1)?.contiguous()?;
        let v = qkv.i(2)?.contiguous()?;

        let attn = (q.matmul(&k.t()?.contiguous()?)? * self.scale)?;
        let attn = candle_nn::ops::softmax_last_dim(&attn)?;
        let out = attn.matmul(&v)?.transpose(1, 2)?.reshape((b, n, c))?;
        self.proj.forward(&out)
    }
}

#[derive(Debug, Clone)]
struct Mlp {
    fc1: Linear,
    fc2: Linear,
}

impl Mlp {
    fn new(config: &VitConfig, vb: VarBuilder) -> candle_core::Result<Self> {
        Ok(Self {
            fc1: linear(config.embed_dim, config.mlp_dim, vb.pp("fc1"))?,
            fc2: linear(config.mlp_dim, config.embed_dim, vb.pp("fc2"))?,
        })
    }
}

impl Module for Mlp {
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        self.fc2.forward(&self.fc1.forward(xs)?.gelu_erf()?)
    }
}

#[derive(Debug, Clone)]
struct Block {
    norm1: LayerNorm,
    attn: Attention,
    norm2: LayerNorm,
    mlp: Mlp,
}

impl Block {
    fn new(config: &VitConfig, vb: VarBuilder) -> candle_core::Result<Self> {
        Ok(Self {
            norm1: layer_norm(config.embed_dim, LAYER_NORM_EPS, vb.pp("norm1"))?,
            attn: Attention::new(config, vb.pp("attn"))?,
            norm2: layer_norm(config.embed_dim, LAYER_NORM_EPS, vb.pp("norm2"))?,
            mlp: Mlp::new(config, vb.pp("mlp"))?,
        })
    }
}

impl Module for Block {
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let xs = (xs + self.attn.forward(&self.norm1.forward(xs)?)?)?;
        &xs + self.mlp.forward(&self.norm2.forward(&xs)?)?
    }
}

/// Inference-only vision transformer producing one logit per rotation class.
#[derive(Debug, Clone)]
pub struct VisionTransformer {
    config: VitConfig,
    patch_embed: Conv2d,
    cls_token: Tensor,
    pos_embed: Tensor,
    blocks: Vec<Block>,
    norm: LayerNorm,
    head: Linear,
}

impl VisionTransformer {
    /// Build the model from `vb`, which must hold every name in
    /// [`VitConfig::parameter_shapes`].
    ///
    /// # Errors
    ///
    /// Fails if a parameter is missing or has the wrong shape.
    pub fn new(config: &VitConfig, vb: VarBuilder) -> candle_core::Result<Self> {
        let d = config.embed_dim;
        let patch_cfg = Conv2dConfig {
            stride: config.patch_size,
            ..Default::default()
        };
        let patch_embed = conv2d(
            config.in_channels,
            d,
            config.patch_size,
            patch_cfg,
            vb.pp("patch_embed.proj"),
        )?;
        let cls_token = vb.get((1, 1, d), "cls_token")?;
        let pos_embed = vb.get((1, config.num_patches() + 1, d), "pos_embed")?;
        let blocks = (0..config.depth)
            .map(|i| Block::new(config, vb.pp(format!("blocks.{i}"))))
            .collect::<candle_core::Result<Vec<_>>>()?;
        let norm = layer_norm(d, LAYER_NORM_EPS, vb.pp("norm"))?;
        let head = linear(d, config.num_classes, vb.pp("head"))?;

        Ok(Self {
            config: config.clone(),
            patch_embed,
            cls_token,
            pos_embed,
            blocks,
            norm,
            head,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &VitConfig {
        &self.config
    }
}

impl Module for VisionTransformer {
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let b = xs.dim(0)?;
        let d = self.config.embed_dim;

        let patches = self.patch_embed.forward(xs)?.flatten_from(2)?.transpose(1, 2)?;
        let cls = self.cls_token.broadcast_as((b, 1, d))?.contiguous()?;
        let mut hidden = Tensor::cat(&[&cls, &patches], 1)?.broadcast_add(&self.pos_embed)?;

        for block in &self.blocks {
            hidden = block.forward(&hidden)?;
        }

        let hidden = self.norm.forward(&hidden)?;
        self.head.forward(&hidden.i((.., 0))?)
    }
}
