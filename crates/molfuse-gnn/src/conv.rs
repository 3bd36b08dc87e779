//! Message-passing convolutions over a `GraphBatch`.
//!
//! Both layers follow the same pattern: the batch connectivity is turned
//! once per forward pass into gather/scatter index tensors plus a per-edge
//! scale, and each layer then does
//!
//! ```text
//! out[t] += scale_e * (x[s] W)      for every edge e = (s -> t)
//! ```
//!
//! with `index_select` for the gather and `index_add` for the scatter, both
//! of which candle differentiates.

use candle_core::{Device, Module, Tensor};
use candle_nn::{init, linear, Init, Linear, VarBuilder};

use crate::{GnnError, GraphBatch, Result};

/// Gather/scatter plan for one set of edges.
#[derive(Debug, Clone)]
struct EdgePlan {
    src: Tensor,
    dst: Tensor,
    /// `(num_edges, 1)`
    scale: Tensor,
}

impl EdgePlan {
    fn new(src: Vec<u32>, dst: Vec<u32>, scale: Vec<f32>, device: &Device) -> Result<Self> {
        let n = scale.len();
        Ok(Self {
            src: Tensor::new(src.as_slice(), device)?,
            dst: Tensor::new(dst.as_slice(), device)?,
            scale: Tensor::from_vec(scale, (n, 1), device)?,
        })
    }

    /// Scatter `scale * messages` onto `num_nodes` target rows.
    fn propagate(&self, h: &Tensor, num_nodes: usize) -> Result<Tensor> {
        let messages = h.index_select(&self.src, 0)?.broadcast_mul(&self.scale)?;
        let out = Tensor::zeros((num_nodes, h.dim(1)?), h.dtype(), h.device())?
            .index_add(&self.dst, &messages, 0)?;
        Ok(out)
    }
}

/// GCN propagation with self-loops and symmetric degree normalisation.
///
/// Self-loops are added only for nodes that lack one. Each edge `s -> t`
/// is weighted `1 / sqrt(deg(s) * deg(t))` with `deg` the in-degree
/// counted after the loops are added.
#[derive(Debug, Clone)]
pub struct GcnPropagation {
    plan: EdgePlan,
    num_nodes: usize,
}

impl GcnPropagation {
    pub fn new(batch: &GraphBatch) -> Result<Self> {
        let num_nodes = batch.num_nodes();
        let mut src = batch.sources().to_vec();
        let mut dst = batch.targets().to_vec();

        let mut has_loop = vec![false; num_nodes];
        for (&s, &t) in src.iter().zip(dst.iter()) {
            if s == t {
                has_loop[s as usize] = true;
            }
        }
        for (node, _) in has_loop.iter().enumerate().filter(|(_, looped)| !**looped) {
            src.push(node as u32);
            dst.push(node as u32);
        }

        let mut degree = vec![0f32; num_nodes];
        for &t in &dst {
            degree[t as usize] += 1.0;
        }
        let scale = src
            .iter()
            .zip(dst.iter())
            .map(|(&s, &t)| 1.0 / (degree[s as usize] * degree[t as usize]).sqrt())
            .collect();

        Ok(Self {
            plan: EdgePlan::new(src, dst, scale, batch.device())?,
            num_nodes,
        })
    }

    /// Number of propagated edges including the added self-loops.
    pub fn num_edges(&self) -> usize {
        self.plan.src.dim(0).unwrap_or(0)
    }
}

/// Per-relation mean aggregation plan for RGCN.
#[derive(Debug, Clone)]
pub struct RelationalPropagation {
    /// One plan per relation, `None` when the batch has no edges of that type
    relations: Vec<Option<EdgePlan>>,
    num_nodes: usize,
}

impl RelationalPropagation {
    /// Split the batch edges by relation.
    ///
    /// Fails with `MissingEdgeTypes` when the batch carries no edge types and
    /// with `RelationOutOfRange` when any type is `>= num_relations`.
    pub fn new(batch: &GraphBatch, num_relations: usize) -> Result<Self> {
        let types = batch.edge_types().ok_or(GnnError::MissingEdgeTypes)?;
        if let Some(&bad) = types.iter().find(|&&t| t as usize >= num_relations) {
            return Err(GnnError::RelationOutOfRange {
                edge_type: bad,
                num_relations,
            });
        }

        let num_nodes = batch.num_nodes();
        let mut relations = Vec::with_capacity(num_relations);
        for r in 0..num_relations as u32 {
            let (src, dst): (Vec<u32>, Vec<u32>) = batch
                .sources()
                .iter()
                .zip(batch.targets())
                .zip(types)
                .filter(|&(_, &t)| t == r)
                .map(|((&s, &d), _)| (s, d))
                .unzip();
            if src.is_empty() {
                relations.push(None);
                continue;
            }

            let mut in_degree = vec![0f32; num_nodes];
            for &d in &dst {
                in_degree[d as usize] += 1.0;
            }
            let scale = dst.iter().map(|&d| 1.0 / in_degree[d as usize]).collect();
            relations.push(Some(EdgePlan::new(src, dst, scale, batch.device())?));
        }

        Ok(Self {
            relations,
            num_nodes,
        })
    }

    pub fn num_relations(&self) -> usize {
        self.relations.len()
    }
}

/// Graph convolution layer (Kipf & Welling).
///
/// `x' = A_hat (x W) + b` where `A_hat` is the normalised adjacency with
/// self-loops from `GcnPropagation`.
#[derive(Debug, Clone)]
pub struct GcnConv {
    /// `(out, in)`
    weight: Tensor,
    /// `(out,)`, added after aggregation
    bias: Tensor,
}

impl GcnConv {
    pub fn new(in_dim: usize, out_dim: usize, vb: VarBuilder) -> Result<Self> {
        let vb = vb.pp("lin");
        let weight = vb.get_with_hints((out_dim, in_dim), "weight", init::DEFAULT_KAIMING_NORMAL)?;
        let bias = vb.get_with_hints(out_dim, "bias", Init::Const(0.))?;
        Ok(Self { weight, bias })
    }

    pub fn forward(&self, x: &Tensor, propagation: &GcnPropagation) -> Result<Tensor> {
        let h = x.matmul(&self.weight.t()?)?;
        let out = propagation.plan.propagate(&h, propagation.num_nodes)?;
        Ok(out.broadcast_add(&self.bias)?)
    }

    pub fn parameter_count(&self) -> usize {
        self.weight.elem_count() + self.bias.elem_count()
    }
}

/// Relational graph convolution layer (Schlichtkrull et al.).
///
/// `x'_i = x_i W_root + b + sum_r mean_{j in N_r(i)} x_j W_r`
#[derive(Debug, Clone)]
pub struct RgcnConv {
    root: Linear,
    /// `(num_relations, in, out)`
    relation_weight: Tensor,
}

impl RgcnConv {
    pub fn new(in_dim: usize, out_dim: usize, num_relations: usize, vb: VarBuilder) -> Result<Self> {
        let root = linear(in_dim, out_dim, vb.pp("root"))?;
        let relation_weight = vb.get_with_hints(
            (num_relations, in_dim, out_dim),
            "relation_weight",
            init::DEFAULT_KAIMING_NORMAL,
        )?;
        Ok(Self {
            root,
            relation_weight,
        })
    }

    pub fn num_relations(&self) -> usize {
        self.relation_weight.dim(0).unwrap_or(0)
    }

    pub fn forward(&self, x: &Tensor, propagation: &RelationalPropagation) -> Result<Tensor> {
        if propagation.num_relations() != self.num_relations() {
            return Err(GnnError::Config(format!(
                "propagation built for {} relations, layer has {}",
                propagation.num_relations(),
                self.num_relations()
            )));
        }

        let mut out = self.root.forward(x)?;
        for (r, plan) in propagation.relations.iter().enumerate() {
            let Some(plan) = plan else { continue };
            let h = x.matmul(&self.relation_weight.get(r)?)?;
            out = (out + plan.propagate(&h, propagation.num_nodes)?)?;
        }
        Ok(out)
    }

    pub fn parameter_count(&self) -> usize {
        self.root.weight().elem_count()
            + self.root.bias().map(|b| b.elem_count()).unwrap_or(0)
            + self.relation_weight.elem_count()
    }
}
