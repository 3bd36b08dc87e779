//! Graph regression model: a stack of graph convolutions, a readout and a
//! linear head producing one scalar per graph.

use candle_core::{Module, Tensor};
use candle_nn::{linear, Linear, VarBuilder};
use tracing::debug;

use crate::conv::{GcnConv, GcnPropagation, RelationalPropagation, RgcnConv};
use crate::{GnnError, GraphBatch, GraphConvKind, GraphModelConfig, Result};

/// One convolution stage.
#[derive(Debug, Clone)]
enum GraphConv {
    Plain(GcnConv),
    Relational(RgcnConv),
}

/// Connectivity prepared once per forward pass and shared by all stages.
enum Propagation {
    Plain(GcnPropagation),
    Relational(RelationalPropagation),
}

impl GraphConv {
    fn forward(&self, x: &Tensor, propagation: &Propagation) -> Result<Tensor> {
        match (self, propagation) {
            (GraphConv::Plain(conv), Propagation::Plain(p)) => conv.forward(x, p),
            (GraphConv::Relational(conv), Propagation::Relational(p)) => conv.forward(x, p),
            _ => Err(GnnError::Config(
                "convolution and propagation kinds differ".to_string(),
            )),
        }
    }

    fn parameter_count(&self) -> usize {
        match self {
            GraphConv::Plain(conv) => conv.parameter_count(),
            GraphConv::Relational(conv) => conv.parameter_count(),
        }
    }
}

/// GCN or RGCN regression model, selected by `GraphModelConfig::kind`.
///
/// Every stage is followed by ReLU; the last stage's node embeddings are
/// pooled per graph and mapped to a scalar by a linear head.
#[derive(Debug, Clone)]
pub struct GraphRegressionModel {
    convs: Vec<GraphConv>,
    head: Linear,
    config: GraphModelConfig,
}

impl GraphRegressionModel {
    /// Build the model's parameters under `vb`.
    ///
    /// Stages are named `conv0`, `conv1`, ... and the head `fc`.
    pub fn new(config: GraphModelConfig, vb: VarBuilder) -> Result<Self> {
        config.validate()?;

        let mut convs = Vec::with_capacity(config.hidden_dims.len());
        let mut in_dim = config.input_dim;
        for (i, &out_dim) in config.hidden_dims.iter().enumerate() {
            let vb = vb.pp(format!("conv{i}"));
            let conv = match config.kind {
                GraphConvKind::Plain => GraphConv::Plain(GcnConv::new(in_dim, out_dim, vb)?),
                GraphConvKind::Relational { num_relations } => {
                    GraphConv::Relational(RgcnConv::new(in_dim, out_dim, num_relations, vb)?)
                }
            };
            convs.push(conv);
            in_dim = out_dim;
        }
        let head = linear(in_dim, 1, vb.pp("fc"))?;

        debug!(
            "Built {:?} graph model {} -> {:?} -> 1",
            config.kind, config.input_dim, config.hidden_dims
        );

        Ok(Self {
            convs,
            head,
            config,
        })
    }

    pub fn config(&self) -> &GraphModelConfig {
        &self.config
    }

    /// One prediction per graph, shape `(num_graphs, 1)`.
    pub fn forward(&self, batch: &GraphBatch) -> Result<Tensor> {
        let pooled = self.embed(batch)?;
        Ok(self.head.forward(&pooled)?)
    }

    /// Pooled graph embeddings before the head, shape
    /// `(num_graphs, embedding_dim)`.
    pub fn embed(&self, batch: &GraphBatch) -> Result<Tensor> {
        if batch.feature_dim() != self.config.input_dim {
            return Err(GnnError::InvalidGraph(format!(
                "batch has {} node features, model expects {}",
                batch.feature_dim(),
                self.config.input_dim
            )));
        }

        let propagation = match self.config.kind {
            GraphConvKind::Plain => Propagation::Plain(GcnPropagation::new(batch)?),
            GraphConvKind::Relational { num_relations } => {
                Propagation::Relational(RelationalPropagation::new(batch, num_relations)?)
            }
        };

        let mut x = batch.x().clone();
        for conv in &self.convs {
            x = conv.forward(&x, &propagation)?.relu()?;
        }

        Ok(self
            .config
            .pooling
            .apply(&x, batch.batch(), batch.num_graphs())?)
    }

    /// Number of learnable scalars.
    pub fn parameter_count(&self) -> usize {
        let head = self.head.weight().elem_count()
            + self.head.bias().map(|b| b.elem_count()).unwrap_or(0);
        self.convs.iter().map(GraphConv::parameter_count).sum::<usize>() + head
    }
}
