//! Run the reference GCN and RGCN architectures on a few synthetic molecules

use candle_core::DType;
use candle_nn::{VarBuilder, VarMap};
use molfuse_common::{seed_parameters, ExecutionContext};
use molfuse_gnn::{GraphLoader, GraphModelConfig, GraphRegressionModel};
use molfuse_test_utils::ring_molecule;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("molfuse=debug,info").init();

    let ctx = ExecutionContext::cpu(42);
    let feature_dim = 8;
    let num_relations = 4;
    let molecules: Vec<_> = (3..9)
        .map(|n| ring_molecule(n, feature_dim, num_relations))
        .collect::<Result<_, _>>()?;

    for config in [
        GraphModelConfig::gcn(feature_dim),
        GraphModelConfig::rgcn(feature_dim, num_relations),
    ] {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, ctx.device());
        let model = GraphRegressionModel::new(config, vb)?;
        seed_parameters(&varmap, ctx.seed())?;

        println!(
            "{:?}: {} parameters, stages {:?}",
            model.config().kind,
            model.parameter_count(),
            model.config().hidden_dims
        );

        for batch in GraphLoader::new(&molecules, 4, ctx.device()) {
            let batch = batch?;
            let predictions = model.forward(&batch)?.squeeze(1)?.to_vec1::<f32>()?;
            println!("  {} graphs -> {:?}", batch.num_graphs(), predictions);
        }
    }

    Ok(())
}
