//! Seeded parameter initialisation.
//!
//! candle cannot reseed its CPU generator, so models are built through a
//! `VarMap` as usual and their variables are then overwritten here from a
//! seeded `StdRng`. Every variable is drawn from `U(-1/sqrt(fan_in),
//! 1/sqrt(fan_in))`, the PyTorch `nn.Linear` default.

use std::collections::HashMap;

use candle_core::{DType, Tensor, Var};
use candle_nn::VarMap;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::{CommonError, Result};

/// Fan-in of a variable from its shape and name.
///
/// Weight matrices are stored `(out, in)` for linear maps and
/// `(relations, in, out)` for per-relation maps, so the fan-in is always
/// the second dimension. Biases borrow the fan-in of their sibling
/// `weight`.
fn fan_in(name: &str, dims: &[usize], all: &HashMap<String, Var>) -> usize {
    match dims {
        [] => 1,
        [n] => name
            .strip_suffix("bias")
            .and_then(|prefix| all.get(&format!("{prefix}weight")))
            .and_then(|w| w.dims().get(1).copied())
            .unwrap_or(*n),
        [_, n, ..] => *n,
    }
}

/// Overwrite every variable in `varmap` with values drawn from a generator
/// seeded by `seed`.
///
/// Variables are visited in name order so the result does not depend on
/// hash-map iteration order.
pub fn seed_parameters(varmap: &VarMap, seed: u64) -> Result<()> {
    let data = varmap
        .data()
        .lock()
        .map_err(|e| CommonError::Init(format!("var map lock poisoned: {e}")))?;

    let mut names: Vec<&String> = data.keys().collect();
    names.sort();

    let mut rng = StdRng::seed_from_u64(seed);
    for name in names {
        let var = &data[name];
        let dims = var.dims().to_vec();
        let bound = 1.0 / (fan_in(name, &dims, &data).max(1) as f32).sqrt();
        let dist = Uniform::new_inclusive(-bound, bound);

        let values: Vec<f32> = (0..var.elem_count()).map(|_| dist.sample(&mut rng)).collect();
        let fresh = Tensor::from_vec(values, dims.as_slice(), var.device())?;
        let fresh = if var.dtype() == DType::F32 {
            fresh
        } else {
            fresh.to_dtype(var.dtype())?
        };
        var.set(&fresh)?;
    }

    debug!("Seeded {} parameter tensors with seed {}", data.len(), seed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;
    use candle_nn::{linear, VarBuilder};

    fn build(seed: u64) -> VarMap {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        linear(4, 3, vb.pp("fc0")).unwrap();
        linear(3, 1, vb.pp("fc1")).unwrap();
        seed_parameters(&varmap, seed).unwrap();
        varmap
    }

    fn flat(varmap: &VarMap, name: &str) -> Vec<f32> {
        let data = varmap.data().lock().unwrap();
        data[name].as_tensor().flatten_all().unwrap().to_vec1().unwrap()
    }

    #[test]
    fn test_same_seed_same_parameters() {
        let a = build(11);
        let b = build(11);
        assert_eq!(flat(&a, "fc0.weight"), flat(&b, "fc0.weight"));
        assert_eq!(flat(&a, "fc1.bias"), flat(&b, "fc1.bias"));
    }

    #[test]
    fn test_different_seed_different_parameters() {
        let a = build(1);
        let b = build(2);
        assert_ne!(flat(&a, "fc0.weight"), flat(&b, "fc0.weight"));
    }

    #[test]
    fn test_values_respect_fan_in_bound() {
        let varmap = build(5);
        let bound = 1.0 / 4f32.sqrt();
        for v in flat(&varmap, "fc0.weight").into_iter().chain(flat(&varmap, "fc0.bias")) {
            assert!(v.abs() <= bound + 1e-6, "{v} outside +/-{bound}");
        }
    }
}
