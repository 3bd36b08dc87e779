//! Best-so-far parameter snapshot.

use std::collections::HashMap;
use std::path::Path;

use candle_core::{Device, Tensor};
use candle_nn::VarMap;
use tracing::debug;

use crate::{FusionError, Result};

/// Parameters of the epoch with the lowest validation loss seen so far.
///
/// Never mutated in place: [`BestCheckpoint::consider`] returns either the
/// same record or a new one built from a deep copy of the live variables.
#[derive(Debug, Clone)]
pub struct BestCheckpoint {
    epoch: Option<usize>,
    val_loss: f64,
    params: HashMap<String, Tensor>,
}

impl Default for BestCheckpoint {
    fn default() -> Self {
        Self::empty()
    }
}

impl BestCheckpoint {
    /// No epoch recorded yet; any finite loss improves on it.
    pub fn empty() -> Self {
        Self {
            epoch: None,
            val_loss: f64::INFINITY,
            params: HashMap::new(),
        }
    }

    /// 0-based epoch of the snapshot, if any epoch improved on +inf.
    pub fn epoch(&self) -> Option<usize> {
        self.epoch
    }

    pub fn val_loss(&self) -> f64 {
        self.val_loss
    }

    pub fn params(&self) -> &HashMap<String, Tensor> {
        &self.params
    }

    pub fn is_empty(&self) -> bool {
        self.epoch.is_none()
    }

    /// Keep `self` unless `val_loss` is strictly lower, in which case
    /// snapshot `varmap` at `epoch`.
    pub fn consider(self, epoch: usize, val_loss: f64, varmap: &VarMap) -> Result<Self> {
        if val_loss < self.val_loss {
            debug!(
                "Validation loss improved {:.6} -> {:.6} at epoch {}",
                self.val_loss,
                val_loss,
                epoch + 1
            );
            Ok(Self {
                epoch: Some(epoch),
                val_loss,
                params: snapshot(varmap)?,
            })
        } else {
            Ok(self)
        }
    }

    /// Write the snapshot as safetensors.
    pub fn save(&self, path: &Path) -> Result<()> {
        if self.params.is_empty() {
            return Err(FusionError::Config(
                "no checkpoint recorded; every validation loss was NaN or infinite".to_string(),
            ));
        }
        candle_core::safetensors::save(&self.params, path)?;
        Ok(())
    }

    /// Read a snapshot written by [`BestCheckpoint::save`].
    pub fn load_params(path: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
        Ok(candle_core::safetensors::load(path, device)?)
    }

    /// Copy the snapshot into matching variables of `varmap`.
    pub fn restore_into(&self, varmap: &VarMap) -> Result<()> {
        restore(&self.params, varmap)
    }
}

/// Deep copy of every variable; later optimiser steps do not alter it.
fn snapshot(varmap: &VarMap) -> Result<HashMap<String, Tensor>> {
    let data = varmap
        .data()
        .lock()
        .map_err(|_| FusionError::Config("variable map lock poisoned".to_string()))?;
    let mut params = HashMap::with_capacity(data.len());
    for (name, var) in data.iter() {
        params.insert(name.clone(), var.as_tensor().copy()?);
    }
    Ok(params)
}

pub(crate) fn restore(params: &HashMap<String, Tensor>, varmap: &VarMap) -> Result<()> {
    let data = varmap
        .data()
        .lock()
        .map_err(|_| FusionError::Config("variable map lock poisoned".to_string()))?;
    for (name, var) in data.iter() {
        let value = params
            .get(name)
            .ok_or_else(|| FusionError::Config(format!("checkpoint has no tensor '{name}'")))?;
        var.set(&value.to_device(var.device())?)?;
    }
    Ok(())
}
