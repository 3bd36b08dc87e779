//! Mini-batch iteration over a split.

use candle_core::{Device, Tensor};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::embeddings::Split;
use crate::Result;

/// Plans the batches of one pass over a split.
///
/// With shuffling the order is drawn from the caller's RNG, so a seeded
/// generator reproduces the same batches.
#[derive(Debug, Clone, Copy)]
pub struct DataLoader {
    batch_size: usize,
    shuffle: bool,
}

impl DataLoader {
    pub fn new(batch_size: usize, shuffle: bool) -> Self {
        Self {
            batch_size: batch_size.max(1),
            shuffle,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// `ceil(len / batch_size)`
    pub fn num_batches(&self, len: usize) -> usize {
        len.div_ceil(self.batch_size)
    }

    /// Split `split` into `(x, y)` batches on `device`. The last batch may
    /// be short.
    pub fn batches(
        &self,
        split: &Split,
        rng: &mut StdRng,
        device: &Device,
    ) -> Result<Vec<(Tensor, Tensor)>> {
        let len = split.len();
        let mut order: Vec<u32> = (0..len as u32).collect();
        if self.shuffle {
            order.shuffle(rng);
        }

        let mut out = Vec::with_capacity(self.num_batches(len));
        for chunk in order.chunks(self.batch_size) {
            let idx = Tensor::new(chunk, split.x().device())?;
            let x = split.x().index_select(&idx, 0)?.to_device(device)?;
            let y = split.y().index_select(&idx, 0)?.to_device(device)?;
            out.push((x, y));
        }
        Ok(out)
    }
}
