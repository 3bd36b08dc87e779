//! molfuse-common: Execution context and parameter initialisation shared by the
//! graph models and the fusion trainer.

pub mod device;
pub mod error;
pub mod init;

pub use device::{DevicePreference, ExecutionContext};
pub use error::{CommonError, Result};
pub use init::seed_parameters;
