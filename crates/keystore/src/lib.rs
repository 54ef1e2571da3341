pub mod error;
mod keystore;
mod lms_backend;

pub use error::KeystoreError;
pub use keystore::{Keystore, NewKey, SignResult};
pub use lms_backend::DEFAULT_PARAMETER_SET;
