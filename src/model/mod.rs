//! Model parameter table and construction interface.

pub mod config;
pub mod param;
pub mod role;

pub use crate::error::Error;
pub use burn::{
    config::Config,
    tensor::{DType, TensorData},
};
pub use config::*;
pub use param::*;
pub use role::*;
