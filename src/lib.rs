#![allow(missing_docs)]

pub mod checkpoint;
pub mod error;
pub mod model;
pub mod setup;
