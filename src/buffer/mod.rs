pub mod batch;

pub use batch::{BatchError, ItemBatch};
