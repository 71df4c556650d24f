pub mod partitioner;
pub mod selection;
