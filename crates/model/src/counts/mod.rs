pub mod data_counts;

pub use data_counts::DataCounts;
