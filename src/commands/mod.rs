pub mod experiment;
pub mod load;
