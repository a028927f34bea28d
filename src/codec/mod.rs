pub mod npz;
pub mod pt;
