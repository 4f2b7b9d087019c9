pub mod gbdt;
pub mod kernel_ridge;
pub mod linear;
pub mod scaled;

pub mod factory;
pub mod regressor_trait;

pub use regressor_trait::Regressor;
