pub mod accrual;
pub mod delegation;
pub mod distribution;

pub use accrual::*;
pub use delegation::*;
pub use distribution::*;
