mod kernels;
pub use kernels::*;

mod separable_filter;
pub use separable_filter::*;
