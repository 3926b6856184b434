pub mod backward_pass;
pub mod delay;
pub mod forward_pass;

pub use backward_pass::BackwardPass;
pub use delay::DelayPass;
pub use forward_pass::ForwardPass;
