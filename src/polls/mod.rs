//! Poll lifecycle rules and the voting workflow.

mod eligibility;
mod voting;

pub use eligibility::*;
pub use voting::*;
