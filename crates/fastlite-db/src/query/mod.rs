//! The fast path: one compiled statement driven through raw bind/step/read
//! primitives with no intermediate allocation.

mod binder;
mod fast;
mod reader;

pub use binder::{BindAction, QueryBinder};
pub use fast::FastQuery;
pub use reader::{QueryReader, StepReader};
