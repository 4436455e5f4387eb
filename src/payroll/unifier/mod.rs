pub mod aggregate;
pub mod classify;
pub mod error;
pub mod io;
pub mod model;
pub mod normalize;
pub mod period;
pub mod reconcile;
pub mod report;
pub mod run;
pub mod source;

pub use error::{Result, UnifierError};
