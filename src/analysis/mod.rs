//! Analysis modules.
//!
//! Pure, in-memory derivations over fetched report rows.

pub mod aggregator;
pub mod discharges;
pub mod window;

pub use aggregator::*;
pub use discharges::*;
