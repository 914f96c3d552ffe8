//! Snapshot, value and payload types shared by the calculators

pub mod context;
pub mod fee;
pub mod fixed_point;
pub mod loan;
pub mod operation;
pub mod pool;
pub mod rate;
pub mod wallet;
