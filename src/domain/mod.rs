pub mod limits;
pub mod loan;
pub mod money;
pub mod ports;
pub mod schedule;
pub mod transaction;
pub mod wallet;
