mod balance;
mod entry;
mod money;

pub use balance::*;
pub use entry::*;
pub use money::*;
