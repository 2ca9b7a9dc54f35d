mod scalar;
mod space;

#[cfg(test)]
pub mod mock;

pub use scalar::ScalarIo;
pub use space::{Address, AddressSpace, TargetMode};

#[cfg(test)]
pub use mock::MockSpace;
