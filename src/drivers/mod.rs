pub mod store;

pub use store::{PageBuffer, Store};
