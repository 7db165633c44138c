pub mod client;
pub mod period;
pub mod store;
