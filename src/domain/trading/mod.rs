// Core trading domain entities and value objects
pub mod account;
pub mod instrument;
pub mod trade;
pub mod types;
