pub mod errors;
pub mod features;
pub mod history;
pub mod instrument;
pub mod ports;
pub mod quote;
