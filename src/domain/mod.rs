pub mod arithmetic;
pub mod errors;
pub mod functions;
pub mod models;
pub mod parser;
pub mod sequence;
pub mod services;

pub use errors::*;
pub use functions::{FunctionImpl, FunctionRegistry};
pub use models::*;
pub use services::*;
