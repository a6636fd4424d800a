pub mod clients;
pub mod errors;
pub mod middleware;
pub mod read_state;
pub mod types;

pub use errors::{AppError, AppResult, ErrorCode};
pub use read_state::{ReadMap, ReadMark};
pub use types::*;
