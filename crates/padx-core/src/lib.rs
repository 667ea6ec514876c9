pub mod config;
pub mod error;
pub mod naming;

pub use config::PadxConfig;
pub use error::{PadxError, PadxResult, EXIT_ERROR, EXIT_REJECTED, EXIT_SUCCESS};
pub use naming::{PadPairPaths, PadState};
