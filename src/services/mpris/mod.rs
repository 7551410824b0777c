/// Media player error types
pub mod error;
/// Player set management and favored player selection
pub mod manager;
/// Track metadata normalization
pub mod metadata;
/// D-Bus proxy trait definitions
pub mod proxy;
/// Bus name discovery
pub mod registry;
/// Per-player session lifecycle and control
pub mod session;
/// Player types and events
pub mod types;

pub use error::*;
pub use manager::*;
pub use metadata::*;
pub use proxy::*;
pub use registry::*;
pub use session::*;
pub use types::*;
