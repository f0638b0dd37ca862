//! Shared data types for the curio auth core.
//!
//! Leaf crate: no I/O, no async. Everything here is plain data that the
//! controller, the access gate, the providers and the CLI pass around.

mod error;
mod notice;
mod route;
mod session;

pub use error::{AuthError, ProviderError, ProviderErrorKind};
pub use notice::{Notice, NoticeLevel};
pub use route::Route;
pub use session::{AuthChange, AuthChangeKind, Identity, Session};
