//! Identity provider implementations for curio.

pub mod hosted;
pub mod session_file;

pub use hosted::HostedAuthProvider;
pub use session_file::SessionFile;
