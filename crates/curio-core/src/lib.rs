//! Curio auth core (controller, session store, throttle, access gate, config).

pub mod clock;
pub mod config;
pub mod controller;
pub mod gate;
pub mod logging;
pub mod provider;
pub mod storage;
pub mod store;
pub mod surface;
pub mod throttle;

pub use controller::{AuthController, AuthDeps, AuthScope, AuthSettings, ExpiryCheck};
pub use gate::{AccessGate, GateState, Rendered};
pub use provider::{AuthChannel, AuthSubscription, IdentityProvider};
pub use store::{AuthSnapshot, SessionEnd, SessionStore};
