//! Access gate reducer.
//!
//! Pure state machine: takes an input, mutates state, returns effects for
//! the runtime to execute. Never performs I/O or touches timers directly.
//!
//! ```text
//!            loading=false, session
//! Checking ───────────────────────────▶ Authorized
//!    │  loading=false, no session              │ session lost (silent if the
//!    │  or timeout                             ▼ controller already redirected)
//!    └───────────────────────────────────▶  Denied
//!                                             │ session appears
//!                                             └──▶ Authorized
//! ```

use curio_types::{AuthError, Notice, Route};

use crate::store::AuthSnapshot;

const SIGN_IN_REQUIRED_MESSAGE: &str = "Please sign in to access this page";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Checking,
    Authorized,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateInput {
    /// The auth state as of now. `redirected` means the controller ended
    /// the session itself and has already notified and navigated.
    Auth {
        loading: bool,
        has_session: bool,
        redirected: bool,
    },
    /// The one-shot verification timer fired.
    TimedOut,
}

impl From<&AuthSnapshot> for GateInput {
    fn from(snapshot: &AuthSnapshot) -> Self {
        GateInput::Auth {
            loading: snapshot.loading,
            has_session: snapshot.has_session(),
            redirected: snapshot.ended.is_some(),
        }
    }
}

/// Commands returned by [`GateMachine::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateEffect {
    ArmTimeout,
    CancelTimeout,
    Notify(Notice),
    Navigate(Route),
}

#[derive(Debug)]
pub struct GateMachine {
    state: GateState,
    timeout_armed: bool,
}

impl Default for GateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl GateMachine {
    pub fn new() -> Self {
        Self {
            state: GateState::Checking,
            timeout_armed: false,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn update(&mut self, input: GateInput) -> Vec<GateEffect> {
        match (self.state, input) {
            (GateState::Checking, GateInput::Auth { loading: true, .. }) => {
                if self.timeout_armed {
                    vec![]
                } else {
                    self.timeout_armed = true;
                    vec![GateEffect::ArmTimeout]
                }
            }
            (GateState::Checking, GateInput::Auth { has_session: true, .. }) => {
                self.state = GateState::Authorized;
                self.disarm()
            }
            (GateState::Checking, GateInput::Auth { .. }) => {
                let mut effects = self.disarm();
                effects.extend(self.deny(Notice::error(SIGN_IN_REQUIRED_MESSAGE)));
                effects
            }
            (GateState::Checking, GateInput::TimedOut) => {
                self.timeout_armed = false;
                self.deny(AuthError::VerificationTimeout.notice())
            }
            (
                GateState::Authorized,
                GateInput::Auth {
                    loading: false,
                    has_session: false,
                    redirected,
                },
            ) => {
                if redirected {
                    self.state = GateState::Denied;
                    vec![]
                } else {
                    self.deny(Notice::error(SIGN_IN_REQUIRED_MESSAGE))
                }
            }
            (
                GateState::Denied,
                GateInput::Auth {
                    loading: false,
                    has_session: true,
                    ..
                },
            ) => {
                self.state = GateState::Authorized;
                vec![]
            }
            // Stale timer, repeated renders, or no change in session presence.
            _ => vec![],
        }
    }

    fn disarm(&mut self) -> Vec<GateEffect> {
        if self.timeout_armed {
            self.timeout_armed = false;
            vec![GateEffect::CancelTimeout]
        } else {
            vec![]
        }
    }

    fn deny(&mut self, notice: Notice) -> Vec<GateEffect> {
        self.state = GateState::Denied;
        vec![GateEffect::Notify(notice), GateEffect::Navigate(Route::Login)]
    }
}
