//! Access gate: guards a protected view.
//!
//! [`AccessGate::mount`] evaluates the session store immediately, then keeps
//! a task that feeds store changes and the one-shot verification timeout into
//! the [`GateMachine`] and executes the effects it returns. Unmounting (drop
//! or [`AccessGate::unmount`]) cancels both the watcher and the timer.

mod machine;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub use machine::{GateEffect, GateInput, GateMachine, GateState};

use crate::store::{AuthSnapshot, SessionStore};
use crate::surface::{Navigator, Notifier};

/// What the guarded view shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered<T> {
    /// Neutral loading affordance.
    Loading,
    /// Nothing: the redirect to sign-in supersedes.
    Nothing,
    Content(T),
}

struct Effects {
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    timeout: Duration,
}

impl Effects {
    fn apply(&self, effects: Vec<GateEffect>, deadline: &mut Option<Instant>) {
        for effect in effects {
            match effect {
                GateEffect::ArmTimeout => *deadline = Some(Instant::now() + self.timeout),
                GateEffect::CancelTimeout => *deadline = None,
                GateEffect::Notify(notice) => self.notifier.notify(notice),
                GateEffect::Navigate(route) => self.navigator.navigate(route),
            }
        }
    }
}

pub struct AccessGate {
    state_rx: watch::Receiver<GateState>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl AccessGate {
    /// Mounts a gate over `store`. Must be called inside a tokio runtime.
    pub fn mount(
        store: &SessionStore,
        timeout: Duration,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let effects = Effects {
            navigator,
            notifier,
            timeout,
        };
        let mut machine = GateMachine::new();
        let mut auth_rx = store.subscribe();
        let mut deadline = None;

        let initial = GateInput::from(&*auth_rx.borrow_and_update());
        effects.apply(machine.update(initial), &mut deadline);

        let (state_tx, state_rx) = watch::channel(machine.state());
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(
            machine,
            auth_rx,
            state_tx,
            effects,
            deadline,
            cancel.clone(),
        ));

        Self {
            state_rx,
            cancel,
            task: Some(task),
        }
    }

    pub fn state(&self) -> GateState {
        *self.state_rx.borrow()
    }

    /// Subscribes to state transitions.
    pub fn watch(&self) -> watch::Receiver<GateState> {
        self.state_rx.clone()
    }

    /// Waits until the gate leaves `Checking` and returns the state.
    pub async fn settled(&mut self) -> GateState {
        let settled = self
            .state_rx
            .wait_for(|state| *state != GateState::Checking)
            .await
            .map(|state| *state);
        match settled {
            Ok(state) => state,
            Err(_) => *self.state_rx.borrow(),
        }
    }

    /// Renders according to the current state; `guarded` runs only when
    /// authorized.
    pub fn render<T>(&self, guarded: impl FnOnce() -> T) -> Rendered<T> {
        match self.state() {
            GateState::Checking => Rendered::Loading,
            GateState::Denied => Rendered::Nothing,
            GateState::Authorized => Rendered::Content(guarded()),
        }
    }

    /// Cancels the watcher and any pending timeout, and waits for the task.
    pub async fn unmount(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take()
            && let Err(err) = task.await
        {
            tracing::warn!(error = %err, "gate task ended abnormally");
        }
    }
}

impl Drop for AccessGate {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run(
    mut machine: GateMachine,
    mut auth_rx: watch::Receiver<AuthSnapshot>,
    state_tx: watch::Sender<GateState>,
    effects: Effects,
    mut deadline: Option<Instant>,
    cancel: CancellationToken,
) {
    let mut auth_open = true;

    loop {
        if !auth_open && deadline.is_none() {
            break;
        }

        let armed = deadline;
        let timer = async move {
            match armed {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        let input = tokio::select! {
            () = cancel.cancelled() => break,
            changed = auth_rx.changed(), if auth_open => {
                if changed.is_err() {
                    auth_open = false;
                    continue;
                }
                GateInput::from(&*auth_rx.borrow_and_update())
            }
            () = timer => {
                deadline = None;
                GateInput::TimedOut
            }
        };

        let before = machine.state();
        effects.apply(machine.update(input), &mut deadline);
        let after = machine.state();
        if before != after {
            tracing::debug!(?before, ?after, "access gate transition");
            state_tx.send_replace(after);
        }
    }
}
