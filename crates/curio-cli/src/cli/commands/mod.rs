//! CLI command handlers.

pub mod auth;
pub mod config;
pub mod shell;
pub mod status;

use std::sync::Arc;

use anyhow::{Context, Result};
use curio_core::clock::SystemClock;
use curio_core::config::{Config, paths};
use curio_core::storage::MemoryTabStorage;
use curio_core::surface::{ChannelSurface, SurfaceEvent};
use curio_core::{AccessGate, AuthController, AuthDeps, AuthSettings, Rendered};
use curio_providers::HostedAuthProvider;
use tokio::sync::mpsc;

pub type Controller = AuthController<HostedAuthProvider>;

/// One "tab": a controller over the hosted provider, with navigation and
/// notices routed to stdout.
pub struct App {
    pub controller: Arc<Controller>,
    surface: Arc<ChannelSurface>,
    events: mpsc::UnboundedReceiver<SurfaceEvent>,
    gate_timeout: std::time::Duration,
}

impl App {
    pub fn new(config: &Config) -> Result<Self> {
        let provider = HostedAuthProvider::new(&config.auth, paths::session_path())
            .context("set up auth provider")?;
        let (surface, events) = ChannelSurface::new();
        let surface = Arc::new(surface);

        let deps = AuthDeps {
            storage: Arc::new(MemoryTabStorage::new()),
            clock: Arc::new(SystemClock),
            navigator: Arc::clone(&surface) as _,
            notifier: Arc::clone(&surface) as _,
        };
        let controller = AuthController::new(
            Arc::new(provider),
            deps,
            AuthSettings::from(&config.auth),
        );

        Ok(Self {
            controller: Arc::new(controller),
            surface,
            events,
            gate_timeout: config.auth.gate_timeout(),
        })
    }

    /// Prints every effect emitted so far.
    pub fn flush(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            print_event(&event);
        }
    }

    /// Waits for the next effect. `None` once every sender is gone.
    pub async fn next_event(&mut self) -> Option<SurfaceEvent> {
        self.events.recv().await
    }

    /// Waits for the initial session check.
    pub async fn wait_loaded(&self) {
        let mut rx = self.controller.store().subscribe();
        // The sender lives in the controller, which outlives this borrow.
        let _ = rx.wait_for(|snap| !snap.loading).await;
    }

    /// Opens the protected admin view behind an access gate.
    pub async fn open_admin(&mut self) {
        let mut gate = AccessGate::mount(
            self.controller.store(),
            self.gate_timeout,
            Arc::clone(&self.surface) as _,
            Arc::clone(&self.surface) as _,
        );
        gate.settled().await;

        let identity = self.controller.current_identity();
        let view = gate.render(|| match identity.and_then(|i| i.email) {
            Some(email) => format!("Admin dashboard (signed in as {email})"),
            None => "Admin dashboard".to_string(),
        });
        gate.unmount().await;

        self.flush();
        if let Rendered::Content(view) = view {
            println!("{view}");
        }
    }
}

pub fn print_event(event: &SurfaceEvent) {
    match event {
        SurfaceEvent::Notice(notice) => println!("{notice}"),
        SurfaceEvent::Navigate(route) => println!("-> {route}"),
    }
}
