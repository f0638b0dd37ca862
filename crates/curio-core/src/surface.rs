//! Side-effect capabilities: navigation and the notification surface.

use curio_types::{Notice, Route};
use tokio::sync::mpsc;

pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// A side effect as observed by whoever drains a [`ChannelSurface`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEvent {
    Navigate(Route),
    Notice(Notice),
}

/// Navigator + notifier that forwards every effect, in order, over a channel.
#[derive(Debug, Clone)]
pub struct ChannelSurface {
    tx: mpsc::UnboundedSender<SurfaceEvent>,
}

impl ChannelSurface {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SurfaceEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: SurfaceEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("surface receiver dropped; effect discarded");
        }
    }
}

impl Navigator for ChannelSurface {
    fn navigate(&self, route: Route) {
        self.send(SurfaceEvent::Navigate(route));
    }
}

impl Notifier for ChannelSurface {
    fn notify(&self, notice: Notice) {
        self.send(SurfaceEvent::Notice(notice));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effects_arrive_in_order() {
        let (surface, mut rx) = ChannelSurface::new();
        surface.notify(Notice::error("nope"));
        surface.navigate(Route::Login);

        assert_eq!(
            rx.try_recv().unwrap(),
            SurfaceEvent::Notice(Notice::error("nope"))
        );
        assert_eq!(rx.try_recv().unwrap(), SurfaceEvent::Navigate(Route::Login));
        assert!(rx.try_recv().is_err());
    }
}
