//! The one loop that owns the dice session.
//!
//! Connection tasks only forward [`Event`]s; every frame is handled here to
//! completion, in arrival order, before the next one is looked at.

use crate::session::{self, Store};
use std::{net::SocketAddr, sync::Arc};
use tokio::sync::mpsc;
use wifidice::{Error, RandomSource, ServerFrame, SessionState};

#[derive(Debug)]
pub enum Event {
    Connected {
        id: session::ID,
        address: SocketAddr,
        tx: mpsc::Sender<String>,
    },
    Disconnected { id: session::ID },
    Text { id: session::ID, bytes: Vec<u8> },
    Binary { id: session::ID, bytes: Vec<u8> },
}

pub struct Device<R> {
    state: SessionState,
    rng: R,
    clients: Arc<Store>,
    error_replies: bool,
}

impl<R: RandomSource> Device<R> {
    pub fn new(state: SessionState, rng: R, clients: Arc<Store>, error_replies: bool) -> Self {
        Self {
            state,
            rng,
            clients,
            error_replies,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Checks that the entropy source answers before any client is served.
    pub fn start(&mut self) {
        match self.rng.next(0, 2) {
            Ok(_) => tracing::info!("entropy source ready"),
            Err(err @ Error::EntropyUnavailable(_)) => self.state.fail(err.to_string()),
            Err(err) => tracing::warn!(%err, "unexpected entropy probe result"),
        }
    }

    pub async fn run(mut self, mut events: mpsc::Receiver<Event>) {
        while let Some(event) = events.recv().await {
            self.handle(event);
        }
        tracing::debug!("event channel closed, device loop stopping");
    }

    pub fn handle(&mut self, event: Event) {
        match event {
            Event::Connected { id, address, tx } => {
                self.clients.insert(id, tx);
                tracing::info!(%id, %address, clients = self.clients.len(), "client connected");
                self.clients.send_to(&id, &ServerFrame::Greeting);
            }
            Event::Disconnected { id } => {
                tracing::info!(%id, "client disconnected");
                self.clients.remove(&id);
            }
            Event::Text { id, bytes } => {
                tracing::debug!(%id, text = %String::from_utf8_lossy(&bytes), "received text");
                let outcome = self.state.handle_frame(&bytes, &mut self.rng);
                let snapshot = match outcome.snapshot {
                    Some(snapshot) => snapshot,
                    None => return,
                };
                self.clients.broadcast(&ServerFrame::Snapshot(snapshot));
                if let (true, Some(err)) = (self.error_replies, outcome.rejected) {
                    self.clients.send_to(
                        &id,
                        &ServerFrame::Error {
                            error: err.to_string(),
                        },
                    );
                }
            }
            Event::Binary { id, bytes } => {
                tracing::debug!(%id, len = bytes.len(), hex = %hex::encode(&bytes), "received binary, ignoring");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wifidice::{
        random::{Scripted, Unavailable},
        Snapshot,
    };

    struct Harness<R> {
        device: Device<R>,
        id: session::ID,
        rx: mpsc::Receiver<String>,
    }

    fn harness<R: RandomSource>(rng: R, error_replies: bool) -> Harness<R> {
        let clients = Arc::new(Store::default());
        let mut device = Device::new(SessionState::default(), rng, clients, error_replies);
        let (id, mut rx) = connect(&mut device);
        assert_eq!(rx.try_recv().unwrap(), wifidice::GREETING);
        Harness { device, id, rx }
    }

    fn connect<R: RandomSource>(device: &mut Device<R>) -> (session::ID, mpsc::Receiver<String>) {
        let id = session::ID::new_v4();
        let (tx, rx) = mpsc::channel(8);
        device.handle(Event::Connected {
            id,
            address: "127.0.0.1:5000".parse().unwrap(),
            tx,
        });
        (id, rx)
    }

    fn text(id: session::ID, text: &str) -> Event {
        Event::Text {
            id,
            bytes: text.as_bytes().to_vec(),
        }
    }

    fn snapshot(frame: String) -> Snapshot {
        match ServerFrame::parse(&frame).unwrap() {
            ServerFrame::Snapshot(snapshot) => snapshot,
            other => panic!("expected snapshot, got {:?}", other),
        }
    }

    #[test]
    fn greets_on_connect() {
        let mut h = harness(Scripted::default(), false);
        let (_, mut rx) = connect(&mut h.device);
        assert_eq!(rx.try_recv().unwrap(), wifidice::GREETING);
        assert!(rx.try_recv().is_err());
        assert!(h.rx.try_recv().is_err());
        assert_eq!(h.device.state().history().len(), 0);
    }

    #[test]
    fn greeting_precedes_earlier_broadcasts() {
        let mut h = harness(Scripted::new([4, 2]), false);
        h.device.handle(text(h.id, "R6*"));
        let (bob, mut rx) = connect(&mut h.device);
        assert_eq!(rx.try_recv().unwrap(), wifidice::GREETING);
        assert!(rx.try_recv().is_err());

        h.device.handle(text(bob, "R6*"));
        assert_eq!(snapshot(rx.try_recv().unwrap()).toss_history, [2, 4]);
    }

    #[test]
    fn roll_is_broadcast() {
        let mut h = harness(Scripted::new([4]), false);
        h.device.handle(text(h.id, "R6*"));
        assert_eq!(h.rx.try_recv().unwrap(), r#"{"RN":4,"UB":6,"tossHist":[4]}"#);
    }

    #[test]
    fn unrecognized_rebroadcasts() {
        let mut h = harness(Scripted::new([4]), false);
        h.device.handle(text(h.id, "R6*"));
        let first = h.rx.try_recv().unwrap();
        h.device.handle(text(h.id, "hello"));
        assert_eq!(h.rx.try_recv().unwrap(), first);
    }

    #[test]
    fn truncated_without_error_reply() {
        let mut h = harness(Scripted::default(), false);
        h.device.handle(text(h.id, "R5"));
        assert_eq!(snapshot(h.rx.try_recv().unwrap()), SessionState::default().snapshot());
        assert!(h.rx.try_recv().is_err());
    }

    #[test]
    fn truncated_with_error_reply() {
        let mut h = harness(Scripted::default(), true);
        h.device.handle(text(h.id, "R5"));
        snapshot(h.rx.try_recv().unwrap());
        assert_eq!(
            ServerFrame::parse(&h.rx.try_recv().unwrap()).unwrap(),
            ServerFrame::Error {
                error: Error::TruncatedCommand.to_string()
            }
        );
    }

    #[test]
    fn binary_is_ignored() {
        let mut h = harness(Scripted::default(), false);
        h.device.handle(Event::Binary {
            id: h.id,
            bytes: vec![0x52, 0x36, 0x2a],
        });
        assert!(h.rx.try_recv().is_err());
    }

    #[test]
    fn disconnect_unregisters() {
        let mut h = harness(Scripted::default(), false);
        h.device.handle(Event::Disconnected { id: h.id });
        h.device.handle(text(h.id, "R6*"));
        assert!(h.rx.try_recv().is_err());
    }

    #[test]
    fn failed_probe_stops_traffic() {
        let mut h = harness(Unavailable, false);
        h.device.start();
        assert!(h.device.state().is_failed());
        h.device.handle(text(h.id, "R6*"));
        assert!(h.rx.try_recv().is_err());
    }

    #[test]
    fn successful_probe() {
        let mut h = harness(Scripted::new([1, 3]), false);
        h.device.start();
        assert!(!h.device.state().is_failed());
        h.device.handle(text(h.id, "R6*"));
        assert_eq!(snapshot(h.rx.try_recv().unwrap()).random_number, 3);
    }
}
