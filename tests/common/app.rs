//! [`RecordingApp`], the [`Application`] used in all of the integration tests.

use std::sync::{Arc, Mutex};

use brb_rs::{
    app::Application,
    types::{NodeId, TrackingId},
};

/// One delivery, in the order the protocol made it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Delivery {
    pub(crate) tracking_id: TrackingId,
    pub(crate) payload: Vec<u8>,
    pub(crate) origin: NodeId,
}

pub(crate) type Deliveries = Arc<Mutex<Vec<Delivery>>>;

/// Appends every delivery to a list shared with the test, which reads it through
/// [`deliveries`](RecordingApp::deliveries).
pub(crate) struct RecordingApp {
    deliveries: Deliveries,
}

impl RecordingApp {
    pub(crate) fn new() -> Self {
        Self {
            deliveries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn deliveries(&self) -> Deliveries {
        self.deliveries.clone()
    }
}

impl Application for RecordingApp {
    fn deliver(&mut self, tracking_id: TrackingId, payload: &[u8], origin: NodeId) {
        self.deliveries.lock().unwrap().push(Delivery {
            tracking_id,
            payload: payload.to_vec(),
            origin,
        });
    }
}
