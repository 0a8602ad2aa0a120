//! In-memory [`Gateway`] for orchestration tests.
//!
//! Replies are scripted up front. Batch fetches can be held on a oneshot
//! gate so a test decides the order in which concurrent fetches resolve.

use super::error::GatewayError;
use super::{BatchTimetable, ClearResponse, Gateway, NO_ACTIVE_TIMETABLE};
use crate::schedule::{Assignment, Batch, Faculty, Room, Subject, Timetable};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::oneshot;

type Reply<T> = Result<T, GatewayError>;

pub(crate) struct FakeGateway {
    pub rooms: Mutex<Reply<Vec<Room>>>,
    pub faculty: Mutex<Reply<Vec<Faculty>>>,
    pub subjects: Mutex<Reply<Vec<Subject>>>,
    pub batches: Mutex<Reply<Vec<Batch>>>,
    pub timetables: Mutex<Reply<Vec<Timetable>>>,
    pub batch_timetables: Mutex<HashMap<String, Reply<BatchTimetable>>>,
    pub assignments: Mutex<HashMap<String, Reply<Vec<Assignment>>>>,
    pub generated: Mutex<Option<Reply<Timetable>>>,
    pub activation: Mutex<Reply<()>>,
    pub cleared: Mutex<Reply<ClearResponse>>,
    batches_gate: Mutex<Option<oneshot::Receiver<()>>>,
    timetable_gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    assignment_gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    calls: Mutex<Vec<String>>,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self {
            rooms: Mutex::new(Ok(Vec::new())),
            faculty: Mutex::new(Ok(Vec::new())),
            subjects: Mutex::new(Ok(Vec::new())),
            batches: Mutex::new(Ok(Vec::new())),
            timetables: Mutex::new(Ok(Vec::new())),
            batch_timetables: Mutex::new(HashMap::new()),
            assignments: Mutex::new(HashMap::new()),
            generated: Mutex::new(None),
            activation: Mutex::new(Ok(())),
            cleared: Mutex::new(Ok(ClearResponse::default())),
            batches_gate: Mutex::new(None),
            timetable_gates: Mutex::new(HashMap::new()),
            assignment_gates: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batches(self, batches: Vec<Batch>) -> Self {
        *self.batches.lock() = Ok(batches);
        self
    }

    pub fn set_timetable(&self, batch_id: &str, reply: Reply<BatchTimetable>) {
        self.batch_timetables
            .lock()
            .insert(batch_id.to_string(), reply);
    }

    pub fn set_assignments(&self, batch_id: &str, reply: Reply<Vec<Assignment>>) {
        self.assignments.lock().insert(batch_id.to_string(), reply);
    }

    /// Holds the next roster fetch. Its reply is the one scripted when the
    /// call was made, not when the gate opens.
    pub fn gate_batches(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.batches_gate.lock() = Some(rx);
        tx
    }

    /// Holds the next timetable fetch for `batch_id` until the returned
    /// sender fires (or is dropped).
    pub fn gate_timetable(&self, batch_id: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.timetable_gates.lock().insert(batch_id.to_string(), rx);
        tx
    }

    pub fn gate_assignments(&self, batch_id: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.assignment_gates
            .lock()
            .insert(batch_id.to_string(), rx);
        tx
    }

    /// Names of the calls made so far, e.g. `"batch_timetable:b1"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }

    async fn wait(gates: &Mutex<HashMap<String, oneshot::Receiver<()>>>, key: &str) {
        let gate = gates.lock().remove(key);
        if let Some(rx) = gate {
            let _ = rx.await;
        }
    }
}

fn not_scripted(what: &str) -> GatewayError {
    GatewayError::NotFound {
        message: format!("no scripted reply for {what}"),
    }
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn list_rooms(&self) -> Result<Vec<Room>, GatewayError> {
        self.record("list_rooms".to_string());
        self.rooms.lock().clone()
    }

    async fn list_faculty(&self) -> Result<Vec<Faculty>, GatewayError> {
        self.record("list_faculty".to_string());
        self.faculty.lock().clone()
    }

    async fn list_subjects(&self) -> Result<Vec<Subject>, GatewayError> {
        self.record("list_subjects".to_string());
        self.subjects.lock().clone()
    }

    async fn list_batches(&self) -> Result<Vec<Batch>, GatewayError> {
        self.record("list_batches".to_string());
        let reply = self.batches.lock().clone();
        let gate = self.batches_gate.lock().take();
        if let Some(rx) = gate {
            let _ = rx.await;
        }
        reply
    }

    async fn list_timetables(&self) -> Result<Vec<Timetable>, GatewayError> {
        self.record("list_timetables".to_string());
        self.timetables.lock().clone()
    }

    async fn batch_timetable(&self, batch_id: &str) -> Result<BatchTimetable, GatewayError> {
        self.record(format!("batch_timetable:{batch_id}"));
        Self::wait(&self.timetable_gates, batch_id).await;
        self.batch_timetables
            .lock()
            .get(batch_id)
            .cloned()
            .unwrap_or_else(|| {
                Err(GatewayError::NotFound {
                    message: NO_ACTIVE_TIMETABLE.to_string(),
                })
            })
    }

    async fn batch_assignments(&self, batch_id: &str) -> Result<Vec<Assignment>, GatewayError> {
        self.record(format!("batch_assignments:{batch_id}"));
        Self::wait(&self.assignment_gates, batch_id).await;
        self.assignments
            .lock()
            .get(batch_id)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn generate_timetable(
        &self,
        department: &str,
        semester: u8,
    ) -> Result<Timetable, GatewayError> {
        self.record(format!("generate_timetable:{department}:{semester}"));
        self.generated
            .lock()
            .clone()
            .unwrap_or_else(|| Err(not_scripted("generate")))
    }

    async fn activate_timetable(&self, timetable_id: &str) -> Result<(), GatewayError> {
        self.record(format!("activate_timetable:{timetable_id}"));
        self.activation.lock().clone()
    }

    async fn clear_schedule(
        &self,
        department: &str,
        semester: u8,
    ) -> Result<ClearResponse, GatewayError> {
        self.record(format!("clear_schedule:{department}:{semester}"));
        self.cleared.lock().clone()
    }

    async fn clear_all_schedules(&self) -> Result<ClearResponse, GatewayError> {
        self.record("clear_all_schedules".to_string());
        self.cleared.lock().clone()
    }

    async fn init_sample_data(&self) -> Result<(), GatewayError> {
        self.record("init_sample_data".to_string());
        Ok(())
    }
}
