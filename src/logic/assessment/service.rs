//! Assessment Service
//!
//! Owns the orchestration tasks. Creation validates and stores the record,
//! then spawns the pipeline with a supervisor that marks the assessment
//! `error` if the task panics or is aborted.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::AbortHandle;
use uuid::Uuid;

use super::orchestrator::Orchestrator;
use super::AssessmentError;
use crate::models::{Assessment, AssessmentSummary, CreateAssessmentRequest};
use crate::store::AssessmentStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    NotFound,
    AlreadyFinished,
    Cancelled,
}

pub struct AssessmentService {
    store: Arc<dyn AssessmentStore>,
    orchestrator: Arc<Orchestrator>,
    tasks: Arc<Mutex<HashMap<Uuid, AbortHandle>>>,
}

impl AssessmentService {
    pub fn new(store: Arc<dyn AssessmentStore>, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            store,
            orchestrator,
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Validate, store and start an assessment. Returns as soon as the task is spawned.
    pub fn create_assessment(
        &self,
        request: CreateAssessmentRequest,
    ) -> Result<Uuid, validator::ValidationErrors> {
        let request = request.into_normalized()?;
        let assessment = Assessment::new(&request);
        let id = assessment.id;
        self.store.put(assessment);

        tracing::info!(
            "Assessment {} queued for {} by {}",
            id,
            request.vendor_domain,
            request.requester_email
        );

        let orchestrator = self.orchestrator.clone();
        let worker = tokio::spawn(async move { orchestrator.execute(id, request).await });
        self.tasks.lock().insert(id, worker.abort_handle());

        let store = self.store.clone();
        let tasks = self.tasks.clone();
        tokio::spawn(async move {
            if let Err(e) = worker.await {
                let error = if e.is_cancelled() {
                    AssessmentError::Cancelled
                } else {
                    AssessmentError::TaskFailed(e.to_string())
                };
                tracing::error!("Assessment {} ended abnormally: {}", id, error);
                let message = error.to_string();
                store.update(&id, &mut |a| {
                    a.fail(&message);
                });
            }
            tasks.lock().remove(&id);
        });

        Ok(id)
    }

    pub fn get_assessment(&self, id: &Uuid) -> Option<Assessment> {
        self.store.get(id)
    }

    /// Newest first
    pub fn list_assessments(&self) -> Vec<AssessmentSummary> {
        self.store.list().iter().map(Assessment::summary).collect()
    }

    /// Abort an in-progress assessment and mark it `error: cancelled`
    pub fn cancel_assessment(&self, id: &Uuid) -> CancelOutcome {
        let Some(current) = self.store.get(id) else {
            return CancelOutcome::NotFound;
        };
        if current.is_terminal() {
            return CancelOutcome::AlreadyFinished;
        }

        let message = AssessmentError::Cancelled.to_string();
        let mut cancelled = false;
        self.store.update(id, &mut |a| {
            cancelled = a.fail(&message);
        });
        if let Some(handle) = self.tasks.lock().remove(id) {
            handle.abort();
        }

        if cancelled {
            tracing::info!("Assessment {} cancelled", id);
            CancelOutcome::Cancelled
        } else {
            // Finished between the read and the write
            CancelOutcome::AlreadyFinished
        }
    }

    pub fn running(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Abort every outstanding orchestration
    pub fn shutdown(&self) {
        let handles: Vec<(Uuid, AbortHandle)> = self.tasks.lock().drain().collect();
        for (id, handle) in handles {
            tracing::info!("Aborting assessment {} on shutdown", id);
            handle.abort();
        }
    }
}
