//! Result store - assessment state by ID
//!
//! Process-memory only; a restart loses all assessments.

use std::collections::HashMap;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::models::Assessment;

pub trait AssessmentStore: Send + Sync {
    fn put(&self, assessment: Assessment);

    /// Snapshot of one assessment
    fn get(&self, id: &Uuid) -> Option<Assessment>;

    /// Mutate in place under the write lock. `false` if the ID is unknown.
    fn update(&self, id: &Uuid, apply: &mut dyn FnMut(&mut Assessment)) -> bool;

    /// Snapshots of every assessment, newest first
    fn list(&self) -> Vec<Assessment>;
}

#[derive(Default)]
pub struct MemoryStore {
    assessments: RwLock<HashMap<Uuid, Assessment>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AssessmentStore for MemoryStore {
    fn put(&self, assessment: Assessment) {
        self.assessments.write().insert(assessment.id, assessment);
    }

    fn get(&self, id: &Uuid) -> Option<Assessment> {
        self.assessments.read().get(id).cloned()
    }

    fn update(&self, id: &Uuid, apply: &mut dyn FnMut(&mut Assessment)) -> bool {
        match self.assessments.write().get_mut(id) {
            Some(assessment) => {
                apply(assessment);
                true
            }
            None => false,
        }
    }

    fn list(&self) -> Vec<Assessment> {
        let mut all: Vec<Assessment> = self.assessments.read().values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all
    }
}
