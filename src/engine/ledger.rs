use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::assignment::{Assignment, AssignmentStatus};

/// Authoritative record of delivery offers.
///
/// `by_shop_order` and `active_couriers` are secondary indexes kept in step
/// with `assignments`: one non-terminal assignment per shop order, one held
/// assignment per courier. Both are claimed through `entry()` so duplicate
/// creation and double-acceptance lose atomically.
pub struct AssignmentLedger {
    assignments: DashMap<Uuid, Assignment>,
    by_shop_order: DashMap<Uuid, Uuid>,
    active_couriers: DashMap<Uuid, Uuid>,
}

impl AssignmentLedger {
    pub fn new() -> Self {
        Self {
            assignments: DashMap::new(),
            by_shop_order: DashMap::new(),
            active_couriers: DashMap::new(),
        }
    }

    pub fn create(
        &self,
        order_id: Uuid,
        shop_id: Uuid,
        shop_order_id: Uuid,
        candidates: Vec<Uuid>,
    ) -> Result<Assignment, AppError> {
        match self.by_shop_order.entry(shop_order_id) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "active assignment already exists for shop order {}",
                shop_order_id
            ))),
            Entry::Vacant(slot) => {
                let assignment = Assignment {
                    id: Uuid::new_v4(),
                    order_id,
                    shop_order_id,
                    shop_id,
                    broadcasted_to: candidates,
                    assigned_to: None,
                    status: AssignmentStatus::Broadcasted,
                    created_at: Utc::now(),
                    accepted_at: None,
                };

                slot.insert(assignment.id);
                self.assignments.insert(assignment.id, assignment.clone());

                Ok(assignment)
            }
        }
    }

    /// Atomic claim: the first caller to flip `broadcasted -> assigned` wins;
    /// every later caller observes the non-broadcasted status and fails.
    pub fn accept(&self, assignment_id: Uuid, courier_id: Uuid) -> Result<Assignment, AppError> {
        {
            let assignment = self.assignments.get(&assignment_id).ok_or_else(|| {
                AppError::NotFound(format!("assignment {} not found", assignment_id))
            })?;

            if assignment.status != AssignmentStatus::Broadcasted {
                return Err(AppError::InvalidState(format!(
                    "assignment {} is no longer open",
                    assignment_id
                )));
            }
        }

        // the courier slot is reserved before the claim; a courier holds at
        // most one assignment
        match self.active_couriers.entry(courier_id) {
            Entry::Occupied(_) => {
                return Err(AppError::Busy(format!(
                    "courier {} already holds an active assignment",
                    courier_id
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(assignment_id);
            }
        }

        let claimed = match self.assignments.get_mut(&assignment_id) {
            None => Err(AppError::NotFound(format!(
                "assignment {} not found",
                assignment_id
            ))),
            Some(mut assignment) => {
                if assignment.status != AssignmentStatus::Broadcasted {
                    Err(AppError::InvalidState(format!(
                        "assignment {} is no longer open",
                        assignment_id
                    )))
                } else {
                    assignment.status = AssignmentStatus::Assigned;
                    assignment.assigned_to = Some(courier_id);
                    assignment.accepted_at = Some(Utc::now());
                    Ok(assignment.clone())
                }
            }
        };

        if claimed.is_err() {
            self.active_couriers
                .remove_if(&courier_id, |_, held| *held == assignment_id);
        }

        claimed
    }

    /// Retires an assignment once its delivery is confirmed. Idempotent:
    /// completing an id that is already gone is a no-op.
    pub fn complete(&self, assignment_id: Uuid) -> Option<Assignment> {
        let (_, assignment) = self.assignments.remove(&assignment_id)?;

        self.by_shop_order
            .remove_if(&assignment.shop_order_id, |_, id| *id == assignment_id);
        if let Some(courier_id) = assignment.assigned_to {
            self.active_couriers
                .remove_if(&courier_id, |_, id| *id == assignment_id);
        }

        Some(assignment)
    }

    pub fn get(&self, assignment_id: Uuid) -> Option<Assignment> {
        self.assignments
            .get(&assignment_id)
            .map(|entry| entry.value().clone())
    }

    pub fn is_busy(&self, courier_id: Uuid) -> bool {
        self.active_couriers.contains_key(&courier_id)
    }

    pub fn active_for_shop_order(&self, shop_order_id: Uuid) -> Option<Uuid> {
        self.by_shop_order
            .get(&shop_order_id)
            .map(|entry| *entry.value())
    }

    pub fn broadcasts_for(&self, courier_id: Uuid) -> Vec<Assignment> {
        self.assignments
            .iter()
            .filter(|entry| {
                entry.status == AssignmentStatus::Broadcasted
                    && entry.broadcasted_to.contains(&courier_id)
            })
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn current_for(&self, courier_id: Uuid) -> Option<Assignment> {
        let held = *self.active_couriers.get(&courier_id)?.value();
        self.get(held)
    }

    pub fn snapshot(&self) -> Vec<Assignment> {
        self.assignments
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Removes broadcasted assignments created before `cutoff`. An assignment
    /// accepted between the scan and the removal survives: the predicate is
    /// re-checked under the shard write lock that `accept` also takes.
    pub fn expire_older_than(&self, cutoff: DateTime<Utc>) -> Vec<Assignment> {
        let stale: Vec<Uuid> = self
            .assignments
            .iter()
            .filter(|entry| {
                entry.status == AssignmentStatus::Broadcasted && entry.created_at < cutoff
            })
            .map(|entry| entry.id)
            .collect();

        let mut removed = Vec::new();
        for id in stale {
            if let Some((_, assignment)) = self.assignments.remove_if(&id, |_, a| {
                a.status == AssignmentStatus::Broadcasted && a.created_at < cutoff
            }) {
                self.by_shop_order
                    .remove_if(&assignment.shop_order_id, |_, held| *held == id);
                removed.push(assignment);
            }
        }

        removed
    }
}

impl Default for AssignmentLedger {
    fn default() -> Self {
        Self::new()
    }
}
