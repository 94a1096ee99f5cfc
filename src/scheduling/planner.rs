//! Greedy assignment planning: places accepted requests into concrete
//! (room, day, slot) cells without violating the conflict predicate.
//!
//! The pass is deliberately order-dependent and that ordering is part of the
//! behavioral contract:
//! - requests are processed in ascending request id, so earlier requests win
//!   scarce rooms;
//! - candidate rooms are tried in descending capacity (ascending id on ties),
//!   leaving smaller rooms free for later, smaller loads;
//! - preference days are scanned in the order supplied, slots in supplied
//!   order within each day, and the first conflict-free room takes the cell.
//!
//! A (day, slot) cell with no free room is skipped and never retried, so a
//! request can end up partially placed or fully unplaced; the pass itself
//! never fails because of it.

use super::conflict::{BlockCell, ConflictSet};
use super::types::{Day, InstructorId, OfferingId, RequestId, RoomId, RoomKind, SlotId, SlotPreferences};
use std::collections::HashMap;
use tracing::{debug, warn};

/// An accepted request as seen by the planner.
#[derive(Debug, Clone)]
pub struct PlannerRequest {
    pub request_id: RequestId,
    pub offering_id: OfferingId,
    pub instructor_id: InstructorId,
    pub section: String,
    pub is_lab: bool,
    pub preferences: SlotPreferences,
}

/// A room available to the planner.
#[derive(Debug, Clone)]
pub struct RoomChoice {
    pub room_id: RoomId,
    pub capacity: i64,
    pub kind: RoomKind,
}

/// One placement the planner decided on; the caller materializes it as a
/// block row.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub request_id: RequestId,
    pub offering_id: OfferingId,
    pub instructor_id: InstructorId,
    pub section: String,
    pub room_id: RoomId,
    pub day: Day,
    pub slot_id: SlotId,
    pub shift: String,
}

impl Placement {
    fn as_cell(&self) -> BlockCell {
        BlockCell {
            block_id: 0,
            instructor_id: self.instructor_id,
            section: self.section.clone(),
            room_id: self.room_id,
            day: self.day,
            slot_id: self.slot_id,
            shift: self.shift.clone(),
        }
    }
}

/// Runs one greedy planning pass.
///
/// `slot_shifts` maps every known slot id to its shift tag; preference cells
/// naming an unknown slot are skipped. `existing` seeds the conflict set, and
/// every placement joins it before the next request is processed, so later
/// requests see earlier placements from the same pass.
pub fn plan(
    requests: &[PlannerRequest],
    rooms: &[RoomChoice],
    slot_shifts: &HashMap<SlotId, String>,
    existing: Vec<BlockCell>,
) -> Vec<Placement> {
    let mut ordered: Vec<&PlannerRequest> = requests.iter().collect();
    ordered.sort_by_key(|r| r.request_id);

    let mut occupied = ConflictSet::from_blocks(existing);
    let mut placements = Vec::new();

    for request in ordered {
        let required_kind = if request.is_lab { RoomKind::Lab } else { RoomKind::Lecture };
        let mut candidates: Vec<&RoomChoice> =
            rooms.iter().filter(|r| r.kind == required_kind).collect();
        candidates.sort_by(|a, b| b.capacity.cmp(&a.capacity).then(a.room_id.cmp(&b.room_id)));

        let declared = request.preferences.slot_ids.len();
        let mut placed = 0usize;

        'cells: for (day, slot_id) in request.preferences.cells() {
            if placed == declared {
                break 'cells;
            }
            let Some(shift) = slot_shifts.get(&slot_id) else {
                warn!(
                    "Request {} references unknown slot {}; skipping cell",
                    request.request_id, slot_id
                );
                continue;
            };

            for room in &candidates {
                let free = occupied
                    .violation(
                        request.instructor_id,
                        &request.section,
                        room.room_id,
                        shift,
                        day,
                        slot_id,
                    )
                    .is_none();
                if free {
                    let placement = Placement {
                        request_id: request.request_id,
                        offering_id: request.offering_id,
                        instructor_id: request.instructor_id,
                        section: request.section.clone(),
                        room_id: room.room_id,
                        day,
                        slot_id,
                        shift: shift.clone(),
                    };
                    occupied.insert(placement.as_cell());
                    placements.push(placement);
                    placed += 1;
                    continue 'cells;
                }
            }
            // No room free for this cell; skip it and keep going.
            debug!(
                "Request {}: no room free on {} slot {}",
                request.request_id, day, slot_id
            );
        }

        if placed < declared {
            warn!(
                "Request {} placed {placed}/{declared} declared slots",
                request.request_id
            );
        }
    }

    placements
}
