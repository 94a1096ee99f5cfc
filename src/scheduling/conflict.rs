//! The conflict predicate: decides whether a candidate (resource, day, slot)
//! cell collides with existing blocks. Pure; every other component builds on
//! it.

use super::types::{BlockId, Day, InstructorId, RoomId, SlotId};
use std::collections::HashMap;
use std::fmt;

/// The three independent conflict dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Instructor,
    Section,
    Room,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceKind::Instructor => "instructor",
            ResourceKind::Section => "section",
            ResourceKind::Room => "room",
        })
    }
}

/// The resource half of a candidate cell. Room claims carry the shift since
/// room occupancy is scoped per shift.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    Instructor(InstructorId),
    Section(&'a str),
    Room { room_id: RoomId, shift: &'a str },
}

/// The conflict-relevant projection of a materialized block.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockCell {
    pub block_id: BlockId,
    pub instructor_id: InstructorId,
    pub section: String,
    pub room_id: RoomId,
    pub day: Day,
    pub slot_id: SlotId,
    pub shift: String,
}

impl BlockCell {
    fn occupies(&self, resource: Resource<'_>) -> bool {
        match resource {
            Resource::Instructor(id) => self.instructor_id == id,
            Resource::Section(section) => self.section == section,
            Resource::Room { room_id, shift } => self.room_id == room_id && self.shift == shift,
        }
    }
}

/// Returns true iff any existing block holds `resource` on the same
/// (day, slot) cell. O(existing); callers with many probes should use
/// [`ConflictSet`] instead.
pub fn conflicts(existing: &[BlockCell], resource: Resource<'_>, day: Day, slot_id: SlotId) -> bool {
    existing
        .iter()
        .any(|b| b.day == day && b.slot_id == slot_id && b.occupies(resource))
}

/// Blocks indexed by (day, slot) so repeated probes during a planning pass
/// stay cheap.
#[derive(Debug, Default)]
pub struct ConflictSet {
    cells: HashMap<(Day, SlotId), Vec<BlockCell>>,
}

impl ConflictSet {
    pub fn from_blocks(blocks: Vec<BlockCell>) -> Self {
        let mut set = ConflictSet::default();
        for block in blocks {
            set.insert(block);
        }
        set
    }

    pub fn insert(&mut self, block: BlockCell) {
        self.cells
            .entry((block.day, block.slot_id))
            .or_default()
            .push(block);
    }

    /// Whether `resource` already occupies the (day, slot) cell.
    pub fn occupied(&self, resource: Resource<'_>, day: Day, slot_id: SlotId) -> bool {
        self.cells
            .get(&(day, slot_id))
            .is_some_and(|blocks| blocks.iter().any(|b| b.occupies(resource)))
    }

    /// Runs all three dimension checks for one candidate placement. Returns
    /// the first violated dimension, or None when the cell is free.
    pub fn violation(
        &self,
        instructor_id: InstructorId,
        section: &str,
        room_id: RoomId,
        shift: &str,
        day: Day,
        slot_id: SlotId,
    ) -> Option<ResourceKind> {
        if self.occupied(Resource::Instructor(instructor_id), day, slot_id) {
            Some(ResourceKind::Instructor)
        } else if self.occupied(Resource::Section(section), day, slot_id) {
            Some(ResourceKind::Section)
        } else if self.occupied(Resource::Room { room_id, shift }, day, slot_id) {
            Some(ResourceKind::Room)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(instructor: InstructorId, section: &str, room: RoomId, day: Day, slot: SlotId) -> BlockCell {
        BlockCell {
            block_id: 1,
            instructor_id: instructor,
            section: section.to_string(),
            room_id: room,
            day,
            slot_id: slot,
            shift: "morning".to_string(),
        }
    }

    #[test]
    fn test_instructor_conflict_same_cell() {
        let existing = vec![block(7, "3/A", 1, Day::Monday, 1)];
        assert!(conflicts(&existing, Resource::Instructor(7), Day::Monday, 1));
        assert!(!conflicts(&existing, Resource::Instructor(8), Day::Monday, 1));
    }

    #[test]
    fn test_no_conflict_on_different_day_or_slot() {
        let existing = vec![block(7, "3/A", 1, Day::Monday, 1)];
        assert!(!conflicts(&existing, Resource::Instructor(7), Day::Tuesday, 1));
        assert!(!conflicts(&existing, Resource::Instructor(7), Day::Monday, 2));
    }

    #[test]
    fn test_section_conflict() {
        let existing = vec![block(7, "3/A", 1, Day::Monday, 1)];
        assert!(conflicts(&existing, Resource::Section("3/A"), Day::Monday, 1));
        assert!(!conflicts(&existing, Resource::Section("3/B"), Day::Monday, 1));
    }

    #[test]
    fn test_room_conflict_is_shift_scoped() {
        let existing = vec![block(7, "3/A", 1, Day::Monday, 1)];
        assert!(conflicts(
            &existing,
            Resource::Room { room_id: 1, shift: "morning" },
            Day::Monday,
            1
        ));
        // Same room and cell, different shift: no collision.
        assert!(!conflicts(
            &existing,
            Resource::Room { room_id: 1, shift: "evening" },
            Day::Monday,
            1
        ));
    }

    #[test]
    fn test_conflict_set_matches_linear_predicate() {
        let blocks = vec![
            block(7, "3/A", 1, Day::Monday, 1),
            block(8, "3/B", 2, Day::Tuesday, 2),
        ];
        let set = ConflictSet::from_blocks(blocks.clone());
        for b in &blocks {
            assert_eq!(
                set.occupied(Resource::Instructor(b.instructor_id), b.day, b.slot_id),
                conflicts(&blocks, Resource::Instructor(b.instructor_id), b.day, b.slot_id)
            );
        }
        assert!(!set.occupied(Resource::Instructor(7), Day::Tuesday, 2));
    }

    #[test]
    fn test_violation_reports_first_dimension() {
        let set = ConflictSet::from_blocks(vec![block(7, "3/A", 1, Day::Monday, 1)]);
        assert_eq!(
            set.violation(7, "3/B", 2, "morning", Day::Monday, 1),
            Some(ResourceKind::Instructor)
        );
        assert_eq!(
            set.violation(9, "3/A", 2, "morning", Day::Monday, 1),
            Some(ResourceKind::Section)
        );
        assert_eq!(
            set.violation(9, "3/B", 1, "morning", Day::Monday, 1),
            Some(ResourceKind::Room)
        );
        assert_eq!(set.violation(9, "3/B", 2, "morning", Day::Monday, 2), None);
    }
}
