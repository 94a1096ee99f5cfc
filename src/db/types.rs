/// Database row types for scheduling state

use crate::scheduling::types::{
    BlockId, Day, InstructorId, OfferingId, RequestId, RequestStatus, RoomId, RoomKind, SlotId,
    SlotPreferences,
};
use chrono::NaiveTime;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct DbOffering {
    pub offering_id: OfferingId,
    pub course_code: String,
    pub section_code: String,
    pub semester: i64,
    pub major: String,
    pub is_lab: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DbRequest {
    pub request_id: RequestId,
    pub offering_id: OfferingId,
    pub status: RequestStatus,
    pub instructor_id: Option<InstructorId>,
    pub accepted_at: Option<i64>,
    pub preferences: Option<SlotPreferences>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DbSlot {
    pub slot_id: SlotId,
    pub shift: String,
    pub seq_no: i64,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct DbRoom {
    pub room_id: RoomId,
    pub name: String,
    pub capacity: i64,
    pub kind: RoomKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct DbBlock {
    pub block_id: BlockId,
    pub request_id: RequestId,
    pub offering_id: OfferingId,
    pub instructor_id: InstructorId,
    pub section: String,
    pub room_id: RoomId,
    pub day: Day,
    pub slot_id: SlotId,
    pub shift: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DbTimings {
    pub timings_id: i64,
    pub opening_time: NaiveTime,
    pub closing_time: NaiveTime,
    pub slot_minutes: i64,
    pub break_minutes: i64,
    pub working_days: Vec<Day>,
    pub shift: String,
    pub is_active: bool,
}
