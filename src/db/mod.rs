/// Database module: owns the SQLite connection and orchestrates every
/// scheduling operation against it.

mod types;

pub use types::{DbBlock, DbOffering, DbRequest, DbRoom, DbSlot, DbTimings};

use crate::config::SlotLengthBounds;
use crate::scheduling::conflict::{conflicts, BlockCell, ConflictSet, Resource, ResourceKind};
use crate::scheduling::planner::{self, PlannerRequest, RoomChoice};
use crate::scheduling::slots::{partition, solve_distributed_length, SlotWindow, MINUTES_PER_DAY};
use crate::scheduling::types::{
    BlockId, Day, InstructorId, OfferingId, RequestId, RequestStatus, ResetScope, RoomId,
    RoomKind, SlotId, SlotPreferences, TimingsSpec,
};
use crate::scheduling::SchedulingError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::info;

const SCHEMA_SQL: &str = include_str!("../../sql/init_schema.sql");

/// How long an acceptance stays revocable, wall clock.
const UNDO_WINDOW_MS: i64 = 10_000;

pub struct SchedulingDbManager {
    db: Mutex<Connection>,
    /// Two concurrent planning passes could double-place the same request;
    /// passes are serialized through this advisory lock.
    planning: Mutex<()>,
}

impl SchedulingDbManager {
    /// Opens the database and initializes the schema.
    pub fn new(db_path: &str) -> rusqlite::Result<Self> {
        let conn = Connection::open(db_path)?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            db: Mutex::new(conn),
            planning: Mutex::new(()),
        })
    }

    // ---- seeding -------------------------------------------------------

    pub fn insert_room(
        &self,
        name: &str,
        capacity: i64,
        kind: RoomKind,
    ) -> Result<RoomId, SchedulingError> {
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO rooms (name, capacity, kind) VALUES (?1, ?2, ?3)",
            params![name, capacity, kind],
        )?;
        Ok(db.last_insert_rowid())
    }

    pub fn insert_offering(
        &self,
        course_code: &str,
        section_code: &str,
        semester: i64,
        major: &str,
        is_lab: bool,
    ) -> Result<OfferingId, SchedulingError> {
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO course_offerings (course_code, section_code, semester, major, is_lab)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![course_code, section_code, semester, major, is_lab],
        )?;
        Ok(db.last_insert_rowid())
    }

    /// Activates a new timings row, deactivating the previous one in the
    /// same transaction. At most one row is active at a time. Slot and break
    /// lengths must fit within a day; slot generation relies on that.
    pub fn activate_timings(&self, spec: &TimingsSpec) -> Result<i64, SchedulingError> {
        if spec.slot_minutes == 0 || spec.slot_minutes >= MINUTES_PER_DAY {
            return Err(SchedulingError::config(format!(
                "slot length {} min must be between 1 and {} minutes",
                spec.slot_minutes,
                MINUTES_PER_DAY - 1
            )));
        }
        if spec.break_minutes >= MINUTES_PER_DAY {
            return Err(SchedulingError::config(format!(
                "break length {} min must be shorter than a day",
                spec.break_minutes
            )));
        }
        let working_days = serde_json::to_string(&spec.working_days)?;
        let mut conn = self.db.lock().unwrap();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute("UPDATE university_timings SET is_active = 0 WHERE is_active = 1", [])?;
        tx.execute(
            "INSERT INTO university_timings
                 (opening_time, closing_time, slot_minutes, break_minutes,
                  working_days, shift, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)",
            params![
                spec.opening_time,
                spec.closing_time,
                spec.slot_minutes,
                spec.break_minutes,
                working_days,
                spec.shift,
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        info!("Activated university timings {} (shift {})", id, spec.shift);
        Ok(id)
    }

    pub fn active_timings(&self) -> Result<Option<DbTimings>, SchedulingError> {
        let db = self.db.lock().unwrap();
        let row = db
            .query_row(
                "SELECT timings_id, opening_time, closing_time, slot_minutes, break_minutes,
                        working_days, shift, is_active
                 FROM university_timings WHERE is_active = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, chrono::NaiveTime>(1)?,
                        row.get::<_, chrono::NaiveTime>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, bool>(7)?,
                    ))
                },
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((timings_id, opening_time, closing_time, slot_minutes, break_minutes, days, shift, is_active)) => {
                let working_days: Vec<Day> = serde_json::from_str(&days)?;
                Ok(Some(DbTimings {
                    timings_id,
                    opening_time,
                    closing_time,
                    slot_minutes,
                    break_minutes,
                    working_days,
                    shift,
                    is_active,
                }))
            }
        }
    }

    // ---- request generation --------------------------------------------

    /// Creates one pending request for every offering matching the filter
    /// that has no open request yet. Idempotent; returns the count created.
    pub fn generate_requests(
        &self,
        semester: Option<i64>,
        major: Option<&str>,
    ) -> Result<usize, SchedulingError> {
        let db = self.db.lock().unwrap();
        let created = db.execute(
            "INSERT INTO course_requests (offering_id, status)
             SELECT o.offering_id, 'pending'
             FROM course_offerings o
             WHERE (?1 IS NULL OR o.semester = ?1)
               AND (?2 IS NULL OR o.major = ?2)
               AND NOT EXISTS (
                   SELECT 1 FROM course_requests r WHERE r.offering_id = o.offering_id
               )",
            params![semester, major],
        )?;
        info!(
            "Generated {} course request(s) (semester={:?}, major={:?})",
            created, semester, major
        );
        Ok(created)
    }

    // ---- acceptance arbiter ---------------------------------------------

    /// Claims a pending request for an instructor.
    ///
    /// The claim itself is a conditional `UPDATE ... WHERE status = 'pending'`
    /// inside an IMMEDIATE transaction; its affected-row count arbitrates
    /// concurrent callers, so exactly one of two racers succeeds and the
    /// other sees `Conflict`.
    pub fn accept_request(
        &self,
        request_id: RequestId,
        instructor_id: InstructorId,
        preferences: &SlotPreferences,
    ) -> Result<(), SchedulingError> {
        if preferences.days.is_empty() || preferences.slot_ids.is_empty() {
            return Err(SchedulingError::config(
                "preference payload must select at least one day and one time slot",
            ));
        }
        let payload = serde_json::to_string(preferences)?;
        let accepted_at = Utc::now().timestamp_millis();

        let mut conn = self.db.lock().unwrap();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let status: Option<RequestStatus> = tx
            .query_row(
                "SELECT status FROM course_requests WHERE request_id = ?1",
                params![request_id],
                |row| row.get(0),
            )
            .optional()?;
        match status {
            None => {
                return Err(SchedulingError::NotFound {
                    entity: "course request",
                    id: request_id,
                })
            }
            Some(RequestStatus::Pending) => {}
            Some(RequestStatus::Accepted) => {
                return Err(SchedulingError::Conflict { request_id })
            }
        }

        // The instructor must be free on every selected (day, slot) cell.
        let existing = instructor_block_cells(&tx, instructor_id)?;
        for (day, slot_id) in preferences.cells() {
            if conflicts(&existing, Resource::Instructor(instructor_id), day, slot_id) {
                return Err(SchedulingError::ScheduleConflict {
                    kind: ResourceKind::Instructor,
                    day,
                    slot_id,
                });
            }
        }

        let claimed = tx.execute(
            "UPDATE course_requests
             SET status = 'accepted', instructor_id = ?1, accepted_at = ?2, preferences = ?3
             WHERE request_id = ?4 AND status = 'pending'",
            params![instructor_id, accepted_at, payload, request_id],
        )?;
        if claimed == 0 {
            return Err(SchedulingError::Conflict { request_id });
        }
        tx.commit()?;
        info!(
            "Request {} accepted by instructor {}",
            request_id, instructor_id
        );
        Ok(())
    }

    /// Reverts an acceptance within the undo window, clearing claimant,
    /// timestamp, and preference payload.
    pub fn undo_acceptance(
        &self,
        request_id: RequestId,
        instructor_id: InstructorId,
    ) -> Result<(), SchedulingError> {
        self.undo_acceptance_at(request_id, instructor_id, Utc::now().timestamp_millis())
    }

    fn undo_acceptance_at(
        &self,
        request_id: RequestId,
        instructor_id: InstructorId,
        now_ms: i64,
    ) -> Result<(), SchedulingError> {
        let mut conn = self.db.lock().unwrap();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let row: Option<(RequestStatus, Option<InstructorId>, Option<i64>)> = tx
            .query_row(
                "SELECT status, instructor_id, accepted_at
                 FROM course_requests WHERE request_id = ?1",
                params![request_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        let (status, claimant, accepted_at) = match row {
            None => {
                return Err(SchedulingError::NotFound {
                    entity: "course request",
                    id: request_id,
                })
            }
            Some(r) => r,
        };
        if status != RequestStatus::Accepted {
            return Err(SchedulingError::NotFound {
                entity: "accepted course request",
                id: request_id,
            });
        }
        if claimant != Some(instructor_id) {
            return Err(SchedulingError::Unauthorized {
                instructor_id,
                entity: "course request",
            });
        }
        let accepted_at = accepted_at.ok_or_else(|| SchedulingError::Corrupt {
            message: format!("accepted request {request_id} has no acceptance timestamp"),
        })?;
        let elapsed_ms = now_ms - accepted_at;
        if elapsed_ms > UNDO_WINDOW_MS {
            return Err(SchedulingError::Expired { elapsed_ms });
        }

        tx.execute(
            "UPDATE course_requests
             SET status = 'pending', instructor_id = NULL, accepted_at = NULL, preferences = NULL
             WHERE request_id = ?1 AND status = 'accepted' AND instructor_id = ?2",
            params![request_id, instructor_id],
        )?;
        tx.commit()?;
        info!(
            "Request {} acceptance undone by instructor {} ({} ms in)",
            request_id, instructor_id, elapsed_ms
        );
        Ok(())
    }

    // ---- assignment planner ---------------------------------------------

    /// Runs one greedy planning pass over every accepted request that has no
    /// block yet, materializing each placement as a block row. Returns the
    /// number of blocks created. Passes are serialized; a single unplaceable
    /// request never fails the run.
    pub fn plan_assignments(&self) -> Result<usize, SchedulingError> {
        let _pass = self.planning.lock().unwrap();
        let mut conn = self.db.lock().unwrap();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut requests = Vec::new();
        {
            let mut stmt = tx.prepare(
                "SELECT r.request_id, r.offering_id, r.instructor_id, r.preferences,
                        o.section_code, o.semester, o.is_lab
                 FROM course_requests r
                 JOIN course_offerings o ON o.offering_id = r.offering_id
                 WHERE r.status = 'accepted'
                   AND NOT EXISTS (SELECT 1 FROM blocks b WHERE b.request_id = r.request_id)
                 ORDER BY r.request_id",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, RequestId>(0)?,
                    row.get::<_, OfferingId>(1)?,
                    row.get::<_, InstructorId>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, bool>(6)?,
                ))
            })?;
            for row in rows {
                let (request_id, offering_id, instructor_id, payload, section_code, semester, is_lab) =
                    row?;
                let preferences: SlotPreferences = serde_json::from_str(&payload)?;
                requests.push(PlannerRequest {
                    request_id,
                    offering_id,
                    instructor_id,
                    section: format!("{semester}/{section_code}"),
                    is_lab,
                    preferences,
                });
            }
        }

        let rooms: Vec<RoomChoice> = {
            let mut stmt = tx.prepare("SELECT room_id, capacity, kind FROM rooms")?;
            let rows = stmt.query_map([], |row| {
                Ok(RoomChoice {
                    room_id: row.get(0)?,
                    capacity: row.get(1)?,
                    kind: row.get(2)?,
                })
            })?;
            rows.collect::<rusqlite::Result<_>>()?
        };

        let slot_shifts: HashMap<SlotId, String> = {
            let mut stmt = tx.prepare("SELECT slot_id, shift FROM time_slots")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, SlotId>(0)?, row.get::<_, String>(1)?))
            })?;
            rows.collect::<rusqlite::Result<_>>()?
        };

        let existing = all_block_cells(&tx)?;
        let placements = planner::plan(&requests, &rooms, &slot_shifts, existing);

        for p in &placements {
            tx.execute(
                "INSERT INTO blocks
                     (request_id, offering_id, instructor_id, section, room_id, day, slot_id, shift)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    p.request_id,
                    p.offering_id,
                    p.instructor_id,
                    p.section,
                    p.room_id,
                    p.day,
                    p.slot_id,
                    p.shift,
                ],
            )?;
        }
        tx.commit()?;
        info!(
            "Planning pass placed {} block(s) for {} request(s)",
            placements.len(),
            requests.len()
        );
        Ok(placements.len())
    }

    // ---- reschedule -------------------------------------------------------

    /// Moves an existing block to a new (day, slot, room), re-checking all
    /// three conflict dimensions with the block itself excluded. On conflict
    /// the block is left untouched.
    pub fn reschedule_block(
        &self,
        block_id: BlockId,
        instructor_id: InstructorId,
        new_day: Day,
        new_slot_id: SlotId,
        new_room_id: RoomId,
    ) -> Result<(), SchedulingError> {
        let mut conn = self.db.lock().unwrap();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let row: Option<(InstructorId, String)> = tx
            .query_row(
                "SELECT instructor_id, section FROM blocks WHERE block_id = ?1",
                params![block_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let (owner, section) = row.ok_or(SchedulingError::NotFound {
            entity: "block",
            id: block_id,
        })?;
        if owner != instructor_id {
            return Err(SchedulingError::Unauthorized {
                instructor_id,
                entity: "block",
            });
        }

        let shift: Option<String> = tx
            .query_row(
                "SELECT shift FROM time_slots WHERE slot_id = ?1",
                params![new_slot_id],
                |row| row.get(0),
            )
            .optional()?;
        let shift = shift.ok_or(SchedulingError::NotFound {
            entity: "time slot",
            id: new_slot_id,
        })?;
        let room_exists: Option<i64> = tx
            .query_row(
                "SELECT room_id FROM rooms WHERE room_id = ?1",
                params![new_room_id],
                |row| row.get(0),
            )
            .optional()?;
        if room_exists.is_none() {
            return Err(SchedulingError::NotFound {
                entity: "room",
                id: new_room_id,
            });
        }

        let others: Vec<BlockCell> = all_block_cells(&tx)?
            .into_iter()
            .filter(|cell| cell.block_id != block_id)
            .collect();
        let occupied = ConflictSet::from_blocks(others);
        if let Some(kind) = occupied.violation(
            instructor_id,
            &section,
            new_room_id,
            &shift,
            new_day,
            new_slot_id,
        ) {
            return Err(SchedulingError::ScheduleConflict {
                kind,
                day: new_day,
                slot_id: new_slot_id,
            });
        }

        tx.execute(
            "UPDATE blocks SET day = ?1, slot_id = ?2, room_id = ?3, shift = ?4
             WHERE block_id = ?5",
            params![new_day, new_slot_id, new_room_id, shift, block_id],
        )?;
        tx.commit()?;
        info!(
            "Block {} moved to {} slot {} room {}",
            block_id, new_day, new_slot_id, new_room_id
        );
        Ok(())
    }

    // ---- slot generation --------------------------------------------------

    /// Regenerates time slots for the active timings. All-or-nothing: a
    /// failure leaves the prior slot set intact.
    pub fn generate_slots(&self) -> Result<Vec<DbSlot>, SchedulingError> {
        let timings = self.require_active_timings()?;
        let windows = partition(
            timings.opening_time,
            timings.closing_time,
            timings.slot_minutes as u32,
            timings.break_minutes as u32,
        )?;
        self.replace_slots(&timings.shift, &windows)
    }

    /// Distribution mode: back-solves an even slot length for the requested
    /// count before regenerating.
    pub fn generate_slots_distributed(
        &self,
        target_slots: u32,
        bounds: &SlotLengthBounds,
    ) -> Result<Vec<DbSlot>, SchedulingError> {
        let timings = self.require_active_timings()?;
        let length = solve_distributed_length(
            timings.opening_time,
            timings.closing_time,
            timings.break_minutes as u32,
            target_slots,
            bounds,
        )?;
        let windows = partition(
            timings.opening_time,
            timings.closing_time,
            length,
            timings.break_minutes as u32,
        )?;
        self.replace_slots(&timings.shift, &windows)
    }

    fn require_active_timings(&self) -> Result<DbTimings, SchedulingError> {
        self.active_timings()?.ok_or_else(|| {
            SchedulingError::config("no active university timings configured")
        })
    }

    /// Swaps the full slot set for a shift in one transaction. Blocks
    /// referencing the old slots are deleted with them (cascading delete).
    fn replace_slots(
        &self,
        shift: &str,
        windows: &[SlotWindow],
    ) -> Result<Vec<DbSlot>, SchedulingError> {
        let mut conn = self.db.lock().unwrap();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "DELETE FROM blocks WHERE slot_id IN (SELECT slot_id FROM time_slots WHERE shift = ?1)",
            params![shift],
        )?;
        tx.execute("DELETE FROM time_slots WHERE shift = ?1", params![shift])?;

        let mut slots = Vec::with_capacity(windows.len());
        for window in windows {
            tx.execute(
                "INSERT INTO time_slots (shift, seq_no, start_time, end_time)
                 VALUES (?1, ?2, ?3, ?4)",
                params![shift, window.seq_no, window.start, window.end],
            )?;
            slots.push(DbSlot {
                slot_id: tx.last_insert_rowid(),
                shift: shift.to_string(),
                seq_no: window.seq_no as i64,
                start_time: window.start,
                end_time: window.end,
            });
        }
        tx.commit()?;
        info!("Regenerated {} slot(s) for shift {}", slots.len(), shift);
        Ok(slots)
    }

    // ---- reset controller ---------------------------------------------------

    /// Bulk state clearing; each scope runs in a single transaction.
    pub fn reset(&self, scope: ResetScope) -> Result<(), SchedulingError> {
        let mut conn = self.db.lock().unwrap();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        match scope {
            ResetScope::Slots => {
                // Cascading: blocks reference slots, so they go first.
                tx.execute("DELETE FROM blocks", [])?;
                tx.execute("DELETE FROM time_slots", [])?;
            }
            ResetScope::Assignments => {
                tx.execute("DELETE FROM blocks", [])?;
                tx.execute(
                    "UPDATE course_requests
                     SET status = 'pending', instructor_id = NULL,
                         accepted_at = NULL, preferences = NULL
                     WHERE status = 'accepted'",
                    [],
                )?;
            }
            ResetScope::Full => {
                tx.execute("DELETE FROM blocks", [])?;
                tx.execute("DELETE FROM course_requests", [])?;
                tx.execute("DELETE FROM time_slots", [])?;
                tx.execute("UPDATE university_timings SET is_active = 0", [])?;
            }
        }
        tx.commit()?;
        info!("Reset applied: {:?}", scope);
        Ok(())
    }

    // ---- read queries ---------------------------------------------------------

    pub fn get_request(&self, request_id: RequestId) -> Result<Option<DbRequest>, SchedulingError> {
        let db = self.db.lock().unwrap();
        let row = db
            .query_row(
                "SELECT request_id, offering_id, status, instructor_id, accepted_at, preferences
                 FROM course_requests WHERE request_id = ?1",
                params![request_id],
                map_request_row,
            )
            .optional()?;
        row.map(parse_request_payload).transpose()
    }

    pub fn list_requests(&self) -> Result<Vec<DbRequest>, SchedulingError> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT request_id, offering_id, status, instructor_id, accepted_at, preferences
             FROM course_requests ORDER BY request_id",
        )?;
        let rows = stmt.query_map([], map_request_row)?;
        rows.map(|row| row.map_err(SchedulingError::from).and_then(parse_request_payload))
            .collect()
    }

    pub fn list_blocks(&self) -> Result<Vec<DbBlock>, SchedulingError> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT block_id, request_id, offering_id, instructor_id, section,
                    room_id, day, slot_id, shift
             FROM blocks ORDER BY block_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(DbBlock {
                block_id: row.get(0)?,
                request_id: row.get(1)?,
                offering_id: row.get(2)?,
                instructor_id: row.get(3)?,
                section: row.get(4)?,
                room_id: row.get(5)?,
                day: row.get(6)?,
                slot_id: row.get(7)?,
                shift: row.get(8)?,
            })
        })?;
        rows.collect::<rusqlite::Result<_>>().map_err(Into::into)
    }

    pub fn list_slots(&self) -> Result<Vec<DbSlot>, SchedulingError> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT slot_id, shift, seq_no, start_time, end_time
             FROM time_slots ORDER BY shift, seq_no",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(DbSlot {
                slot_id: row.get(0)?,
                shift: row.get(1)?,
                seq_no: row.get(2)?,
                start_time: row.get(3)?,
                end_time: row.get(4)?,
            })
        })?;
        rows.collect::<rusqlite::Result<_>>().map_err(Into::into)
    }

    pub fn list_rooms(&self) -> Result<Vec<DbRoom>, SchedulingError> {
        let db = self.db.lock().unwrap();
        let mut stmt =
            db.prepare("SELECT room_id, name, capacity, kind FROM rooms ORDER BY room_id")?;
        let rows = stmt.query_map([], |row| {
            Ok(DbRoom {
                room_id: row.get(0)?,
                name: row.get(1)?,
                capacity: row.get(2)?,
                kind: row.get(3)?,
            })
        })?;
        rows.collect::<rusqlite::Result<_>>().map_err(Into::into)
    }

    pub fn list_offerings(&self) -> Result<Vec<DbOffering>, SchedulingError> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT offering_id, course_code, section_code, semester, major, is_lab
             FROM course_offerings ORDER BY offering_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(DbOffering {
                offering_id: row.get(0)?,
                course_code: row.get(1)?,
                section_code: row.get(2)?,
                semester: row.get(3)?,
                major: row.get(4)?,
                is_lab: row.get(5)?,
            })
        })?;
        rows.collect::<rusqlite::Result<_>>().map_err(Into::into)
    }
}

type RawRequest = (RequestId, OfferingId, RequestStatus, Option<InstructorId>, Option<i64>, Option<String>);

fn map_request_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRequest> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn parse_request_payload(raw: RawRequest) -> Result<DbRequest, SchedulingError> {
    let (request_id, offering_id, status, instructor_id, accepted_at, payload) = raw;
    let preferences = match payload {
        Some(json) => Some(serde_json::from_str::<SlotPreferences>(&json)?),
        None => None,
    };
    Ok(DbRequest {
        request_id,
        offering_id,
        status,
        instructor_id,
        accepted_at,
        preferences,
    })
}

fn all_block_cells(conn: &Connection) -> rusqlite::Result<Vec<BlockCell>> {
    let mut stmt = conn.prepare(
        "SELECT block_id, instructor_id, section, room_id, day, slot_id, shift FROM blocks",
    )?;
    let rows = stmt.query_map([], map_block_cell)?;
    rows.collect()
}

fn instructor_block_cells(
    conn: &Connection,
    instructor_id: InstructorId,
) -> rusqlite::Result<Vec<BlockCell>> {
    let mut stmt = conn.prepare(
        "SELECT block_id, instructor_id, section, room_id, day, slot_id, shift
         FROM blocks WHERE instructor_id = ?1",
    )?;
    let rows = stmt.query_map(params![instructor_id], map_block_cell)?;
    rows.collect()
}

fn map_block_cell(row: &rusqlite::Row<'_>) -> rusqlite::Result<BlockCell> {
    Ok(BlockCell {
        block_id: row.get(0)?,
        instructor_id: row.get(1)?,
        section: row.get(2)?,
        room_id: row.get(3)?,
        day: row.get(4)?,
        slot_id: row.get(5)?,
        shift: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use std::sync::{Arc, Barrier};

    fn manager() -> SchedulingDbManager {
        SchedulingDbManager::new(":memory:").unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn morning_timings() -> TimingsSpec {
        TimingsSpec {
            opening_time: t(8, 0),
            closing_time: t(12, 0),
            slot_minutes: 60,
            break_minutes: 0,
            working_days: vec![Day::Monday, Day::Tuesday, Day::Wednesday],
            shift: "morning".to_string(),
        }
    }

    fn prefs(days: Vec<Day>, slot_ids: Vec<SlotId>) -> SlotPreferences {
        SlotPreferences { days, slot_ids }
    }

    /// Seeds a room, two semester-3 offerings, four morning slots, and the
    /// pending requests for them. Returns the manager and the request ids.
    fn seeded() -> (SchedulingDbManager, Vec<RequestId>) {
        let mgr = manager();
        mgr.insert_room("A-101", 60, RoomKind::Lecture).unwrap();
        mgr.insert_offering("CourseA", "1", 3, "CS", false).unwrap();
        mgr.insert_offering("CourseB", "1", 3, "CS", false).unwrap();
        mgr.activate_timings(&morning_timings()).unwrap();
        mgr.generate_slots().unwrap();
        assert_eq!(mgr.generate_requests(Some(3), None).unwrap(), 2);
        let ids = mgr
            .list_requests()
            .unwrap()
            .into_iter()
            .map(|r| r.request_id)
            .collect();
        (mgr, ids)
    }

    #[test]
    fn test_activate_timings_rejects_out_of_day_lengths() {
        let mgr = manager();
        let mut timings = morning_timings();
        timings.slot_minutes = u32::MAX;
        let err = mgr.activate_timings(&timings).unwrap_err();
        assert!(matches!(err, SchedulingError::ConfigError { .. }));

        let mut timings = morning_timings();
        timings.break_minutes = 24 * 60;
        let err = mgr.activate_timings(&timings).unwrap_err();
        assert!(matches!(err, SchedulingError::ConfigError { .. }));

        // Rejected rows never activate.
        assert!(mgr.active_timings().unwrap().is_none());
    }

    #[test]
    fn test_generate_requests_is_idempotent() {
        let (mgr, _) = seeded();
        assert_eq!(mgr.generate_requests(Some(3), None).unwrap(), 0);
        assert_eq!(mgr.generate_requests(None, None).unwrap(), 0);
        assert_eq!(mgr.list_requests().unwrap().len(), 2);
    }

    #[test]
    fn test_generate_requests_applies_filters() {
        let mgr = manager();
        mgr.insert_offering("CourseA", "1", 3, "CS", false).unwrap();
        mgr.insert_offering("CourseB", "1", 5, "CS", false).unwrap();
        mgr.insert_offering("CourseC", "1", 3, "EE", false).unwrap();
        assert_eq!(mgr.generate_requests(Some(3), Some("CS")).unwrap(), 1);
        assert_eq!(mgr.generate_requests(Some(3), None).unwrap(), 1);
        assert_eq!(mgr.generate_requests(None, None).unwrap(), 1);
    }

    #[test]
    fn test_accept_claims_pending_request() {
        let (mgr, ids) = seeded();
        let p = prefs(vec![Day::Monday], vec![1]);
        mgr.accept_request(ids[0], 7, &p).unwrap();

        let request = mgr.get_request(ids[0]).unwrap().unwrap();
        assert_eq!(request.status, RequestStatus::Accepted);
        assert_eq!(request.instructor_id, Some(7));
        assert!(request.accepted_at.is_some());
        assert_eq!(request.preferences, Some(p));
    }

    #[test]
    fn test_accept_unknown_request_is_not_found() {
        let (mgr, _) = seeded();
        let err = mgr
            .accept_request(999, 7, &prefs(vec![Day::Monday], vec![1]))
            .unwrap_err();
        assert!(matches!(err, SchedulingError::NotFound { .. }));
    }

    #[test]
    fn test_accept_already_claimed_is_conflict() {
        let (mgr, ids) = seeded();
        mgr.accept_request(ids[0], 7, &prefs(vec![Day::Monday], vec![1]))
            .unwrap();
        let err = mgr
            .accept_request(ids[0], 8, &prefs(vec![Day::Tuesday], vec![2]))
            .unwrap_err();
        assert!(matches!(err, SchedulingError::Conflict { .. }));
    }

    #[test]
    fn test_accept_rejects_empty_preferences() {
        let (mgr, ids) = seeded();
        let err = mgr
            .accept_request(ids[0], 7, &prefs(vec![], vec![1]))
            .unwrap_err();
        assert!(matches!(err, SchedulingError::ConfigError { .. }));
        let err = mgr
            .accept_request(ids[0], 7, &prefs(vec![Day::Monday], vec![]))
            .unwrap_err();
        assert!(matches!(err, SchedulingError::ConfigError { .. }));
    }

    #[test]
    fn test_accept_rejects_collision_with_own_blocks() {
        let (mgr, ids) = seeded();
        mgr.accept_request(ids[0], 7, &prefs(vec![Day::Monday], vec![1]))
            .unwrap();
        assert_eq!(mgr.plan_assignments().unwrap(), 1);

        // Same instructor, same (day, slot): the preference collides with
        // the block just materialized.
        let err = mgr
            .accept_request(ids[1], 7, &prefs(vec![Day::Monday], vec![1]))
            .unwrap_err();
        assert!(matches!(
            err,
            SchedulingError::ScheduleConflict {
                kind: ResourceKind::Instructor,
                ..
            }
        ));
        // The request stays claimable.
        let request = mgr.get_request(ids[1]).unwrap().unwrap();
        assert_eq!(request.status, RequestStatus::Pending);
    }

    #[test]
    fn test_concurrent_accepts_produce_exactly_one_winner() {
        let (mgr, ids) = seeded();
        let mgr = Arc::new(mgr);
        let request_id = ids[0];
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = [7i64, 8]
            .into_iter()
            .map(|instructor| {
                let mgr = Arc::clone(&mgr);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    mgr.accept_request(request_id, instructor, &prefs(vec![Day::Monday], vec![1]))
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let wins = results.iter().filter(|r| r.is_ok()).count();
        let losses = results
            .iter()
            .filter(|r| matches!(r, Err(SchedulingError::Conflict { .. })))
            .count();
        assert_eq!(wins, 1);
        assert_eq!(losses, 1);

        let request = mgr.get_request(request_id).unwrap().unwrap();
        assert_eq!(request.status, RequestStatus::Accepted);
        assert!(request.instructor_id.is_some());
    }

    #[test]
    fn test_undo_within_window_reverts_to_pending() {
        let (mgr, ids) = seeded();
        mgr.accept_request(ids[0], 7, &prefs(vec![Day::Monday], vec![1]))
            .unwrap();
        mgr.undo_acceptance(ids[0], 7).unwrap();

        let request = mgr.get_request(ids[0]).unwrap().unwrap();
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.instructor_id, None);
        assert_eq!(request.accepted_at, None);
        assert_eq!(request.preferences, None);

        // Claimable again afterwards.
        mgr.accept_request(ids[0], 8, &prefs(vec![Day::Tuesday], vec![2]))
            .unwrap();
    }

    #[test]
    fn test_undo_after_window_is_expired() {
        let (mgr, ids) = seeded();
        mgr.accept_request(ids[0], 7, &prefs(vec![Day::Monday], vec![1]))
            .unwrap();
        let accepted_at = mgr.get_request(ids[0]).unwrap().unwrap().accepted_at.unwrap();

        let err = mgr
            .undo_acceptance_at(ids[0], 7, accepted_at + 11_000)
            .unwrap_err();
        assert!(matches!(err, SchedulingError::Expired { .. }));

        // Still within the window at exactly 10 seconds.
        mgr.undo_acceptance_at(ids[0], 7, accepted_at + 10_000).unwrap();
    }

    #[test]
    fn test_undo_by_other_instructor_is_unauthorized() {
        let (mgr, ids) = seeded();
        mgr.accept_request(ids[0], 7, &prefs(vec![Day::Monday], vec![1]))
            .unwrap();
        let err = mgr.undo_acceptance(ids[0], 8).unwrap_err();
        assert!(matches!(err, SchedulingError::Unauthorized { .. }));
        assert_eq!(
            mgr.get_request(ids[0]).unwrap().unwrap().status,
            RequestStatus::Accepted
        );
    }

    #[test]
    fn test_undo_detects_missing_acceptance_timestamp() {
        let (mgr, ids) = seeded();
        mgr.accept_request(ids[0], 7, &prefs(vec![Day::Monday], vec![1]))
            .unwrap();
        // Break the store invariant: accepted rows always carry a timestamp.
        mgr.db
            .lock()
            .unwrap()
            .execute(
                "UPDATE course_requests SET accepted_at = NULL WHERE request_id = ?1",
                params![ids[0]],
            )
            .unwrap();

        let err = mgr.undo_acceptance(ids[0], 7).unwrap_err();
        assert!(matches!(err, SchedulingError::Corrupt { .. }));
        assert_eq!(
            mgr.get_request(ids[0]).unwrap().unwrap().status,
            RequestStatus::Accepted
        );
    }

    #[test]
    fn test_undo_pending_request_is_not_found() {
        let (mgr, ids) = seeded();
        let err = mgr.undo_acceptance(ids[0], 7).unwrap_err();
        assert!(matches!(err, SchedulingError::NotFound { .. }));
        let err = mgr.undo_acceptance(999, 7).unwrap_err();
        assert!(matches!(err, SchedulingError::NotFound { .. }));
    }

    #[test]
    fn test_plan_assignments_scenario_single_accept() {
        // Two offerings, one accepted: the pass creates exactly one block
        // and leaves the other request untouched.
        let (mgr, ids) = seeded();
        mgr.accept_request(ids[0], 7, &prefs(vec![Day::Monday], vec![1]))
            .unwrap();
        assert_eq!(mgr.plan_assignments().unwrap(), 1);

        let blocks = mgr.list_blocks().unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].request_id, ids[0]);
        assert_eq!(blocks[0].day, Day::Monday);
        assert_eq!(blocks[0].slot_id, 1);
        assert_eq!(blocks[0].shift, "morning");

        // Re-running plans nothing new.
        assert_eq!(mgr.plan_assignments().unwrap(), 0);
    }

    #[test]
    fn test_plan_assignments_output_is_conflict_free() {
        let mgr = manager();
        mgr.insert_room("A-101", 100, RoomKind::Lecture).unwrap();
        mgr.insert_room("A-102", 40, RoomKind::Lecture).unwrap();
        mgr.insert_offering("CourseA", "1", 3, "CS", false).unwrap();
        mgr.insert_offering("CourseB", "2", 3, "CS", false).unwrap();
        mgr.insert_offering("CourseC", "1", 3, "CS", false).unwrap();
        mgr.activate_timings(&morning_timings()).unwrap();
        mgr.generate_slots().unwrap();
        mgr.generate_requests(None, None).unwrap();

        let ids: Vec<_> = mgr
            .list_requests()
            .unwrap()
            .into_iter()
            .map(|r| r.request_id)
            .collect();
        mgr.accept_request(ids[0], 7, &prefs(vec![Day::Monday, Day::Tuesday], vec![1, 2]))
            .unwrap();
        mgr.accept_request(ids[1], 8, &prefs(vec![Day::Monday, Day::Tuesday], vec![1, 2]))
            .unwrap();
        mgr.accept_request(ids[2], 9, &prefs(vec![Day::Monday, Day::Wednesday], vec![1, 2]))
            .unwrap();
        mgr.plan_assignments().unwrap();

        let blocks = mgr.list_blocks().unwrap();
        for (i, a) in blocks.iter().enumerate() {
            for b in blocks.iter().skip(i + 1) {
                if a.day == b.day && a.slot_id == b.slot_id {
                    assert_ne!(a.instructor_id, b.instructor_id);
                    assert_ne!(a.section, b.section);
                    assert!(a.room_id != b.room_id || a.shift != b.shift);
                }
            }
        }
    }

    #[test]
    fn test_reschedule_moves_block() {
        let (mgr, ids) = seeded();
        mgr.accept_request(ids[0], 7, &prefs(vec![Day::Monday], vec![1]))
            .unwrap();
        mgr.plan_assignments().unwrap();
        let block = mgr.list_blocks().unwrap().remove(0);

        mgr.reschedule_block(block.block_id, 7, Day::Wednesday, 3, block.room_id)
            .unwrap();
        let moved = mgr.list_blocks().unwrap().remove(0);
        assert_eq!(moved.day, Day::Wednesday);
        assert_eq!(moved.slot_id, 3);
    }

    #[test]
    fn test_reschedule_into_occupied_room_cell_fails() {
        let mgr = manager();
        mgr.insert_room("A-101", 100, RoomKind::Lecture).unwrap();
        mgr.insert_room("A-102", 40, RoomKind::Lecture).unwrap();
        mgr.insert_offering("CourseA", "1", 3, "CS", false).unwrap();
        mgr.insert_offering("CourseB", "2", 3, "CS", false).unwrap();
        mgr.activate_timings(&morning_timings()).unwrap();
        mgr.generate_slots().unwrap();
        mgr.generate_requests(None, None).unwrap();
        let ids: Vec<_> = mgr
            .list_requests()
            .unwrap()
            .into_iter()
            .map(|r| r.request_id)
            .collect();
        mgr.accept_request(ids[0], 7, &prefs(vec![Day::Monday], vec![1])).unwrap();
        mgr.accept_request(ids[1], 8, &prefs(vec![Day::Monday], vec![1])).unwrap();
        mgr.plan_assignments().unwrap();

        let blocks = mgr.list_blocks().unwrap();
        let (a, b) = (&blocks[0], &blocks[1]);
        // Move b's block onto a's exact (room, day, slot, shift).
        let err = mgr
            .reschedule_block(b.block_id, b.instructor_id, a.day, a.slot_id, a.room_id)
            .unwrap_err();
        assert!(matches!(
            err,
            SchedulingError::ScheduleConflict { kind: ResourceKind::Room, .. }
        ));
        // Untouched on failure.
        let after = mgr.list_blocks().unwrap();
        let b_after = after.iter().find(|x| x.block_id == b.block_id).unwrap();
        assert_eq!((b_after.day, b_after.slot_id, b_after.room_id), (b.day, b.slot_id, b.room_id));
    }

    #[test]
    fn test_reschedule_checks_ownership_and_existence() {
        let (mgr, ids) = seeded();
        mgr.accept_request(ids[0], 7, &prefs(vec![Day::Monday], vec![1]))
            .unwrap();
        mgr.plan_assignments().unwrap();
        let block = mgr.list_blocks().unwrap().remove(0);

        let err = mgr
            .reschedule_block(block.block_id, 8, Day::Tuesday, 2, block.room_id)
            .unwrap_err();
        assert!(matches!(err, SchedulingError::Unauthorized { .. }));
        let err = mgr
            .reschedule_block(999, 7, Day::Tuesday, 2, block.room_id)
            .unwrap_err();
        assert!(matches!(err, SchedulingError::NotFound { .. }));
        let err = mgr
            .reschedule_block(block.block_id, 7, Day::Tuesday, 999, block.room_id)
            .unwrap_err();
        assert!(matches!(err, SchedulingError::NotFound { .. }));
    }

    #[test]
    fn test_generate_slots_replaces_prior_set() {
        let (mgr, _) = seeded();
        assert_eq!(mgr.list_slots().unwrap().len(), 4);

        let mut timings = morning_timings();
        timings.slot_minutes = 120;
        mgr.activate_timings(&timings).unwrap();
        let slots = mgr.generate_slots().unwrap();
        assert_eq!(slots.len(), 2);
        assert_eq!(mgr.list_slots().unwrap().len(), 2);
    }

    #[test]
    fn test_generate_slots_requires_active_timings() {
        let mgr = manager();
        let err = mgr.generate_slots().unwrap_err();
        assert!(matches!(err, SchedulingError::ConfigError { .. }));
    }

    #[test]
    fn test_distribution_failure_leaves_old_slots_intact() {
        let (mgr, _) = seeded();
        let before = mgr.list_slots().unwrap().len();

        let bounds = SlotLengthBounds { min_minutes: 90, max_minutes: 120 };
        // Solves to 48 minutes (240 / 5), below the minimum.
        let err = mgr.generate_slots_distributed(5, &bounds).unwrap_err();
        assert!(matches!(err, SchedulingError::ConfigError { .. }));
        assert_eq!(mgr.list_slots().unwrap().len(), before);

        let bounds = SlotLengthBounds { min_minutes: 30, max_minutes: 120 };
        let slots = mgr.generate_slots_distributed(5, &bounds).unwrap();
        assert_eq!(slots.len(), 5);
    }

    #[test]
    fn test_reset_assignments_reverts_requests() {
        let (mgr, ids) = seeded();
        mgr.accept_request(ids[0], 7, &prefs(vec![Day::Monday], vec![1]))
            .unwrap();
        mgr.plan_assignments().unwrap();

        mgr.reset(ResetScope::Assignments).unwrap();
        assert!(mgr.list_blocks().unwrap().is_empty());
        let request = mgr.get_request(ids[0]).unwrap().unwrap();
        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.instructor_id, None);
        assert_eq!(request.preferences, None);
        // Slots survive this scope.
        assert!(!mgr.list_slots().unwrap().is_empty());
    }

    #[test]
    fn test_reset_slots_cascades_blocks() {
        let (mgr, ids) = seeded();
        mgr.accept_request(ids[0], 7, &prefs(vec![Day::Monday], vec![1]))
            .unwrap();
        mgr.plan_assignments().unwrap();

        mgr.reset(ResetScope::Slots).unwrap();
        assert!(mgr.list_slots().unwrap().is_empty());
        assert!(mgr.list_blocks().unwrap().is_empty());
        // Requests are untouched by this scope.
        assert_eq!(mgr.list_requests().unwrap().len(), 2);
    }

    #[test]
    fn test_reset_full_clears_everything() {
        let (mgr, ids) = seeded();
        mgr.accept_request(ids[0], 7, &prefs(vec![Day::Monday], vec![1]))
            .unwrap();
        mgr.plan_assignments().unwrap();

        mgr.reset(ResetScope::Full).unwrap();
        assert!(mgr.list_blocks().unwrap().is_empty());
        assert!(mgr.list_requests().unwrap().is_empty());
        assert!(mgr.list_slots().unwrap().is_empty());
        assert!(mgr.active_timings().unwrap().is_none());
        // Offerings and rooms survive; a new cycle can start immediately.
        assert_eq!(mgr.list_offerings().unwrap().len(), 2);
        assert_eq!(mgr.generate_requests(None, None).unwrap(), 2);
    }
}
