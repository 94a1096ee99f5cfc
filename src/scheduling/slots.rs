//! Time-slot partitioning: turns an operating-hours window into an ordered
//! sequence of bookable slots.

use super::error::SchedulingError;
use crate::config::SlotLengthBounds;
use chrono::{NaiveTime, Timelike};

/// One generated slot: `[start, end)`, numbered 1..N within its shift.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotWindow {
    pub seq_no: u32,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// Slot and break lengths are capped below this, keeping every minute
/// computation in here comfortably inside `u32`.
pub(crate) const MINUTES_PER_DAY: u32 = 24 * 60;

fn minutes_from_midnight(t: NaiveTime) -> u32 {
    t.num_seconds_from_midnight() / 60
}

fn time_from_minutes(m: u32) -> NaiveTime {
    // Callers only pass offsets at or before closing, which is within a day.
    NaiveTime::from_hms_opt(m / 60, m % 60, 0).expect("minute offset within one day")
}

/// Partitions `[opening, closing)` into slots of `slot_minutes`, stepping by
/// `slot_minutes + break_minutes`. A slot is emitted only when it fits
/// entirely before closing; a dangling remainder shorter than a slot is
/// discarded, never truncated.
pub fn partition(
    opening: NaiveTime,
    closing: NaiveTime,
    slot_minutes: u32,
    break_minutes: u32,
) -> Result<Vec<SlotWindow>, SchedulingError> {
    if slot_minutes == 0 {
        return Err(SchedulingError::config("slot length must be positive"));
    }
    if slot_minutes >= MINUTES_PER_DAY || break_minutes >= MINUTES_PER_DAY {
        return Err(SchedulingError::config(format!(
            "slot length {slot_minutes} min and break {break_minutes} min must each be shorter than a day"
        )));
    }
    let open_min = minutes_from_midnight(opening);
    let close_min = minutes_from_midnight(closing);
    if close_min <= open_min {
        return Err(SchedulingError::config(format!(
            "closing time {closing} is not after opening time {opening}"
        )));
    }

    let mut slots = Vec::new();
    let mut cursor = open_min;
    let mut seq_no = 1;
    while cursor + slot_minutes <= close_min {
        slots.push(SlotWindow {
            seq_no,
            start: time_from_minutes(cursor),
            end: time_from_minutes(cursor + slot_minutes),
        });
        cursor += slot_minutes + break_minutes;
        seq_no += 1;
    }

    if slots.is_empty() {
        return Err(SchedulingError::config(format!(
            "no {slot_minutes}-minute slot fits between {opening} and {closing}"
        )));
    }
    Ok(slots)
}

/// Distribution mode: back-solves the slot length that splits the window
/// into exactly `target_slots` even slots given the break overhead. Fails
/// with a configuration error when the window does not divide evenly or the
/// solved length falls outside `bounds`.
pub fn solve_distributed_length(
    opening: NaiveTime,
    closing: NaiveTime,
    break_minutes: u32,
    target_slots: u32,
    bounds: &SlotLengthBounds,
) -> Result<u32, SchedulingError> {
    if target_slots == 0 {
        return Err(SchedulingError::config("target slot count must be positive"));
    }
    let open_min = minutes_from_midnight(opening);
    let close_min = minutes_from_midnight(closing);
    if close_min <= open_min {
        return Err(SchedulingError::config(format!(
            "closing time {closing} is not after opening time {opening}"
        )));
    }

    let window = close_min - open_min;
    let break_total = match break_minutes.checked_mul(target_slots - 1) {
        Some(total) if total < window => total,
        _ => {
            return Err(SchedulingError::config(format!(
                "breaks alone exceed the {window}-minute window"
            )))
        }
    };
    let usable = window - break_total;
    if usable % target_slots != 0 {
        return Err(SchedulingError::config(format!(
            "{usable} usable minutes cannot be split evenly into {target_slots} slots"
        )));
    }
    let length = usable / target_slots;
    if length < bounds.min_minutes || length > bounds.max_minutes {
        return Err(SchedulingError::config(format!(
            "solved slot length {length} min is outside the allowed {}..={} range",
            bounds.min_minutes, bounds.max_minutes
        )));
    }
    Ok(length)
}
