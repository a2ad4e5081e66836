use ulid::Ulid;

use crate::model::{Budget, EventTable};

use super::EngineError;

/// Reject seating `requested` more guests at a table already holding `used`.
pub(crate) fn check_seating(table: &EventTable, used: u32, requested: u32) -> Result<(), EngineError> {
    if table.capacity > 0 && used.saturating_add(requested) > table.capacity {
        metrics::counter!(crate::observability::ADMISSION_REJECTED_TOTAL, "reason" => "capacity")
            .increment(1);
        return Err(EngineError::Capacity {
            table_id: table.id,
            capacity: table.capacity,
            seated: used,
            requested,
        });
    }
    Ok(())
}

/// Reject a committed provider total above the event's budget. No limit, no check.
pub(crate) fn check_budget(event_id: Ulid, budget: &Budget, total: u64) -> Result<(), EngineError> {
    if let Some(limit) = budget.limit()
        && total > limit
    {
        metrics::counter!(crate::observability::ADMISSION_REJECTED_TOTAL, "reason" => "budget")
            .increment(1);
        return Err(EngineError::Budget {
            event_id,
            limit,
            total,
        });
    }
    Ok(())
}
