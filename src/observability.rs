use std::net::SocketAddr;

use crate::sql::Command;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total queries executed. Labels: command, status.
pub const QUERIES_TOTAL: &str = "soiree_queries_total";

/// Histogram: query latency in seconds. Labels: command.
pub const QUERY_DURATION_SECONDS: &str = "soiree_query_duration_seconds";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: active TCP connections.
pub const CONNECTIONS_ACTIVE: &str = "soiree_connections_active";

/// Counter: total connections accepted.
pub const CONNECTIONS_TOTAL: &str = "soiree_connections_total";

/// Counter: connections rejected due to limit.
pub const CONNECTIONS_REJECTED_TOTAL: &str = "soiree_connections_rejected_total";

/// Gauge: number of loaded tenant engines.
pub const TENANTS_ACTIVE: &str = "soiree_tenants_active";

/// Counter: startup/auth failures.
pub const AUTH_FAILURES_TOTAL: &str = "soiree_auth_failures_total";

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "soiree_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (transactions per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "soiree_wal_flush_batch_size";

// ── Domain metrics ──────────────────────────────────────────────

/// Counter: derived statuses rewritten. Labels: kind (venue, staff, table).
pub const PROJECTION_UPDATES_TOTAL: &str = "soiree_projection_updates_total";

/// Counter: event statuses moved by the clock. Labels: status.
pub const SWEEP_TRANSITIONS_TOTAL: &str = "soiree_sweep_transitions_total";

/// Counter: writes refused by an admission check. Labels: reason (conflict, capacity, budget).
pub const ADMISSION_REJECTED_TOTAL: &str = "soiree_admission_rejected_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Map a Command variant to a short label for metrics.
pub fn command_label(cmd: &Command) -> &'static str {
    match cmd {
        Command::InsertEvent(_) => "insert_event",
        Command::UpdateEvent { .. } => "update_event",
        Command::DeleteEvent { .. } => "delete_event",
        Command::InsertVenue(_) => "insert_venue",
        Command::UpdateVenue { .. } => "update_venue",
        Command::DeleteVenue { .. } => "delete_venue",
        Command::InsertStaff(_) => "insert_staff",
        Command::UpdateStaff { .. } => "update_staff",
        Command::DeleteStaff { .. } => "delete_staff",
        Command::InsertTask(_) => "insert_task",
        Command::UpdateTask { .. } => "update_task",
        Command::DeleteTask { .. } => "delete_task",
        Command::AssignStaff { .. } => "assign_staff",
        Command::UnassignStaff { .. } => "unassign_staff",
        Command::AssignTaskStaff { .. } => "assign_task_staff",
        Command::UnassignTaskStaff { .. } => "unassign_task_staff",
        Command::InsertTable(_) => "insert_table",
        Command::UpdateTable { .. } => "update_table",
        Command::DeleteTable { .. } => "delete_table",
        Command::InsertInvite(_) => "insert_invite",
        Command::UpdateInvite { .. } => "update_invite",
        Command::DeleteInvite { .. } => "delete_invite",
        Command::InsertProvider(_) => "insert_provider",
        Command::UpdateProvider { .. } => "update_provider",
        Command::DeleteProvider { .. } => "delete_provider",
        Command::SelectEvents(_) => "select_events",
        Command::SelectVenues { .. } => "select_venues",
        Command::SelectStaff { .. } => "select_staff",
        Command::SelectTasks { .. } => "select_tasks",
        Command::SelectEventStaff { .. } => "select_event_staff",
        Command::SelectTaskStaff { .. } => "select_task_staff",
        Command::SelectTables { .. } => "select_tables",
        Command::SelectInvites { .. } => "select_invites",
        Command::SelectProviders { .. } => "select_providers",
    }
}
