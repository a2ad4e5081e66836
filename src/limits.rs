// Hard ceilings applied at the engine and tenant boundaries.

pub const MAX_TENANTS: usize = 10_000;
pub const MAX_TENANT_NAME_LEN: usize = 63;

/// Titles, names, roles and other short free-text columns.
pub const MAX_NAME_LEN: usize = 256;
/// Budget is free text; only its digits matter, but the raw value is stored.
pub const MAX_BUDGET_LEN: usize = 64;
/// Opaque metadata (`kind`, `area`, `folder`).
pub const MAX_METADATA_LEN: usize = 1024;

pub const MAX_EVENTS_PER_TENANT: usize = 100_000;
pub const MAX_VENUES_PER_TENANT: usize = 10_000;
pub const MAX_STAFF_PER_TENANT: usize = 10_000;

/// Tasks, tables, invites and providers hanging off a single event (each kind).
pub const MAX_CHILDREN_PER_EVENT: usize = 10_000;
pub const MAX_STAFF_PER_ASSIGNMENT: usize = 1_000;

pub const MAX_PARTY_SIZE: u32 = 10_000;
