use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use sqlparser::ast::{
    self, Expr, FromTable, ObjectNamePart, SetExpr, Statement, TableFactor, TableObject, Value,
    ValueWithSpan,
};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use ulid::Ulid;

use crate::model::*;

/// Tables of the wire surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Events,
    Venues,
    Staff,
    Tasks,
    EventStaff,
    TaskStaff,
    EventTables,
    Invites,
    Providers,
}

impl Table {
    fn from_name(name: &str) -> Result<Self, SqlError> {
        Ok(match name {
            "events" => Table::Events,
            "venues" => Table::Venues,
            "staff" => Table::Staff,
            "tasks" => Table::Tasks,
            "event_staff" => Table::EventStaff,
            "task_staff" => Table::TaskStaff,
            "event_tables" => Table::EventTables,
            "invites" => Table::Invites,
            "providers" => Table::Providers,
            other => return Err(SqlError::UnknownTable(other.to_string())),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Table::Events => "events",
            Table::Venues => "venues",
            Table::Staff => "staff",
            Table::Tasks => "tasks",
            Table::EventStaff => "event_staff",
            Table::TaskStaff => "task_staff",
            Table::EventTables => "event_tables",
            Table::Invites => "invites",
            Table::Providers => "providers",
        }
    }

    /// Columns accepted in INSERT / upsert statements.
    fn writable(&self) -> &'static [&'static str] {
        match self {
            Table::Events => &[
                "id", "company", "venue_id", "title", "date", "start_time", "end_time", "guests",
                "budget", "status", "kind", "area", "folder",
            ],
            Table::Venues => &["id", "company", "name", "capacity"],
            Table::Staff => &["id", "company", "name", "role"],
            Table::Tasks => &["id", "event_id", "title", "done"],
            Table::EventStaff => &["event_id", "staff_id"],
            Table::TaskStaff => &["task_id", "staff_id"],
            Table::EventTables => &["id", "event_id", "name", "capacity"],
            Table::Invites => &["id", "event_id", "table_id", "name", "personnes", "status", "present"],
            Table::Providers => &["id", "event_id", "name", "amount", "advance"],
        }
    }

    /// Status columns derived by the engine; never written by clients.
    fn projected(&self) -> &'static [&'static str] {
        match self {
            Table::Venues | Table::Staff | Table::EventTables => &["status"],
            _ => &[],
        }
    }

    /// Columns usable in `WHERE col = value AND ...` of a SELECT.
    fn filterable(&self) -> &'static [&'static str] {
        match self {
            Table::Events => &["id", "company", "venue_id", "date", "status"],
            Table::Venues | Table::Staff => &["id"],
            Table::Tasks | Table::EventTables | Table::Invites | Table::Providers => &["event_id"],
            Table::EventStaff => &["event_id"],
            Table::TaskStaff => &["task_id"],
        }
    }
}

/// Parsed command from SQL input.
#[derive(Debug, PartialEq)]
pub enum Command {
    InsertEvent(EventDraft),
    UpdateEvent { id: Ulid, patch: EventPatch },
    DeleteEvent { id: Ulid },
    InsertVenue(VenueDraft),
    UpdateVenue { id: Ulid, patch: VenuePatch },
    DeleteVenue { id: Ulid },
    InsertStaff(StaffDraft),
    UpdateStaff { id: Ulid, patch: StaffPatch },
    DeleteStaff { id: Ulid },
    InsertTask(TaskDraft),
    UpdateTask { id: Ulid, patch: TaskPatch },
    DeleteTask { id: Ulid },
    AssignStaff { event_id: Ulid, staff_id: Ulid },
    UnassignStaff { event_id: Ulid, staff_id: Ulid },
    AssignTaskStaff { task_id: Ulid, staff_id: Ulid },
    UnassignTaskStaff { task_id: Ulid, staff_id: Ulid },
    InsertTable(TableDraft),
    UpdateTable { id: Ulid, patch: TablePatch },
    DeleteTable { id: Ulid },
    InsertInvite(InviteDraft),
    UpdateInvite { id: Ulid, patch: InvitePatch },
    DeleteInvite { id: Ulid },
    InsertProvider(ProviderDraft),
    UpdateProvider { id: Ulid, patch: ProviderPatch },
    DeleteProvider { id: Ulid },
    SelectEvents(EventFilter),
    SelectVenues { id: Option<Ulid> },
    SelectStaff { id: Option<Ulid> },
    SelectTasks { event_id: Option<Ulid> },
    SelectEventStaff { event_id: Option<Ulid> },
    SelectTaskStaff { task_id: Option<Ulid> },
    SelectTables { event_id: Option<Ulid> },
    SelectInvites { event_id: Option<Ulid> },
    SelectProviders { event_id: Option<Ulid> },
}

pub fn parse_sql(sql: &str) -> Result<Command, SqlError> {
    let stmts = Parser::parse_sql(&PostgreSqlDialect {}, sql).map_err(|e| SqlError::Parse(e.to_string()))?;
    match stmts.first() {
        None => Err(SqlError::Empty),
        Some(Statement::Insert(insert)) => parse_insert(insert),
        Some(Statement::Delete(delete)) => parse_delete(delete),
        Some(Statement::Query(query)) => parse_select(query),
        Some(other) => Err(SqlError::Unsupported(format!("{other}"))),
    }
}

/// Table a SELECT reads from, without evaluating its filters.
/// Used to describe result columns before parameters are bound.
pub fn select_target(sql: &str) -> Option<Table> {
    let stmts = Parser::parse_sql(&PostgreSqlDialect {}, sql).ok()?;
    let Some(Statement::Query(query)) = stmts.first() else {
        return None;
    };
    let SetExpr::Select(select) = query.body.as_ref() else {
        return None;
    };
    let name = table_factor_name(&select.from.first()?.relation).ok()?;
    Table::from_name(&name).ok()
}

// ── Statements ────────────────────────────────────────────────

/// `ON CONFLICT (id)`; a bare `ON CONFLICT` also resolves on the primary key.
fn targets_id(target: Option<&ast::ConflictTarget>) -> bool {
    match target {
        None => true,
        Some(ast::ConflictTarget::Columns(cols)) => {
            matches!(cols.as_slice(), [col] if col.value.eq_ignore_ascii_case("id"))
        }
        Some(_) => false,
    }
}

fn parse_insert(insert: &ast::Insert) -> Result<Command, SqlError> {
    let table = Table::from_name(&insert_table_name(insert)?)?;
    let row = insert_row(insert, table)?;

    // INSERT ... ON CONFLICT (id) DO UPDATE: the listed columns patch the row named by id.
    match &insert.on {
        None => {}
        Some(ast::OnInsert::OnConflict(ast::OnConflict {
            conflict_target,
            action: ast::OnConflictAction::DoUpdate(_),
            ..
        })) if targets_id(conflict_target.as_ref()) => return parse_update(table, &row),
        Some(other) => return Err(SqlError::Unsupported(format!("{other}").trim().to_string())),
    }

    Ok(match table {
        Table::Events => Command::InsertEvent(EventDraft {
            id: row.required("id", as_ulid)?,
            company: row.optional("company", as_text)?,
            venue_id: row.optional("venue_id", as_ulid)?,
            title: row.required("title", as_text)?,
            date: row.required("date", as_date)?,
            start: row.optional("start_time", as_time)?,
            end: row.optional("end_time", as_time)?,
            guests: row.optional("guests", as_u32)?.unwrap_or(0),
            budget: Budget::new(row.optional("budget", as_text)?.unwrap_or_default()),
            status: row.optional("status", as_status)?,
            kind: row.optional("kind", as_text)?,
            area: row.optional("area", as_text)?,
            folder: row.optional("folder", as_text)?,
            staff: BTreeSet::new(),
        }),
        Table::Venues => Command::InsertVenue(VenueDraft {
            id: row.required("id", as_ulid)?,
            company: row.optional("company", as_text)?,
            name: row.required("name", as_text)?,
            capacity: row.optional("capacity", as_u32)?.unwrap_or(0),
        }),
        Table::Staff => Command::InsertStaff(StaffDraft {
            id: row.required("id", as_ulid)?,
            company: row.optional("company", as_text)?,
            name: row.required("name", as_text)?,
            role: row.optional("role", as_text)?,
        }),
        Table::Tasks => Command::InsertTask(TaskDraft {
            id: row.required("id", as_ulid)?,
            event_id: row.required("event_id", as_ulid)?,
            title: row.required("title", as_text)?,
            done: row.optional("done", as_bool)?.unwrap_or(false),
            staff: BTreeSet::new(),
        }),
        Table::EventStaff => Command::AssignStaff {
            event_id: row.required("event_id", as_ulid)?,
            staff_id: row.required("staff_id", as_ulid)?,
        },
        Table::TaskStaff => Command::AssignTaskStaff {
            task_id: row.required("task_id", as_ulid)?,
            staff_id: row.required("staff_id", as_ulid)?,
        },
        Table::EventTables => Command::InsertTable(TableDraft {
            id: row.required("id", as_ulid)?,
            event_id: row.required("event_id", as_ulid)?,
            name: row.required("name", as_text)?,
            capacity: row.optional("capacity", as_u32)?.unwrap_or(0),
        }),
        Table::Invites => Command::InsertInvite(InviteDraft {
            id: row.required("id", as_ulid)?,
            event_id: row.required("event_id", as_ulid)?,
            table_id: row.optional("table_id", as_ulid)?,
            name: row.required("name", as_text)?,
            personnes: row.optional("personnes", as_u32)?.unwrap_or(1),
            status: row.optional("status", as_status)?.unwrap_or_default(),
            present: row.optional("present", as_bool)?.unwrap_or(false),
        }),
        Table::Providers => Command::InsertProvider(ProviderDraft {
            id: row.required("id", as_ulid)?,
            event_id: row.required("event_id", as_ulid)?,
            name: row.required("name", as_text)?,
            amount: row.optional("amount", as_u64)?.unwrap_or(0),
            advance: row.optional("advance", as_u64)?.unwrap_or(0),
        }),
    })
}

fn parse_update(table: Table, row: &Row) -> Result<Command, SqlError> {
    let id = row.required("id", as_ulid)?;
    Ok(match table {
        Table::Events => Command::UpdateEvent {
            id,
            patch: EventPatch {
                company: row.settable("company", as_text)?,
                venue_id: row.clearable("venue_id", as_ulid)?,
                title: row.settable("title", as_text)?,
                date: row.settable("date", as_date)?,
                start: row.clearable("start_time", as_time)?,
                end: row.clearable("end_time", as_time)?,
                guests: row.settable("guests", as_u32)?,
                budget: row.settable("budget", as_text)?.map(Budget::new),
                status: row.settable("status", as_status)?,
                kind: row.clearable("kind", as_text)?,
                area: row.clearable("area", as_text)?,
                folder: row.clearable("folder", as_text)?,
            },
        },
        Table::Venues => Command::UpdateVenue {
            id,
            patch: VenuePatch {
                company: row.settable("company", as_text)?,
                name: row.settable("name", as_text)?,
                capacity: row.settable("capacity", as_u32)?,
            },
        },
        Table::Staff => Command::UpdateStaff {
            id,
            patch: StaffPatch {
                company: row.settable("company", as_text)?,
                name: row.settable("name", as_text)?,
                role: row.clearable("role", as_text)?,
            },
        },
        Table::Tasks => Command::UpdateTask {
            id,
            patch: TaskPatch {
                title: row.settable("title", as_text)?,
                done: row.settable("done", as_bool)?,
            },
        },
        Table::EventTables => Command::UpdateTable {
            id,
            patch: TablePatch {
                name: row.settable("name", as_text)?,
                capacity: row.settable("capacity", as_u32)?,
            },
        },
        Table::Invites => Command::UpdateInvite {
            id,
            patch: InvitePatch {
                table_id: row.clearable("table_id", as_ulid)?,
                name: row.settable("name", as_text)?,
                personnes: row.settable("personnes", as_u32)?,
                status: row.settable("status", as_status)?,
                present: row.settable("present", as_bool)?,
            },
        },
        Table::Providers => Command::UpdateProvider {
            id,
            patch: ProviderPatch {
                name: row.settable("name", as_text)?,
                amount: row.settable("amount", as_u64)?,
                advance: row.settable("advance", as_u64)?,
            },
        },
        Table::EventStaff | Table::TaskStaff => {
            return Err(SqlError::Unsupported(format!("upsert into {}", table.name())));
        }
    })
}

fn parse_delete(delete: &ast::Delete) -> Result<Command, SqlError> {
    let table = Table::from_name(&delete_table_name(delete)?)?;
    let filter = where_row(delete.selection.as_ref())?;

    Ok(match table {
        Table::EventStaff => Command::UnassignStaff {
            event_id: filter.required("event_id", as_ulid)?,
            staff_id: filter.required("staff_id", as_ulid)?,
        },
        Table::TaskStaff => Command::UnassignTaskStaff {
            task_id: filter.required("task_id", as_ulid)?,
            staff_id: filter.required("staff_id", as_ulid)?,
        },
        other => {
            let id = filter.required("id", as_ulid)?;
            match other {
                Table::Events => Command::DeleteEvent { id },
                Table::Venues => Command::DeleteVenue { id },
                Table::Staff => Command::DeleteStaff { id },
                Table::Tasks => Command::DeleteTask { id },
                Table::EventTables => Command::DeleteTable { id },
                Table::Invites => Command::DeleteInvite { id },
                _ => Command::DeleteProvider { id },
            }
        }
    })
}

fn parse_select(query: &ast::Query) -> Result<Command, SqlError> {
    let select = match query.body.as_ref() {
        SetExpr::Select(s) => s,
        _ => return Err(SqlError::Unsupported("non-SELECT query".into())),
    };
    let from = select
        .from
        .first()
        .ok_or_else(|| SqlError::Parse("SELECT without FROM".into()))?;
    let table = Table::from_name(&table_factor_name(&from.relation)?)?;
    let filter = where_row(select.selection.as_ref())?;
    filter.check_columns(table, table.filterable())?;

    Ok(match table {
        Table::Events => Command::SelectEvents(EventFilter {
            company: filter.optional("company", as_text)?,
            id: filter.optional("id", as_ulid)?,
            venue_id: filter.optional("venue_id", as_ulid)?,
            date: filter.optional("date", as_date)?,
            status: filter.optional("status", as_status)?,
        }),
        Table::Venues => Command::SelectVenues { id: filter.optional("id", as_ulid)? },
        Table::Staff => Command::SelectStaff { id: filter.optional("id", as_ulid)? },
        Table::Tasks => Command::SelectTasks { event_id: filter.optional("event_id", as_ulid)? },
        Table::EventStaff => Command::SelectEventStaff { event_id: filter.optional("event_id", as_ulid)? },
        Table::TaskStaff => Command::SelectTaskStaff { task_id: filter.optional("task_id", as_ulid)? },
        Table::EventTables => Command::SelectTables { event_id: filter.optional("event_id", as_ulid)? },
        Table::Invites => Command::SelectInvites { event_id: filter.optional("event_id", as_ulid)? },
        Table::Providers => Command::SelectProviders { event_id: filter.optional("event_id", as_ulid)? },
    })
}

// ── Rows of literals ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Literal {
    Null,
    Text(String),
    Number(String),
    Bool(bool),
}

type Convert<T> = fn(&str, &Literal) -> Result<T, SqlError>;

/// Column → literal pairs from a VALUES row or a WHERE conjunction.
#[derive(Debug, Default)]
struct Row(BTreeMap<String, Literal>);

impl Row {
    fn insert(&mut self, column: String, value: Literal) -> Result<(), SqlError> {
        if self.0.insert(column.clone(), value).is_some() {
            return Err(SqlError::DuplicateColumn(column));
        }
        Ok(())
    }

    fn check_columns(&self, table: Table, allowed: &[&str]) -> Result<(), SqlError> {
        for column in self.0.keys() {
            if table.projected().contains(&column.as_str()) {
                return Err(SqlError::ReadOnlyColumn(column.clone()));
            }
            if !allowed.contains(&column.as_str()) {
                return Err(SqlError::UnknownColumn(table.name(), column.clone()));
            }
        }
        Ok(())
    }

    /// Absent → `None`, NULL → `Some(None)`.
    fn clearable<T>(&self, column: &str, convert: Convert<T>) -> Result<Option<Option<T>>, SqlError> {
        match self.0.get(column) {
            None => Ok(None),
            Some(Literal::Null) => Ok(Some(None)),
            Some(value) => convert(column, value).map(|v| Some(Some(v))),
        }
    }

    /// Absent or NULL → `None`.
    fn optional<T>(&self, column: &str, convert: Convert<T>) -> Result<Option<T>, SqlError> {
        Ok(self.clearable(column, convert)?.flatten())
    }

    /// Absent → `None`; NULL is rejected.
    fn settable<T>(&self, column: &str, convert: Convert<T>) -> Result<Option<T>, SqlError> {
        match self.clearable(column, convert)? {
            Some(None) => Err(SqlError::NullValue(column.to_string())),
            other => Ok(other.flatten()),
        }
    }

    fn required<T>(&self, column: &str, convert: Convert<T>) -> Result<T, SqlError> {
        match self.clearable(column, convert)? {
            Some(Some(value)) => Ok(value),
            Some(None) => Err(SqlError::NullValue(column.to_string())),
            None => Err(SqlError::MissingColumn(column.to_string())),
        }
    }
}

fn bad(column: &str, reason: impl Into<String>) -> SqlError {
    SqlError::BadValue {
        column: column.to_string(),
        reason: reason.into(),
    }
}

fn as_text(column: &str, value: &Literal) -> Result<String, SqlError> {
    match value {
        Literal::Text(s) | Literal::Number(s) => Ok(s.clone()),
        other => Err(bad(column, format!("expected text, got {other:?}"))),
    }
}

fn as_ulid(column: &str, value: &Literal) -> Result<Ulid, SqlError> {
    let text = as_text(column, value)?;
    Ulid::from_string(&text).map_err(|e| bad(column, format!("bad ULID: {e}")))
}

fn as_u64(column: &str, value: &Literal) -> Result<u64, SqlError> {
    let text = as_text(column, value)?;
    text.trim().parse().map_err(|_| bad(column, format!("expected non-negative integer, got {text}")))
}

fn as_u32(column: &str, value: &Literal) -> Result<u32, SqlError> {
    let n = as_u64(column, value)?;
    u32::try_from(n).map_err(|_| bad(column, format!("{n} out of range")))
}

fn as_bool(column: &str, value: &Literal) -> Result<bool, SqlError> {
    match value {
        Literal::Bool(b) => Ok(*b),
        Literal::Text(s) | Literal::Number(s) => match s.to_lowercase().as_str() {
            "true" | "t" | "1" => Ok(true),
            "false" | "f" | "0" => Ok(false),
            _ => Err(bad(column, format!("bad bool: {s}"))),
        },
        Literal::Null => Err(bad(column, "expected bool")),
    }
}

fn as_date(column: &str, value: &Literal) -> Result<NaiveDate, SqlError> {
    let text = as_text(column, value)?;
    parse_date(&text).ok_or_else(|| bad(column, format!("expected YYYY-MM-DD, got {text}")))
}

fn as_time(column: &str, value: &Literal) -> Result<NaiveTime, SqlError> {
    let text = as_text(column, value)?;
    parse_clock_time(&text).ok_or_else(|| bad(column, format!("expected HH:MM, got {text}")))
}

fn as_status<T: FromStr<Err = ParseStatusError>>(column: &str, value: &Literal) -> Result<T, SqlError> {
    let text = as_text(column, value)?;
    text.parse().map_err(|e: ParseStatusError| bad(column, e.to_string()))
}

// ── AST helpers ───────────────────────────────────────────────

fn object_name_last(name: &ast::ObjectName) -> Option<String> {
    name.0.last().and_then(|part| match part {
        ObjectNamePart::Identifier(ident) => Some(ident.value.to_lowercase()),
        _ => None,
    })
}

fn insert_table_name(insert: &ast::Insert) -> Result<String, SqlError> {
    match &insert.table {
        TableObject::TableName(name) => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("unsupported table object in INSERT".into())),
    }
}

fn delete_table_name(delete: &ast::Delete) -> Result<String, SqlError> {
    let tables_with_joins = match &delete.from {
        FromTable::WithFromKeyword(t) | FromTable::WithoutKeyword(t) => t,
    };
    match tables_with_joins.first() {
        Some(first) => table_factor_name(&first.relation),
        None => Err(SqlError::Parse("DELETE without table".into())),
    }
}

fn table_factor_name(tf: &TableFactor) -> Result<String, SqlError> {
    match tf {
        TableFactor::Table { name, .. } => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("complex table expression".into())),
    }
}

/// The single VALUES row of an INSERT, keyed by its column list.
fn insert_row(insert: &ast::Insert, table: Table) -> Result<Row, SqlError> {
    if insert.columns.is_empty() {
        return Err(SqlError::Parse("INSERT needs an explicit column list".into()));
    }
    let body = insert
        .source
        .as_ref()
        .ok_or_else(|| SqlError::Parse("no VALUES".into()))?;
    let values = match body.body.as_ref() {
        SetExpr::Values(values) => values,
        _ => return Err(SqlError::Parse("expected VALUES".into())),
    };
    let exprs = match values.rows.as_slice() {
        [] => return Err(SqlError::Parse("empty VALUES".into())),
        [row] => row,
        _ => return Err(SqlError::Unsupported("one row per INSERT".into())),
    };
    if exprs.len() != insert.columns.len() {
        return Err(SqlError::WrongArity(table.name(), insert.columns.len(), exprs.len()));
    }

    let mut row = Row::default();
    for (ident, expr) in insert.columns.iter().zip(exprs) {
        row.insert(ident.value.to_lowercase(), literal(expr)?)?;
    }
    row.check_columns(table, table.writable())?;
    Ok(row)
}

/// `col = value AND col = value ...`; anything else is unsupported.
fn where_row(selection: Option<&Expr>) -> Result<Row, SqlError> {
    fn collect(expr: &Expr, row: &mut Row) -> Result<(), SqlError> {
        match expr {
            Expr::Nested(inner) => collect(inner, row),
            Expr::BinaryOp { left, op: ast::BinaryOperator::And, right } => {
                collect(left, row)?;
                collect(right, row)
            }
            Expr::BinaryOp { left, op: ast::BinaryOperator::Eq, right } => {
                let column = expr_column_name(left)
                    .ok_or_else(|| SqlError::Unsupported(format!("filter on {left}")))?;
                row.insert(column, literal(right)?)
            }
            other => Err(SqlError::Unsupported(format!("filter {other}"))),
        }
    }

    let mut row = Row::default();
    if let Some(expr) = selection {
        collect(expr, &mut row)?;
    }
    Ok(row)
}

fn expr_column_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(ident) => Some(ident.value.to_lowercase()),
        Expr::CompoundIdentifier(parts) => parts.last().map(|i| i.value.to_lowercase()),
        _ => None,
    }
}

fn literal(expr: &Expr) -> Result<Literal, SqlError> {
    match expr {
        Expr::Value(ValueWithSpan { value, .. }) => match value {
            Value::Null => Ok(Literal::Null),
            Value::Boolean(b) => Ok(Literal::Bool(*b)),
            Value::Number(n, _) => Ok(Literal::Number(n.to_string())),
            Value::SingleQuotedString(s) => Ok(Literal::Text(s.clone())),
            other => Err(SqlError::Parse(format!("unsupported literal {other}"))),
        },
        Expr::UnaryOp { op: ast::UnaryOperator::Minus, expr } => match literal(expr)? {
            Literal::Number(n) => Ok(Literal::Number(format!("-{n}"))),
            _ => Err(SqlError::Parse(format!("cannot negate {expr}"))),
        },
        other => Err(SqlError::Parse(format!("expected literal, got {other}"))),
    }
}

// ── Errors ────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum SqlError {
    #[error("parse error: {0}")]
    Parse(String),
    #[error("empty query")]
    Empty,
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("unknown table: {0}")]
    UnknownTable(String),
    #[error("{0}: unknown column {1}")]
    UnknownColumn(&'static str, String),
    #[error("column {0} is derived and cannot be written")]
    ReadOnlyColumn(String),
    #[error("column {0} given twice")]
    DuplicateColumn(String),
    #[error("missing column: {0}")]
    MissingColumn(String),
    #[error("column {0} cannot be NULL")]
    NullValue(String),
    #[error("bad value for {column}: {reason}")]
    BadValue { column: String, reason: String },
    #[error("{0}: expected {1} values, got {2}")]
    WrongArity(&'static str, usize, usize),
}
