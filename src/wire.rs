use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::stream;
use futures::Sink;
use pgwire::api::auth::cleartext::CleartextPasswordAuthStartupHandler;
use pgwire::api::auth::{DefaultServerParameterProvider, StartupHandler};
use pgwire::api::copy::CopyHandler;
use pgwire::api::portal::{Format, Portal};
use pgwire::api::query::{ExtendedQueryHandler, SimpleQueryHandler};
use pgwire::api::results::{
    DataRowEncoder, DescribePortalResponse, DescribeStatementResponse, FieldFormat, FieldInfo,
    QueryResponse, Response, Tag,
};
use pgwire::api::stmt::{QueryParser, StoredStatement};
use pgwire::api::store::PortalStore;
use pgwire::api::{ClientInfo, ClientPortalStore, NoopHandler, PgWireServerHandlers, Type};
use pgwire::error::{ErrorInfo, PgWireError, PgWireResult};
use pgwire::messages::PgWireBackendMessage;
use pgwire::tokio::TlsAcceptor;
use tokio::net::TcpStream;
use ulid::Ulid;

use crate::auth::SoireeAuthSource;
use crate::engine::{Engine, EngineError};
use crate::model::*;
use crate::observability;
use crate::sql::{self, Command, SqlError, Table};
use crate::tenant::TenantManager;

pub struct SoireeHandler {
    tenant_manager: Arc<TenantManager>,
    query_parser: Arc<SoireeQueryParser>,
}

impl SoireeHandler {
    pub fn new(tenant_manager: Arc<TenantManager>) -> Self {
        Self {
            tenant_manager,
            query_parser: Arc::new(SoireeQueryParser),
        }
    }

    /// The startup `database` parameter names the company.
    fn resolve_engine<C: ClientInfo>(&self, client: &C) -> PgWireResult<Arc<Engine>> {
        let db = client
            .metadata()
            .get("database")
            .cloned()
            .unwrap_or_else(|| "default".to_string());
        self.tenant_manager.get_or_create(&db).map_err(|e| {
            metrics::counter!(observability::AUTH_FAILURES_TOTAL).increment(1);
            user_error("08006", format!("tenant error: {e}"))
        })
    }

    /// Parse, execute and record metrics for one statement.
    async fn run<C: ClientInfo>(&self, client: &C, query: &str) -> PgWireResult<Response> {
        let engine = self.resolve_engine(client)?;
        let cmd = sql::parse_sql(query).map_err(sql_err)?;
        let label = observability::command_label(&cmd);

        let started = Instant::now();
        let result = execute_command(&engine, cmd).await;
        metrics::histogram!(observability::QUERY_DURATION_SECONDS, "command" => label)
            .record(started.elapsed().as_secs_f64());
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(observability::QUERIES_TOTAL, "command" => label, "status" => status)
            .increment(1);

        result.map_err(engine_err)
    }
}

fn inserted() -> Response {
    Response::Execution(Tag::new("INSERT").with_rows(1))
}

fn deleted() -> Response {
    Response::Execution(Tag::new("DELETE").with_rows(1))
}

async fn execute_command(engine: &Engine, cmd: Command) -> Result<Response, EngineError> {
    Ok(match cmd {
        Command::InsertEvent(draft) => engine.create_event(draft).await.map(|_| inserted())?,
        Command::UpdateEvent { id, patch } => engine.update_event(id, patch).await.map(|_| inserted())?,
        Command::DeleteEvent { id } => engine.delete_event(id).await.map(|_| deleted())?,
        Command::InsertVenue(draft) => engine.create_venue(draft).await.map(|_| inserted())?,
        Command::UpdateVenue { id, patch } => engine.update_venue(id, patch).await.map(|_| inserted())?,
        Command::DeleteVenue { id } => engine.delete_venue(id).await.map(|_| deleted())?,
        Command::InsertStaff(draft) => engine.create_staff(draft).await.map(|_| inserted())?,
        Command::UpdateStaff { id, patch } => engine.update_staff(id, patch).await.map(|_| inserted())?,
        Command::DeleteStaff { id } => engine.delete_staff(id).await.map(|_| deleted())?,
        Command::InsertTask(draft) => engine.create_task(draft).await.map(|_| inserted())?,
        Command::UpdateTask { id, patch } => engine.update_task(id, patch).await.map(|_| inserted())?,
        Command::DeleteTask { id } => engine.delete_task(id).await.map(|_| deleted())?,
        Command::AssignStaff { event_id, staff_id } => {
            engine.assign_staff(event_id, staff_id).await.map(|_| inserted())?
        }
        Command::UnassignStaff { event_id, staff_id } => {
            engine.unassign_staff(event_id, staff_id).await.map(|_| deleted())?
        }
        Command::AssignTaskStaff { task_id, staff_id } => {
            engine.assign_task_staff(task_id, staff_id).await.map(|_| inserted())?
        }
        Command::UnassignTaskStaff { task_id, staff_id } => {
            engine.unassign_task_staff(task_id, staff_id).await.map(|_| deleted())?
        }
        Command::InsertTable(draft) => engine.create_table(draft).await.map(|_| inserted())?,
        Command::UpdateTable { id, patch } => engine.update_table(id, patch).await.map(|_| inserted())?,
        Command::DeleteTable { id } => engine.delete_table(id).await.map(|_| deleted())?,
        Command::InsertInvite(draft) => engine.create_invite(draft).await.map(|_| inserted())?,
        Command::UpdateInvite { id, patch } => engine.update_invite(id, patch).await.map(|_| inserted())?,
        Command::DeleteInvite { id } => engine.delete_invite(id).await.map(|_| deleted())?,
        Command::InsertProvider(draft) => engine.create_provider(draft).await.map(|_| inserted())?,
        Command::UpdateProvider { id, patch } => {
            engine.update_provider(id, patch).await.map(|_| inserted())?
        }
        Command::DeleteProvider { id } => engine.delete_provider(id).await.map(|_| deleted())?,

        Command::SelectEvents(filter) => {
            let events = engine.list_events(&filter).await?;
            rows(Table::Events, events.iter().map(event_row))
        }
        Command::SelectVenues { id } => {
            let venues = match id {
                Some(id) => only(engine.get_venue(id).await)?,
                None => engine.list_venues().await,
            };
            rows(Table::Venues, venues.iter().map(venue_row))
        }
        Command::SelectStaff { id } => {
            let staff = match id {
                Some(id) => only(engine.get_staff(id).await)?,
                None => engine.list_staff().await,
            };
            rows(Table::Staff, staff.iter().map(staff_row))
        }
        Command::SelectTasks { event_id } => {
            let tasks = engine.list_tasks(event_id).await;
            rows(Table::Tasks, tasks.iter().map(task_row))
        }
        Command::SelectEventStaff { event_id } => {
            let filter = EventFilter {
                id: event_id,
                ..Default::default()
            };
            let events = engine.list_events(&filter).await?;
            let pairs = events
                .iter()
                .flat_map(|e| e.staff.iter().map(move |s| pair_row(e.id, *s)));
            rows(Table::EventStaff, pairs)
        }
        Command::SelectTaskStaff { task_id } => {
            let tasks = engine.list_tasks(None).await;
            let pairs = tasks
                .iter()
                .filter(|t| task_id.is_none_or(|id| t.id == id))
                .flat_map(|t| t.staff.iter().map(move |s| pair_row(t.id, *s)));
            rows(Table::TaskStaff, pairs)
        }
        Command::SelectTables { event_id } => {
            let tables = engine.list_tables(event_id).await;
            rows(Table::EventTables, tables.iter().map(table_row))
        }
        Command::SelectInvites { event_id } => {
            let invites = engine.list_invites(event_id).await;
            rows(Table::Invites, invites.iter().map(invite_row))
        }
        Command::SelectProviders { event_id } => {
            let providers = engine.list_providers(event_id).await;
            rows(Table::Providers, providers.iter().map(provider_row))
        }
    })
}

/// A lookup by id that finds nothing is an empty result set, not an error.
fn only<T>(found: Result<T, EngineError>) -> Result<Vec<T>, EngineError> {
    match found {
        Ok(row) => Ok(vec![row]),
        Err(EngineError::NotFound(_)) => Ok(vec![]),
        Err(e) => Err(e),
    }
}

// ── Result rows ──────────────────────────────────────────────────

enum Cell {
    Text(Option<String>),
    Int(i64),
    Bool(bool),
}

fn text(value: impl ToString) -> Cell {
    Cell::Text(Some(value.to_string()))
}

fn opt_text(value: Option<impl ToString>) -> Cell {
    Cell::Text(value.map(|v| v.to_string()))
}

fn int(value: impl Into<i64>) -> Cell {
    Cell::Int(value.into())
}

fn event_row(e: &Event) -> Vec<Cell> {
    vec![
        text(e.id),
        text(&e.company),
        opt_text(e.venue_id),
        text(&e.title),
        text(e.date),
        opt_text(e.start.map(format_clock_time)),
        opt_text(e.end.map(format_clock_time)),
        int(e.guests),
        text(&e.budget),
        text(e.status),
        opt_text(e.kind.as_ref()),
        opt_text(e.area.as_ref()),
        opt_text(e.folder.as_ref()),
    ]
}

fn venue_row(v: &Venue) -> Vec<Cell> {
    vec![text(v.id), text(&v.company), text(&v.name), int(v.capacity), text(v.status)]
}

fn staff_row(s: &Staff) -> Vec<Cell> {
    vec![text(s.id), text(&s.company), text(&s.name), opt_text(s.role.as_ref()), text(s.status)]
}

fn task_row(t: &Task) -> Vec<Cell> {
    vec![text(t.id), text(t.event_id), text(&t.title), Cell::Bool(t.done)]
}

fn pair_row(owner: Ulid, staff: Ulid) -> Vec<Cell> {
    vec![text(owner), text(staff)]
}

fn table_row(t: &EventTable) -> Vec<Cell> {
    vec![text(t.id), text(t.event_id), text(&t.name), int(t.capacity), text(t.status)]
}

fn invite_row(i: &Invite) -> Vec<Cell> {
    vec![
        text(i.id),
        text(i.event_id),
        opt_text(i.table_id),
        text(&i.name),
        int(i.personnes),
        text(i.status),
        Cell::Bool(i.present),
    ]
}

fn provider_row(p: &Provider) -> Vec<Cell> {
    let money = |n: u64| Cell::Int(i64::try_from(n).unwrap_or(i64::MAX));
    vec![text(p.id), text(p.event_id), text(&p.name), money(p.amount), money(p.advance)]
}

fn rows(table: Table, cells: impl Iterator<Item = Vec<Cell>>) -> Response {
    let schema = Arc::new(schema(table));
    let encoded: Vec<PgWireResult<_>> = cells
        .map(|row| {
            let mut encoder = DataRowEncoder::new(schema.clone());
            for cell in row {
                match cell {
                    Cell::Text(value) => encoder.encode_field(&value)?,
                    Cell::Int(value) => encoder.encode_field(&value)?,
                    Cell::Bool(value) => encoder.encode_field(&value)?,
                }
            }
            Ok(encoder.take_row())
        })
        .collect();
    Response::Query(QueryResponse::new(schema, stream::iter(encoded)))
}

/// Result columns of `SELECT * FROM <table>`.
pub fn schema(table: Table) -> Vec<FieldInfo> {
    use pgwire::api::Type as T;
    let columns: &[(&str, Type)] = match table {
        Table::Events => &[
            ("id", T::VARCHAR),
            ("company", T::VARCHAR),
            ("venue_id", T::VARCHAR),
            ("title", T::VARCHAR),
            ("date", T::VARCHAR),
            ("start_time", T::VARCHAR),
            ("end_time", T::VARCHAR),
            ("guests", T::INT8),
            ("budget", T::VARCHAR),
            ("status", T::VARCHAR),
            ("kind", T::VARCHAR),
            ("area", T::VARCHAR),
            ("folder", T::VARCHAR),
        ],
        Table::Venues => &[
            ("id", T::VARCHAR),
            ("company", T::VARCHAR),
            ("name", T::VARCHAR),
            ("capacity", T::INT8),
            ("status", T::VARCHAR),
        ],
        Table::Staff => &[
            ("id", T::VARCHAR),
            ("company", T::VARCHAR),
            ("name", T::VARCHAR),
            ("role", T::VARCHAR),
            ("status", T::VARCHAR),
        ],
        Table::Tasks => &[
            ("id", T::VARCHAR),
            ("event_id", T::VARCHAR),
            ("title", T::VARCHAR),
            ("done", T::BOOL),
        ],
        Table::EventStaff => &[("event_id", T::VARCHAR), ("staff_id", T::VARCHAR)],
        Table::TaskStaff => &[("task_id", T::VARCHAR), ("staff_id", T::VARCHAR)],
        Table::EventTables => &[
            ("id", T::VARCHAR),
            ("event_id", T::VARCHAR),
            ("name", T::VARCHAR),
            ("capacity", T::INT8),
            ("status", T::VARCHAR),
        ],
        Table::Invites => &[
            ("id", T::VARCHAR),
            ("event_id", T::VARCHAR),
            ("table_id", T::VARCHAR),
            ("name", T::VARCHAR),
            ("personnes", T::INT8),
            ("status", T::VARCHAR),
            ("present", T::BOOL),
        ],
        Table::Providers => &[
            ("id", T::VARCHAR),
            ("event_id", T::VARCHAR),
            ("name", T::VARCHAR),
            ("amount", T::INT8),
            ("advance", T::INT8),
        ],
    };
    columns
        .iter()
        .map(|(name, ty)| FieldInfo::new(name.to_string(), None, None, ty.clone(), FieldFormat::Text))
        .collect()
}

fn result_schema(sql: &str) -> Vec<FieldInfo> {
    sql::select_target(sql).map(schema).unwrap_or_default()
}

#[async_trait]
impl SimpleQueryHandler for SoireeHandler {
    async fn do_query<C>(
        &self,
        client: &mut C,
        query: &str,
    ) -> PgWireResult<Vec<Response>>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        Ok(vec![self.run(client, query).await?])
    }
}

// ── Extended Query Protocol ──────────────────────────────────────

#[derive(Debug)]
pub struct SoireeQueryParser;

#[async_trait]
impl QueryParser for SoireeQueryParser {
    type Statement = String;

    async fn parse_sql<C>(
        &self,
        _client: &C,
        sql: &str,
        _types: &[Option<Type>],
    ) -> PgWireResult<String>
    where
        C: ClientInfo + Unpin + Send + Sync,
    {
        Ok(sql.to_string())
    }

    fn get_parameter_types(&self, stmt: &String) -> PgWireResult<Vec<Type>> {
        Ok(vec![Type::VARCHAR; count_params(stmt)])
    }

    fn get_result_schema(
        &self,
        stmt: &String,
        _column_format: Option<&Format>,
    ) -> PgWireResult<Vec<FieldInfo>> {
        Ok(result_schema(stmt))
    }
}

#[async_trait]
impl ExtendedQueryHandler for SoireeHandler {
    type Statement = String;
    type QueryParser = SoireeQueryParser;

    fn query_parser(&self) -> Arc<Self::QueryParser> {
        self.query_parser.clone()
    }

    async fn do_query<C>(
        &self,
        client: &mut C,
        portal: &Portal<Self::Statement>,
        _max_rows: usize,
    ) -> PgWireResult<Response>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let sql = substitute_params(portal);
        self.run(client, &sql).await
    }

    async fn do_describe_statement<C>(
        &self,
        _client: &mut C,
        target: &StoredStatement<Self::Statement>,
    ) -> PgWireResult<DescribeStatementResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let param_types = vec![Type::VARCHAR; count_params(&target.statement)];
        Ok(DescribeStatementResponse::new(
            param_types,
            result_schema(&target.statement),
        ))
    }

    async fn do_describe_portal<C>(
        &self,
        _client: &mut C,
        target: &Portal<Self::Statement>,
    ) -> PgWireResult<DescribePortalResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        Ok(DescribePortalResponse::new(result_schema(
            &target.statement.statement,
        )))
    }
}

/// Highest `$N` placeholder in the statement.
fn count_params(sql: &str) -> usize {
    let bytes = sql.as_bytes();
    let mut max = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'$' {
            i += 1;
            continue;
        }
        i += 1;
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if let Ok(n) = sql[start..i].parse::<usize>() {
            max = max.max(n);
        }
    }
    max
}

/// Inline bound text parameters as quoted literals; a NULL parameter becomes `NULL`.
fn substitute_params(portal: &Portal<String>) -> String {
    let values: Vec<String> = portal
        .parameters
        .iter()
        .map(|param| match param {
            Some(bytes) => format!("'{}'", String::from_utf8_lossy(bytes).replace('\'', "''")),
            None => "NULL".to_string(),
        })
        .collect();
    inline_params(&portal.statement.statement, &values)
}

/// Replace `$N` with `values[N-1]`, leaving quoted text untouched.
fn inline_params(sql: &str, values: &[String]) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.char_indices().peekable();
    let mut quoted = false;
    while let Some((_, c)) = chars.next() {
        if c == '\'' {
            quoted = !quoted;
            out.push(c);
            continue;
        }
        if c != '$' || quoted {
            out.push(c);
            continue;
        }
        let mut digits = String::new();
        while let Some(&(_, d)) = chars.peek() {
            if !d.is_ascii_digit() {
                break;
            }
            digits.push(d);
            chars.next();
        }
        match digits.parse::<usize>().ok().and_then(|n| values.get(n.wrapping_sub(1))) {
            Some(value) => out.push_str(value),
            None => {
                out.push('$');
                out.push_str(&digits);
            }
        }
    }
    out
}

// ── Factory ──────────────────────────────────────────────────────

pub struct SoireeFactory {
    handler: Arc<SoireeHandler>,
    auth_handler:
        Arc<CleartextPasswordAuthStartupHandler<SoireeAuthSource, DefaultServerParameterProvider>>,
    noop: Arc<NoopHandler>,
}

impl SoireeFactory {
    pub fn new(tenant_manager: Arc<TenantManager>, password: String) -> Self {
        let auth_source = SoireeAuthSource::new(password);
        let param_provider = DefaultServerParameterProvider::default();
        Self {
            handler: Arc::new(SoireeHandler::new(tenant_manager)),
            auth_handler: Arc::new(CleartextPasswordAuthStartupHandler::new(
                auth_source,
                param_provider,
            )),
            noop: Arc::new(NoopHandler),
        }
    }
}

impl PgWireServerHandlers for SoireeFactory {
    fn simple_query_handler(&self) -> Arc<impl SimpleQueryHandler> {
        self.handler.clone()
    }

    fn extended_query_handler(&self) -> Arc<impl ExtendedQueryHandler> {
        self.handler.clone()
    }

    fn startup_handler(&self) -> Arc<impl StartupHandler> {
        self.auth_handler.clone()
    }

    fn copy_handler(&self) -> Arc<impl CopyHandler> {
        self.noop.clone()
    }
}

/// Serve one client connection until it closes.
pub async fn process_connection(
    socket: TcpStream,
    tenant_manager: Arc<TenantManager>,
    password: String,
    tls: Option<TlsAcceptor>,
) -> std::io::Result<()> {
    let factory = SoireeFactory::new(tenant_manager, password);
    pgwire::tokio::process_socket(socket, tls, factory).await
}

// ── Errors ───────────────────────────────────────────────────────

fn user_error(code: &str, message: String) -> PgWireError {
    PgWireError::UserError(Box::new(ErrorInfo::new(
        "ERROR".into(),
        code.into(),
        message,
    )))
}

/// SQLSTATE for each engine error.
fn sqlstate(e: &EngineError) -> &'static str {
    match e {
        EngineError::Validation { .. } => "22023",
        EngineError::Conflict { .. } => "23P01",
        EngineError::Capacity { .. } | EngineError::Budget { .. } => "23514",
        EngineError::Scope { .. } => "42501",
        EngineError::NotFound(_) => "P0002",
        EngineError::AlreadyExists(_) => "23505",
        EngineError::InUse(_) => "23503",
        EngineError::LimitExceeded(_) => "54000",
        EngineError::WalError(_) => "P0001",
    }
}

fn engine_err(e: EngineError) -> PgWireError {
    user_error(sqlstate(&e), e.to_string())
}

fn sql_err(e: SqlError) -> PgWireError {
    let code = match e {
        SqlError::BadValue { .. } => "22P02",
        SqlError::NullValue(_) => "23502",
        SqlError::UnknownTable(_) => "42P01",
        SqlError::UnknownColumn(..) => "42703",
        SqlError::ReadOnlyColumn(_) => "428C9",
        _ => "42601",
    };
    user_error(code, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_are_counted_by_highest_index() {
        assert_eq!(count_params("SELECT * FROM events"), 0);
        assert_eq!(count_params("DELETE FROM event_staff WHERE event_id = $2 AND staff_id = $1"), 2);
        assert_eq!(count_params("SELECT $10"), 10);
    }

    #[test]
    fn inline_params_respects_indices_and_quotes() {
        let values = vec!["'a'".to_string(), "NULL".to_string()];
        assert_eq!(inline_params("VALUES ($1, $2)", &values), "VALUES ('a', NULL)");
        assert_eq!(inline_params("VALUES ('$1', $1)", &values), "VALUES ('$1', 'a')");
        // $1 must not clobber the prefix of $10
        let many: Vec<String> = (1..=10).map(|n| n.to_string()).collect();
        assert_eq!(inline_params("$10,$1", &many), "10,1");
        assert_eq!(inline_params("$3", &values), "$3");
    }

    #[test]
    fn schema_matches_row_shapes() {
        let event = EventDraft::new(Ulid::new(), "Gala", chrono::NaiveDate::from_ymd_opt(2026, 6, 1).unwrap());
        let row = event_row(&Event {
            id: event.id,
            company: "acme".into(),
            venue_id: None,
            title: event.title,
            date: event.date,
            start: None,
            end: None,
            guests: 0,
            budget: Budget::default(),
            status: EventStatus::Pending,
            kind: None,
            area: None,
            folder: None,
            staff: Default::default(),
        });
        assert_eq!(row.len(), schema(Table::Events).len());
        assert_eq!(pair_row(Ulid::new(), Ulid::new()).len(), schema(Table::EventStaff).len());
    }

    #[test]
    fn describe_uses_select_target() {
        let fields = result_schema("SELECT * FROM venues WHERE id = $1");
        assert_eq!(fields.len(), 5);
        assert!(result_schema("DELETE FROM venues WHERE id = $1").is_empty());
    }

    #[test]
    fn engine_errors_map_to_sqlstate() {
        let id = Ulid::new();
        assert_eq!(sqlstate(&EngineError::NotFound(id)), "P0002");
        assert_eq!(sqlstate(&EngineError::InUse(id)), "23503");
        assert_eq!(
            sqlstate(&EngineError::Conflict {
                venue_id: id,
                date: chrono::NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
                event_id: id,
            }),
            "23P01"
        );
        assert_eq!(sqlstate(&EngineError::invalid("status", "derived")), "22023");
    }
}
