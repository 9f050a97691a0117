use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use tracing::{error, info};
use uuid::Uuid;

use stockyard_core::{
    AuditSink, ContainerKind, EquipmentMovement, MovementEndpoints, MovementError, MovementType,
};
use stockyard_movements::{MovementRequest, MovementService};
use stockyard_pg::PgMovementStore;
use stockyard_platform::{
    AuditBus, MOVEMENTS_CHANNEL, MovementRecordedEvent, ServiceConfig, connect_database,
};

const MAX_REFERENCE_LEN: usize = 200;
const MAX_COMMENT_LEN: usize = 1000;

#[derive(Clone)]
struct AppState {
    pool: PgPool,
    service: Arc<MovementService<PgMovementStore>>,
}

struct RedisAuditSink {
    bus: AuditBus,
}

#[async_trait]
impl AuditSink for RedisAuditSink {
    async fn movement_recorded(&self, movement: &EquipmentMovement) -> anyhow::Result<()> {
        let event = MovementRecordedEvent {
            movement_id: movement.id,
            movement_type: movement.movement_type.as_str().to_string(),
            equipment_type_id: movement.equipment_type_id,
            quantity: movement.quantity,
            performed_by_id: movement.performed_by_id,
        };
        self.bus.publish_json(MOVEMENTS_CHANNEL, &event).await
    }
}

#[derive(Debug, Clone, Deserialize)]
struct CreateMovementRequest {
    movement_type: String,
    equipment_type_id: Uuid,
    quantity: i64,
    from_warehouse_id: Option<Uuid>,
    to_warehouse_id: Option<Uuid>,
    from_cabinet_id: Option<Uuid>,
    to_cabinet_id: Option<Uuid>,
    to_assembly_id: Option<Uuid>,
    reference: Option<String>,
    comment: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct MovementView {
    id: Uuid,
    movement_type: String,
    equipment_type_id: Uuid,
    quantity: i64,
    from_warehouse_id: Option<Uuid>,
    to_warehouse_id: Option<Uuid>,
    from_cabinet_id: Option<Uuid>,
    to_cabinet_id: Option<Uuid>,
    to_assembly_id: Option<Uuid>,
    reference: Option<String>,
    comment: Option<String>,
    performed_by_id: Uuid,
    created_at: DateTime<Utc>,
}

impl From<EquipmentMovement> for MovementView {
    fn from(movement: EquipmentMovement) -> Self {
        MovementView {
            id: movement.id,
            movement_type: movement.movement_type.as_str().to_string(),
            equipment_type_id: movement.equipment_type_id,
            quantity: movement.quantity,
            from_warehouse_id: movement.from_warehouse_id,
            to_warehouse_id: movement.to_warehouse_id,
            from_cabinet_id: movement.from_cabinet_id,
            to_cabinet_id: movement.to_cabinet_id,
            to_assembly_id: movement.to_assembly_id,
            reference: movement.reference,
            comment: movement.comment,
            performed_by_id: movement.performed_by_id,
            created_at: movement.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ListMovementsQuery {
    movement_type: Option<String>,
    equipment_type_id: Option<Uuid>,
    warehouse_id: Option<Uuid>,
    cabinet_id: Option<Uuid>,
    assembly_id: Option<Uuid>,
    performed_by_id: Option<Uuid>,
    created_at_from: Option<DateTime<Utc>>,
    created_at_to: Option<DateTime<Utc>>,
    q: Option<String>,
    page: Option<i64>,
    page_size: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
struct MovementListResponse {
    items: Vec<MovementView>,
    page: i64,
    page_size: i64,
    total: i64,
}

#[derive(Debug, Clone, Serialize)]
struct StockLineView {
    equipment_type_id: Uuid,
    equipment_type_name: String,
    quantity: i64,
    unit_price: Option<Decimal>,
    line_value: Option<Decimal>,
    last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
struct StockListResponse {
    container_id: Uuid,
    container_kind: String,
    items: Vec<StockLineView>,
    total_value: Decimal,
}

#[tokio::main]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "stockyard_gateway=info,tower_http=info".to_string()),
        )
        .init();

    let config = ServiceConfig::from_env("0.0.0.0:8080")?;
    let pool = connect_database(&config.database_url).await?;
    let bus = AuditBus::connect(&config.redis_url)?;

    let mut service = MovementService::new(
        PgMovementStore::new(pool.clone()),
        Arc::new(RedisAuditSink { bus }),
    );
    if let Some(timeout) = config.movement_timeout {
        service = service.with_timeout(timeout);
    }
    let state = AppState {
        pool,
        service: Arc::new(service),
    };

    let router = Router::new()
        .route("/healthz", get(healthz))
        .route("/movements", post(create_movement).get(list_movements))
        .route("/stock/{kind}/{container_id}", get(list_stock))
        .with_state(state);

    let addr: SocketAddr = config.http_addr.parse()?;
    info!("gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

fn actor_from_headers(headers: &HeaderMap) -> Result<Uuid, (StatusCode, String)> {
    let Some(raw) = headers.get("x-actor-id") else {
        return Err((
            StatusCode::UNAUTHORIZED,
            "x-actor-id header is required".to_string(),
        ));
    };
    raw.to_str()
        .ok()
        .and_then(|value| value.parse::<Uuid>().ok())
        .ok_or((
            StatusCode::BAD_REQUEST,
            "x-actor-id must be a UUID".to_string(),
        ))
}

fn movement_error_response(err: MovementError) -> (StatusCode, String) {
    match err {
        MovementError::NotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        MovementError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        MovementError::InsufficientQuantity { .. } => (StatusCode::CONFLICT, err.to_string()),
        MovementError::Transient(_) | MovementError::Storage(_) => {
            error!("movement failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "movement could not be applied".to_string(),
            )
        }
    }
}

// Limits mirror the VARCHAR column widths, which count characters, not bytes.
fn ensure_max_chars(value: &str, limit: usize, field: &str) -> Result<(), (StatusCode, String)> {
    if value.chars().count() > limit {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("{field} must be at most {limit} characters"),
        ));
    }
    Ok(())
}

fn internal_error<E: std::fmt::Display>(err: E) -> (StatusCode, String) {
    error!("internal error: {err}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal error".to_string(),
    )
}

async fn create_movement(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateMovementRequest>,
) -> Result<(StatusCode, Json<MovementView>), (StatusCode, String)> {
    let performed_by_id = actor_from_headers(&headers)?;

    let movement_type: MovementType = payload
        .movement_type
        .parse()
        .map_err(movement_error_response)?;

    if let Some(reference) = &payload.reference {
        ensure_max_chars(reference, MAX_REFERENCE_LEN, "reference")?;
    }
    if let Some(comment) = &payload.comment {
        ensure_max_chars(comment, MAX_COMMENT_LEN, "comment")?;
    }

    let request = MovementRequest {
        movement_type,
        equipment_type_id: payload.equipment_type_id,
        quantity: payload.quantity,
        endpoints: MovementEndpoints {
            from_warehouse_id: payload.from_warehouse_id,
            to_warehouse_id: payload.to_warehouse_id,
            from_cabinet_id: payload.from_cabinet_id,
            to_cabinet_id: payload.to_cabinet_id,
            to_assembly_id: payload.to_assembly_id,
        },
        reference: payload.reference,
        comment: payload.comment,
    };

    let record = state
        .service
        .apply(&request, performed_by_id)
        .await
        .map_err(movement_error_response)?;

    Ok((StatusCode::CREATED, Json(MovementView::from(record))))
}

async fn list_movements(
    State(state): State<AppState>,
    Query(query): Query<ListMovementsQuery>,
) -> Result<Json<MovementListResponse>, (StatusCode, String)> {
    let movement_type = query
        .movement_type
        .as_deref()
        .map(str::parse::<MovementType>)
        .transpose()
        .map_err(movement_error_response)?
        .map(|mt| mt.as_str().to_string());

    let page = query.page.unwrap_or(1).max(1);
    let page_size = query.page_size.unwrap_or(50).clamp(1, 200);
    let offset = (page - 1) * page_size;

    let filter = r#"
        ($1::text IS NULL OR movement_type = $1)
        AND ($2::uuid IS NULL OR equipment_type_id = $2)
        AND ($3::uuid IS NULL OR from_warehouse_id = $3 OR to_warehouse_id = $3)
        AND ($4::uuid IS NULL OR from_cabinet_id = $4 OR to_cabinet_id = $4)
        AND ($5::uuid IS NULL OR to_assembly_id = $5)
        AND ($6::uuid IS NULL OR performed_by_id = $6)
        AND ($7::timestamptz IS NULL OR created_at >= $7)
        AND ($8::timestamptz IS NULL OR created_at <= $8)
        AND ($9::text IS NULL OR reference ILIKE '%' || $9 || '%' OR comment ILIKE '%' || $9 || '%')
    "#;

    let count_row = sqlx::query(&format!(
        "SELECT COUNT(*) AS total FROM equipment_movements WHERE {filter}"
    ))
    .bind(&movement_type)
    .bind(query.equipment_type_id)
    .bind(query.warehouse_id)
    .bind(query.cabinet_id)
    .bind(query.assembly_id)
    .bind(query.performed_by_id)
    .bind(query.created_at_from)
    .bind(query.created_at_to)
    .bind(&query.q)
    .fetch_one(&state.pool)
    .await
    .map_err(internal_error)?;
    let total: i64 = count_row.try_get("total").map_err(internal_error)?;

    let rows = sqlx::query(&format!(
        r#"
        SELECT
            id, movement_type, equipment_type_id, quantity,
            from_warehouse_id, to_warehouse_id, from_cabinet_id, to_cabinet_id, to_assembly_id,
            reference, comment, performed_by_id, created_at
        FROM equipment_movements
        WHERE {filter}
        ORDER BY created_at DESC, id DESC
        LIMIT $10 OFFSET $11
        "#
    ))
    .bind(&movement_type)
    .bind(query.equipment_type_id)
    .bind(query.warehouse_id)
    .bind(query.cabinet_id)
    .bind(query.assembly_id)
    .bind(query.performed_by_id)
    .bind(query.created_at_from)
    .bind(query.created_at_to)
    .bind(&query.q)
    .bind(page_size)
    .bind(offset)
    .fetch_all(&state.pool)
    .await
    .map_err(internal_error)?;

    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        items.push(MovementView {
            id: row.try_get("id").map_err(internal_error)?,
            movement_type: row.try_get("movement_type").map_err(internal_error)?,
            equipment_type_id: row.try_get("equipment_type_id").map_err(internal_error)?,
            quantity: row.try_get("quantity").map_err(internal_error)?,
            from_warehouse_id: row.try_get("from_warehouse_id").map_err(internal_error)?,
            to_warehouse_id: row.try_get("to_warehouse_id").map_err(internal_error)?,
            from_cabinet_id: row.try_get("from_cabinet_id").map_err(internal_error)?,
            to_cabinet_id: row.try_get("to_cabinet_id").map_err(internal_error)?,
            to_assembly_id: row.try_get("to_assembly_id").map_err(internal_error)?,
            reference: row.try_get("reference").map_err(internal_error)?,
            comment: row.try_get("comment").map_err(internal_error)?,
            performed_by_id: row.try_get("performed_by_id").map_err(internal_error)?,
            created_at: row.try_get("created_at").map_err(internal_error)?,
        });
    }

    Ok(Json(MovementListResponse {
        items,
        page,
        page_size,
        total,
    }))
}

fn parse_container_kind(raw: &str) -> Result<ContainerKind, (StatusCode, String)> {
    match raw {
        "warehouses" => Ok(ContainerKind::Warehouse),
        "cabinets" => Ok(ContainerKind::Cabinet),
        "assemblies" => Ok(ContainerKind::Assembly),
        other => Err((
            StatusCode::NOT_FOUND,
            format!("unknown container kind {other}"),
        )),
    }
}

async fn list_stock(
    State(state): State<AppState>,
    Path((kind, container_id)): Path<(String, Uuid)>,
) -> Result<Json<StockListResponse>, (StatusCode, String)> {
    let kind = parse_container_kind(&kind)?;
    let (container_table, stock_table, container_column) = match kind {
        ContainerKind::Warehouse => ("warehouses", "warehouse_stock", "warehouse_id"),
        ContainerKind::Cabinet => ("cabinets", "cabinet_stock", "cabinet_id"),
        ContainerKind::Assembly => ("assemblies", "assembly_stock", "assembly_id"),
    };

    let exists_row = sqlx::query(&format!(
        "SELECT EXISTS (SELECT 1 FROM {container_table} WHERE id = $1 AND is_deleted = FALSE) AS live"
    ))
    .bind(container_id)
    .fetch_one(&state.pool)
    .await
    .map_err(internal_error)?;
    let live: bool = exists_row.try_get("live").map_err(internal_error)?;
    if !live {
        return Err((
            StatusCode::NOT_FOUND,
            format!("{} not found", kind.as_str()),
        ));
    }

    let rows = sqlx::query(&format!(
        r#"
        SELECT s.equipment_type_id, e.name AS equipment_type_name, e.unit_price,
               s.quantity, s.last_updated
        FROM {stock_table} s
        INNER JOIN equipment_types e ON e.id = s.equipment_type_id
        WHERE s.{container_column} = $1
        ORDER BY e.name
        "#
    ))
    .bind(container_id)
    .fetch_all(&state.pool)
    .await
    .map_err(internal_error)?;

    let mut items = Vec::with_capacity(rows.len());
    let mut total_value = Decimal::ZERO;
    for row in rows {
        let quantity: i64 = row.try_get("quantity").map_err(internal_error)?;
        let unit_price: Option<Decimal> = row.try_get("unit_price").map_err(internal_error)?;
        let line_value = unit_price.map(|price| price * Decimal::from(quantity));
        if let Some(value) = line_value {
            total_value += value;
        }
        items.push(StockLineView {
            equipment_type_id: row.try_get("equipment_type_id").map_err(internal_error)?,
            equipment_type_name: row.try_get("equipment_type_name").map_err(internal_error)?,
            quantity,
            unit_price,
            line_value,
            last_updated: row.try_get("last_updated").map_err(internal_error)?,
        });
    }

    Ok(Json(StockListResponse {
        container_id,
        container_kind: kind.as_str().to_string(),
        items,
        total_value,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_limits_count_characters_not_bytes() {
        // 150 two-byte characters: 300 bytes, well within the 200-char limit.
        let multibyte = "ä".repeat(150);
        assert!(ensure_max_chars(&multibyte, MAX_REFERENCE_LEN, "reference").is_ok());
        assert!(ensure_max_chars(&"x".repeat(200), MAX_REFERENCE_LEN, "reference").is_ok());

        let over = ensure_max_chars(&"ä".repeat(201), MAX_REFERENCE_LEN, "reference");
        let (status, message) = over.unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "reference must be at most 200 characters");
    }
}
