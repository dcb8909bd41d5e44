use crate::error::Result;
use crate::routes::now;
use crate::side_effect::SideEffect;
use crate::state::AppState;
use crate::supabase::Key;
use crate::validation::{check, MeasurementRequest};
use quest_core::{Json, State};
use serde_json::{json, Value};

pub async fn record_measurement(
    State(state): State<AppState>,
    Json(body): Json<MeasurementRequest>,
) -> Result<Json<Value>> {
    check(&body)?;

    let measurement = json!({
        "session_id": body.session_id,
        "room_id": body.room_id,
        "measurement_type": body.measurement_type,
        "measurement_data": body.measurement_data,
        "measured_at": now(),
    });
    SideEffect::record(
        "quantum measurement",
        state
            .db
            .insert("quantum_measurements", &measurement, Key::Anon)
            .await,
    );

    Ok(Json(json!({ "success": true, "message": "Quantum measurement logged" })))
}
