//! Attribute lookup for non-building city objects.
//!
//! GET /features/{gmlid} returns feature_type + attributes for LandUse,
//! Road, or WaterBody features. Buildings are handled by
//! /buildings/{gmlid} instead.

use axum::extract::{Path, State};
use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use sqlx::Row;

use crate::http::ApiError;
use crate::state::AppState;

const LOOKUP_SQL: &str = r#"
    SELECT co.id::bigint AS id, oc.classname
    FROM citydb.cityobject co
    JOIN citydb.objectclass oc ON oc.id = co.objectclass_id
    WHERE co.gmlid = $1
"#;

/// Type-specific attribute query per objectclass classname. Classname
/// string match rather than hardcoded objectclass ids.
fn attribute_sql(classname: &str) -> Option<&'static str> {
    match classname {
        "LandUse" => {
            Some("SELECT lu.class, lu.function, lu.usage FROM citydb.land_use lu WHERE lu.id = $1")
        }
        "Road" => Some(
            "SELECT tc.class, tc.function, tc.usage \
             FROM citydb.transportation_complex tc WHERE tc.id = $1",
        ),
        "WaterBody" => Some(
            "SELECT wb.class, wb.function, wb.usage FROM citydb.waterbody wb WHERE wb.id = $1",
        ),
        _ => None,
    }
}

/// GET /features/{gmlid}
async fn get_feature(
    State(state): State<AppState>,
    Path(gmlid): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let pool = state.pool().acquire().await?;

    let row = sqlx::query(LOOKUP_SQL)
        .bind(&gmlid)
        .fetch_optional(&pool)
        .await?;
    let Some(row) = row else {
        return Err(ApiError::NotFound {
            resource: "feature",
            id: gmlid,
        });
    };

    let id: i64 = row.try_get("id")?;
    let classname: String = row.try_get("classname")?;

    let Some(sql) = attribute_sql(&classname) else {
        return Err(ApiError::Unsupported(format!(
            "Feature type '{classname}' not supported here"
        )));
    };

    let attrs = sqlx::query(sql).bind(id).fetch_optional(&pool).await?;
    let attributes = match attrs {
        Some(row) => {
            let class: Option<String> = row.try_get("class")?;
            let function: Option<String> = row.try_get("function")?;
            let usage: Option<String> = row.try_get("usage")?;
            json!({ "class": class, "function": function, "usage": usage })
        }
        None => json!({}),
    };

    Ok(Json(json!({
        "gmlid": gmlid,
        "feature_type": classname,
        "attributes": attributes,
    })))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/features/{gmlid}", get(get_feature))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_classnames_have_queries() {
        for classname in ["LandUse", "Road", "WaterBody"] {
            assert!(attribute_sql(classname).is_some(), "{classname}");
        }
    }

    #[test]
    fn buildings_and_unknowns_are_not_served_here() {
        assert!(attribute_sql("Building").is_none());
        assert!(attribute_sql("Bridge").is_none());
        assert!(attribute_sql("").is_none());
    }
}
