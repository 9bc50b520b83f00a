//! Building endpoints for the map tab.
//!
//! All geometry SQL goes through ST_FlipCoordinates() because 3DCityDB
//! stores coordinates in (lat, lon) axis order (JGD2011 convention) while
//! GeoJSON requires (lon, lat).
//!
//! The map overview itself is served as pre-rendered vector tiles by an
//! external tile server; this API serves per-building detail plus a
//! bounding-box footprint fallback.

use axum::extract::{Path, Query, State};
use axum::{routing::get, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::Row;

use crate::http::ApiError;
use crate::state::AppState;

/// Upper bound on features returned by the bbox overview endpoint.
const BBOX_FEATURE_CAP: usize = 3000;

/// SRID of the stored geometry (JGD2011 geographic).
const STORAGE_SRID: i32 = 6668;

fn class_label(code: &str) -> &'static str {
    match code {
        "3001" => "普通建物",
        "3002" => "堅牢建物",
        "3003" => "普通無壁舎",
        "3004" => "堅牢無壁舎",
        "9999" => "不明",
        _ => "",
    }
}

fn usage_label(code: &str) -> &'static str {
    match code {
        "401" => "業務施設",
        "402" => "商業施設",
        "403" => "宿泊施設",
        "404" => "商業系複合施設",
        "411" => "住宅",
        "412" => "共同住宅",
        "413" => "店舗等併用住宅",
        "414" => "店舗等併用共同住宅",
        "415" => "作業所併用住宅",
        "421" => "官公庁施設",
        "422" => "文教厚生施設",
        "431" => "運輸倉庫施設",
        "441" => "工場",
        "454" => "その他",
        "461" => "不明",
        _ => "不明",
    }
}

// Attributes for one root building. Storey counts and heights are cast so
// the citydb NUMERIC columns decode as plain Rust types.
const ATTR_SQL: &str = r#"
    SELECT
        co.gmlid,
        co.name,
        b.measured_height::float8 AS measured_height,
        b.storeys_above_ground::int AS storeys_above_ground,
        b.storeys_below_ground::int AS storeys_below_ground,
        b.usage,
        b.class,
        (b.lod2_solid_id IS NOT NULL) AS has_lod2
    FROM citydb.building b
    JOIN citydb.cityobject co ON co.id = b.id
    WHERE co.gmlid = $1 AND b.building_root_id = b.id
    LIMIT 1
"#;

// Generic attributes (uro: ADE overflow attributes).
const GENERIC_SQL: &str = r#"
    SELECT ga.attrname, ga.datatype::int AS datatype, ga.strval,
           ga.intval::bigint AS intval, ga.realval::float8 AS realval
    FROM citydb.cityobject_genericattrib ga
    JOIN citydb.building b ON b.id = ga.cityobject_id
    JOIN citydb.cityobject co ON co.id = b.id
    WHERE co.gmlid = $1
    ORDER BY ga.attrname
"#;

// LOD1 geometry: collect all solid faces, project to 2D, convex hull =
// building footprint.
const LOD1_SQL: &str = r#"
    SELECT ST_AsGeoJSON(
        ST_FlipCoordinates(ST_ConvexHull(ST_Collect(ST_Force2D(sg.geometry)))),
        15, 0
    ) AS geom_json
    FROM citydb.building b
    JOIN citydb.cityobject co ON co.id = b.id
    JOIN citydb.surface_geometry sg ON sg.root_id = b.lod1_solid_id
    WHERE co.gmlid = $1
      AND sg.geometry IS NOT NULL
"#;

// LOD2 thematic surfaces.
const LOD2_SQL: &str = r#"
    SELECT
        ts.objectclass_id,
        ST_AsGeoJSON(ST_FlipCoordinates(sg.geometry), 15, 0) AS geom_json
    FROM citydb.building b
    JOIN citydb.cityobject co ON co.id = b.id
    JOIN citydb.thematic_surface ts ON ts.building_id = b.id
    JOIN citydb.surface_geometry sg ON sg.root_id = ts.lod2_multi_surface_id
    WHERE co.gmlid = $1
      AND sg.geometry IS NOT NULL
"#;

// Footprint overview from the materialized view the tile server renders.
// Envelope corners are bound in stored (lat, lon) axis order.
const BBOX_SQL: &str = r#"
    SELECT gmlid, height::float8 AS height,
           ST_AsGeoJSON(ST_FlipCoordinates(geom), 15, 0) AS geom_json
    FROM citydb.building_footprints_mv
    WHERE geom && ST_MakeEnvelope($1, $2, $3, $4, $5)
    LIMIT $6
"#;

fn feature(geom_json: &str, properties: Value) -> Result<Value, ApiError> {
    let geometry: Value = serde_json::from_str(geom_json)
        .map_err(|err| ApiError::Database(format!("invalid geometry JSON from database: {err}")))?;
    Ok(json!({
        "type": "Feature",
        "geometry": geometry,
        "properties": properties,
    }))
}

fn feature_collection(features: Vec<Value>) -> Value {
    json!({ "type": "FeatureCollection", "features": features })
}

/// Fill-extrusion height for the LOD1 footprint; buildings without a usable
/// measured height get a nominal 10m.
fn lod1_height(measured: Option<f64>) -> f64 {
    measured.filter(|h| *h > 0.0).unwrap_or(10.0)
}

fn generic_value(datatype: Option<i32>, strval: Option<String>, intval: Option<i64>, realval: Option<f64>) -> Value {
    match datatype {
        Some(1) => strval.map(Value::String).unwrap_or(Value::Null),
        Some(2) => intval.map(Value::from).unwrap_or(Value::Null),
        Some(3) | Some(6) => realval
            .map(|v| (v * 1000.0).round() / 1000.0)
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        _ => strval.map(Value::String).unwrap_or(Value::Null),
    }
}

/// GET /buildings/{gmlid}
///
/// Attributes + LOD1 footprint + LOD2 thematic surfaces for one building.
async fn building_detail(
    State(state): State<AppState>,
    Path(gmlid): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let pool = state.pool().acquire().await?;

    let attr = sqlx::query(ATTR_SQL)
        .bind(&gmlid)
        .fetch_optional(&pool)
        .await?;
    let Some(attr) = attr else {
        return Err(ApiError::NotFound {
            resource: "building",
            id: gmlid,
        });
    };

    let lod1_rows = sqlx::query(LOD1_SQL).bind(&gmlid).fetch_all(&pool).await?;
    let lod2_rows = sqlx::query(LOD2_SQL).bind(&gmlid).fetch_all(&pool).await?;
    let generic_rows = sqlx::query(GENERIC_SQL).bind(&gmlid).fetch_all(&pool).await?;

    let measured_height: Option<f64> = attr.try_get("measured_height")?;
    let usage: Option<String> = attr.try_get("usage")?;
    let class: Option<String> = attr.try_get("class")?;
    let storeys_above: Option<i32> = attr.try_get("storeys_above_ground")?;
    let storeys_below: Option<i32> = attr.try_get("storeys_below_ground")?;

    let height = lod1_height(measured_height);
    let mut lod1_features = Vec::with_capacity(lod1_rows.len());
    for row in &lod1_rows {
        let geom_json: Option<String> = row.try_get("geom_json")?;
        if let Some(geom_json) = geom_json {
            lod1_features.push(feature(&geom_json, json!({ "height": height }))?);
        }
    }

    // Split LOD2 surfaces by type.
    // Verified against citydb.objectclass: 33=RoofSurface, 34=WallSurface,
    // 35=GroundSurface.
    let mut wall_features = Vec::new();
    let mut roof_features = Vec::new();
    let mut ground_features = Vec::new();
    for row in &lod2_rows {
        let objectclass_id: i32 = row.try_get("objectclass_id")?;
        let geom_json: String = row.try_get("geom_json")?;
        let feat = feature(&geom_json, json!({ "surface_type": objectclass_id }))?;
        match objectclass_id {
            33 => roof_features.push(feat),
            34 => wall_features.push(feat),
            35 => ground_features.push(feat),
            _ => {}
        }
    }

    let mut generic_attrs = Vec::with_capacity(generic_rows.len());
    for row in &generic_rows {
        let name: String = row.try_get("attrname")?;
        let value = generic_value(
            row.try_get("datatype")?,
            row.try_get("strval")?,
            row.try_get("intval")?,
            row.try_get("realval")?,
        );
        generic_attrs.push(json!({ "name": name, "value": value }));
    }

    let name: Option<String> = attr.try_get("name")?;
    let has_lod2: bool = attr.try_get("has_lod2")?;
    let gmlid: String = attr.try_get("gmlid")?;

    Ok(Json(json!({
        "gmlid": gmlid,
        "attributes": {
            "name": name,
            "measured_height": measured_height,
            "usage": usage,
            "usage_label": usage_label(usage.as_deref().unwrap_or("")),
            "storeys_above_ground": storeys_above.filter(|&v| v != 0 && v != 9999),
            "storeys_below_ground": storeys_below.filter(|&v| v != 0 && v != 9999),
            "class": class,
            "class_label": class_label(class.as_deref().unwrap_or("")),
            "has_lod2": has_lod2,
        },
        "generic_attrs": generic_attrs,
        "lod1": feature_collection(lod1_features),
        "lod2": {
            "wall": feature_collection(wall_features),
            "roof": feature_collection(roof_features),
            "ground": feature_collection(ground_features),
        },
    })))
}

/// Bounding box in GeoJSON (lon, lat) axis order.
#[derive(Debug, PartialEq)]
struct Bbox {
    min_lon: f64,
    min_lat: f64,
    max_lon: f64,
    max_lat: f64,
}

fn parse_bbox(raw: &str) -> Result<Bbox, ApiError> {
    let parts: Vec<f64> = raw
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| ApiError::BadRequest(format!("Invalid bbox: {raw}")))?;

    let [min_lon, min_lat, max_lon, max_lat] = parts[..] else {
        return Err(ApiError::BadRequest(
            "bbox must be minLon,minLat,maxLon,maxLat".to_string(),
        ));
    };

    if min_lon >= max_lon || min_lat >= max_lat {
        return Err(ApiError::BadRequest(
            "bbox minimum must be less than maximum".to_string(),
        ));
    }

    Ok(Bbox {
        min_lon,
        min_lat,
        max_lon,
        max_lat,
    })
}

/// Keep at most `cap` rows; the flag records whether anything was cut.
/// Callers fetch `cap + 1` rows so one extra row means "more matched".
fn cap_rows<T>(mut rows: Vec<T>, cap: usize) -> (Vec<T>, bool) {
    let truncated = rows.len() > cap;
    rows.truncate(cap);
    (rows, truncated)
}

#[derive(Debug, Deserialize)]
struct BboxParams {
    bbox: String,
}

/// GET /buildings?bbox=minLon,minLat,maxLon,maxLat
///
/// Footprint FeatureCollection for the viewport, capped at
/// [`BBOX_FEATURE_CAP`] features with `truncated` set when more matched.
async fn buildings_in_bbox(
    State(state): State<AppState>,
    Query(params): Query<BboxParams>,
) -> Result<Json<Value>, ApiError> {
    let bbox = parse_bbox(&params.bbox)?;
    let pool = state.pool().acquire().await?;

    // Fetch one past the cap to detect truncation.
    let rows = sqlx::query(BBOX_SQL)
        .bind(bbox.min_lat)
        .bind(bbox.min_lon)
        .bind(bbox.max_lat)
        .bind(bbox.max_lon)
        .bind(STORAGE_SRID)
        .bind((BBOX_FEATURE_CAP + 1) as i64)
        .fetch_all(&pool)
        .await?;

    let (rows, truncated) = cap_rows(rows, BBOX_FEATURE_CAP);
    let mut features = Vec::with_capacity(rows.len());
    for row in &rows {
        let gmlid: String = row.try_get("gmlid")?;
        let height: Option<f64> = row.try_get("height")?;
        let geom_json: String = row.try_get("geom_json")?;
        features.push(feature(
            &geom_json,
            json!({ "gmlid": gmlid, "height": lod1_height(height) }),
        )?);
    }

    let count = features.len();
    Ok(Json(json!({
        "type": "FeatureCollection",
        "features": features,
        "count": count,
        "truncated": truncated,
    })))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/buildings", get(buildings_in_bbox))
        .route("/buildings/{gmlid}", get(building_detail))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bbox_accepts_lon_lat_order() {
        let bbox = parse_bbox("139.77,35.70,139.80,35.73").unwrap();
        assert_eq!(
            bbox,
            Bbox {
                min_lon: 139.77,
                min_lat: 35.70,
                max_lon: 139.80,
                max_lat: 35.73,
            }
        );
    }

    #[test]
    fn parse_bbox_rejects_malformed_input() {
        assert!(matches!(
            parse_bbox("139.77,35.70,139.80"),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            parse_bbox("a,b,c,d"),
            Err(ApiError::BadRequest(_))
        ));
        // min >= max
        assert!(matches!(
            parse_bbox("139.80,35.70,139.77,35.73"),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn cap_rows_truncates_past_the_cap() {
        // 3001 matches come back as exactly 3000 with the flag set
        let (rows, truncated) = cap_rows((0..3001).collect::<Vec<_>>(), 3000);
        assert_eq!(rows.len(), 3000);
        assert!(truncated);

        let (rows, truncated) = cap_rows((0..3000).collect::<Vec<_>>(), 3000);
        assert_eq!(rows.len(), 3000);
        assert!(!truncated);

        let (rows, truncated) = cap_rows(Vec::<i32>::new(), 3000);
        assert!(rows.is_empty());
        assert!(!truncated);
    }

    #[test]
    fn lod1_height_defaults_to_ten_meters() {
        assert_eq!(lod1_height(Some(25.4)), 25.4);
        assert_eq!(lod1_height(Some(0.0)), 10.0);
        assert_eq!(lod1_height(Some(-3.0)), 10.0);
        assert_eq!(lod1_height(None), 10.0);
    }

    #[test]
    fn labels_fall_back_like_the_survey_codes() {
        assert_eq!(usage_label("411"), "住宅");
        assert_eq!(usage_label(""), "不明");
        assert_eq!(usage_label("999"), "不明");
        assert_eq!(class_label("3001"), "普通建物");
        assert_eq!(class_label(""), "");
    }

    #[test]
    fn generic_value_follows_datatype() {
        assert_eq!(
            generic_value(Some(1), Some("木造".into()), None, None),
            Value::String("木造".into())
        );
        assert_eq!(generic_value(Some(2), None, Some(3), None), Value::from(3));
        assert_eq!(
            generic_value(Some(3), None, None, Some(12.34567)),
            Value::from(12.346)
        );
        // Unknown datatype falls back to the string value
        assert_eq!(
            generic_value(Some(9), Some("raw".into()), None, None),
            Value::String("raw".into())
        );
        assert_eq!(generic_value(Some(3), None, None, None), Value::Null);
    }

    #[test]
    fn feature_wraps_geometry_json() {
        let feat = feature(r#"{"type":"Point","coordinates":[139.8,35.7]}"#, json!({"height": 10.0}))
            .unwrap();
        assert_eq!(feat["type"], "Feature");
        assert_eq!(feat["geometry"]["type"], "Point");
        assert_eq!(feat["properties"]["height"], 10.0);
    }
}
