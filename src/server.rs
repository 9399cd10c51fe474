use crate::config::AppConfig;
use crate::dashboard::DashboardView;
use crate::data::Dataset;
use crate::filter::{list_municipalities, list_zones};
use crate::render::render_page;
use crate::types::{MapPoint, Selection};
use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    response::{Html, Json},
    routing::get,
    Router,
};
use geojson::{Feature, FeatureCollection, Geometry, Value};
use rstar::primitives::GeomWithData;
use rstar::RTree;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

// Section location ([lon, lat]) tagged with its index in the dataset
type SectionIndex = GeomWithData<[f64; 2], usize>;

pub struct AppState {
    pub dataset: Dataset,
    pub tree: RTree<SectionIndex>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig, dataset: Dataset) -> Self {
        tracing::info!("Building spatial index for {} sections...", dataset.len());
        let items: Vec<SectionIndex> = dataset.records().iter().enumerate()
            .map(|(i, r)| GeomWithData::new([r.longitude(), r.latitude()], i))
            .collect();
        let tree = RTree::bulk_load(items);

        AppState { dataset, tree, config }
    }

    fn view(&self, params: &SelectionParams) -> DashboardView {
        DashboardView::build(
            &self.dataset,
            &self.config.report,
            Selection::municipality(params.municipio.as_deref()),
            Selection::zone(params.zona.as_deref()),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SelectionParams {
    municipio: Option<String>,
    zona: Option<String>,
}

#[derive(Deserialize)]
pub struct NearestParams {
    lat: f64,
    lon: f64,
}

#[derive(Serialize)]
pub struct NearestResponse {
    #[serde(flatten)]
    section: MapPoint,
}

pub async fn start_server(config: AppConfig, dataset: Dataset) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("Invalid server address {}:{}", config.server.host, config.server.port))?;

    let state = Arc::new(AppState::new(config, dataset));
    let app = router(state);

    tracing::info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/municipalities", get(municipalities_handler))
        .route("/api/zones", get(zones_handler))
        .route("/api/sections", get(sections_handler))
        .route("/api/summary", get(summary_handler))
        .route("/api/nearest", get(nearest_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn index_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SelectionParams>,
) -> Html<String> {
    tracing::info!(municipio = ?params.municipio, zona = ?params.zona, "Rendering dashboard");
    let view = state.view(&params);
    Html(render_page(&state.config.report, &view))
}

async fn municipalities_handler(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(list_municipalities(&state.dataset))
}

async fn zones_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SelectionParams>,
) -> Json<Vec<String>> {
    let municipality = Selection::municipality(params.municipio.as_deref());
    Json(list_zones(&state.dataset, &municipality))
}

async fn sections_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SelectionParams>,
) -> Json<FeatureCollection> {
    let view = state.view(&params);
    let features = view.points.iter().map(point_feature).collect();

    Json(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

async fn summary_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SelectionParams>,
) -> Json<DashboardView> {
    Json(state.view(&params))
}

async fn nearest_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NearestParams>,
) -> Json<Option<NearestResponse>> {
    // rstar cannot order NaN distances
    if !params.lat.is_finite() || !params.lon.is_finite() {
        return Json(None);
    }

    let nearest = state.tree.nearest_neighbor(&[params.lon, params.lat])
        .and_then(|hit| state.dataset.records().get(hit.data))
        .map(|record| NearestResponse { section: MapPoint::from(record) });

    Json(nearest)
}

fn point_feature(point: &MapPoint) -> Feature {
    let mut feature = Feature::from(Geometry::new(Value::Point(vec![point.longitude, point.latitude])));
    feature.set_property("Municipio", point.municipality.clone());
    feature.set_property("Zona", point.zone.clone());
    feature.set_property("Seção", point.section.clone());
    feature.set_property("Endereço", point.address.clone());
    feature.set_property("Votos", point.votes);
    feature
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::tests::{record, scenario};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use geo::Point;
    use tower::ServiceExt;

    fn app(dataset: Dataset) -> Router {
        let config = AppConfig::from_toml("[input]\ndataset = \"unused.geojson\"").unwrap();
        router(Arc::new(AppState::new(config, dataset)))
    }

    async fn get_json(app: Router, uri: &str) -> serde_json::Value {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn zones_follow_municipality() {
        let all = get_json(app(scenario()), "/api/zones").await;
        assert_eq!(all, serde_json::json!(["1", "2"]));

        let b = get_json(app(scenario()), "/api/zones?municipio=B").await;
        assert_eq!(b, serde_json::json!(["1"]));

        let municipalities = get_json(app(scenario()), "/api/municipalities").await;
        assert_eq!(municipalities, serde_json::json!(["A", "B"]));
    }

    #[tokio::test]
    async fn sections_are_geojson_points() {
        let body = get_json(app(scenario()), "/api/sections?municipio=A&zona=Todas").await;
        assert_eq!(body["type"], "FeatureCollection");
        let features = body["features"].as_array().unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0]["geometry"]["type"], "Point");
        assert_eq!(features[0]["properties"]["Votos"], 10);
    }

    #[tokio::test]
    async fn summary_of_empty_selection_is_zero() {
        let body = get_json(app(scenario()), "/api/summary?municipio=B&zona=2").await;
        assert_eq!(body["zone"], "2");
        assert_eq!(body["total_votes"], 0);
        assert_eq!(body["section_count"], 0);
        assert_eq!(body["zone_count"], 0);

        let unknown = get_json(app(scenario()), "/api/summary?municipio=NOWHERE").await;
        assert_eq!(unknown["total_votes"], 0);

        let empty = get_json(app(Dataset::default()), "/api/summary").await;
        assert_eq!(empty["total_votes"], 0);
        assert_eq!(empty["section_count"], 0);
        assert_eq!(empty["zone_count"], 0);
    }

    #[tokio::test]
    async fn nearest_section_lookup() {
        let mut near = record("C", "3", "99", 1);
        near.location = Point::new(-43.5, -22.5);
        let mut records = scenario().records().to_vec();
        records.push(near);

        let body = get_json(app(Dataset::new(records)), "/api/nearest?lat=-22.49&lon=-43.51").await;
        assert_eq!(body["Municipio"], "C");
        assert_eq!(body["Seção"], "99");

        let none = get_json(app(Dataset::default()), "/api/nearest?lat=0&lon=0").await;
        assert!(none.is_null());
    }

    #[tokio::test]
    async fn nearest_ignores_non_finite_coordinates() {
        for uri in ["/api/nearest?lat=NaN&lon=NaN", "/api/nearest?lat=inf&lon=-43.0"] {
            let body = get_json(app(scenario()), uri).await;
            assert!(body.is_null(), "{} should find nothing", uri);
        }
    }

    #[tokio::test]
    async fn index_renders_html() {
        let response = app(scenario())
            .oneshot(Request::builder().uri("/?municipio=A").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("Total de votos: <strong>15</strong>"));
    }
}
