//! HTTP client for the timetable service's JSON API.
//!
//! Every call is a single request under the configured connect and total
//! timeouts. Non-2xx replies are mapped onto [`GatewayError`]:
//! - 404 becomes `NotFound`
//! - other 4xx replies carrying a `detail` reason become `Rejected`, with the
//!   reason kept word for word
//! - anything else becomes `Status`

use super::config::PortalConfig;
use super::error::GatewayError;
use super::{BatchTimetable, ClearResponse, Gateway};
use crate::schedule::{Assignment, Batch, Faculty, Room, Subject, Timetable};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

/// [`Gateway`] backed by `reqwest`.
pub struct HttpGateway {
    client: Client,
    /// API root; endpoint paths are appended as percent-encoded segments
    base_url: Url,
}

impl HttpGateway {
    /// Creates a client from the portal configuration.
    pub fn new(config: &PortalConfig) -> Result<Self, GatewayError> {
        let base_url = config.api_base().map_err(|e| GatewayError::Url {
            message: e.to_string(),
        })?;

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| GatewayError::Network {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends `segments` to the API root, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| GatewayError::Url {
                message: format!("{} cannot be used as a base URL", self.base_url),
            })?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    /// Sends a request and returns the body of a successful reply.
    async fn request(&self, method: Method, segments: &[&str]) -> Result<String, GatewayError> {
        let url = self.endpoint(segments)?;
        let start = Instant::now();
        debug!(method = %method, url = %url, "Sending request");

        let response = self
            .client
            .request(method.clone(), url.clone())
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(
                method = %method,
                url = %url,
                status = status.as_u16(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Service returned an error"
            );
            return Err(error_from_response(status, &body));
        }

        debug!(
            method = %method,
            url = %url,
            duration_ms = start.elapsed().as_millis() as u64,
            "Request completed"
        );
        Ok(body)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
    ) -> Result<T, GatewayError> {
        let body = self.request(method, segments).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// FastAPI-style error body. `detail` is usually a string but validation
/// errors send a list.
#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
}

fn error_from_response(status: StatusCode, body: &str) -> GatewayError {
    let reason = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.detail)
        .map(|detail| match detail {
            serde_json::Value::String(text) => text,
            other => other.to_string(),
        });

    match (status, reason) {
        (status, reason) if status == StatusCode::NOT_FOUND => GatewayError::NotFound {
            message: reason.unwrap_or_else(|| body.trim().to_string()),
        },
        (status, Some(reason)) if status.is_client_error() => GatewayError::Rejected { reason },
        (status, reason) => GatewayError::Status {
            status: status.as_u16(),
            message: reason.unwrap_or_else(|| body.trim().to_string()),
        },
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn list_rooms(&self) -> Result<Vec<Room>, GatewayError> {
        self.fetch(Method::GET, &["rooms"]).await
    }

    async fn list_faculty(&self) -> Result<Vec<Faculty>, GatewayError> {
        self.fetch(Method::GET, &["faculty"]).await
    }

    async fn list_subjects(&self) -> Result<Vec<Subject>, GatewayError> {
        self.fetch(Method::GET, &["subjects"]).await
    }

    async fn list_batches(&self) -> Result<Vec<Batch>, GatewayError> {
        self.fetch(Method::GET, &["batches"]).await
    }

    async fn list_timetables(&self) -> Result<Vec<Timetable>, GatewayError> {
        self.fetch(Method::GET, &["timetables"]).await
    }

    async fn batch_timetable(&self, batch_id: &str) -> Result<BatchTimetable, GatewayError> {
        self.fetch(Method::GET, &["student", "timetable", batch_id])
            .await
    }

    async fn batch_assignments(&self, batch_id: &str) -> Result<Vec<Assignment>, GatewayError> {
        self.fetch(Method::GET, &["assignments", "batch", batch_id])
            .await
    }

    async fn generate_timetable(
        &self,
        department: &str,
        semester: u8,
    ) -> Result<Timetable, GatewayError> {
        info!(department = %department, semester, "Requesting timetable generation");
        let semester = semester.to_string();
        let timetable: Timetable = self
            .fetch(
                Method::POST,
                &["timetables", "generate", department, &semester],
            )
            .await?;
        info!(
            timetable_id = %timetable.id,
            entries = timetable.entries.len(),
            "Timetable generated"
        );
        Ok(timetable)
    }

    async fn activate_timetable(&self, timetable_id: &str) -> Result<(), GatewayError> {
        info!(timetable_id = %timetable_id, "Activating timetable");
        self.request(Method::PATCH, &["timetables", timetable_id, "activate"])
            .await
            .map(|_| ())
    }

    async fn clear_schedule(
        &self,
        department: &str,
        semester: u8,
    ) -> Result<ClearResponse, GatewayError> {
        info!(department = %department, semester, "Clearing schedule");
        let semester = semester.to_string();
        self.fetch(
            Method::DELETE,
            &["timetables", "clear", department, &semester],
        )
        .await
    }

    async fn clear_all_schedules(&self) -> Result<ClearResponse, GatewayError> {
        info!("Clearing all schedules");
        self.fetch(Method::DELETE, &["timetables", "clear-all"])
            .await
    }

    async fn init_sample_data(&self) -> Result<(), GatewayError> {
        info!("Initializing sample data");
        self.request(Method::POST, &["init-sample-data"])
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::routing::{delete, get, post};
    use axum::{Json, Router};
    use serde_json::json;

    async fn serve(app: Router) -> HttpGateway {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        let config = PortalConfig {
            base_url: format!("http://{addr}/api"),
            ..PortalConfig::default()
        };
        HttpGateway::new(&config).unwrap()
    }

    fn entry_json(day: &str, start: &str, end: &str) -> serde_json::Value {
        json!({
            "id": format!("{day}-{start}"),
            "batch_id": "b1",
            "day": day,
            "start_time": start,
            "end_time": end,
            "subject_code": "CS201",
            "subject_name": "Data Structures",
            "faculty_id": "f1",
            "faculty_name": "Dr. John Smith",
            "room_id": "r1",
            "room_name": "Room 101",
            "room_type": "Classroom"
        })
    }

    #[test]
    fn test_endpoint_encodes_segments_and_ignores_trailing_slash() {
        let config = PortalConfig {
            base_url: "http://localhost:8001/api/".to_string(),
            ..PortalConfig::default()
        };
        let gateway = HttpGateway::new(&config).unwrap();
        let url = gateway
            .endpoint(&["timetables", "generate", "Computer Science", "3"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8001/api/timetables/generate/Computer%20Science/3"
        );
    }

    #[test]
    fn test_error_mapping() {
        let rejected = error_from_response(
            StatusCode::BAD_REQUEST,
            r#"{"detail": "Insufficient data for timetable generation"}"#,
        );
        assert_eq!(
            rejected,
            GatewayError::Rejected {
                reason: "Insufficient data for timetable generation".to_string()
            }
        );

        let missing =
            error_from_response(StatusCode::NOT_FOUND, r#"{"detail": "Batch not found"}"#);
        assert_eq!(
            missing,
            GatewayError::NotFound {
                message: "Batch not found".to_string()
            }
        );

        let crashed =
            error_from_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
        assert_eq!(
            crashed,
            GatewayError::Status {
                status: 500,
                message: "Internal Server Error".to_string()
            }
        );

        // A 4xx without a reason has nothing to forward verbatim.
        let bare = error_from_response(StatusCode::CONFLICT, "");
        assert!(matches!(bare, GatewayError::Status { status: 409, .. }));
    }

    #[tokio::test]
    async fn test_batch_timetable_decodes_entries() {
        let app = Router::new().route(
            "/api/student/timetable/:batch_id",
            get(|Path(batch_id): Path<String>| async move {
                Json(json!({
                    "timetable": [
                        entry_json("Monday", "09:00", "10:00"),
                        entry_json("Tuesday", "11:15", "12:15")
                    ],
                    "batch_info": {
                        "id": batch_id,
                        "name": "CS-3A",
                        "department": "Computer Science",
                        "semester": 3,
                        "student_count": 45
                    }
                }))
            }),
        );
        let gateway = serve(app).await;

        let reply = gateway.batch_timetable("batch 3A").await.unwrap();
        assert_eq!(reply.timetable.len(), 2);
        assert_eq!(reply.timetable[1].slot_key(), "11:15-12:15");
        assert_eq!(reply.timetable[0].faculty_name, "Dr. John Smith");
        // The id travelled percent-encoded and came back decoded.
        assert_eq!(reply.batch_info.unwrap().id, "batch 3A");
    }

    #[tokio::test]
    async fn test_generate_success_and_rejection() {
        let app = Router::new().route(
            "/api/timetables/generate/:department/:semester",
            post(|Path((department, semester)): Path<(String, u8)>| async move {
                if department == "Computer Science" && semester == 3 {
                    (
                        axum::http::StatusCode::OK,
                        Json(json!({
                            "id": "tt-1",
                            "name": "Computer Science - Semester 3 Timetable",
                            "department": department,
                            "semester": semester,
                            "entries": [{
                                "batch_id": "b1",
                                "subject_id": "s1",
                                "faculty_id": "f1",
                                "room_id": "r1",
                                "time_slot_id": "slot-1",
                                "day": "Monday",
                                "start_time": "09:00",
                                "end_time": "10:00"
                            }],
                            "created_at": "2025-01-10T08:00:00",
                            "is_active": false
                        })),
                    )
                } else {
                    (
                        axum::http::StatusCode::BAD_REQUEST,
                        Json(json!({ "detail": "faculty not assigned to subjects" })),
                    )
                }
            }),
        );
        let gateway = serve(app).await;

        let timetable = gateway
            .generate_timetable("Computer Science", 3)
            .await
            .unwrap();
        assert_eq!(timetable.id, "tt-1");
        assert_eq!(timetable.entries.len(), 1);
        assert_eq!(timetable.entries[0].subject_name, "Unknown");
        assert!(!timetable.is_active);

        let err = gateway.generate_timetable("Electronics", 5).await.unwrap_err();
        assert_eq!(err.to_string(), "faculty not assigned to subjects");
    }

    #[tokio::test]
    async fn test_missing_active_timetable_is_not_found() {
        let app = Router::new().route(
            "/api/student/timetable/:batch_id",
            get(|| async {
                (
                    axum::http::StatusCode::NOT_FOUND,
                    Json(json!({ "detail": "No active timetable found" })),
                )
            }),
        );
        let gateway = serve(app).await;

        let err = gateway.batch_timetable("b1").await.unwrap_err();
        assert_eq!(
            err,
            GatewayError::NotFound {
                message: "No active timetable found".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_clear_all_reads_message() {
        let app = Router::new().route(
            "/api/timetables/clear-all",
            delete(|| async {
                Json(json!({ "message": "Cleared 2 timetables", "deleted_count": 2 }))
            }),
        );
        let gateway = serve(app).await;

        let reply = gateway.clear_all_schedules().await.unwrap();
        assert_eq!(reply.message, "Cleared 2 timetables");
        assert_eq!(reply.deleted_count, Some(2));
    }

    #[tokio::test]
    async fn test_unexpected_shape_is_a_decode_error() {
        let app = Router::new().route("/api/rooms", get(|| async { Json(json!({ "rooms": [] })) }));
        let gateway = serve(app).await;

        let err = gateway.list_rooms().await.unwrap_err();
        assert!(matches!(err, GatewayError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_a_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = PortalConfig {
            base_url: format!("http://{addr}/api"),
            connect_timeout_secs: 2,
            request_timeout_secs: 2,
            ..PortalConfig::default()
        };
        let gateway = HttpGateway::new(&config).unwrap();

        let err = gateway.list_batches().await.unwrap_err();
        assert!(matches!(err, GatewayError::Network { .. }));
        assert!(err.is_retryable());
    }
}
