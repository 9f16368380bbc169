use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde::Serialize;
use serde_json::Value;

/// Uniform response envelope. The HTTP status always mirrors `status_code`.
#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub status_code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ApiResponse {
    pub fn new(status_code: u16, message: impl Into<String>, data: Option<Value>) -> Self {
        ApiResponse {
            status_code,
            message: message.into(),
            data,
        }
    }

    pub fn write(self) -> HttpResponse {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        HttpResponse::build(status).json(self)
    }
}

pub fn ok(message: impl Into<String>, data: Option<Value>) -> HttpResponse {
    ApiResponse::new(200, message, data).write()
}

pub fn bad_request(message: impl Into<String>) -> HttpResponse {
    ApiResponse::new(400, message, None).write()
}

pub fn unauthorized(message: impl Into<String>) -> HttpResponse {
    ApiResponse::new(401, message, None).write()
}

pub fn forbidden(message: impl Into<String>) -> HttpResponse {
    ApiResponse::new(403, message, None).write()
}

pub fn not_found(message: impl Into<String>) -> HttpResponse {
    ApiResponse::new(404, message, None).write()
}

pub fn conflict(message: impl Into<String>) -> HttpResponse {
    ApiResponse::new(409, message, None).write()
}

pub fn internal(message: impl Into<String>) -> HttpResponse {
    ApiResponse::new(500, message, None).write()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_omits_null_data() {
        let body = serde_json::to_value(ApiResponse::new(404, "Keluarga not found", None)).unwrap();
        assert_eq!(body, json!({"status_code": 404, "message": "Keluarga not found"}));
    }

    #[test]
    fn envelope_carries_data() {
        let body =
            serde_json::to_value(ApiResponse::new(200, "OK", Some(json!({"id": "7"})))).unwrap();
        assert_eq!(body["data"]["id"], "7");
        assert_eq!(body["status_code"], 200);
    }
}
