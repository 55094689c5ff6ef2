use crate::error::AttendanceError;
use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn bad_params(message: impl Into<String>) -> Self {
        HandlerErr {
            code: "bad_params",
            message: message.into(),
            details: Some(json!({ "kind": "invalidInput", "advisory": true })),
        }
    }

    /// Workspace-bound method called before `workspace.select`.
    pub fn no_workspace() -> Self {
        HandlerErr {
            code: "no_workspace",
            message: "select a workspace first".to_string(),
            details: Some(json!({ "kind": "invalidInput", "advisory": true })),
        }
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<AttendanceError> for HandlerErr {
    fn from(e: AttendanceError) -> Self {
        let kind = e.kind();
        HandlerErr {
            code: e.code(),
            message: e.to_string(),
            details: Some(json!({
                "kind": kind.as_str(),
                "advisory": kind.is_advisory(),
            })),
        }
    }
}
