use super::ApiMode;

pub const SUCCESS: i64 = 200;

pub fn is_success(code: i64) -> bool {
    code == SUCCESS
}

/// Human-readable description of a recognition status code. One table for
/// both modes; only the size ceiling wording differs.
pub fn describe(code: i64, mode: ApiMode) -> String {
    match code {
        200 => "success".to_string(),
        500 => "internal server error".to_string(),
        30203 => "recognition engine busy, try again later".to_string(),
        40003 => "insufficient account balance".to_string(),
        40004 => "bad request parameters".to_string(),
        40101 => "invalid x-ti-app-id or x-ti-secret-code".to_string(),
        40102 => "x-ti-app-id has no access to this service".to_string(),
        40103 => "client IP not in the allow-list".to_string(),
        40301 => "unsupported file format".to_string(),
        40302 => "file download failed".to_string(),
        40303 => format!("file too large, over {}MB", mode.max_size_mb()),
        40304 => "image dimensions out of range, must be 20px-10000px".to_string(),
        40305 => "unreadable or corrupt file content".to_string(),
        40306 => "page count over limit".to_string(),
        40400 => "invalid request URL".to_string(),
        other => format!("unknown status {other}"),
    }
}
