/// Lỗi khi tải lịch sử mẫu.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("Không kết nối được máy chủ: {0}")]
    Network(String),
    #[error("Máy chủ trả về HTTP {0}")]
    Status(u16),
    #[error("Không đọc được dữ liệu: {0}")]
    Parse(String),
    #[error("Bản ghi thứ {index} thiếu dữ liệu sức khỏe")]
    MissingHealthData { index: usize },
    #[error("Hết thời gian chờ sau {0} ms")]
    Timeout(u64),
}

/// Lỗi chung của bộ đồng bộ hiển thị.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ViewError {
    #[error("Trạng thái không hợp lệ: cần {expected}, đang ở {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("Khung dữ liệu trực tiếp không hợp lệ: {0}")]
    Frame(String),
    #[error("Khoảng thời gian không hợp lệ: {0}")]
    Range(String),
}

impl FetchError {
    /// Lỗi của một bước trong lần tải có hạn chót (gửi request hoặc đọc body).
    ///
    /// Bước bị hủy vì hết giờ luôn là `Timeout`, bất kể thông điệp của lớp vận chuyển.
    pub fn interrupted(aborted: bool, timeout_ms: u64, detail: impl std::fmt::Display) -> Self {
        if aborted {
            FetchError::Timeout(timeout_ms)
        } else {
            FetchError::Network(detail.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aborted_step_is_a_timeout() {
        assert_eq!(
            FetchError::interrupted(true, 10_000, "AbortError: body stream aborted"),
            FetchError::Timeout(10_000)
        );
    }

    #[test]
    fn failed_step_without_abort_is_a_network_error() {
        assert_eq!(
            FetchError::interrupted(false, 10_000, "connection reset"),
            FetchError::Network("connection reset".into())
        );
    }
}
