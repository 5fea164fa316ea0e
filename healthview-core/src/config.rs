use serde::{Deserialize, Serialize};

/// Cấu hình nguồn dữ liệu và cách hiển thị.
///
/// Trường thiếu khi deserialize lấy giá trị mặc định.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewConfig {
    /// Endpoint trả về lịch sử mẫu (GET, mảng JSON).
    pub history_url: String,
    /// WebSocket của kênh đẩy trực tiếp; `None` nghĩa là không nghe cập nhật.
    pub live_url: Option<String>,
    /// Tên sự kiện mang mẫu mới trên kênh đẩy.
    pub live_event: String,
    /// Thời gian chờ tối đa cho lần tải lịch sử (mili giây).
    pub fetch_timeout_ms: u64,
    /// Lề cộng thêm vào hai đầu trục Y.
    pub axis_margin: f64,
    /// Kéo trục Y về 0 nếu giá trị nhỏ nhất dương.
    pub begin_at_zero: bool,
    /// Số sự kiện tối đa được giữ lại trong lúc chờ tải lịch sử.
    pub max_pending_events: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            history_url: "/health-data".to_string(),
            live_url: None,
            live_event: "healthDataUpdate".to_string(),
            fetch_timeout_ms: 10_000,
            axis_margin: 10.0,
            begin_at_zero: false,
            max_pending_events: 10_000,
        }
    }
}
