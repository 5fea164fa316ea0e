use chrono::{DateTime, Utc};

use crate::error::FetchError;
use crate::model::Sample;

/// Thông điệp đã giải mã từ kênh đẩy trực tiếp.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveMessage {
    Connected,
    Disconnected,
    Sample(Sample),
    /// Sự kiện thiếu dữ liệu sức khỏe (heartbeat, payload hỏng); chỉ ghi log.
    Malformed(String),
}

/// Một sự kiện trong hàng đợi do môi trường chủ xếp tuần tự.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    HistoryLoaded(Result<Vec<Sample>, FetchError>),
    Live(LiveMessage),
    RangeSelected {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    RangeCleared,
}
