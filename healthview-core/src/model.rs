//! Mô hình mẫu sức khỏe và cửa sổ thời gian dùng để lọc.

use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Timelike,
    Utc,
};
use serde::{Deserialize, Serialize};

/// Gia tốc ba trục đo cùng thời điểm với mẫu.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Accelerometer {
    pub ax: f64,
    pub ay: f64,
    pub az: f64,
}

/// Một mẫu sức khỏe đã nhận. Không thay đổi sau khi tạo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub heart_rate: f64,
    pub oxygen_level: f64,
    pub accelerometer: Accelerometer,
}

impl Sample {
    /// Tạo mẫu mới; thời điểm được cắt về độ chính xác mili giây.
    pub fn new(
        timestamp: DateTime<Utc>,
        heart_rate: f64,
        oxygen_level: f64,
        accelerometer: Accelerometer,
    ) -> Self {
        Self {
            timestamp: truncate_to_millis(timestamp),
            heart_rate,
            oxygen_level,
            accelerometer,
        }
    }

    /// Nhãn thời gian dạng `YYYY-MM-DDTHH:MM:SS.sssZ`.
    pub fn label(&self) -> String {
        format_instant(self.timestamp)
    }
}

/// Khoảng thời gian lọc, bao gồm cả hai đầu mút.
///
/// Khi `start > end` cửa sổ vẫn hợp lệ nhưng không chứa mẫu nào.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ViewWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: truncate_to_millis(start),
            end: truncate_to_millis(end),
        }
    }

    /// Dựng cửa sổ từ giờ địa phương (quy ước của bộ chọn khoảng ngày).
    pub fn from_local(start: NaiveDateTime, end: NaiveDateTime, offset: FixedOffset) -> Option<Self> {
        let start = offset.from_local_datetime(&start).single()?;
        let end = offset.from_local_datetime(&end).single()?;
        Some(Self::new(start.with_timezone(&Utc), end.with_timezone(&Utc)))
    }

    /// Trọn một ngày địa phương: từ 00:00:00.000 tới 23:59:59.999.
    pub fn local_day(day: NaiveDate, offset: FixedOffset) -> Option<Self> {
        let start = day.and_hms_opt(0, 0, 0)?;
        let end = day.and_hms_milli_opt(23, 59, 59, 999)?;
        Self::from_local(start, end, offset)
    }

    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

/// Mẫu có hiển thị dưới cửa sổ hiện tại hay không (không có cửa sổ = hiển thị tất cả).
pub fn is_visible(window: Option<&ViewWindow>, sample: &Sample) -> bool {
    window.map_or(true, |window| window.contains(sample.timestamp))
}

/// Định dạng giống `Date.prototype.toISOString`.
pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn truncate_to_millis(instant: DateTime<Utc>) -> DateTime<Utc> {
    let excess = instant.nanosecond() % 1_000_000;
    instant - Duration::nanoseconds(i64::from(excess))
}
