//! Logic lõi đồng bộ bảng và biểu đồ mẫu sức khỏe với ba nguồn dữ liệu:
//! lần tải lịch sử, kênh đẩy trực tiếp và khoảng thời gian người dùng chọn.

mod config;
mod error;
mod event;
mod model;
mod sink;
mod sync;

pub use config::ViewConfig;
pub use error::{FetchError, ViewError};
pub use event::{LiveMessage, ViewEvent};
pub use model::{format_instant, is_visible, truncate_to_millis, Accelerometer, Sample, ViewWindow};
pub use sink::{
    format_number, AxisBounds, ChartModel, ChartPoint, ChartSeries, TableModel, TableRow, ViewSink,
    HEART_RATE_LABEL, OXYGEN_LEVEL_LABEL,
};
pub use sync::{LinkStatus, ViewState, ViewSynchronizer};
