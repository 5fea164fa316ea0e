//! Bridge WASM <-> JavaScript trung lập framework cho bộ đồng bộ mẫu sức khỏe.
//!
//! Trang web tự lo fetch, socket và bộ chọn ngày; bridge chỉ nhận sự kiện
//! theo thứ tự và trả về snapshot của bảng và biểu đồ.

use healthview_core::{
    ChartModel, FetchError, LinkStatus, LiveMessage, Sample, TableModel, ViewConfig, ViewError,
    ViewState, ViewSynchronizer, ViewWindow,
};
use healthview_feed::{
    decode_live_value, parse_day, parse_history_str, parse_history_value, parse_instant,
    parse_range, parse_utc_offset,
};
use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

#[derive(Serialize)]
struct ViewSnapshot<'a> {
    state: &'static str,
    error: Option<String>,
    connected: Option<bool>,
    window: Option<&'a ViewWindow>,
    dataset_len: usize,
    table: &'a TableModel,
    chart: &'a ChartModel,
}

#[wasm_bindgen]
pub struct HealthView {
    sync: ViewSynchronizer<TableModel, ChartModel>,
}

#[wasm_bindgen]
impl HealthView {
    #[wasm_bindgen(constructor)]
    pub fn new(config: Option<JsValue>) -> Result<HealthView, JsValue> {
        #[cfg(target_arch = "wasm32")]
        console_error_panic_hook::set_once();

        let cfg = match config {
            Some(js_cfg) => {
                from_value::<ViewConfig>(js_cfg)
                    .map_err(|err| JsValue::from_str(&format!("Không đọc được config: {err}")))?
            }
            None => ViewConfig::default(),
        };

        Ok(HealthView {
            sync: ViewSynchronizer::with_models(cfg),
        })
    }

    pub fn begin_load(&mut self) -> Result<(), JsValue> {
        self.sync.begin_load().map_err(to_js_error)
    }

    /// Kết quả `response.json()` của endpoint lịch sử.
    pub fn load_history(&mut self, records: JsValue) -> Result<(), JsValue> {
        let result = from_value::<serde_json::Value>(records)
            .map_err(|err| FetchError::Parse(err.to_string()))
            .and_then(|value| parse_history_value(&value));
        self.finish_load(result)
    }

    /// Thân response dạng text, khi trang không tự parse JSON.
    pub fn load_history_text(&mut self, body: &str) -> Result<(), JsValue> {
        self.finish_load(parse_history_str(body))
    }

    /// `fetch` bị reject (lỗi mạng, bị hủy do hết giờ).
    pub fn fail_load(&mut self, message: &str) -> Result<(), JsValue> {
        self.finish_load(Err(FetchError::Network(message.to_string())))
    }

    /// Response không phải 2xx.
    pub fn fail_status(&mut self, status: u16) -> Result<(), JsValue> {
        self.finish_load(Err(FetchError::Status(status)))
    }

    /// Handler cho sự kiện mẫu mới. Trả về `false` nếu payload bị bỏ qua.
    pub fn push_sample(&mut self, payload: JsValue) -> bool {
        let message = match from_value::<serde_json::Value>(payload) {
            Ok(value) => decode_live_value(&value),
            Err(err) => LiveMessage::Malformed(err.to_string()),
        };
        let accepted = matches!(message, LiveMessage::Sample(_));
        self.sync.handle_live(message);
        accepted
    }

    pub fn connected(&mut self) {
        self.sync.handle_live(LiveMessage::Connected);
    }

    pub fn disconnected(&mut self) {
        self.sync.handle_live(LiveMessage::Disconnected);
    }

    /// Khoảng chọn dạng ISO-8601 (`start.toISOString()`).
    pub fn select_range(&mut self, start: &str, end: &str) -> Result<(), JsValue> {
        let start = parse_instant(start)
            .ok_or_else(|| JsValue::from_str(&format!("Không đọc được thời điểm bắt đầu {start}")))?;
        let end = parse_instant(end)
            .ok_or_else(|| JsValue::from_str(&format!("Không đọc được thời điểm kết thúc {end}")))?;
        self.sync.on_range_selected(start, end);
        Ok(())
    }

    /// Khoảng chọn theo giờ địa phương `YYYY-MM-DD HH:mm:ss` kèm offset (`+07:00`).
    pub fn select_local_range(&mut self, start: &str, end: &str, utc_offset: &str) -> Result<(), JsValue> {
        let offset = parse_utc_offset(utc_offset)
            .ok_or_else(|| JsValue::from_str(&format!("Offset không hợp lệ: {utc_offset}")))?;
        let window = parse_range(start, end, offset).map_err(to_js_error)?;
        self.sync.on_range_selected(window.start, window.end);
        Ok(())
    }

    /// Trọn một ngày địa phương `YYYY-MM-DD` (khoảng mặc định của bộ chọn là hôm nay).
    pub fn select_day(&mut self, day: &str, utc_offset: &str) -> Result<(), JsValue> {
        let offset = parse_utc_offset(utc_offset)
            .ok_or_else(|| JsValue::from_str(&format!("Offset không hợp lệ: {utc_offset}")))?;
        let window = parse_day(day, offset).map_err(to_js_error)?;
        self.sync.on_range_selected(window.start, window.end);
        Ok(())
    }

    pub fn clear_range(&mut self) {
        self.sync.on_range_cleared();
    }

    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        let error = match self.sync.state() {
            ViewState::Failed(err) => Some(err.to_string()),
            _ => None,
        };
        let connected = match self.sync.link() {
            LinkStatus::Unknown => None,
            LinkStatus::Connected => Some(true),
            LinkStatus::Disconnected => Some(false),
        };
        let snapshot = ViewSnapshot {
            state: self.sync.state().as_str(),
            error,
            connected,
            window: self.sync.window(),
            dataset_len: self.sync.dataset().len(),
            table: self.sync.table(),
            chart: self.sync.chart(),
        };

        to_value(&snapshot)
            .map_err(|err| JsValue::from_str(&format!("Không serialize snapshot: {err}")))
    }
}

impl HealthView {
    fn finish_load(&mut self, result: Result<Vec<Sample>, FetchError>) -> Result<(), JsValue> {
        let failure = result.as_ref().err().cloned();
        self.sync.complete_load(result).map_err(to_js_error)?;
        match failure {
            Some(err) => Err(JsValue::from_str(&format!("Lỗi tải dữ liệu: {err}"))),
            None => Ok(()),
        }
    }
}

fn to_js_error(err: ViewError) -> JsValue {
    JsValue::from_str(&format!("HealthView error: {err}"))
}
