//! Bảng và biểu đồ mẫu sức khỏe gắn trực tiếp vào trang (WebAssembly).

#[cfg(target_arch = "wasm32")]
mod chart;
#[cfg(target_arch = "wasm32")]
mod logger;
#[cfg(target_arch = "wasm32")]
mod styles;
#[cfg(target_arch = "wasm32")]
mod table;
#[cfg(target_arch = "wasm32")]
mod transport;

#[cfg(target_arch = "wasm32")]
pub(crate) type SharedView = std::rc::Rc<
    std::cell::RefCell<healthview_core::ViewSynchronizer<table::DomTableSink, chart::ChartJsSink>>,
>;

#[cfg(target_arch = "wasm32")]
mod wasm_ui {
    use std::cell::RefCell;
    use std::rc::Rc;

    use chrono::{DateTime, Datelike, NaiveDateTime, Timelike, Utc};
    use healthview_core::{ViewConfig, ViewError, ViewSynchronizer};
    use healthview_feed::{parse_instant, parse_local_bound};
    use log::LevelFilter;
    use serde_wasm_bindgen::from_value;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::spawn_local;
    use web_sys::{console, Document, Element, HtmlCanvasElement, Window};

    use crate::chart::ChartJsSink;
    use crate::table::DomTableSink;
    use crate::transport::{load_history, run_live_feed};
    use crate::{logger, styles, SharedView};

    /// Điều khiển khung nhìn đã gắn vào trang.
    #[wasm_bindgen]
    pub struct HealthViewHandle {
        view: SharedView,
    }

    #[wasm_bindgen]
    impl HealthViewHandle {
        /// Callback của bộ chọn khoảng ngày: hai mốc giờ địa phương `YYYY-MM-DD HH:mm:ss`.
        pub fn select_range(&self, start: &str, end: &str) -> Result<(), JsValue> {
            let start = local_bound(start)?;
            let end = local_bound(end)?;
            self.view.borrow_mut().on_range_selected(start, end);
            Ok(())
        }

        /// Khoảng chọn dạng ISO-8601 (`moment#toISOString`).
        pub fn select_iso_range(&self, start: &str, end: &str) -> Result<(), JsValue> {
            let start = parse_instant(start)
                .ok_or_else(|| JsValue::from_str(&format!("Mốc thời gian không hợp lệ: {start}")))?;
            let end = parse_instant(end)
                .ok_or_else(|| JsValue::from_str(&format!("Mốc thời gian không hợp lệ: {end}")))?;
            self.view.borrow_mut().on_range_selected(start, end);
            Ok(())
        }

        pub fn clear_range(&self) {
            self.view.borrow_mut().on_range_cleared();
        }

        /// Tải lại thủ công sau khi lần tải trước thất bại.
        pub fn reload(&self) -> Result<(), JsValue> {
            self.view.borrow_mut().begin_load().map_err(to_js_error)?;
            spawn_local(load_history(self.view.clone()));
            Ok(())
        }

        pub fn state(&self) -> String {
            self.view.borrow().state().as_str().to_string()
        }

        pub fn error(&self) -> Option<String> {
            match self.view.borrow().state() {
                healthview_core::ViewState::Failed(err) => Some(err.to_string()),
                _ => None,
            }
        }

        pub fn row_count(&self) -> usize {
            self.view.borrow().table().model().len()
        }
    }

    /// Gắn bảng (`<tbody>`) và biểu đồ (`<canvas>`) rồi bắt đầu tải lịch sử.
    ///
    /// Kênh trực tiếp được mở song song; sự kiện đến trước khi tải xong được giữ lại.
    #[wasm_bindgen]
    pub fn mount_health_view(
        table_body_selector: &str,
        canvas_selector: &str,
        config: JsValue,
    ) -> Result<HealthViewHandle, JsValue> {
        logger::init(LevelFilter::Info);

        let window: Window =
            web_sys::window().ok_or_else(|| JsValue::from_str("Không có window"))?;
        let document: Document = window
            .document()
            .ok_or_else(|| JsValue::from_str("Không truy cập được document"))?;

        if let Err(err) = styles::ensure_styles(&document) {
            console::error_1(&err);
        }

        let cfg: ViewConfig = if config.is_undefined() || config.is_null() {
            ViewConfig::default()
        } else {
            from_value(config)?
        };

        let body = select(&document, table_body_selector)?;
        if let Some(table) = body.closest("table")? {
            let classes = table.class_name();
            if !classes.split_whitespace().any(|class| class == "healthview-table") {
                table.set_class_name(format!("{classes} healthview-table").trim());
            }
        }

        let canvas: HtmlCanvasElement = select(&document, canvas_selector)?
            .dyn_into()
            .map_err(|_| JsValue::from_str("Phần tử biểu đồ không phải <canvas>"))?;

        let chart = ChartJsSink::create(&canvas, &cfg)?;
        let table = DomTableSink::new(document, body);
        let live_url = cfg.live_url.clone();

        let mut sync = ViewSynchronizer::new(cfg, table, chart);
        sync.begin_load().map_err(to_js_error)?;
        let view: SharedView = Rc::new(RefCell::new(sync));

        spawn_local(load_history(view.clone()));
        if let Some(url) = live_url {
            spawn_local(run_live_feed(url, view.clone()));
        }

        Ok(HealthViewHandle { view })
    }

    fn select(document: &Document, selector: &str) -> Result<Element, JsValue> {
        document
            .query_selector(selector)
            .map_err(|err| JsValue::from_str(&format!("Selector lỗi: {err:?}")))?
            .ok_or_else(|| JsValue::from_str(&format!("Không tìm thấy element {selector}")))
    }

    /// Giờ địa phương của trình duyệt -> UTC, theo quy tắc múi giờ tại chính thời điểm đó.
    fn local_bound(text: &str) -> Result<DateTime<Utc>, JsValue> {
        let naive = parse_local_bound(text)
            .ok_or_else(|| JsValue::from_str(&format!("Mốc thời gian không hợp lệ: {text}")))?;
        local_to_utc(naive)
            .ok_or_else(|| JsValue::from_str(&format!("Không quy đổi được sang UTC: {text}")))
    }

    fn local_to_utc(naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        let date = js_sys::Date::new_with_year_month_day_hr_min_sec_milli(
            u32::try_from(naive.year()).ok()?,
            naive.month0() as i32,
            naive.day() as i32,
            naive.hour() as i32,
            naive.minute() as i32,
            naive.second() as i32,
            (naive.nanosecond() / 1_000_000) as i32,
        );
        let millis = date.get_time();
        if millis.is_nan() {
            return None;
        }
        DateTime::from_timestamp_millis(millis as i64)
    }

    fn to_js_error(err: ViewError) -> JsValue {
        JsValue::from_str(&format!("HealthView error: {err}"))
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm_ui::{mount_health_view, HealthViewHandle};

#[cfg(not(target_arch = "wasm32"))]
pub fn mount_health_view(
    _: &str,
    _: &str,
    _: wasm_bindgen::JsValue,
) -> Result<(), wasm_bindgen::JsValue> {
    Err(wasm_bindgen::JsValue::from_str(
        "healthview-ui chỉ hỗ trợ biên dịch target wasm32",
    ))
}
