//! Bộ đồng bộ giữ tập dữ liệu, cửa sổ lọc và khung nhìn hiện tại,
//! đồng thời đẩy khung nhìn tới bảng và biểu đồ.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};

use crate::config::ViewConfig;
use crate::error::{FetchError, ViewError};
use crate::event::{LiveMessage, ViewEvent};
use crate::model::{format_instant, is_visible, Sample, ViewWindow};
use crate::sink::{ChartModel, TableModel, ViewSink};

/// Vòng đời của một khung nhìn.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    Uninitialized,
    Loading,
    Ready,
    /// Lần tải này thất bại; chỉ tải lại khi được gọi `begin_load` thủ công.
    Failed(FetchError),
}

impl ViewState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewState::Uninitialized => "uninitialized",
            ViewState::Loading => "loading",
            ViewState::Ready => "ready",
            ViewState::Failed(_) => "failed",
        }
    }
}

/// Trạng thái kết nối của kênh đẩy, chỉ để quan sát.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    Unknown,
    Connected,
    Disconnected,
}

/// Sự kiện đến trước khi khung nhìn sẵn sàng.
#[derive(Debug, Clone, PartialEq)]
enum Deferred {
    Live(Sample),
    Range(Option<ViewWindow>),
}

pub struct ViewSynchronizer<T: ViewSink, C: ViewSink> {
    config: ViewConfig,
    state: ViewState,
    link: LinkStatus,
    dataset: Vec<Sample>,
    window: Option<ViewWindow>,
    current: Vec<Sample>,
    pending: VecDeque<Deferred>,
    table: T,
    chart: C,
}

impl ViewSynchronizer<TableModel, ChartModel> {
    /// Bộ đồng bộ dùng hai phép chiếu trong bộ nhớ.
    pub fn with_models(config: ViewConfig) -> Self {
        let chart = ChartModel::from_config(&config);
        Self::new(config, TableModel::new(), chart)
    }
}

impl<T: ViewSink, C: ViewSink> ViewSynchronizer<T, C> {
    pub fn new(config: ViewConfig, table: T, chart: C) -> Self {
        Self {
            config,
            state: ViewState::Uninitialized,
            link: LinkStatus::Unknown,
            dataset: Vec::new(),
            window: None,
            current: Vec::new(),
            pending: VecDeque::new(),
            table,
            chart,
        }
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn link(&self) -> LinkStatus {
        self.link
    }

    /// Toàn bộ lịch sử đã biết, theo thứ tự đến.
    pub fn dataset(&self) -> &[Sample] {
        &self.dataset
    }

    pub fn window(&self) -> Option<&ViewWindow> {
        self.window.as_ref()
    }

    /// Khung nhìn đang hiển thị trên bảng và biểu đồ.
    pub fn current_view(&self) -> &[Sample] {
        &self.current
    }

    pub fn table(&self) -> &T {
        &self.table
    }

    pub fn chart(&self) -> &C {
        &self.chart
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Bắt đầu tải lịch sử. Hợp lệ khi chưa khởi tạo hoặc lần tải trước đã thất bại.
    pub fn begin_load(&mut self) -> Result<(), ViewError> {
        match self.state {
            ViewState::Uninitialized | ViewState::Failed(_) => {
                info!("Đang tải lịch sử từ {}", self.config.history_url);
                self.state = ViewState::Loading;
                Ok(())
            }
            _ => Err(self.invalid_state("uninitialized|failed")),
        }
    }

    /// Kết thúc lần tải: dựng khung nhìn đầy đủ rồi áp dụng các sự kiện đang chờ.
    pub fn complete_load(&mut self, result: Result<Vec<Sample>, FetchError>) -> Result<(), ViewError> {
        if self.state != ViewState::Loading {
            return Err(self.invalid_state("loading"));
        }

        match result {
            Ok(samples) => {
                info!("Đã tải {} mẫu lịch sử", samples.len());
                self.dataset = samples;
                self.window = None;
                self.current = self.dataset.clone();
                self.render_full();
                self.state = ViewState::Ready;
                self.replay_pending();
            }
            Err(err) => {
                error!("Lỗi tải dữ liệu sức khỏe: {err}");
                if !self.pending.is_empty() {
                    warn!("Bỏ {} sự kiện đang chờ do tải thất bại", self.pending.len());
                    self.pending.clear();
                }
                self.state = ViewState::Failed(err);
            }
        }
        Ok(())
    }

    /// Mẫu mới từ kênh đẩy. Ngoài cửa sổ đang chọn thì chỉ thêm vào tập dữ liệu.
    pub fn on_live_sample(&mut self, sample: Sample) {
        if self.state == ViewState::Ready {
            self.apply_live(sample);
        } else {
            self.defer(Deferred::Live(sample));
        }
    }

    pub fn handle_live(&mut self, message: LiveMessage) {
        match message {
            LiveMessage::Connected => {
                info!("Đã kết nối kênh cập nhật trực tiếp");
                self.link = LinkStatus::Connected;
            }
            LiveMessage::Disconnected => {
                warn!("Mất kết nối kênh cập nhật trực tiếp");
                self.link = LinkStatus::Disconnected;
            }
            LiveMessage::Sample(sample) => self.on_live_sample(sample),
            LiveMessage::Malformed(reason) => debug!("Bỏ qua sự kiện trực tiếp: {reason}"),
        }
    }

    /// Người dùng chọn khoảng thời gian mới; thay thế hoàn toàn cửa sổ cũ.
    pub fn on_range_selected(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) {
        let window = ViewWindow::new(start, end);
        if self.state == ViewState::Ready {
            self.apply_window(Some(window));
        } else {
            self.defer(Deferred::Range(Some(window)));
        }
    }

    pub fn on_range_cleared(&mut self) {
        if self.state == ViewState::Ready {
            self.apply_window(None);
        } else {
            self.defer(Deferred::Range(None));
        }
    }

    /// Xử lý trọn vẹn một sự kiện của hàng đợi trước khi nhận sự kiện tiếp theo.
    pub fn handle(&mut self, event: ViewEvent) -> Result<(), ViewError> {
        match event {
            ViewEvent::HistoryLoaded(result) => self.complete_load(result)?,
            ViewEvent::Live(message) => self.handle_live(message),
            ViewEvent::RangeSelected { start, end } => self.on_range_selected(start, end),
            ViewEvent::RangeCleared => self.on_range_cleared(),
        }
        Ok(())
    }

    fn apply_live(&mut self, sample: Sample) {
        self.dataset.push(sample.clone());
        if is_visible(self.window.as_ref(), &sample) {
            self.table.append_one(&sample);
            self.chart.append_one(&sample);
            self.current.push(sample);
        } else {
            debug!(
                "Mẫu {} nằm ngoài khoảng đang chọn, chỉ lưu vào tập dữ liệu",
                sample.label()
            );
        }
    }

    fn apply_window(&mut self, window: Option<ViewWindow>) {
        match &window {
            Some(w) if w.is_inverted() => debug!(
                "Khoảng chọn đảo ngược {} > {}, khung nhìn rỗng",
                format_instant(w.start),
                format_instant(w.end)
            ),
            Some(w) => info!(
                "Khoảng thời gian mới: {} tới {}",
                format_instant(w.start),
                format_instant(w.end)
            ),
            None => info!("Bỏ lọc khoảng thời gian"),
        }

        self.window = window;
        self.current = self
            .dataset
            .iter()
            .filter(|sample| is_visible(self.window.as_ref(), sample))
            .cloned()
            .collect();
        self.render_full();
    }

    fn render_full(&mut self) {
        self.table.render_full(&self.current);
        self.chart.render_full(&self.current);
    }

    /// Chỉ giữ lại khi chưa khởi tạo hoặc đang tải; sau khi tải thất bại thì bỏ.
    fn defer(&mut self, event: Deferred) {
        if let ViewState::Failed(_) = self.state {
            debug!("Tải lịch sử đã thất bại, bỏ sự kiện {event:?}");
            return;
        }
        if self.config.max_pending_events == 0 {
            warn!("Bỏ sự kiện đến trước khi khung nhìn sẵn sàng");
            return;
        }
        if self.pending.len() >= self.config.max_pending_events {
            warn!(
                "Hàng đợi chờ đã đầy ({}), bỏ sự kiện cũ nhất",
                self.config.max_pending_events
            );
            self.pending.pop_front();
        }
        self.pending.push_back(event);
    }

    fn replay_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        debug!("Áp dụng {} sự kiện đến trong lúc tải", self.pending.len());
        while let Some(event) = self.pending.pop_front() {
            match event {
                Deferred::Live(sample) => self.apply_live(sample),
                Deferred::Range(window) => self.apply_window(window),
            }
        }
    }

    fn invalid_state(&self, expected: &'static str) -> ViewError {
        ViewError::InvalidState {
            expected,
            actual: self.state.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Accelerometer;

    type Synchronizer = ViewSynchronizer<TableModel, ChartModel>;

    fn at(text: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(text)
            .expect("thời điểm hợp lệ")
            .with_timezone(&Utc)
    }

    fn sample(ts: &str, hr: f64, ox: f64) -> Sample {
        Sample::new(
            at(ts),
            hr,
            ox,
            Accelerometer {
                ax: 0.0,
                ay: 0.0,
                az: 1.0,
            },
        )
    }

    fn history() -> Vec<Sample> {
        vec![
            sample("2024-01-01T10:00:00Z", 70.0, 98.0),
            sample("2024-01-01T14:00:00Z", 80.0, 97.0),
        ]
    }

    fn ready(samples: Vec<Sample>) -> Synchronizer {
        let mut sync = Synchronizer::with_models(ViewConfig::default());
        sync.begin_load().expect("bắt đầu tải");
        sync.complete_load(Ok(samples)).expect("tải xong");
        sync
    }

    fn assert_projections_match(sync: &Synchronizer) {
        let mut table = TableModel::new();
        let mut chart = ChartModel::default();
        table.render_full(sync.current_view());
        chart.render_full(sync.current_view());
        assert_eq!(sync.table(), &table);
        assert_eq!(sync.chart(), &chart);
    }

    #[test]
    fn initial_load_renders_everything_in_server_order() {
        let mut samples = history();
        samples.reverse();
        let sync = ready(samples.clone());

        assert_eq!(sync.state(), &ViewState::Ready);
        assert_eq!(sync.current_view(), samples.as_slice());
        assert_eq!(sync.table().len(), 2);
        assert_eq!(sync.chart().len(), 2);
        assert_eq!(sync.table().rows()[0].timestamp, "2024-01-01T14:00:00.000Z");
        assert_projections_match(&sync);
    }

    #[test]
    fn failed_load_leaves_view_empty() {
        let mut sync = Synchronizer::with_models(ViewConfig::default());
        sync.begin_load().expect("bắt đầu tải");
        sync.on_live_sample(sample("2024-01-01T15:00:00Z", 90.0, 95.0));
        sync.complete_load(Err(FetchError::Status(500)))
            .expect("kết thúc tải");

        assert_eq!(sync.state(), &ViewState::Failed(FetchError::Status(500)));
        assert!(sync.dataset().is_empty());
        assert!(sync.table().is_empty());
        assert!(sync.chart().is_empty());
        assert_eq!(sync.pending_len(), 0);
    }

    #[test]
    fn manual_retry_after_failure() {
        let mut sync = Synchronizer::with_models(ViewConfig::default());
        sync.begin_load().expect("bắt đầu tải");
        sync.complete_load(Err(FetchError::Timeout(10_000)))
            .expect("kết thúc tải");
        sync.begin_load().expect("tải lại");
        sync.complete_load(Ok(history())).expect("tải xong");
        assert_eq!(sync.current_view().len(), 2);
    }

    #[test]
    fn events_after_failure_are_not_replayed_on_retry() {
        let mut sync = Synchronizer::with_models(ViewConfig::default());
        sync.begin_load().expect("bắt đầu tải");
        sync.complete_load(Err(FetchError::Status(500)))
            .expect("kết thúc tải");

        let late = sample("2024-01-01T15:00:00Z", 90.0, 95.0);
        sync.on_live_sample(late.clone());
        sync.on_range_selected(at("2024-01-01T12:00:00Z"), at("2024-01-01T23:59:59Z"));
        assert_eq!(sync.pending_len(), 0);

        sync.begin_load().expect("tải lại");
        sync.complete_load(Ok(vec![late])).expect("tải xong");

        assert_eq!(sync.dataset().len(), 1);
        assert_eq!(sync.window(), None);
        assert_projections_match(&sync);
    }

    #[test]
    fn complete_load_outside_loading_is_rejected() {
        let mut sync = Synchronizer::with_models(ViewConfig::default());
        let err = sync.complete_load(Ok(history())).unwrap_err();
        assert_eq!(
            err,
            ViewError::InvalidState {
                expected: "loading",
                actual: "uninitialized"
            }
        );

        let mut sync = ready(history());
        assert!(sync.begin_load().is_err());
    }

    #[test]
    fn live_samples_grow_dataset_and_visible_view() {
        let mut sync = ready(history());
        sync.on_range_selected(at("2024-01-01T12:00:00Z"), at("2024-01-01T23:59:59Z"));

        let live = [
            sample("2024-01-01T15:00:00Z", 90.0, 95.0),
            sample("2024-01-01T08:00:00Z", 60.0, 99.0),
            sample("2024-01-01T16:00:00Z", 85.0, 96.0),
        ];
        for s in &live {
            sync.on_live_sample(s.clone());
        }

        assert_eq!(sync.dataset().len(), 2 + live.len());
        let expected = sync
            .dataset()
            .iter()
            .filter(|s| sync.window().map_or(true, |w| w.contains(s.timestamp)))
            .count();
        assert_eq!(sync.current_view().len(), expected);
        assert_eq!(expected, 3);
        assert_projections_match(&sync);
    }

    #[test]
    fn malformed_live_event_changes_nothing() {
        let mut sync = ready(history());
        let table = sync.table().clone();
        let chart = sync.chart().clone();
        let dataset = sync.dataset().to_vec();

        sync.handle_live(LiveMessage::Malformed("thiếu HealthData".into()));

        assert_eq!(sync.table(), &table);
        assert_eq!(sync.chart(), &chart);
        assert_eq!(sync.dataset(), dataset.as_slice());
        assert_eq!(sync.current_view(), dataset.as_slice());
    }

    #[test]
    fn second_range_replaces_first() {
        let mut sequential = ready(history());
        sequential.on_range_selected(at("2024-01-01T00:00:00Z"), at("2024-01-01T11:00:00Z"));
        sequential.on_range_selected(at("2024-01-01T09:00:00Z"), at("2024-01-01T20:00:00Z"));

        let mut direct = ready(history());
        direct.on_range_selected(at("2024-01-01T09:00:00Z"), at("2024-01-01T20:00:00Z"));

        assert_eq!(sequential.current_view(), direct.current_view());
        assert_eq!(sequential.current_view().len(), 2);
        assert_eq!(sequential.table(), direct.table());
        assert_eq!(sequential.chart(), direct.chart());
    }

    #[test]
    fn afternoon_range_keeps_only_second_sample() {
        let mut sync = ready(history());
        sync.on_range_selected(at("2024-01-01T12:00:00Z"), at("2024-01-01T23:59:59Z"));

        assert_eq!(sync.current_view(), &history()[1..]);
        assert_eq!(sync.table().len(), 1);
        assert_eq!(sync.chart().heart_rate().points.len(), 1);
        assert_eq!(sync.chart().oxygen_level().points.len(), 1);
    }

    #[test]
    fn inverted_range_yields_empty_view() {
        let mut sync = ready(history());
        sync.on_range_selected(at("2024-01-02T00:00:00Z"), at("2024-01-01T00:00:00Z"));

        assert!(sync.current_view().is_empty());
        assert!(sync.table().is_empty());
        assert_eq!(sync.dataset().len(), 2);
    }

    #[test]
    fn live_sample_outside_window_appears_after_clear() {
        let mut sync = ready(history());
        sync.on_range_selected(at("2024-01-01T12:00:00Z"), at("2024-01-01T23:59:59Z"));
        let before = sync.table().clone();

        let late = sample("2024-01-02T01:00:00Z", 101.0, 93.0);
        sync.on_live_sample(late.clone());

        assert_eq!(sync.dataset().last(), Some(&late));
        assert_eq!(sync.table(), &before);
        assert!(!sync.current_view().contains(&late));

        sync.on_range_cleared();
        assert_eq!(sync.current_view().last(), Some(&late));
        assert_eq!(sync.table().len(), 3);
        assert_projections_match(&sync);
    }

    #[test]
    fn events_before_ready_are_replayed_in_order() {
        let mut sync = Synchronizer::with_models(ViewConfig::default());
        sync.on_live_sample(sample("2024-01-01T09:00:00Z", 66.0, 99.0));
        sync.begin_load().expect("bắt đầu tải");
        sync.on_range_selected(at("2024-01-01T12:00:00Z"), at("2024-01-01T23:59:59Z"));
        sync.on_live_sample(sample("2024-01-01T18:00:00Z", 88.0, 96.0));
        assert_eq!(sync.pending_len(), 3);
        assert!(sync.table().is_empty());

        sync.complete_load(Ok(history())).expect("tải xong");

        assert_eq!(sync.pending_len(), 0);
        assert_eq!(sync.dataset().len(), 4);
        let labels: Vec<String> = sync.current_view().iter().map(Sample::label).collect();
        assert_eq!(
            labels,
            ["2024-01-01T14:00:00.000Z", "2024-01-01T18:00:00.000Z"]
        );
        assert_projections_match(&sync);
    }

    #[test]
    fn pending_buffer_drops_oldest_when_full() {
        let config = ViewConfig {
            max_pending_events: 2,
            ..ViewConfig::default()
        };
        let mut sync = Synchronizer::with_models(config);
        sync.begin_load().expect("bắt đầu tải");
        sync.on_live_sample(sample("2024-01-01T15:00:00Z", 90.0, 95.0));
        sync.on_live_sample(sample("2024-01-01T16:00:00Z", 91.0, 95.0));
        sync.on_live_sample(sample("2024-01-01T17:00:00Z", 92.0, 95.0));
        assert_eq!(sync.pending_len(), 2);

        sync.complete_load(Ok(Vec::new())).expect("tải xong");
        let rates: Vec<f64> = sync.dataset().iter().map(|s| s.heart_rate).collect();
        assert_eq!(rates, [91.0, 92.0]);
    }

    #[test]
    fn link_events_do_not_touch_data() {
        let mut sync = ready(history());
        sync.handle(ViewEvent::Live(LiveMessage::Disconnected))
            .expect("xử lý sự kiện");
        assert_eq!(sync.link(), LinkStatus::Disconnected);
        assert_eq!(sync.dataset().len(), 2);
        assert!(sync.window().is_none());

        sync.handle(ViewEvent::Live(LiveMessage::Connected))
            .expect("xử lý sự kiện");
        assert_eq!(sync.link(), LinkStatus::Connected);
    }

    #[test]
    fn dispatcher_routes_every_event_kind() {
        let mut sync = Synchronizer::with_models(ViewConfig::default());
        sync.begin_load().expect("bắt đầu tải");
        let events = vec![
            ViewEvent::RangeSelected {
                start: at("2024-01-01T12:00:00Z"),
                end: at("2024-01-01T23:59:59Z"),
            },
            ViewEvent::HistoryLoaded(Ok(history())),
            ViewEvent::Live(LiveMessage::Sample(sample("2024-01-01T20:00:00Z", 75.0, 97.0))),
            ViewEvent::RangeCleared,
        ];
        for event in events {
            sync.handle(event).expect("xử lý sự kiện");
        }

        assert_eq!(sync.current_view().len(), 3);
        assert!(sync.window().is_none());
        assert_projections_match(&sync);
    }
}
