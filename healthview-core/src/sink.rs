//! Hai phép chiếu của khung nhìn hiện tại: bảng và biểu đồ.

use serde::{Deserialize, Serialize};

use crate::config::ViewConfig;
use crate::model::Sample;

pub const HEART_RATE_LABEL: &str = "Heart Rate";
pub const OXYGEN_LEVEL_LABEL: &str = "Oxygen Saturation";

/// Nơi nhận khung nhìn hiện tại.
///
/// `render_full` thay toàn bộ nội dung, `append_one` thêm đúng một mẫu vào cuối.
/// Với cùng một dãy mẫu, hai đường này phải cho ra trạng thái giống hệt nhau.
pub trait ViewSink {
    fn render_full(&mut self, samples: &[Sample]);
    fn append_one(&mut self, sample: &Sample);
}

impl<S: ViewSink + ?Sized> ViewSink for Box<S> {
    fn render_full(&mut self, samples: &[Sample]) {
        (**self).render_full(samples)
    }

    fn append_one(&mut self, sample: &Sample) {
        (**self).append_one(sample)
    }
}

/// Một dòng của bảng: thời điểm, nhịp tim, SpO2, ax, ay, az.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableRow {
    pub timestamp: String,
    pub heart_rate: String,
    pub oxygen_level: String,
    pub ax: String,
    pub ay: String,
    pub az: String,
}

impl TableRow {
    pub fn from_sample(sample: &Sample) -> Self {
        Self {
            timestamp: sample.label(),
            heart_rate: format_number(sample.heart_rate),
            oxygen_level: format_number(sample.oxygen_level),
            ax: format_number(sample.accelerometer.ax),
            ay: format_number(sample.accelerometer.ay),
            az: format_number(sample.accelerometer.az),
        }
    }

    pub fn cells(&self) -> [&str; 6] {
        [
            &self.timestamp,
            &self.heart_rate,
            &self.oxygen_level,
            &self.ax,
            &self.ay,
            &self.az,
        ]
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableModel {
    rows: Vec<TableRow>,
}

impl TableModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl ViewSink for TableModel {
    fn render_full(&mut self, samples: &[Sample]) {
        self.rows.clear();
        self.rows.extend(samples.iter().map(TableRow::from_sample));
    }

    fn append_one(&mut self, sample: &Sample) {
        self.rows.push(TableRow::from_sample(sample));
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartPoint {
    pub x: String,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartSeries {
    pub label: String,
    pub points: Vec<ChartPoint>,
}

impl ChartSeries {
    fn named(label: &str) -> Self {
        Self {
            label: label.to_string(),
            points: Vec::new(),
        }
    }
}

/// Giới hạn gợi ý của trục Y.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AxisBounds {
    pub min: f64,
    pub max: f64,
}

/// Biểu đồ đường: một trục thời gian chung, hai chuỗi nhịp tim và SpO2.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartModel {
    labels: Vec<String>,
    heart_rate: ChartSeries,
    oxygen_level: ChartSeries,
    y_bounds: Option<AxisBounds>,
    #[serde(skip)]
    observed: Option<(f64, f64)>,
    #[serde(skip)]
    margin: f64,
    #[serde(skip)]
    begin_at_zero: bool,
}

impl Default for ChartModel {
    fn default() -> Self {
        let config = ViewConfig::default();
        Self::new(config.axis_margin, config.begin_at_zero)
    }
}

impl ChartModel {
    pub fn new(margin: f64, begin_at_zero: bool) -> Self {
        Self {
            labels: Vec::new(),
            heart_rate: ChartSeries::named(HEART_RATE_LABEL),
            oxygen_level: ChartSeries::named(OXYGEN_LEVEL_LABEL),
            y_bounds: None,
            observed: None,
            margin,
            begin_at_zero,
        }
    }

    pub fn from_config(config: &ViewConfig) -> Self {
        Self::new(config.axis_margin, config.begin_at_zero)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn heart_rate(&self) -> &ChartSeries {
        &self.heart_rate
    }

    pub fn oxygen_level(&self) -> &ChartSeries {
        &self.oxygen_level
    }

    pub fn y_bounds(&self) -> Option<AxisBounds> {
        self.y_bounds
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    fn clear(&mut self) {
        self.labels.clear();
        self.heart_rate.points.clear();
        self.oxygen_level.points.clear();
        self.observed = None;
        self.y_bounds = None;
    }

    fn push(&mut self, sample: &Sample) {
        let label = sample.label();
        self.heart_rate.points.push(ChartPoint {
            x: label.clone(),
            y: sample.heart_rate,
        });
        self.oxygen_level.points.push(ChartPoint {
            x: label.clone(),
            y: sample.oxygen_level,
        });
        self.labels.push(label);

        let low = sample.heart_rate.min(sample.oxygen_level);
        let high = sample.heart_rate.max(sample.oxygen_level);
        self.observed = Some(match self.observed {
            Some((min, max)) => (min.min(low), max.max(high)),
            None => (low, high),
        });
    }

    fn refresh_bounds(&mut self) {
        self.y_bounds = self.observed.map(|(min, max)| {
            let mut lower = min - self.margin;
            if self.begin_at_zero && lower > 0.0 {
                lower = 0.0;
            }
            AxisBounds {
                min: lower,
                max: max + self.margin,
            }
        });
    }
}

impl ViewSink for ChartModel {
    fn render_full(&mut self, samples: &[Sample]) {
        self.clear();
        for sample in samples {
            self.push(sample);
        }
        self.refresh_bounds();
    }

    fn append_one(&mut self, sample: &Sample) {
        self.push(sample);
        self.refresh_bounds();
    }
}

/// In số giống template literal của JavaScript (`70`, `98.5`, `0`, `1e+21`, `1e-7`).
///
/// Dạng mũ dùng khi |x| >= 1e21 hoặc |x| < 1e-6, như `Number#toString`.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let magnitude = value.abs();
    if magnitude >= 1e21 || magnitude < 1e-6 {
        let text = format!("{value:e}");
        return match text.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{mantissa}e+{exponent}")
            }
            _ => text,
        };
    }
    value.to_string()
}
