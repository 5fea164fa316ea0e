#![cfg(target_arch = "wasm32")]

use healthview_core::{ChartModel, ChartSeries, Sample, ViewConfig, ViewSink};
use js_sys::{Array, Object, Reflect};
use log::error;
use serde::Serialize;
use serde_json::{json, Value};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::HtmlCanvasElement;

const HEART_RATE_BORDER: &str = "rgb(255, 99, 132)";
const HEART_RATE_FILL: &str = "rgba(255, 99, 132, 0.5)";
const OXYGEN_BORDER: &str = "rgb(54, 162, 235)";
const OXYGEN_FILL: &str = "rgba(54, 162, 235, 0.5)";
const TIME_FORMAT: &str = "yyyy-MM-dd HH:mm:ss";

#[wasm_bindgen]
extern "C" {
    /// Chart.js instance; the page loads Chart.js and a date adapter for the time axis.
    #[wasm_bindgen(js_name = Chart)]
    pub type ChartJs;

    #[wasm_bindgen(constructor, js_class = "Chart", catch)]
    fn new(context: &JsValue, config: &JsValue) -> Result<ChartJs, JsValue>;

    #[wasm_bindgen(method)]
    fn update(this: &ChartJs);

    #[wasm_bindgen(method, getter)]
    fn data(this: &ChartJs) -> JsValue;

    #[wasm_bindgen(method, setter)]
    fn set_data(this: &ChartJs, data: &JsValue);

    #[wasm_bindgen(method, getter)]
    fn options(this: &ChartJs) -> JsValue;
}

/// Mirrors a `ChartModel` into a Chart.js line chart.
pub struct ChartJsSink {
    chart: ChartJs,
    model: ChartModel,
}

impl ChartJsSink {
    pub fn create(canvas: &HtmlCanvasElement, config: &ViewConfig) -> Result<Self, JsValue> {
        let context = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("Canvas không có 2d context"))?;
        let model = ChartModel::from_config(config);

        let chart_config = json!({
            "type": "line",
            "data": chart_data(&model),
            "options": {
                "animation": false,
                "scales": {
                    "x": {
                        "type": "time",
                        "time": {
                            "unit": "minute",
                            "tooltipFormat": TIME_FORMAT,
                            "displayFormats": { "minute": TIME_FORMAT }
                        },
                        "title": { "display": true, "text": "Time" }
                    },
                    "y": { "beginAtZero": config.begin_at_zero }
                }
            }
        });
        let chart = ChartJs::new(&context.into(), &to_js(&chart_config)?)?;

        Ok(Self { chart, model })
    }

    pub fn model(&self) -> &ChartModel {
        &self.model
    }

    fn rebuild(&self) -> Result<(), JsValue> {
        self.chart.set_data(&to_js(&chart_data(&self.model))?);
        self.apply_bounds()?;
        self.chart.update();
        Ok(())
    }

    fn push_point(&self, sample: &Sample) -> Result<(), JsValue> {
        let label = JsValue::from_str(&sample.label());
        let data = self.chart.data();

        let labels: Array = Reflect::get(&data, &"labels".into())?.dyn_into()?;
        labels.push(&label);

        let datasets: Array = Reflect::get(&data, &"datasets".into())?.dyn_into()?;
        for (index, y) in [sample.heart_rate, sample.oxygen_level].into_iter().enumerate() {
            let points: Array = Reflect::get(&datasets.get(index as u32), &"data".into())?.dyn_into()?;
            let point = Object::new();
            Reflect::set(&point, &"x".into(), &label)?;
            Reflect::set(&point, &"y".into(), &JsValue::from_f64(y))?;
            points.push(&point);
        }

        self.apply_bounds()?;
        self.chart.update();
        Ok(())
    }

    fn apply_bounds(&self) -> Result<(), JsValue> {
        let scales = Reflect::get(&self.chart.options(), &"scales".into())?;
        let y_axis = Reflect::get(&scales, &"y".into())?;
        let (min, max) = match self.model.y_bounds() {
            Some(bounds) => (JsValue::from_f64(bounds.min), JsValue::from_f64(bounds.max)),
            None => (JsValue::UNDEFINED, JsValue::UNDEFINED),
        };
        Reflect::set(&y_axis, &"suggestedMin".into(), &min)?;
        Reflect::set(&y_axis, &"suggestedMax".into(), &max)?;
        Ok(())
    }
}

impl ViewSink for ChartJsSink {
    fn render_full(&mut self, samples: &[Sample]) {
        self.model.render_full(samples);
        if let Err(err) = self.rebuild() {
            error!("Không vẽ lại được biểu đồ: {err:?}");
        }
    }

    fn append_one(&mut self, sample: &Sample) {
        self.model.append_one(sample);
        if let Err(err) = self.push_point(sample) {
            error!("Không thêm được điểm, dựng lại biểu đồ: {err:?}");
            if let Err(err) = self.rebuild() {
                error!("Không vẽ lại được biểu đồ: {err:?}");
            }
        }
    }
}

fn chart_data(model: &ChartModel) -> Value {
    json!({
        "labels": model.labels(),
        "datasets": [
            dataset(model.heart_rate(), HEART_RATE_BORDER, HEART_RATE_FILL),
            dataset(model.oxygen_level(), OXYGEN_BORDER, OXYGEN_FILL),
        ]
    })
}

fn dataset(series: &ChartSeries, border: &str, fill: &str) -> Value {
    json!({
        "label": series.label,
        "data": series.points,
        "borderColor": border,
        "backgroundColor": fill,
    })
}

/// Plain JS objects rather than `Map`s for JSON objects.
fn to_js(value: &Value) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(JsValue::from)
}
