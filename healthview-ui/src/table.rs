#![cfg(target_arch = "wasm32")]

use healthview_core::{Sample, TableModel, TableRow, ViewSink};
use log::error;
use wasm_bindgen::JsValue;
use web_sys::{Document, Element};

/// Renders rows into a `<tbody>`, one `<td>` per column.
pub struct DomTableSink {
    document: Document,
    body: Element,
    model: TableModel,
}

impl DomTableSink {
    pub fn new(document: Document, body: Element) -> Self {
        Self {
            document,
            body,
            model: TableModel::new(),
        }
    }

    pub fn model(&self) -> &TableModel {
        &self.model
    }

    fn build_row(&self, row: &TableRow) -> Result<Element, JsValue> {
        let tr = self.document.create_element("tr")?;
        for cell in row.cells() {
            let td = self.document.create_element("td")?;
            td.set_text_content(Some(cell));
            tr.append_child(&td)?;
        }
        Ok(tr)
    }

    fn append_row(&self, row: &TableRow) -> Result<(), JsValue> {
        self.body.append_child(&self.build_row(row)?)?;
        Ok(())
    }

    /// Rows go into a fragment first; the `<tbody>` is swapped only when every row was built.
    fn rebuild(&self) -> Result<(), JsValue> {
        let fragment = self.document.create_document_fragment();
        for row in self.model.rows() {
            fragment.append_child(&self.build_row(row)?)?;
        }
        self.body.set_inner_html("");
        self.body.append_child(&fragment)?;
        Ok(())
    }
}

impl ViewSink for DomTableSink {
    fn render_full(&mut self, samples: &[Sample]) {
        self.model.render_full(samples);
        if let Err(err) = self.rebuild() {
            error!("Không dựng lại được bảng: {err:?}");
        }
    }

    fn append_one(&mut self, sample: &Sample) {
        self.model.append_one(sample);
        let appended = match self.model.rows().last() {
            Some(row) => self.append_row(row),
            None => Ok(()),
        };
        if let Err(err) = appended {
            error!("Không thêm được dòng bảng, dựng lại toàn bộ: {err:?}");
            if let Err(err) = self.rebuild() {
                error!("Không dựng lại được bảng: {err:?}");
            }
        }
    }
}
