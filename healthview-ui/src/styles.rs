#![cfg(target_arch = "wasm32")]

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Node};

const STYLE_TAG_SELECTOR: &str = "style[data-healthview-ui]";

/// Default CSS for the table and chart, with overridable design tokens.
pub const DEFAULT_STYLES: &str = r#"
:root {
  --healthview-font-family: 'Inter', system-ui, -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif;
  --healthview-text: #1f2933;
  --healthview-muted: #52606d;
  --healthview-border: rgba(148, 163, 184, 0.28);
  --healthview-stripe: #f8fafc;
  --healthview-head-bg: #eef2f7;
  --healthview-radius: 12px;
}

.healthview-table {
  font-family: var(--healthview-font-family);
  color: var(--healthview-text);
  width: 100%;
  border-collapse: collapse;
  border: 1px solid var(--healthview-border);
  border-radius: var(--healthview-radius);
  font-variant-numeric: tabular-nums;
}

.healthview-table th {
  background: var(--healthview-head-bg);
  color: var(--healthview-muted);
  font-weight: 600;
  text-align: left;
  padding: 8px 12px;
}

.healthview-table td {
  padding: 6px 12px;
  border-top: 1px solid var(--healthview-border);
}

.healthview-table tbody tr:nth-child(even) {
  background: var(--healthview-stripe);
}

.healthview-table td:first-child {
  white-space: nowrap;
}

@media (max-width: 720px) {
  .healthview-table td,
  .healthview-table th {
    padding: 4px 6px;
    font-size: 0.85rem;
  }
}
"#;

pub fn ensure_styles(document: &Document) -> Result<(), JsValue> {
    if document.query_selector(STYLE_TAG_SELECTOR)?.is_some() {
        return Ok(());
    }

    let head = document
        .head()
        .ok_or_else(|| JsValue::from_str("Document không có thẻ <head>"))?;

    let style_el = document.create_element("style")?;
    style_el.set_attribute("data-healthview-ui", "v1")?;
    style_el.set_text_content(Some(DEFAULT_STYLES));
    head.append_child(&style_el.clone().dyn_into::<Node>()?)?;

    Ok(())
}
