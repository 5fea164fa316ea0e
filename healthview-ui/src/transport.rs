#![cfg(target_arch = "wasm32")]

use futures_util::{SinkExt, StreamExt};
use gloo_net::http::Request;
use gloo_net::websocket::{futures::WebSocket, Message};
use healthview_core::{FetchError, LiveMessage, Sample};
use healthview_feed::parse_history_str;
use healthview_feed::socketio::{decode_frame, frame_to_message, Frame, CONNECT, PONG};
use log::{debug, error, info, warn};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{AbortController, AbortSignal};

use crate::SharedView;

/// GET the history endpoint. The deadline covers both the headers and the body.
pub async fn fetch_history(url: &str, timeout_ms: u64) -> Result<Vec<Sample>, FetchError> {
    let window = web_sys::window().ok_or_else(|| FetchError::Network("Không có window".into()))?;
    let controller =
        AbortController::new().map_err(|err| FetchError::Network(format!("{err:?}")))?;
    let signal = controller.signal();

    let abort = Closure::once(move || controller.abort());
    let timer = window
        .set_timeout_with_callback_and_timeout_and_arguments_0(
            abort.as_ref().unchecked_ref(),
            i32::try_from(timeout_ms).unwrap_or(i32::MAX),
        )
        .map_err(|err| FetchError::Network(format!("{err:?}")))?;

    let body = read_body(url, &signal, timeout_ms).await;
    window.clear_timeout_with_handle(timer);
    drop(abort);

    parse_history_str(&body?)
}

async fn read_body(url: &str, signal: &AbortSignal, timeout_ms: u64) -> Result<String, FetchError> {
    let response = Request::get(url)
        .abort_signal(Some(signal))
        .send()
        .await
        .map_err(|err| FetchError::interrupted(signal.aborted(), timeout_ms, err))?;

    if !response.ok() {
        return Err(FetchError::Status(response.status()));
    }

    response
        .text()
        .await
        .map_err(|err| FetchError::interrupted(signal.aborted(), timeout_ms, err))
}

pub async fn load_history(view: SharedView) {
    let (url, timeout_ms) = {
        let view = view.borrow();
        (
            view.config().history_url.clone(),
            view.config().fetch_timeout_ms,
        )
    };

    let result = fetch_history(&url, timeout_ms).await;
    if let Err(err) = view.borrow_mut().complete_load(result) {
        error!("{err}");
    }
}

/// Socket.IO over a raw WebSocket. Reconnecting is left to the page.
pub async fn run_live_feed(url: String, view: SharedView) {
    let live_event = view.borrow().config().live_event.clone();

    let socket = match WebSocket::open(&url) {
        Ok(socket) => socket,
        Err(err) => {
            warn!("Không mở được kênh trực tiếp {url}: {err}");
            return;
        }
    };
    info!("Đang kết nối kênh trực tiếp {url}");
    let (mut writer, mut reader) = socket.split();

    while let Some(message) = reader.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Bytes(_)) => {
                debug!("Bỏ qua khung nhị phân");
                continue;
            }
            Err(err) => {
                warn!("Lỗi kênh trực tiếp: {err}");
                break;
            }
        };

        let frame = match decode_frame(&text) {
            Ok(frame) => frame,
            Err(err) => {
                debug!("{err}");
                continue;
            }
        };

        let reply = match frame {
            Frame::Open(_) => Some(CONNECT),
            Frame::Ping => Some(PONG),
            _ => None,
        };
        if let Some(reply) = reply {
            if let Err(err) = writer.send(Message::Text(reply.to_string())).await {
                warn!("Không gửi được khung điều khiển: {err}");
                break;
            }
        }

        if let Some(message) = frame_to_message(frame, &live_event) {
            view.borrow_mut().handle_live(message);
        }
    }

    view.borrow_mut().handle_live(LiveMessage::Disconnected);
}
