pub mod http;
pub mod kv;
pub mod timer;

pub use crux_core::render::Render;
pub use crux_http::Http;
pub use crux_kv::KeyValue;

pub use self::http::{request_id, settle, FetchError, REQUEST_ID_HEADER};
pub use self::kv::{storage_result, StorageKey, StorageKeyError};
pub use self::timer::{Timer, TimerId, TimerOperation, TimerOutput};

use crate::app::App;
use crate::event::Event;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub http: Http<Event>,
    pub key_value: KeyValue<Event>,
    pub render: Render<Event>,
    pub timer: Timer<Event>,
}
