use std::sync::Arc;
use std::time::Duration;

use chat_provider::{BackendInitError, ChatBackend};
use chat_provider_http::{HttpBackend, HttpBackendConfig, HTTP_BACKEND_ID};
use chat_provider_mock::{MockBackend, MOCK_BACKEND_ID};

use crate::config::ChatConfig;

pub const DEFAULT_BACKEND_ID: &str = HTTP_BACKEND_ID;

const MOCK_DELTA_DELAY: Duration = Duration::from_millis(40);

pub fn backend_for_id(
    backend_id: &str,
    config: &ChatConfig,
) -> Result<Arc<dyn ChatBackend>, BackendInitError> {
    match backend_id {
        HTTP_BACKEND_ID => {
            let mut http_config = HttpBackendConfig::new()
                .with_base_url(config.api_url.clone())
                .with_user_agent(format!("cafe_chat/{}", env!("CARGO_PKG_VERSION")));
            if let Some(timeout) = config.timeout {
                http_config = http_config.with_timeout(timeout);
            }
            for (name, value) in &config.headers {
                http_config = http_config.with_header(name, value);
            }
            Ok(Arc::new(HttpBackend::new(http_config)?))
        }
        MOCK_BACKEND_ID => Ok(Arc::new(
            MockBackend::default().with_delta_delay(MOCK_DELTA_DELAY),
        )),
        unknown => Err(BackendInitError::new(format!(
            "Unsupported backend '{unknown}'. Available backends: {HTTP_BACKEND_ID}, {MOCK_BACKEND_ID}"
        ))),
    }
}
