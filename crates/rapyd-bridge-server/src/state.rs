use crate::config::ServerConfig;
use rapyd::{Dispatcher, HttpTransport, ReqwestTransport};
use std::sync::Arc;

/// Shared application state
pub struct AppState<T: HttpTransport = ReqwestTransport> {
    pub config: Arc<ServerConfig>,
    pub dispatcher: Arc<Dispatcher<T>>,
}

impl<T: HttpTransport> Clone for AppState<T> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl AppState<ReqwestTransport> {
    pub fn new(config: ServerConfig) -> Self {
        let dispatcher = Dispatcher::with_reqwest(config.gateway.clone());
        Self::with_dispatcher(config, dispatcher)
    }
}

impl<T: HttpTransport> AppState<T> {
    pub fn with_dispatcher(config: ServerConfig, dispatcher: Dispatcher<T>) -> Self {
        Self {
            config: Arc::new(config),
            dispatcher: Arc::new(dispatcher),
        }
    }
}
