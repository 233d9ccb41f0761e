//! Test doubles shared by unit tests

use crate::error::Result;
use crate::http::{ApiClient, ApiFamily};
use crate::types::{JsonValue, QueryParams};
use async_trait::async_trait;
use std::sync::Mutex;

type Responder = Box<dyn Fn(&str, &QueryParams) -> Result<JsonValue> + Send + Sync>;

/// One recorded request
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Call {
    pub api: ApiFamily,
    pub endpoint: String,
    pub params: QueryParams,
}

impl Call {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// In-process `ApiClient` answering from a closure and recording every call
pub(crate) struct FakeApi {
    responder: Responder,
    calls: Mutex<Vec<Call>>,
}

impl FakeApi {
    pub fn new(
        responder: impl Fn(&str, &QueryParams) -> Result<JsonValue> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, endpoint: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.endpoint == endpoint)
            .collect()
    }
}

#[async_trait]
impl ApiClient for FakeApi {
    async fn get(&self, api: ApiFamily, endpoint: &str, params: &QueryParams) -> Result<JsonValue> {
        self.calls.lock().unwrap().push(Call {
            api,
            endpoint: endpoint.to_string(),
            params: params.clone(),
        });
        (self.responder)(endpoint, params)
    }
}
