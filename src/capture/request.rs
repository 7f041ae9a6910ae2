use serde::{Deserialize, Serialize};

/// A single header as the capture layer saw it. The value may be missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    pub fn without_value(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }
}

/// A network request recorded by the capture layer. Never modified after capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservedRequest {
    pub request_id: String,
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub request_headers: Vec<Header>,
    #[serde(default)]
    pub request_body: Option<String>,
}

impl ObservedRequest {
    pub fn new(
        request_id: impl Into<String>,
        method: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            url: url.into(),
            method: method.into(),
            request_headers: Vec::new(),
            request_body: None,
        }
    }

    pub fn with_header(mut self, header: Header) -> Self {
        self.request_headers.push(header);
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.request_body = Some(body.into());
        self
    }
}
