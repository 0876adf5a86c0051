use reqwest::RequestBuilder;

/// Snapshot of the credentials a single request is sent with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub token: Option<String>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// Adds `Authorization: Bearer <token>` when a token is present.
    pub fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}
