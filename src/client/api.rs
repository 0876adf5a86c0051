use std::{fmt::Display, sync::Arc, time::Duration};

use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, warn};

use super::{
    error::ClientError,
    session::{Session, SessionManager},
};
use crate::{
    auth::dto::{AuthResponse, LoginRequest, ProfileRequest, ProfileResponse, RegisterRequest},
    models::{PublicUser, RecentDeal, Resource},
    routes::{dashboard::DashboardStats, Deleted},
};

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client for the CRM API.
#[derive(Clone)]
pub struct CrmClient {
    http: Client,
    base_url: Url,
    sessions: Arc<SessionManager>,
}

impl CrmClient {
    /// `base_url` is the server root, e.g. `http://localhost:3000`.
    pub fn new(
        base_url: impl Into<String>,
        sessions: Arc<SessionManager>,
    ) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;
        let raw = base_url.into();
        let base_url = Url::parse(&raw).map_err(|e| ClientError::BaseUrl(format!("{raw}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::BaseUrl(raw));
        }
        Ok(Self {
            http,
            base_url,
            sessions,
        })
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    #[inline]
    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    /// Record ids go in as a single escaped path segment, so `/`, `?`
    /// and `#` inside an id stay part of it.
    fn item_url(&self, path: &str, id: &impl Display) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["api", path])
                .push(&id.to_string());
        }
        url
    }

    /// Sends with the current credentials and applies the response policy.
    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ClientError> {
        let resp = self.sessions.context().authorize(req).send().await?;
        let resp = self.check(resp).await?;
        Ok(resp.json::<T>().await?)
    }

    /// Any 401 or 403 ends the session, whichever request triggered it.
    async fn check(&self, resp: Response) -> Result<Response, ClientError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let text = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|b| b.error)
            .unwrap_or(text);

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(%status, %message, "request unauthorized; dropping session");
            self.sessions.end()?;
            return Err(ClientError::Unauthorized { status, message });
        }
        Err(ClientError::Api { status, message })
    }

    fn start_session(&self, resp: AuthResponse) -> Result<Session, ClientError> {
        let session = Session {
            token: resp.token,
            user: resp.user,
        };
        self.sessions.begin(session.clone())?;
        Ok(session)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let resp: AuthResponse = self
            .send(self.http.post(self.url("/auth/login")).json(&body))
            .await?;
        self.start_session(resp)
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, ClientError> {
        let body = RegisterRequest {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        };
        let resp: AuthResponse = self
            .send(self.http.post(self.url("/auth/register")).json(&body))
            .await?;
        self.start_session(resp)
    }

    pub fn logout(&self) -> Result<(), ClientError> {
        self.sessions.end()
    }

    /// Updates the caller's profile and the user kept in the session.
    pub async fn update_profile(&self, req: &ProfileRequest) -> Result<PublicUser, ClientError> {
        let resp: ProfileResponse = self
            .send(self.http.put(self.url("/auth/profile")).json(req))
            .await?;
        if let Some(mut session) = self.sessions.current() {
            session.user = resp.user.clone();
            self.sessions.begin(session)?;
        }
        Ok(resp.user)
    }

    pub async fn list<R: Resource>(&self) -> Result<Vec<R>, ClientError> {
        debug!(resource = R::PATH, "list");
        self.send(self.http.get(self.url(&format!("/{}", R::PATH))))
            .await
    }

    pub async fn create<R: Resource>(&self, new: &R::New) -> Result<R, ClientError> {
        self.send(self.http.post(self.url(&format!("/{}", R::PATH))).json(new))
            .await
    }

    pub async fn update<R: Resource>(
        &self,
        id: &R::Id,
        patch: &R::Patch,
    ) -> Result<R, ClientError> {
        self.send(
            self.http
                .put(self.item_url(R::PATH, id))
                .json(patch),
        )
        .await
    }

    pub async fn delete<R: Resource>(&self, id: &R::Id) -> Result<(), ClientError> {
        let _: Deleted = self
            .send(self.http.delete(self.item_url(R::PATH, id)))
            .await?;
        Ok(())
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ClientError> {
        self.send(self.http.get(self.url("/dashboard/stats"))).await
    }

    pub async fn recent_deals(&self) -> Result<Vec<RecentDeal>, ClientError> {
        self.send(self.http.get(self.url("/dashboard/recent-deals")))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> CrmClient {
        CrmClient::new(base, Arc::new(SessionManager::in_memory())).unwrap()
    }

    #[test]
    fn ids_are_escaped_as_one_segment() {
        let c = client("http://localhost:3000");
        assert_eq!(
            c.item_url("invoices", &"Q1/2024").as_str(),
            "http://localhost:3000/api/invoices/Q1%2F2024"
        );
        assert_eq!(
            c.item_url("invoices", &"INV 7?x#9").as_str(),
            "http://localhost:3000/api/invoices/INV%207%3Fx%239"
        );
        assert_eq!(c.item_url("deals", &3).as_str(), "http://localhost:3000/api/deals/3");
    }

    #[test]
    fn base_path_is_kept() {
        let c = client("http://localhost:3000/crm/");
        assert_eq!(c.url("/deals"), "http://localhost:3000/crm/api/deals");
        assert_eq!(c.item_url("deals", &1).as_str(), "http://localhost:3000/crm/api/deals/1");
    }

    #[test]
    fn unusable_base_url_is_refused() {
        let sessions = Arc::new(SessionManager::in_memory());
        assert!(matches!(
            CrmClient::new("not a url", sessions.clone()),
            Err(ClientError::BaseUrl(_))
        ));
        assert!(matches!(
            CrmClient::new("mailto:ops@example.com", sessions),
            Err(ClientError::BaseUrl(_))
        ));
    }
}
