//! REST action adapter. Every call terminates in dispatched events, never a
//! return value: a mutating action has exactly two terminal events (success
//! updates state, failure replaces the error list), and an unreachable API
//! server becomes the `api_server_not_found` flag.

use std::{fmt::Display, sync::Arc};

use reqwest::{header::AUTHORIZATION, Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use shared::{
    domain::{Retro, RetroId},
    error::ErrorsBody,
    protocol::RetroEvent,
};
use tracing::warn;

use crate::{EventEmitter, TokenStore};

#[derive(Debug, Clone, Serialize)]
pub struct NewRetro {
    pub name: String,
    pub slug: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
    /// Correlation token of this client's push subscription, echoed back by
    /// the server as `originator_id` on the resulting force_relogin push.
    pub request_uuid: String,
}

#[derive(Debug, Deserialize)]
struct RetroBody {
    retro: Retro,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    token: String,
}

#[derive(Debug, Serialize)]
struct ArchiveBody {
    send_archive_email: bool,
}

pub struct ApiClient {
    http: Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
    emitter: EventEmitter,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        tokens: Arc<dyn TokenStore>,
        emitter: EventEmitter,
    ) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            tokens,
            emitter,
        }
    }

    pub async fn create_retro(&self, new_retro: &NewRetro) {
        let response = self
            .http
            .post(format!("{}/retros", self.base_url))
            .json(new_retro)
            .send()
            .await;
        let response = match response {
            Ok(response) => response,
            Err(err) => return self.api_unreachable("create retro", err),
        };

        if response.status().is_success() {
            match response.json::<RetroBody>().await {
                Ok(body) => self
                    .emitter
                    .emit(RetroEvent::RetroSuccessfullyCreated { retro: body.retro }),
                Err(err) => self.api_unreachable("create retro", err),
            }
        } else {
            let errors = response.json::<ErrorsBody>().await.unwrap_or_default().errors;
            self.emitter
                .emit(RetroEvent::RetroUnsuccessfullyCreated { errors });
        }
    }

    pub async fn fetch_retro(&self, retro_id: RetroId) {
        let request = self
            .authorized(retro_id, self.http.get(self.retro_url(retro_id)))
            .await;
        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => return self.api_unreachable("fetch retro", err),
        };

        match response.status() {
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => {
                self.emitter.emit(RetroEvent::RequireRetroLogin { retro_id });
            }
            StatusCode::NOT_FOUND => self.emitter.emit(RetroEvent::RetroNotFound),
            status if status.is_success() => match response.json::<RetroBody>().await {
                Ok(body) => self
                    .emitter
                    .emit(RetroEvent::RetroSuccessfullyFetched { retro: body.retro }),
                Err(err) => self.api_unreachable("fetch retro", err),
            },
            status => {
                warn!(
                    retro_id = retro_id.0,
                    status = status.as_u16(),
                    "api: unexpected fetch retro response"
                );
            }
        }
    }

    pub async fn archive_retro(&self, retro_id: RetroId, send_archive_email: bool) {
        let request = self
            .authorized(
                retro_id,
                self.http
                    .put(format!("{}/archive", self.retro_url(retro_id)))
                    .json(&ArchiveBody { send_archive_email }),
            )
            .await;
        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => return self.api_unreachable("archive retro", err),
        };

        match response.status() {
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => {
                self.emitter.emit(RetroEvent::RequireRetroLogin { retro_id });
            }
            status if status.is_success() => match response.json::<RetroBody>().await {
                Ok(body) => self
                    .emitter
                    .emit(RetroEvent::ArchiveRetroSuccessfullyDone { retro: body.retro }),
                Err(err) => self.api_unreachable("archive retro", err),
            },
            status => {
                warn!(
                    retro_id = retro_id.0,
                    status = status.as_u16(),
                    "api: unexpected archive retro response"
                );
            }
        }
    }

    pub async fn update_retro_password(&self, retro_id: RetroId, change: &PasswordChange) {
        let request = self
            .authorized(
                retro_id,
                self.http
                    .patch(format!("{}/password", self.retro_url(retro_id)))
                    .json(change),
            )
            .await;
        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => return self.api_unreachable("update retro password", err),
        };

        if response.status().is_success() {
            match response.json::<TokenBody>().await {
                Ok(body) => self.emitter.emit(RetroEvent::RetroPasswordSuccessfullyUpdated {
                    retro_id,
                    token: body.token,
                }),
                Err(err) => self.api_unreachable("update retro password", err),
            }
        } else {
            let errors = response.json::<ErrorsBody>().await.unwrap_or_default().errors;
            self.emitter
                .emit(RetroEvent::RetroPasswordUnsuccessfullyUpdated { errors });
        }
    }

    fn retro_url(&self, retro_id: RetroId) -> String {
        format!("{}/retros/{}", self.base_url, retro_id.0)
    }

    async fn authorized(&self, retro_id: RetroId, request: RequestBuilder) -> RequestBuilder {
        match self.tokens.token(retro_id).await {
            Ok(Some(token)) => request.header(AUTHORIZATION, format!("Bearer {token}")),
            Ok(None) => request,
            Err(err) => {
                warn!(retro_id = retro_id.0, "api: token lookup failed: {err:#}");
                request
            }
        }
    }

    fn api_unreachable(&self, action: &str, err: impl Display) {
        warn!("api: {action} request failed: {err}");
        self.emitter.emit(RetroEvent::ApiServerNotFound);
    }
}
