//! Request guards.
//!
//! [`AccessTokenGuard`] authenticates ordinary API calls from `x-access-token`.
//! [`SessionGuard`] authenticates the refresh flow from `x-refresh-token` and `_id`.
//! Both reject with 401 and never retry; retrying is the client's job.
//!
//! Rejections are returned as ordinary responses rather than `Err`, so outer middleware
//! such as CORS still decorates them.

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, ResourceDef, Service, ServiceRequest, ServiceResponse, Transform},
    http::{header::HeaderMap, Method},
    web, Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;
use uuid::Uuid;

use super::extractors::{AuthenticatedUserId, VerifiedSession};
use super::session::SessionManager;
use super::token::TokenService;
use super::{ACCESS_TOKEN_HEADER, REFRESH_TOKEN_HEADER, USER_ID_HEADER};
use crate::error::AppError;

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Verifies `x-access-token` and stores the caller's id in request extensions.
#[derive(Clone, Default)]
pub struct AccessTokenGuard {
    anonymous: Vec<(Method, ResourceDef)>,
}

impl AccessTokenGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lets `method` requests whose full path matches `pattern` through without a token.
    pub fn allow_anonymous(mut self, method: Method, pattern: &str) -> Self {
        self.anonymous.push((method, ResourceDef::new(pattern)));
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for AccessTokenGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AccessTokenGuardService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AccessTokenGuardService {
            service,
            anonymous: Rc::new(self.anonymous.clone()),
        }))
    }
}

pub struct AccessTokenGuardService<S> {
    service: S,
    anonymous: Rc<Vec<(Method, ResourceDef)>>,
}

impl<S> AccessTokenGuardService<S> {
    fn is_anonymous(&self, req: &ServiceRequest) -> bool {
        self.anonymous
            .iter()
            .any(|(method, pattern)| req.method() == method && pattern.is_match(req.path()))
    }
}

fn authenticate(req: &ServiceRequest) -> Result<AuthenticatedUserId, AppError> {
    let tokens = req
        .app_data::<web::Data<TokenService>>()
        .ok_or_else(|| AppError::Internal("TokenService is not registered".into()))?;

    let token = header_str(req.headers(), ACCESS_TOKEN_HEADER)
        .ok_or_else(|| AppError::Unauthorized("Missing access token".into()))?;

    let claims = tokens.verify_access_token(token)?;
    Ok(AuthenticatedUserId(claims.sub))
}

impl<S, B> Service<ServiceRequest> for AccessTokenGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if !self.is_anonymous(&req) {
            match authenticate(&req) {
                Ok(user_id) => {
                    req.extensions_mut().insert(user_id);
                }
                Err(app_err) => {
                    log::debug!("Rejected {} {}: {}", req.method(), req.path(), app_err);
                    let response = req.error_response(app_err).map_into_right_body();
                    return Box::pin(async move { Ok(response) });
                }
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
    }
}

/// Verifies the refresh session named by `_id` + `x-refresh-token`.
pub struct SessionGuard;

impl<S, B> Transform<S, ServiceRequest> for SessionGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = SessionGuardService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionGuardService {
            service: Rc::new(service),
        }))
    }
}

pub struct SessionGuardService<S> {
    service: Rc<S>,
}

fn session_credentials(headers: &HeaderMap) -> Result<(Uuid, String), AppError> {
    let missing = || {
        AppError::SessionNotFound(
            "User not found. Make sure refresh token and user id are correct".into(),
        )
    };

    let refresh_token = header_str(headers, REFRESH_TOKEN_HEADER).ok_or_else(missing)?;
    let user_id = header_str(headers, USER_ID_HEADER)
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or_else(missing)?;
    Ok((user_id, refresh_token.to_string()))
}

async fn verify_refresh_session(req: &ServiceRequest) -> Result<VerifiedSession, AppError> {
    let sessions = req
        .app_data::<web::Data<SessionManager>>()
        .cloned()
        .ok_or_else(|| AppError::Internal("SessionManager is not registered".into()))?;

    let (user_id, refresh_token) = session_credentials(req.headers())?;
    let user = sessions.verify_session(user_id, &refresh_token).await?;
    Ok(VerifiedSession {
        user,
        refresh_token,
    })
}

impl<S, B> Service<ServiceRequest> for SessionGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            let verified = verify_refresh_session(&req).await;
            match verified {
                Ok(session) => {
                    req.extensions_mut().insert(session);
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                Err(app_err) => {
                    log::debug!("Refresh session rejected: {}", app_err);
                    Ok(req.error_response(app_err).map_into_right_body())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{
        http::{header, StatusCode},
        test, App, HttpResponse,
    };

    async fn whoami(user_id: AuthenticatedUserId) -> HttpResponse {
        HttpResponse::Ok().body(user_id.0.to_string())
    }

    async fn open() -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    #[actix_rt::test]
    async fn test_access_token_guard() {
        let tokens = TokenService::new("guard_secret", 900, 3600);
        let user_id = Uuid::new_v4();
        let (token, _) = tokens.sign_access_token(user_id).unwrap();

        let app = test::init_service(
            App::new().app_data(web::Data::new(tokens)).service(
                web::scope("/lists")
                    .wrap(AccessTokenGuard::new().allow_anonymous(Method::GET, "/lists/{id}/tasks"))
                    .route("", web::get().to(whoami))
                    .route("/{id}/tasks", web::get().to(open))
                    .route("/{id}/tasks", web::post().to(whoami)),
            ),
        )
        .await;

        // Valid token
        let req = test::TestRequest::get()
            .uri("/lists")
            .insert_header((ACCESS_TOKEN_HEADER, token.clone()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(test::read_body(resp).await, user_id.to_string());

        // Missing token
        let req = test::TestRequest::get().uri("/lists").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "unauthorized");

        // Garbage token
        let req = test::TestRequest::get()
            .uri("/lists")
            .insert_header((ACCESS_TOKEN_HEADER, "garbage"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "invalid_token");

        // Anonymous exemption is method-specific
        let req = test::TestRequest::get().uri("/lists/abc/tasks").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
        let req = test::TestRequest::post().uri("/lists/abc/tasks").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_rt::test]
    async fn test_rejection_passes_through_outer_middleware() {
        let app = test::init_service(
            App::new()
                .wrap(crate::routes::cors())
                .app_data(web::Data::new(TokenService::new("guard_secret", 900, 3600)))
                .service(
                    web::scope("/lists")
                        .wrap(AccessTokenGuard::new())
                        .route("", web::get().to(whoami)),
                ),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/lists")
            .insert_header((header::ORIGIN, "http://app.example"))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://app.example"
        );
    }

    #[actix_rt::test]
    async fn test_session_credentials_require_both_headers() {
        let user_id = Uuid::new_v4();

        let req = test::TestRequest::default()
            .insert_header((REFRESH_TOKEN_HEADER, "refresh"))
            .insert_header((USER_ID_HEADER, user_id.to_string()))
            .to_srv_request();
        assert_eq!(
            session_credentials(req.headers()).unwrap(),
            (user_id, "refresh".to_string())
        );

        let req = test::TestRequest::default()
            .insert_header((USER_ID_HEADER, user_id.to_string()))
            .to_srv_request();
        assert!(matches!(
            session_credentials(req.headers()),
            Err(AppError::SessionNotFound(_))
        ));

        let req = test::TestRequest::default()
            .insert_header((REFRESH_TOKEN_HEADER, "refresh"))
            .insert_header((USER_ID_HEADER, "not-a-uuid"))
            .to_srv_request();
        assert!(session_credentials(req.headers()).is_err());
    }
}
