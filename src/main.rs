// src/main.rs

mod app_state;
mod auth;
mod config;
mod controller;
mod db;
mod error;
mod session;
mod store;
mod task;
mod tasks;

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use actix_cors::Cors;
use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http,
    middleware::Logger,
    web, App, Error, HttpMessage, HttpServer,
};
use env_logger::Env;
use futures_util::future::{ok, Ready};
use log::info;

use crate::app_state::AppState;
use crate::auth::MongoAuthGateway;
use crate::controller::TaskListController;
use crate::session::{FileCredentialStore, SessionGate};
use crate::store::MongoTaskStore;

/// Bearer-token middleware. A valid token deposits the signed-in email as
/// a request extension; handlers that require auth check for it. An
/// invalid token is rejected outright, a missing one is passed through so
/// the `/auth` routes stay reachable.
#[derive(Debug)]
pub struct Authentication;

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = AuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddleware { service })
    }
}

pub struct AuthMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if let Some(auth_header) = req.headers().get(http::header::AUTHORIZATION) {
            if let Ok(auth_str) = auth_header.to_str() {
                if let Some(token) = auth_str.strip_prefix("Bearer ") {
                    let secret = req
                        .app_data::<web::Data<AppState>>()
                        .map(|data| data.config.jwt_secret.clone())
                        .unwrap_or_default();
                    match auth::validate_jwt(token.trim(), &secret) {
                        Ok(claims) => {
                            req.extensions_mut().insert(claims.sub);
                        }
                        Err(e) => {
                            let (req_parts, _payload) = req.into_parts();
                            let resp = actix_web::HttpResponse::Unauthorized()
                                .body(format!("Invalid token: {}", e))
                                .map_into_boxed_body();
                            let srv_resp = ServiceResponse::new(req_parts, resp);
                            return Box::pin(async move { Ok(srv_resp) });
                        }
                    }
                }
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_boxed_body())
        })
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = config::Config::from_env();
    let mongodb = db::MongoDB::init(&config.mongo_uri, &config.database_name).await;

    let controller = TaskListController::new(MongoTaskStore::new(&mongodb.db));
    let session = SessionGate::new(
        MongoAuthGateway::new(&mongodb.db),
        FileCredentialStore::new(config.credentials_path.clone()),
    );
    let state = web::Data::new(AppState {
        controller: tokio::sync::Mutex::new(controller),
        session,
        config: config.clone(),
    });

    info!("Server running at http://{}", config.bind_addr);
    info!("Allowed CORS origin: {}", config.frontend_origin);

    let frontend_origin = config.frontend_origin.clone();
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&frontend_origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                http::header::CONTENT_TYPE,
                http::header::ACCEPT,
                http::header::AUTHORIZATION,
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .wrap(Authentication)
            .app_data(state.clone())
            .service(
                web::scope("/auth")
                    .route("/signup", web::post().to(auth::signup))
                    .route("/login", web::post().to(auth::login))
                    .route("/session", web::get().to(auth::session))
                    .route("/logout", web::post().to(auth::logout)),
            )
            .service(
                web::scope("/tasks")
                    .route("", web::get().to(tasks::list_tasks))
                    .route("", web::post().to(tasks::create_task))
                    .route("/{task_id}", web::put().to(tasks::update_task))
                    .route("/{task_id}", web::delete().to(tasks::delete_task))
                    .route("/{task_id}/complete", web::put().to(tasks::complete_task)),
            )
    })
    .bind(&config.bind_addr)?
    .run()
    .await
}
