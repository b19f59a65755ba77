//! HTTP edge of the housekeeping bridge.

// std
use std::{env, net::SocketAddr, sync::Arc};
// crates.io
use axum::{
	Form, Json, Router,
	extract::{Path, Query, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use color_eyre::eyre::{Result, WrapErr};
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
// self
use housekeeping_bridge::{
	adapter::{Adapter, AdapterReply, ReplyBody},
	bootstrap::{self, LoginOutcome},
	config::{BridgeConfig, StoreConfig},
	directory,
	event::CallEvent,
	hospitality::HospitalityClient,
	http::ReqwestHttpClient,
	oauth::OAuthAuthority,
};

const BIND_ADDRESS: &str = "BIND_ADDRESS";
const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

#[derive(Deserialize)]
struct CallbackParams {
	#[serde(default)]
	state: String,
	#[serde(default)]
	code: String,
}

#[derive(Deserialize)]
struct UpdateRoomForm {
	condition: String,
	#[serde(default)]
	housekeeper: String,
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	if let Err(e) = dotenvy::dotenv() {
		if !e.not_found() {
			return Err(e).wrap_err("failed to load .env");
		}
	}

	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
		)
		.init();

	let store = StoreConfig::from_env()?.open().await?;
	let config = BridgeConfig::load(&*store).await?;
	let http = ReqwestHttpClient::new()?;
	let directory = directory::source_from_config(&config.directory, http.0.clone());
	let authority = Arc::new(OAuthAuthority::with_http_client(config.client, store, http));

	match bootstrap::bootstrap(&authority).await {
		Ok(LoginOutcome::Ready) => tracing::info!("access token ready"),
		Ok(LoginOutcome::AwaitingAuthorization(_)) =>
			tracing::info!("waiting for an operator to complete the authorization"),
		Err(e) => tracing::error!(kind = %e.kind(), error = %e, "startup login failed"),
	}

	let adapter = Adapter::new(Arc::new(HospitalityClient::new(authority, directory)));
	let addr: SocketAddr = env::var(BIND_ADDRESS)
		.unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.into())
		.parse()
		.wrap_err("BIND_ADDRESS is not a socket address")?;
	let listener = TcpListener::bind(addr).await?;

	tracing::info!(%addr, "bridge listening");

	axum::serve(listener, router(adapter.clone())).with_graceful_shutdown(shutdown_signal()).await?;
	adapter.close().await?;

	tracing::info!("bridge shut down");

	Ok(())
}

fn router(adapter: Adapter) -> Router {
	Router::new()
		.route("/login", get(login))
		.route("/oauth/callback", get(oauth_callback))
		.route("/pbx/events", post(pbx_event))
		.route("/rooms", get(list_rooms))
		.route("/rooms/:extension", get(get_room).post(update_room))
		.with_state(adapter)
}

async fn login(State(adapter): State<Adapter>) -> Response {
	into_response(adapter.handle_manual_login().await)
}

async fn oauth_callback(
	State(adapter): State<Adapter>,
	Query(params): Query<CallbackParams>,
) -> Response {
	into_response(adapter.handle_oauth_callback(&params.state, &params.code).await)
}

async fn pbx_event(State(adapter): State<Adapter>, Json(event): Json<CallEvent>) -> Response {
	into_response(adapter.handle_call_event(&event).await)
}

async fn list_rooms(State(adapter): State<Adapter>) -> Response {
	into_response(adapter.get_rooms().await)
}

async fn get_room(State(adapter): State<Adapter>, Path(extension): Path<String>) -> Response {
	into_response(adapter.get_room(&extension).await)
}

async fn update_room(
	State(adapter): State<Adapter>,
	Path(extension): Path<String>,
	Form(form): Form<UpdateRoomForm>,
) -> Response {
	into_response(adapter.update_room(&extension, &form.condition, &form.housekeeper).await)
}

fn into_response(reply: AdapterReply) -> Response {
	let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

	match reply.body {
		ReplyBody::Empty => status.into_response(),
		ReplyBody::Text(text) => (status, text).into_response(),
		ReplyBody::Json(value) => (status, Json(value)).into_response(),
	}
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::error!(error = %e, "failed to listen for the shutdown signal");
	}
}
