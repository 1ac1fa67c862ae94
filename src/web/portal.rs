//! Driver self-service portal.
//!
//! Drivers sign in with their name (or id) and portal password, edit the
//! free-text parts of their own profile and upload a new photo. Uploaded
//! photos land in `pending_image_url` and only go public after admin
//! approval. Identity, lineup and rating fields stay admin-only.

use axum::extract::{Multipart, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use tracing::{info, warn};

use super::auth::{logout_cookie, session_cookie, Principal};
use super::pages::{admin_page, esc, esc_opt, redirect_notice};
use super::server::{AppState, NoticeQuery};
use super::uploads;
use crate::store::ids_equal;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(profile))
        .route("/login", get(login_form).post(login))
        .route("/logout", get(logout))
        .route("/save", post(save))
}

/// Resolve the logged-in driver id or bounce to the portal login
async fn require_driver(state: &AppState, headers: &HeaderMap) -> Result<String, Redirect> {
    match state.sessions.principal(headers).await {
        Some(Principal::Driver(id)) => Ok(id),
        _ => Err(Redirect::to("/portal/login")),
    }
}

fn portal_nav() -> &'static str {
    concat!(
        r#"<a href="/portal">My profile</a>"#,
        r#"<a href="/">Site</a>"#,
        r#"<a href="/portal/logout">Logout</a>"#,
    )
}

#[derive(Deserialize)]
struct LoginForm {
    login: String,
    password: String,
}

async fn login_form(Query(q): Query<NoticeQuery>) -> Html<String> {
    let body = r#"<h1>Driver portal</h1>
<form class="panel" method="post" action="/portal/login">
<label>Name or driver id</label>
<input type="text" name="login" autofocus>
<label>Password</label>
<input type="password" name="password">
<button type="submit">Sign in</button>
</form>"#;
    Html(admin_page("Driver portal", "", q.notice.as_deref(), body))
}

/// Match by id or by exact name, then check the portal password. Drivers
/// without a password set cannot sign in at all.
async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    let login = form.login.trim();

    let driver_id = {
        let drivers = state.drivers.read().await;
        drivers
            .all()
            .iter()
            .find(|d| ids_equal(&d.id, login) || d.name == login)
            .filter(|d| matches!(&d.password, Some(p) if !p.is_empty() && *p == form.password))
            .map(|d| d.id.clone())
    };

    let Some(driver_id) = driver_id else {
        warn!("Failed portal login for '{}'", login);
        return redirect_notice("/portal/login", "Unknown driver or wrong password")
            .into_response();
    };

    let token = state.sessions.login(Principal::Driver(driver_id.clone())).await;
    info!("Driver {} signed in to the portal", driver_id);
    (
        [(header::SET_COOKIE, session_cookie(&token))],
        Redirect::to("/portal"),
    )
        .into_response()
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    state.sessions.logout(&headers).await;
    (
        [(header::SET_COOKIE, logout_cookie())],
        Redirect::to("/"),
    )
        .into_response()
}

async fn profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<NoticeQuery>,
) -> Result<Html<String>, Redirect> {
    let driver_id = require_driver(&state, &headers).await?;

    let Some(driver) = state.drivers.read().await.find(&driver_id).cloned() else {
        // Deleted while the session was alive
        return Err(redirect_notice("/portal/login", "Account no longer exists"));
    };

    let current_image = driver
        .image_url
        .as_deref()
        .map(|url| format!(r#"<p>Public photo: <a href="{0}">{0}</a></p>"#, esc(url)))
        .unwrap_or_default();
    let pending = driver
        .pending_image_url
        .as_deref()
        .map(|url| {
            format!(
                r#"<p class="pending">New photo awaiting approval: <a href="{0}">{0}</a></p>"#,
                esc(url)
            )
        })
        .unwrap_or_default();

    let body = format!(
        r#"<h1>{name}</h1>
<p><a href="/driver/{id}">Public profile page</a></p>
<form class="panel" method="post" action="/portal/save" enctype="multipart/form-data">
<label>Nickname</label><input type="text" name="nickname" value="{nickname}">
<label>Twitch</label><input type="text" name="twitch" value="{twitch}">
<label>Rig</label><textarea name="rig">{rig}</textarea>
<label>New photo</label><input type="file" name="portal_image">
{current_image}
{pending}
<button type="submit">Save</button>
</form>"#,
        name = esc(&driver.name),
        id = esc(&driver.id),
        nickname = esc_opt(driver.nickname.as_deref()),
        twitch = esc_opt(driver.twitch.as_deref()),
        rig = esc_opt(driver.rig.as_deref()),
        current_image = current_image,
        pending = pending,
    );

    Ok(Html(admin_page("My profile", portal_nav(), q.notice.as_deref(), &body)))
}

async fn save(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Redirect, Redirect> {
    let driver_id = require_driver(&state, &headers).await?;

    let mut nickname = None;
    let mut twitch = None;
    let mut rig = None;
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| redirect_notice("/portal", &format!("Could not read form: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "portal_image" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    redirect_notice("/portal", &format!("Could not read upload: {}", e))
                })?;
                if !filename.is_empty() && !bytes.is_empty() {
                    upload = Some((filename, bytes.to_vec()));
                }
            }
            "nickname" | "twitch" | "rig" => {
                let value = field.text().await.unwrap_or_default().trim().to_string();
                let value = (!value.is_empty()).then_some(value);
                match name.as_str() {
                    "nickname" => nickname = value,
                    "twitch" => twitch = value,
                    _ => rig = value,
                }
            }
            _ => {}
        }
    }

    let pending_url = match upload {
        Some((filename, bytes)) => Some(
            uploads::store_upload(
                &state.settings.upload_dir,
                "driver",
                &driver_id,
                &filename,
                &bytes,
            )
            .await
            .map_err(|e| redirect_notice("/portal", &e.to_string()))?,
        ),
        None => None,
    };

    let replaced_pending = {
        let mut drivers = state.drivers.write().await;
        let Some(driver) = drivers.find_mut(&driver_id) else {
            return Err(redirect_notice("/portal/login", "Account no longer exists"));
        };

        driver.nickname = nickname;
        driver.twitch = twitch;
        driver.rig = rig;
        let replaced = match pending_url {
            Some(url) => driver.pending_image_url.replace(url),
            None => None,
        };

        drivers
            .save()
            .await
            .map_err(|e| redirect_notice("/portal", &e.to_string()))?;
        replaced
    };

    // A re-upload before moderation supersedes the previous pending file
    if let Some(old) = replaced_pending {
        uploads::remove_upload(&state.settings.upload_dir, &old).await;
    }

    Ok(redirect_notice("/portal", "Profile saved"))
}
