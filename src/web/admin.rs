//! Admin back office.
//!
//! Password login, CRUD forms for events/drivers/news, hero and navigation
//! editing, pending-image moderation, the rating sync trigger and a live
//! log view. Every handler resolves the session principal first; anything
//! that is not an admin gets bounced to the login form.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use futures::stream::Stream;
use serde::Deserialize;
use std::collections::HashMap;
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{info, warn};

use super::auth::{session_cookie, Principal};
use super::pages::{admin_nav, admin_page, esc, esc_opt, redirect_notice};
use super::server::{AppState, NoticeQuery};
use super::uploads;
use crate::calendar;
use crate::store::{
    fresh_id, normalize_category, Driver, Event, NavLink, NewsItem, SiteConfig,
};
use crate::sync;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard))
        .route("/login", get(login_form).post(login))
        .route("/logout", get(logout))
        .route("/events", get(events_list))
        .route("/events/new", get(event_new))
        .route("/events/:id/edit", get(event_edit))
        .route("/events/save", post(event_save))
        .route("/events/:id/delete", post(event_delete))
        .route("/team", get(team_list))
        .route("/team/new", get(driver_new))
        .route("/team/:id/edit", get(driver_edit))
        .route("/team/save", post(driver_save))
        .route("/team/:id/delete", post(driver_delete))
        .route("/team/:id/approve-image", post(approve_image))
        .route("/team/:id/reject-image", post(reject_image))
        .route("/news", get(news_list))
        .route("/news/new", get(news_new))
        .route("/news/:id/edit", get(news_edit))
        .route("/news/save", post(news_save))
        .route("/news/:id/delete", post(news_delete))
        .route("/hero", get(hero_form).post(hero_save))
        .route("/nav", get(nav_form).post(nav_save))
        .route("/sync", get(sync_ratings))
        .route("/logs", get(logs_page))
        .route("/logs/stream", get(logs_stream))
}

/// Bounce non-admin sessions to the login form
async fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), Redirect> {
    match state.sessions.principal(headers).await {
        Some(Principal::Admin) => Ok(()),
        _ => Err(Redirect::to("/admin/login")),
    }
}

// ---------------------------------------------------------------------------
// Multipart form decoding

/// Decoded multipart form: repeated text fields plus uploaded files
#[derive(Default)]
struct FormData {
    fields: HashMap<String, Vec<String>>,
    files: HashMap<String, (String, Vec<u8>)>,
}

impl FormData {
    async fn read(multipart: &mut Multipart) -> std::result::Result<Self, String> {
        let mut form = FormData::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| format!("could not read form: {}", e))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name.is_empty() {
                continue;
            }
            match field.file_name().map(|f| f.to_string()) {
                Some(filename) => {
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| format!("could not read upload: {}", e))?;
                    if !filename.is_empty() && !bytes.is_empty() {
                        form.files.insert(name, (filename, bytes.to_vec()));
                    }
                }
                None => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| format!("could not read field: {}", e))?;
                    form.fields.entry(name).or_default().push(value);
                }
            }
        }
        Ok(form)
    }

    /// First value of a field, trimmed; empty string when absent
    fn value(&self, name: &str) -> String {
        self.fields
            .get(name)
            .and_then(|v| v.first())
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    }

    /// First value as an option, dropping empty input
    fn opt(&self, name: &str) -> Option<String> {
        let v = self.value(name);
        (!v.is_empty()).then_some(v)
    }

    /// All values of a repeated field (checkbox groups)
    fn values(&self, name: &str) -> Vec<String> {
        self.fields
            .get(name)
            .map(|v| v.iter().map(|s| s.trim().to_string()).collect())
            .unwrap_or_default()
    }

    fn file(&self, name: &str) -> Option<(&str, &[u8])> {
        self.files
            .get(name)
            .map(|(filename, bytes)| (filename.as_str(), bytes.as_slice()))
    }
}

/// Store an uploaded image if the form carries one, returning its URL
async fn take_upload(
    state: &AppState,
    form: &FormData,
    field: &str,
    prefix: &str,
    owner_id: &str,
) -> std::result::Result<Option<String>, String> {
    let Some((filename, bytes)) = form.file(field) else {
        return Ok(None);
    };
    uploads::store_upload(&state.settings.upload_dir, prefix, owner_id, filename, bytes)
        .await
        .map(Some)
        .map_err(|e| e.to_string())
}

// ---------------------------------------------------------------------------
// Login

#[derive(Deserialize)]
struct LoginForm {
    password: String,
}

async fn login_form(Query(q): Query<NoticeQuery>) -> Html<String> {
    let body = r#"<h1>Admin login</h1>
<form class="panel" method="post" action="/admin/login">
<label>Password</label>
<input type="password" name="password" autofocus>
<button type="submit">Sign in</button>
</form>"#;
    Html(admin_page("Admin login", "", q.notice.as_deref(), body))
}

async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> Response {
    if form.password != state.settings.admin_password {
        warn!("Failed admin login attempt");
        return redirect_notice("/admin/login", "Wrong password").into_response();
    }

    let token = state.sessions.login(Principal::Admin).await;
    info!("Admin logged in");
    (
        [(header::SET_COOKIE, session_cookie(&token))],
        Redirect::to("/admin"),
    )
        .into_response()
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    state.sessions.logout(&headers).await;
    (
        [(header::SET_COOKIE, super::auth::logout_cookie())],
        Redirect::to("/"),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Dashboard

async fn dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<NoticeQuery>,
) -> Result<Html<String>, Redirect> {
    require_admin(&state, &headers).await?;

    let (event_count, upcoming_count) = {
        let events = state.events.read().await;
        let (upcoming, _) = calendar::partition(events.all(), calendar::local_now());
        (events.all().len(), upcoming.len())
    };
    let driver_count = state.drivers.read().await.len();
    let pending_images = {
        let drivers = state.drivers.read().await;
        drivers
            .all()
            .iter()
            .filter(|d| d.pending_image_url.is_some())
            .count()
    };
    let news_count = state.news.read().await.all().len();

    let body = format!(
        r#"<h1>Dashboard</h1>
<div class="tiles">
<a class="tile" href="/admin/events"><h2>{event_count}</h2>Events ({upcoming_count} upcoming)</a>
<a class="tile" href="/admin/team"><h2>{driver_count}</h2>Drivers{pending}</a>
<a class="tile" href="/admin/news"><h2>{news_count}</h2>News items</a>
<a class="tile" href="/admin/sync"><h2>&#8635;</h2>Sync ratings</a>
<a class="tile" href="/admin/hero"><h2>&#9733;</h2>Hero &amp; socials</a>
<a class="tile" href="/admin/logs"><h2>&#9776;</h2>Live logs</a>
</div>"#,
        pending = if pending_images > 0 {
            format!(r#" <span class="pending">({pending_images} pending)</span>"#)
        } else {
            String::new()
        },
    );

    Ok(Html(admin_page("Admin", admin_nav(), q.notice.as_deref(), &body)))
}

// ---------------------------------------------------------------------------
// Events

fn event_rows(events: &[&Event], archived: bool) -> String {
    events
        .iter()
        .map(|e| {
            let result = if archived {
                format!("<td>{}</td>", esc_opt(e.result.as_deref()))
            } else {
                String::new()
            };
            format!(
                r#"<tr><td>{date}</td><td>{title}</td><td>{track}</td><td>{n}</td>{result}
<td><a href="/admin/events/{id}/edit">Edit</a></td>
<td><form method="post" action="/admin/events/{id}/delete"><button class="danger">Delete</button></form></td></tr>"#,
                date = esc(&e.date),
                title = esc(&e.title),
                track = esc(&e.track),
                n = e.drivers.len(),
                result = result,
                id = esc(&e.id),
            )
        })
        .collect()
}

async fn events_list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<NoticeQuery>,
) -> Result<Html<String>, Redirect> {
    require_admin(&state, &headers).await?;

    let events = state.events.read().await;
    let (upcoming, past) = calendar::partition(events.all(), calendar::local_now());

    let body = format!(
        r#"<h1>Events</h1>
<p><a href="/admin/events/new">+ New event</a></p>
<h2>Upcoming</h2>
<table><tr><th>Date</th><th>Title</th><th>Track</th><th>Lineup</th><th></th><th></th></tr>{up}</table>
<h2>Archive</h2>
<table><tr><th>Date</th><th>Title</th><th>Track</th><th>Lineup</th><th>Result</th><th></th><th></th></tr>{past}</table>"#,
        up = event_rows(&upcoming, false),
        past = event_rows(&past, true),
    );

    Ok(Html(admin_page("Events", admin_nav(), q.notice.as_deref(), &body)))
}

/// Event create/edit form. Driver checkboxes preselect the current lineup,
/// car class and model get datalists from the catalog.
async fn event_form_page(state: &AppState, event: Event, notice: Option<&str>) -> Html<String> {
    let driver_checks: String = {
        let drivers = state.drivers.read().await;
        drivers
            .sorted_by_name()
            .iter()
            .map(|d| {
                let checked = if event.has_driver(&d.id) { " checked" } else { "" };
                format!(
                    r#"<label><input type="checkbox" name="driver_ids" value="{}"{}> {}</label>"#,
                    esc(&d.id),
                    checked,
                    esc(&d.name)
                )
            })
            .collect()
    };

    let class_options: String = state
        .cars
        .classes()
        .map(|(class, _)| format!(r#"<option value="{}">"#, esc(class)))
        .collect();
    let model_options: String = state
        .cars
        .classes()
        .flat_map(|(_, models)| models.iter())
        .map(|m| format!(r#"<option value="{}">"#, esc(m)))
        .collect();

    let current_image = event
        .image_url
        .as_deref()
        .map(|url| format!(r#"<p>Current image: <a href="{0}">{0}</a></p>"#, esc(url)))
        .unwrap_or_default();

    let title = if event.id.is_empty() { "New event" } else { "Edit event" };
    let body = format!(
        r#"<h1>{heading}</h1>
<form class="panel" method="post" action="/admin/events/save" enctype="multipart/form-data">
<input type="hidden" name="id" value="{id}">
<label>Title</label><input type="text" name="title" value="{title}">
<label>Series</label><input type="text" name="series" value="{series}">
<label>League</label><input type="text" name="league" value="{league}">
<label>Track</label><input type="text" name="track" value="{track}">
<label>Date</label><input type="datetime-local" name="date" value="{date}">
<label>Duration (hours)</label><input type="number" step="0.5" name="duration" value="{duration}">
<label>Car class</label><input type="text" name="car_class" value="{car_class}" list="car-classes">
<datalist id="car-classes">{class_options}</datalist>
<label>Car model</label><input type="text" name="car_model" value="{car_model}" list="car-models">
<datalist id="car-models">{model_options}</datalist>
<label>Description</label><textarea name="description">{description}</textarea>
<label>Twitch stream</label><input type="text" name="twitch" value="{twitch}">
<label>Result (after the race)</label><textarea name="result">{result}</textarea>
<label>Lineup</label>
{driver_checks}
<label>Event image</label><input type="file" name="event_image">
{current_image}
<button type="submit">Save</button>
</form>"#,
        heading = title,
        id = esc(&event.id),
        title = esc(&event.title),
        series = esc(&event.series),
        league = esc(&event.league),
        track = esc(&event.track),
        date = esc(&event.date),
        duration = esc_opt(event.duration.as_deref()),
        car_class = esc(&event.car_class),
        car_model = esc(&event.car_model),
        description = esc(&event.description),
        twitch = esc_opt(event.twitch.as_deref()),
        result = esc_opt(event.result.as_deref()),
        driver_checks = driver_checks,
        current_image = current_image,
        class_options = class_options,
        model_options = model_options,
    );

    Html(admin_page(title, admin_nav(), notice, &body))
}

async fn event_new(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<NoticeQuery>,
) -> Result<Html<String>, Redirect> {
    require_admin(&state, &headers).await?;
    Ok(event_form_page(&state, Event::default(), q.notice.as_deref()).await)
}

async fn event_edit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(q): Query<NoticeQuery>,
) -> Result<Html<String>, Redirect> {
    require_admin(&state, &headers).await?;
    let Some(event) = state.events.read().await.find(&id).cloned() else {
        return Err(redirect_notice("/admin/events", "Event not found"));
    };
    Ok(event_form_page(&state, event, q.notice.as_deref()).await)
}

/// Apply the posted form onto an event record. The image URL is only
/// replaced when a new upload arrives.
fn event_from_form(form: &FormData, mut event: Event) -> Event {
    event.title = form.value("title");
    event.series = form.value("series");
    event.league = form.value("league");
    event.track = form.value("track");
    event.date = form.value("date");
    event.duration = form.opt("duration");
    event.car_class = form.value("car_class");
    event.car_model = form.value("car_model");
    event.description = form.value("description");
    event.twitch = form.opt("twitch");
    event.result = form.opt("result");
    event.drivers = form.values("driver_ids");
    event
}

async fn event_save(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Redirect, Redirect> {
    require_admin(&state, &headers).await?;

    let form = FormData::read(&mut multipart)
        .await
        .map_err(|e| redirect_notice("/admin/events", &e))?;

    let id = form.opt("id").unwrap_or_else(fresh_id);
    let existing = state.events.read().await.find(&id).cloned();
    let is_new = existing.is_none();

    let mut event = event_from_form(&form, existing.unwrap_or_default());
    event.id = id.clone();

    if let Some(url) = take_upload(&state, &form, "event_image", "event", &id)
        .await
        .map_err(|e| redirect_notice(&format!("/admin/events/{}/edit", id), &e))?
    {
        event.image_url = Some(url);
    }

    let mut events = state.events.write().await;
    events.upsert(event);
    events
        .save()
        .await
        .map_err(|e| redirect_notice("/admin/events", &e.to_string()))?;

    let notice = if is_new { "Event created" } else { "Event saved" };
    Ok(redirect_notice("/admin/events", notice))
}

async fn event_delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Redirect, Redirect> {
    require_admin(&state, &headers).await?;

    let mut events = state.events.write().await;
    if !events.remove(&id) {
        return Err(redirect_notice("/admin/events", "Event not found"));
    }
    events
        .save()
        .await
        .map_err(|e| redirect_notice("/admin/events", &e.to_string()))?;
    info!("Deleted event {}", id);
    Ok(redirect_notice("/admin/events", "Event deleted"))
}

// ---------------------------------------------------------------------------
// Team

async fn team_list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<NoticeQuery>,
) -> Result<Html<String>, Redirect> {
    require_admin(&state, &headers).await?;

    let drivers = state.drivers.read().await;
    let rows: String = drivers
        .sorted_by_name()
        .iter()
        .map(|d| {
            let moderation = match &d.pending_image_url {
                Some(url) => format!(
                    r#"<span class="pending">pending</span> <a href="{url}">view</a>
<form style="display:inline" method="post" action="/admin/team/{id}/approve-image"><button>Approve</button></form>
<form style="display:inline" method="post" action="/admin/team/{id}/reject-image"><button class="danger">Reject</button></form>"#,
                    url = esc(url),
                    id = esc(&d.id),
                ),
                None => String::new(),
            };
            format!(
                r#"<tr><td>{name}</td><td>{iracing}</td><td>{ir}</td><td>{sr}</td><td>{moderation}</td>
<td><a href="/admin/team/{id}/edit">Edit</a></td>
<td><form method="post" action="/admin/team/{id}/delete"><button class="danger">Delete</button></form></td></tr>"#,
                name = esc(&d.name),
                iracing = esc_opt(d.iracing_id.as_deref()),
                ir = d.ir_sports.map(|v| v.to_string()).unwrap_or_default(),
                sr = esc_opt(d.sr_sports.as_deref()),
                moderation = moderation,
                id = esc(&d.id),
            )
        })
        .collect();

    let body = format!(
        r#"<h1>Team</h1>
<p><a href="/admin/team/new">+ New driver</a> &middot; <a href="/admin/sync">Sync ratings</a></p>
<table><tr><th>Name</th><th>iRacing id</th><th>iR</th><th>SR</th><th>Image</th><th></th><th></th></tr>{rows}</table>"#,
        rows = rows
    );

    Ok(Html(admin_page("Team", admin_nav(), q.notice.as_deref(), &body)))
}

fn driver_form_page(driver: &Driver, notice: Option<&str>) -> Html<String> {
    let title = if driver.id.is_empty() { "New driver" } else { "Edit driver" };
    let current_image = driver
        .image_url
        .as_deref()
        .map(|url| format!(r#"<p>Current image: <a href="{0}">{0}</a></p>"#, esc(url)))
        .unwrap_or_default();

    let body = format!(
        r#"<h1>{heading}</h1>
<form class="panel" method="post" action="/admin/team/save" enctype="multipart/form-data">
<input type="hidden" name="id" value="{id}">
<label>Name</label><input type="text" name="name" value="{name}">
<label>Nickname</label><input type="text" name="nickname" value="{nickname}">
<label>iRacing customer id</label><input type="text" name="iracing_id" value="{iracing_id}">
<label>Role</label><input type="text" name="role" value="{role}">
<label>Car number</label><input type="text" name="number" value="{number}">
<label>Nationality</label><input type="text" name="nationality" value="{nationality}">
<label>Twitch</label><input type="text" name="twitch" value="{twitch}">
<label>Rig</label><textarea name="rig">{rig}</textarea>
<label>Portal password</label><input type="text" name="password" value="{password}">
<label>Photo</label><input type="file" name="driver_image">
{current_image}
<button type="submit">Save</button>
</form>"#,
        heading = title,
        id = esc(&driver.id),
        name = esc(&driver.name),
        nickname = esc_opt(driver.nickname.as_deref()),
        iracing_id = esc_opt(driver.iracing_id.as_deref()),
        role = esc_opt(driver.role.as_deref()),
        number = esc_opt(driver.number.as_deref()),
        nationality = esc_opt(driver.nationality.as_deref()),
        twitch = esc_opt(driver.twitch.as_deref()),
        rig = esc_opt(driver.rig.as_deref()),
        password = esc_opt(driver.password.as_deref()),
        current_image = current_image,
    );

    Html(admin_page(title, admin_nav(), notice, &body))
}

async fn driver_new(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<NoticeQuery>,
) -> Result<Html<String>, Redirect> {
    require_admin(&state, &headers).await?;
    Ok(driver_form_page(&Driver::default(), q.notice.as_deref()))
}

async fn driver_edit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(q): Query<NoticeQuery>,
) -> Result<Html<String>, Redirect> {
    require_admin(&state, &headers).await?;
    let Some(driver) = state.drivers.read().await.find(&id).cloned() else {
        return Err(redirect_notice("/admin/team", "Driver not found"));
    };
    Ok(driver_form_page(&driver, q.notice.as_deref()))
}

/// Apply the posted form onto a driver record, leaving rating fields and
/// the pending image untouched.
fn driver_from_form(form: &FormData, mut driver: Driver) -> Driver {
    driver.name = form.value("name");
    driver.nickname = form.opt("nickname");
    driver.iracing_id = form.opt("iracing_id");
    driver.role = form.opt("role");
    driver.number = form.opt("number");
    driver.nationality = form.opt("nationality");
    driver.twitch = form.opt("twitch");
    driver.rig = form.opt("rig");
    driver.password = form.opt("password");
    driver
}

async fn driver_save(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Redirect, Redirect> {
    require_admin(&state, &headers).await?;

    let form = FormData::read(&mut multipart)
        .await
        .map_err(|e| redirect_notice("/admin/team", &e))?;

    let id = form.opt("id").unwrap_or_else(fresh_id);
    let existing = state.drivers.read().await.find(&id).cloned();
    let is_new = existing.is_none();

    let mut driver = driver_from_form(&form, existing.unwrap_or_default());
    driver.id = id.clone();

    if let Some(url) = take_upload(&state, &form, "driver_image", "driver", &id)
        .await
        .map_err(|e| redirect_notice(&format!("/admin/team/{}/edit", id), &e))?
    {
        driver.image_url = Some(url);
    }

    let mut drivers = state.drivers.write().await;
    drivers.upsert(driver);
    drivers
        .save()
        .await
        .map_err(|e| redirect_notice("/admin/team", &e.to_string()))?;

    let notice = if is_new { "Driver created" } else { "Driver saved" };
    Ok(redirect_notice("/admin/team", notice))
}

async fn driver_delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Redirect, Redirect> {
    require_admin(&state, &headers).await?;

    let mut drivers = state.drivers.write().await;
    if !drivers.remove(&id) {
        return Err(redirect_notice("/admin/team", "Driver not found"));
    }
    drivers
        .save()
        .await
        .map_err(|e| redirect_notice("/admin/team", &e.to_string()))?;
    info!("Deleted driver {}", id);
    Ok(redirect_notice("/admin/team", "Driver deleted"))
}

/// Promote a driver's pending image to the public one. The replaced public
/// image is removed from disk.
async fn approve_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Redirect, Redirect> {
    require_admin(&state, &headers).await?;

    let replaced = {
        let mut drivers = state.drivers.write().await;
        let Some(driver) = drivers.find_mut(&id) else {
            return Err(redirect_notice("/admin/team", "Driver not found"));
        };
        let Some(pending) = driver.pending_image_url.take() else {
            return Err(redirect_notice("/admin/team", "Nothing to approve"));
        };
        let replaced = driver.image_url.replace(pending);
        drivers
            .save()
            .await
            .map_err(|e| redirect_notice("/admin/team", &e.to_string()))?;
        replaced
    };

    if let Some(old) = replaced {
        uploads::remove_upload(&state.settings.upload_dir, &old).await;
    }
    Ok(redirect_notice("/admin/team", "Image approved"))
}

async fn reject_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Redirect, Redirect> {
    require_admin(&state, &headers).await?;

    let rejected = {
        let mut drivers = state.drivers.write().await;
        let Some(driver) = drivers.find_mut(&id) else {
            return Err(redirect_notice("/admin/team", "Driver not found"));
        };
        let Some(pending) = driver.pending_image_url.take() else {
            return Err(redirect_notice("/admin/team", "Nothing to reject"));
        };
        drivers
            .save()
            .await
            .map_err(|e| redirect_notice("/admin/team", &e.to_string()))?;
        pending
    };

    uploads::remove_upload(&state.settings.upload_dir, &rejected).await;
    Ok(redirect_notice("/admin/team", "Image rejected"))
}

// ---------------------------------------------------------------------------
// News

async fn news_list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<NoticeQuery>,
) -> Result<Html<String>, Redirect> {
    require_admin(&state, &headers).await?;

    let news = state.news.read().await;
    let rows: String = news
        .all()
        .iter()
        .map(|n| {
            format!(
                r#"<tr><td>{date}</td><td>{category}</td><td>{title}</td>
<td><a href="/admin/news/{id}/edit">Edit</a></td>
<td><form method="post" action="/admin/news/{id}/delete"><button class="danger">Delete</button></form></td></tr>"#,
                date = esc(&n.date),
                category = esc(&n.category),
                title = esc(&n.title),
                id = esc(&n.id),
            )
        })
        .collect();

    let body = format!(
        r#"<h1>News</h1>
<p><a href="/admin/news/new">+ New item</a></p>
<table><tr><th>Date</th><th>Category</th><th>Title</th><th></th><th></th></tr>{rows}</table>"#,
        rows = rows
    );

    Ok(Html(admin_page("News", admin_nav(), q.notice.as_deref(), &body)))
}

async fn news_form_page(state: &AppState, item: NewsItem, notice: Option<&str>) -> Html<String> {
    let event_options: String = {
        let events = state.events.read().await;
        let mut options = String::from(r#"<option value="">(none)</option>"#);
        for e in events.all() {
            let selected = match &item.event_id {
                Some(id) if crate::store::ids_equal(id, &e.id) => " selected",
                _ => "",
            };
            options.push_str(&format!(
                r#"<option value="{}"{}>{} ({})</option>"#,
                esc(&e.id),
                selected,
                esc(&e.title),
                esc(&e.date)
            ));
        }
        options
    };

    let title = if item.id.is_empty() { "New news item" } else { "Edit news item" };
    let body = format!(
        r#"<h1>{heading}</h1>
<form class="panel" method="post" action="/admin/news/save" enctype="multipart/form-data">
<input type="hidden" name="id" value="{id}">
<label>Title</label><input type="text" name="title" value="{title}">
<label>Category</label><input type="text" name="category" value="{category}">
<label>Date</label><input type="date" name="date" value="{date}">
<label>Content</label><textarea name="content">{content}</textarea>
<label>External link</label><input type="text" name="link" value="{link}">
<label>Linked event</label><select name="event_id">{event_options}</select>
<label>Image</label><input type="file" name="news_image">
<button type="submit">Save</button>
</form>"#,
        heading = title,
        id = esc(&item.id),
        title = esc(&item.title),
        category = esc(&item.category),
        date = esc(&item.date),
        content = esc_opt(item.content.as_deref()),
        link = esc_opt(item.link.as_deref()),
        event_options = event_options,
    );

    Html(admin_page(title, admin_nav(), notice, &body))
}

async fn news_new(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<NoticeQuery>,
) -> Result<Html<String>, Redirect> {
    require_admin(&state, &headers).await?;
    Ok(news_form_page(&state, NewsItem::default(), q.notice.as_deref()).await)
}

async fn news_edit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(q): Query<NoticeQuery>,
) -> Result<Html<String>, Redirect> {
    require_admin(&state, &headers).await?;
    let Some(item) = state.news.read().await.find(&id).cloned() else {
        return Err(redirect_notice("/admin/news", "News item not found"));
    };
    Ok(news_form_page(&state, item, q.notice.as_deref()).await)
}

async fn news_save(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Redirect, Redirect> {
    require_admin(&state, &headers).await?;

    let form = FormData::read(&mut multipart)
        .await
        .map_err(|e| redirect_notice("/admin/news", &e))?;

    let id = form.opt("id").unwrap_or_else(fresh_id);
    let mut item = state
        .news
        .read()
        .await
        .find(&id)
        .cloned()
        .unwrap_or_default();

    item.id = id.clone();
    item.title = form.value("title");
    item.category = normalize_category(&form.value("category"));
    item.date = form.value("date");
    item.content = form.opt("content");
    item.link = form.opt("link");
    item.event_id = form.opt("event_id");

    if let Some(url) = take_upload(&state, &form, "news_image", "news", &id)
        .await
        .map_err(|e| redirect_notice("/admin/news", &e))?
    {
        item.image_url = Some(url);
    }

    let mut news = state.news.write().await;
    news.upsert(item);
    news.save()
        .await
        .map_err(|e| redirect_notice("/admin/news", &e.to_string()))?;

    Ok(redirect_notice("/admin/news", "News item saved"))
}

async fn news_delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Redirect, Redirect> {
    require_admin(&state, &headers).await?;

    let mut news = state.news.write().await;
    if !news.remove(&id) {
        return Err(redirect_notice("/admin/news", "News item not found"));
    }
    news.save()
        .await
        .map_err(|e| redirect_notice("/admin/news", &e.to_string()))?;
    Ok(redirect_notice("/admin/news", "News item deleted"))
}

// ---------------------------------------------------------------------------
// Hero and navigation

async fn hero_form(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<NoticeQuery>,
) -> Result<Html<String>, Redirect> {
    require_admin(&state, &headers).await?;

    let config = state.site_config().await;
    let current_image = config
        .hero
        .image_url
        .as_deref()
        .map(|url| format!(r#"<p>Current image: <a href="{0}">{0}</a></p>"#, esc(url)))
        .unwrap_or_default();

    let body = format!(
        r#"<h1>Hero &amp; socials</h1>
<form class="panel" method="post" action="/admin/hero" enctype="multipart/form-data">
<label>Badge text</label><input type="text" name="badge" value="{badge}">
<label>Hero image</label><input type="file" name="hero_image">
{current_image}
<h2>Social links</h2>
<label>Twitch</label><input type="text" name="twitch" value="{twitch}">
<label>YouTube</label><input type="text" name="youtube" value="{youtube}">
<label>Instagram</label><input type="text" name="instagram" value="{instagram}">
<label>Discord</label><input type="text" name="discord" value="{discord}">
<button type="submit">Save</button>
</form>"#,
        badge = esc(&config.hero.badge),
        current_image = current_image,
        twitch = esc_opt(config.socials.twitch.as_deref()),
        youtube = esc_opt(config.socials.youtube.as_deref()),
        instagram = esc_opt(config.socials.instagram.as_deref()),
        discord = esc_opt(config.socials.discord.as_deref()),
    );

    Ok(Html(admin_page("Hero", admin_nav(), q.notice.as_deref(), &body)))
}

async fn hero_save(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Redirect, Redirect> {
    require_admin(&state, &headers).await?;

    let form = FormData::read(&mut multipart)
        .await
        .map_err(|e| redirect_notice("/admin/hero", &e))?;

    let image_url = take_upload(&state, &form, "hero_image", "hero", "site")
        .await
        .map_err(|e| redirect_notice("/admin/hero", &e))?;

    let mut site = state.site.write().await;
    site.config.hero.badge = form.value("badge");
    if let Some(url) = image_url {
        site.config.hero.image_url = Some(url);
    }
    site.config.socials.twitch = form.opt("twitch");
    site.config.socials.youtube = form.opt("youtube");
    site.config.socials.instagram = form.opt("instagram");
    site.config.socials.discord = form.opt("discord");
    site.save()
        .await
        .map_err(|e| redirect_notice("/admin/hero", &e.to_string()))?;

    Ok(redirect_notice("/admin/hero", "Saved"))
}

async fn nav_form(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<NoticeQuery>,
) -> Result<Html<String>, Redirect> {
    require_admin(&state, &headers).await?;

    let config = state.site_config().await;
    let lines: String = config
        .navigation
        .iter()
        .map(|n| format!("{} | {}\n", n.text, n.link))
        .collect();

    let body = format!(
        r#"<h1>Navigation</h1>
<p>One link per line, as <code>text | url</code>. Order is kept.</p>
<form class="panel" method="post" action="/admin/nav">
<label>Links</label><textarea name="lines">{lines}</textarea>
<button type="submit">Save</button>
</form>"#,
        lines = esc(&lines)
    );

    Ok(Html(admin_page("Navigation", admin_nav(), q.notice.as_deref(), &body)))
}

#[derive(Deserialize)]
struct NavForm {
    lines: String,
}

/// Parse the navigation textarea: `text | url` per line, malformed lines
/// dropped. An empty result falls back to the default navigation.
fn parse_nav_lines(raw: &str) -> Vec<NavLink> {
    let links: Vec<NavLink> = raw
        .lines()
        .filter_map(|line| {
            let (text, link) = line.split_once('|')?;
            let (text, link) = (text.trim(), link.trim());
            (!text.is_empty() && !link.is_empty()).then(|| NavLink {
                text: text.to_string(),
                link: link.to_string(),
            })
        })
        .collect();
    if links.is_empty() {
        SiteConfig::default().navigation
    } else {
        links
    }
}

async fn nav_save(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<NavForm>,
) -> Result<Redirect, Redirect> {
    require_admin(&state, &headers).await?;

    let mut site = state.site.write().await;
    site.config.navigation = parse_nav_lines(&form.lines);
    site.save()
        .await
        .map_err(|e| redirect_notice("/admin/nav", &e.to_string()))?;

    Ok(redirect_notice("/admin/nav", "Navigation saved"))
}

// ---------------------------------------------------------------------------
// Rating sync

async fn sync_ratings(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Redirect, Redirect> {
    require_admin(&state, &headers).await?;

    let report = sync::sync_ratings(&state.drivers, state.rating.as_ref()).await;
    Ok(redirect_notice("/admin/team", &report.summary()))
}

// ---------------------------------------------------------------------------
// Logs

async fn logs_page(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Html<String>, Redirect> {
    require_admin(&state, &headers).await?;

    let recent: String = state
        .log_buffer
        .get_recent(200)
        .iter()
        .map(|e| format!("{}\n", esc(&e.format())))
        .collect();

    let body = format!(
        r#"<h1>Live logs</h1>
<pre class="logs" id="logs">{recent}</pre>
<script>
const pre = document.getElementById('logs');
const source = new EventSource('/admin/logs/stream');
source.onmessage = (e) => {{
  pre.textContent += e.data + '\n';
  pre.scrollTop = pre.scrollHeight;
}};
</script>"#,
        recent = recent
    );

    Ok(Html(admin_page("Logs", admin_nav(), None, &body)))
}

async fn logs_stream(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Sse<impl Stream<Item = std::result::Result<SseEvent, Infallible>>>, Redirect> {
    require_admin(&state, &headers).await?;

    let rx = state.log_buffer.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|entry| match entry {
        Ok(entry) => Some(Ok(SseEvent::default().data(entry.format()))),
        // Lagged receiver, drop the gap and keep streaming
        Err(_) => None,
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nav_lines_parsed_in_order() {
        let links = parse_nav_lines("Home | /\nShop|https://shop.example\nbroken line\n | /x\n");
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].text, "Home");
        assert_eq!(links[1].link, "https://shop.example");
    }

    #[test]
    fn test_empty_nav_falls_back_to_default() {
        let links = parse_nav_lines("\n\n");
        assert!(!links.is_empty());
        assert_eq!(links[0].link, "/");
    }

    fn form_with(fields: &[(&str, &[&str])]) -> FormData {
        let mut form = FormData::default();
        for (name, values) in fields {
            form.fields.insert(
                name.to_string(),
                values.iter().map(|v| v.to_string()).collect(),
            );
        }
        form
    }

    #[test]
    fn test_event_form_replaces_lineup() {
        let existing = Event {
            id: "1".to_string(),
            title: "Old title".to_string(),
            image_url: Some("/uploads/event_1_old.png".to_string()),
            drivers: vec!["7".to_string()],
            ..Default::default()
        };
        let form = form_with(&[
            ("title", &["Spa 6h"]),
            ("date", &["2024-06-01T19:00"]),
            ("driver_ids", &["42", "99"]),
        ]);

        let event = event_from_form(&form, existing);
        assert_eq!(event.title, "Spa 6h");
        assert_eq!(event.drivers, vec!["42", "99"]);
        // No new upload in the form leaves the stored image alone
        assert_eq!(event.image_url.as_deref(), Some("/uploads/event_1_old.png"));
    }

    #[test]
    fn test_unchecked_lineup_clears_drivers() {
        let existing = Event {
            drivers: vec!["7".to_string()],
            ..Default::default()
        };
        let event = event_from_form(&form_with(&[("title", &["x"])]), existing);
        assert!(event.drivers.is_empty());
    }

    #[test]
    fn test_driver_form_preserves_rating_and_pending_fields() {
        let existing = Driver {
            id: "1".to_string(),
            ir_sports: Some(1500),
            sr_sports: Some("B 3.45".to_string()),
            pending_image_url: Some("/uploads/driver_1_p.png".to_string()),
            ..Default::default()
        };
        let form = form_with(&[("name", &["Alex"]), ("nickname", &[""])]);

        let driver = driver_from_form(&form, existing);
        assert_eq!(driver.name, "Alex");
        assert_eq!(driver.nickname, None, "empty input clears the field");
        assert_eq!(driver.ir_sports, Some(1500));
        assert_eq!(
            driver.pending_image_url.as_deref(),
            Some("/uploads/driver_1_p.png")
        );
    }
}
