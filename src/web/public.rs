//! Public site pages.

use axum::extract::{Path, Query, State};
use axum::response::{Html, Redirect};
use tracing::warn;

use super::pages::{esc, esc_opt, public_page};
use super::server::{AppState, NoticeQuery};
use crate::calendar;
use crate::roster::{self, DriverView};
use crate::store::Event;

fn driver_card(d: &DriverView) -> String {
    let image = d
        .image_url
        .as_deref()
        .map(|url| format!(r#"<img class="thumb" src="{}" alt="{}">"#, esc(url), esc(&d.name)))
        .unwrap_or_default();
    let number = d
        .number
        .as_deref()
        .map(|n| format!("#{} ", esc(n)))
        .unwrap_or_default();
    format!(
        r#"<a href="/driver/{id}" class="card">
{image}
<h3>{number}{name}</h3>
<div class="sub">{role}</div>
<div class="sub">iR {ir} &middot; SR {sr}</div>
</a>"#,
        id = esc(&d.id),
        image = image,
        number = number,
        name = esc(&d.name),
        role = esc_opt(d.role.as_deref()),
        ir = esc(&d.ir_sports),
        sr = esc(&d.sr_sports),
    )
}

fn event_row(e: &Event) -> String {
    format!(
        r#"<tr><td><a href="/event/{id}">{title}</a></td><td>{date}</td><td>{series}</td><td>{track}</td></tr>"#,
        id = esc(&e.id),
        title = esc(&e.title),
        date = esc(&e.date),
        series = esc(&e.series),
        track = esc(&e.track),
    )
}

const EVENT_TABLE_HEAD: &str =
    "<tr><th>Event</th><th>Date</th><th>Series</th><th>Track</th></tr>";

/// GET / - home page with hero and roster highlights
pub(super) async fn home(
    State(state): State<AppState>,
    Query(q): Query<NoticeQuery>,
) -> Html<String> {
    let config = state.site_config().await;
    let next = state.next_chip().await;

    let hero_style = config
        .hero
        .image_url
        .as_deref()
        .map(|url| format!(r#" style="background-image: url('{}')""#, esc(url)))
        .unwrap_or_default();

    let roster = {
        let drivers = state.drivers.read().await;
        roster::enriched_roster(drivers.all())
    };
    let cards: String = roster.iter().map(driver_card).collect();

    let next_section = match &next {
        Some(n) if n.is_live => format!(
            r#"<h2>Happening now</h2><div class="card"><h3><a href="/event/{}">{}</a></h3><div class="sub">LIVE</div></div>"#,
            esc(&n.id),
            esc(&n.title)
        ),
        Some(n) => format!(
            r#"<h2>Next race</h2><div class="card"><h3><a href="/event/{}">{}</a></h3><div class="sub">{}</div></div>"#,
            esc(&n.id),
            esc(&n.title),
            esc(&n.date)
        ),
        None => String::new(),
    };

    let body = format!(
        r#"<div class="hero"{hero_style}>
<span class="badge">{badge}</span>
</div>
{next_section}
<h2>The team</h2>
<div class="grid">{cards}</div>"#,
        hero_style = hero_style,
        badge = esc(&config.hero.badge),
        next_section = next_section,
        cards = cards,
    );

    Html(public_page("Home", &config, next.as_ref(), q.notice.as_deref(), &body))
}

/// GET /team - full roster with rating columns
pub(super) async fn team(
    State(state): State<AppState>,
    Query(q): Query<NoticeQuery>,
) -> Html<String> {
    let config = state.site_config().await;
    let next = state.next_chip().await;

    let roster = {
        let drivers = state.drivers.read().await;
        roster::enriched_roster(drivers.all())
    };

    let rows: String = roster
        .iter()
        .map(|d| {
            format!(
                r#"<tr><td><a href="/driver/{id}">{name}</a></td><td>{nick}</td><td>{role}</td><td>{nat}</td><td>{ir}</td><td>{sr}</td></tr>"#,
                id = esc(&d.id),
                name = esc(&d.name),
                nick = esc_opt(d.nickname.as_deref()),
                role = esc_opt(d.role.as_deref()),
                nat = esc_opt(d.nationality.as_deref()),
                ir = esc(&d.ir_sports),
                sr = esc(&d.sr_sports),
            )
        })
        .collect();

    let body = format!(
        r#"<h1>Team</h1>
<table>
<tr><th>Driver</th><th>Nickname</th><th>Role</th><th>Nation</th><th>iRating</th><th>Safety</th></tr>
{rows}
</table>"#,
        rows = rows
    );

    Html(public_page("Team", &config, next.as_ref(), q.notice.as_deref(), &body))
}

/// GET /driver/:id - profile with recent races and event history
pub(super) async fn driver_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<NoticeQuery>,
) -> Result<Html<String>, Redirect> {
    let config = state.site_config().await;
    let next = state.next_chip().await;

    let (view, cust_id, all_names) = {
        let drivers = state.drivers.read().await;
        let Some(driver) = drivers.find(&id) else {
            return Err(super::pages::redirect_notice("/team", "Driver not found"));
        };
        let names: Vec<(String, String)> = drivers
            .sorted_by_name()
            .into_iter()
            .map(|d| (d.id.clone(), d.name.clone()))
            .collect();
        (roster::enrich(driver), driver.numeric_iracing_id(), names)
    };

    // Recent races are best effort; a provider failure just means no stats
    let recent = match cust_id {
        Some(cust_id) => match state.rating.recent_races(cust_id).await {
            Ok(races) => races,
            Err(e) => {
                warn!("Recent races unavailable for driver {}: {}", id, e);
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    let (upcoming, past) = {
        let events = state.events.read().await;
        let now = calendar::local_now();
        let (u, p) = calendar::partition_for_driver(events.all(), &view.id, now);
        (
            u.into_iter().cloned().collect::<Vec<Event>>(),
            p.into_iter().cloned().collect::<Vec<Event>>(),
        )
    };

    let races_rows: String = recent
        .iter()
        .take(10)
        .map(|r| {
            format!(
                r#"<tr><td>{date}</td><td>{series}</td><td>{track}</td><td>P{start} &rarr; P{finish}</td><td>{delta:+}</td><td>{inc}</td><td>{sof}</td></tr>"#,
                date = esc(&r.formatted_date()),
                series = esc(&r.series_name),
                track = esc(r.track_name()),
                start = r.start_position,
                finish = r.finish_position,
                delta = r.position_delta(),
                inc = r.incidents,
                sof = r.strength_of_field,
            )
        })
        .collect();

    let races_section = if races_rows.is_empty() {
        String::new()
    } else {
        format!(
            r#"<h2>Recent races</h2>
<table>
<tr><th>Date</th><th>Series</th><th>Track</th><th>Result</th><th>+/-</th><th>Inc</th><th>SoF</th></tr>
{races_rows}
</table>"#
        )
    };

    let event_list = |title: &str, list: &[Event]| -> String {
        if list.is_empty() {
            return String::new();
        }
        let rows: String = list.iter().map(event_row).collect();
        format!("<h2>{title}</h2><table>{EVENT_TABLE_HEAD}{rows}</table>")
    };

    let nav_links: String = all_names
        .iter()
        .map(|(did, name)| format!(r#"<a href="/driver/{}" class="chip">{}</a> "#, esc(did), esc(name)))
        .collect();

    let image = view
        .image_url
        .as_deref()
        .map(|url| format!(r#"<img class="thumb" style="max-width:280px" src="{}" alt="{}">"#, esc(url), esc(&view.name)))
        .unwrap_or_default();

    let body = format!(
        r#"<h1>{name}</h1>
{image}
<p class="sub">{nick} {role} {nat}</p>
<p>iRating: <strong>{ir}</strong> &middot; Safety: <strong>{sr}</strong></p>
<p>{rig}</p>
{twitch}
{races_section}
{upcoming_section}
{past_section}
<h2>All drivers</h2>
<p>{nav_links}</p>"#,
        name = esc(&view.name),
        image = image,
        nick = esc_opt(view.nickname.as_deref()),
        role = esc_opt(view.role.as_deref()),
        nat = esc_opt(view.nationality.as_deref()),
        ir = esc(&view.ir_sports),
        sr = esc(&view.sr_sports),
        rig = esc_opt(view.rig.as_deref()),
        twitch = view
            .twitch
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(|t| format!(r#"<p><a href="{0}">Twitch</a></p>"#, esc(t)))
            .unwrap_or_default(),
        races_section = races_section,
        upcoming_section = event_list("Upcoming events", &upcoming),
        past_section = event_list("Past events", &past),
        nav_links = nav_links,
    );

    Ok(Html(public_page(
        &view.name,
        &config,
        next.as_ref(),
        q.notice.as_deref(),
        &body,
    )))
}

/// GET /calendar - upcoming and past events
pub(super) async fn calendar_page(
    State(state): State<AppState>,
    Query(q): Query<NoticeQuery>,
) -> Html<String> {
    let config = state.site_config().await;
    let next = state.next_chip().await;

    let (upcoming, past) = {
        let events = state.events.read().await;
        let now = calendar::local_now();
        let (u, p) = calendar::partition(events.all(), now);
        (
            u.into_iter().cloned().collect::<Vec<Event>>(),
            p.into_iter().cloned().collect::<Vec<Event>>(),
        )
    };

    let upcoming_rows: String = upcoming.iter().map(event_row).collect();
    let past_rows: String = past.iter().map(event_row).collect();

    let body = format!(
        r#"<h1>Calendar</h1>
<h2>Upcoming</h2>
<table>{head}{upcoming_rows}</table>
<h2>Past</h2>
<table>{head}{past_rows}</table>"#,
        head = EVENT_TABLE_HEAD,
        upcoming_rows = upcoming_rows,
        past_rows = past_rows,
    );

    Html(public_page("Calendar", &config, next.as_ref(), q.notice.as_deref(), &body))
}

/// GET /event/:id - event detail with lineup
pub(super) async fn event_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<NoticeQuery>,
) -> Result<Html<String>, Redirect> {
    let config = state.site_config().await;
    let next = state.next_chip().await;

    let Some(event) = state.events.read().await.find(&id).cloned() else {
        return Err(Redirect::to("/calendar"));
    };

    let lineup = {
        let drivers = state.drivers.read().await;
        roster::lineup_views(drivers.all(), &event.drivers)
    };
    let is_past = calendar::is_past(&event, calendar::local_now());

    let lineup_cards: String = lineup.iter().map(driver_card).collect();
    let image = event
        .image_url
        .as_deref()
        .map(|url| format!(r#"<img class="thumb" src="{}" alt="{}">"#, esc(url), esc(&event.title)))
        .unwrap_or_default();

    let result_section = match (&event.result, is_past) {
        (Some(result), true) if !result.is_empty() => {
            format!("<h2>Result</h2><p>{}</p>", esc(result))
        }
        _ => String::new(),
    };

    let twitch = event
        .twitch
        .as_deref()
        .filter(|t| !t.is_empty())
        .map(|t| format!(r#"<p><a href="{0}">Watch on Twitch</a></p>"#, esc(t)))
        .unwrap_or_default();

    let body = format!(
        r#"<h1>{title}</h1>
<p class="sub">{series} &middot; {league}</p>
{image}
<p><strong>{date}</strong> &middot; {track} &middot; {duration}h</p>
<p>{car_class} {car_model}</p>
<p>{description}</p>
{twitch}
{result_section}
<h2>Lineup</h2>
<div class="grid">{lineup_cards}</div>"#,
        title = esc(&event.title),
        series = esc(&event.series),
        league = esc(&event.league),
        image = image,
        date = esc(&event.date),
        track = esc(&event.track),
        duration = event.duration_hours(),
        car_class = esc(&event.car_class),
        car_model = esc(&event.car_model),
        description = esc(&event.description),
        twitch = twitch,
        result_section = result_section,
        lineup_cards = lineup_cards,
    );

    Ok(Html(public_page(
        &event.title,
        &config,
        next.as_ref(),
        q.notice.as_deref(),
        &body,
    )))
}

/// GET /event-info - jump to the current/next event, or the calendar
pub(super) async fn event_info_redirect(State(state): State<AppState>) -> Redirect {
    match state.next_chip().await {
        Some(next) => Redirect::to(&format!("/event/{}", next.id)),
        None => Redirect::to("/calendar"),
    }
}

/// GET /news - the news feed, newest first
pub(super) async fn news_feed(
    State(state): State<AppState>,
    Query(q): Query<NoticeQuery>,
) -> Html<String> {
    let config = state.site_config().await;
    let next = state.next_chip().await;

    let items = state.news.read().await.all().to_vec();
    let event_titles: Vec<(String, String)> = {
        let events = state.events.read().await;
        events
            .all()
            .iter()
            .map(|e| (e.id.clone(), e.title.clone()))
            .collect()
    };

    let cards: String = items
        .iter()
        .map(|n| {
            // External link wins over the event cross-reference
            let link = match (&n.link, &n.event_id) {
                (Some(link), _) if !link.is_empty() => {
                    format!(r#"<a href="{}">Read more</a>"#, esc(link))
                }
                (_, Some(event_id)) => {
                    let known = event_titles
                        .iter()
                        .find(|(id, _)| crate::store::ids_equal(id, event_id));
                    match known {
                        Some((id, title)) => {
                            format!(r#"<a href="/event/{}">Event: {}</a>"#, esc(id), esc(title))
                        }
                        // Dangling reference after an event delete
                        None => String::new(),
                    }
                }
                _ => String::new(),
            };
            let image = n
                .image_url
                .as_deref()
                .map(|url| format!(r#"<img class="thumb" src="{}" alt="">"#, esc(url)))
                .unwrap_or_default();
            format!(
                r#"<div class="card">
{image}
<span class="chip">{category}</span>
<h3>{title}</h3>
<div class="sub">{date}</div>
<p>{content}</p>
{link}
</div>"#,
                image = image,
                category = esc(&n.category),
                title = esc(&n.title),
                date = esc(&n.date),
                content = esc_opt(n.content.as_deref()),
                link = link,
            )
        })
        .collect();

    let body = format!(r#"<h1>News</h1><div class="grid">{cards}</div>"#);

    Html(public_page("News", &config, next.as_ref(), q.notice.as_deref(), &body))
}
