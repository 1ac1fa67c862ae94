//! Shared page chrome.
//!
//! All pages are rendered as plain HTML strings: a public layout driven by
//! the site configuration (navigation, socials, live-event chip) and a
//! darker back-office layout for admin and portal pages. Notices travel as
//! a `notice` query parameter on redirects.

use axum::response::Redirect;

use crate::store::SiteConfig;

/// Escape text for interpolation into HTML
pub fn esc(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Escape an optional value, empty string when absent
pub fn esc_opt(raw: Option<&str>) -> String {
    raw.map(esc).unwrap_or_default()
}

/// Redirect carrying a user-visible notice
pub fn redirect_notice(path: &str, notice: &str) -> Redirect {
    let sep = if path.contains('?') { '&' } else { '?' };
    Redirect::to(&format!(
        "{}{}notice={}",
        path,
        sep,
        urlencoding::encode(notice)
    ))
}

/// What the layout needs to render the current/next event chip
#[derive(Debug, Clone)]
pub struct NextChip {
    pub id: String,
    pub title: String,
    pub date: String,
    pub is_live: bool,
}

fn notice_banner(notice: Option<&str>) -> String {
    match notice {
        Some(msg) if !msg.is_empty() => {
            format!(r#"<div class="notice">{}</div>"#, esc(msg))
        }
        _ => String::new(),
    }
}

const PUBLIC_CSS: &str = r#"
* { box-sizing: border-box; margin: 0; padding: 0; }
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
       background: #0e0e14; color: #eee; min-height: 100vh; }
a { color: #e8443c; text-decoration: none; }
a:hover { text-decoration: underline; }
header { display: flex; align-items: center; justify-content: space-between;
         padding: 1rem 2rem; background: #16161f; border-bottom: 2px solid #e8443c; }
header .brand { font-weight: 800; font-size: 1.2rem; letter-spacing: 2px; color: #fff; }
nav a { color: #ccc; margin-left: 1.2rem; font-weight: 600; }
nav a:hover { color: #fff; text-decoration: none; }
main { max-width: 1000px; margin: 0 auto; padding: 2rem; }
.notice { background: #243524; border: 1px solid #3f6f3f; color: #bde5bd;
          padding: 0.6rem 1rem; border-radius: 8px; margin-bottom: 1.2rem; }
.chip { display: inline-block; background: #23232f; border-radius: 999px;
        padding: 0.3rem 0.9rem; font-size: 0.85rem; color: #ccc; }
.chip.live { background: #5d1616; color: #ffb3b3; font-weight: 700; }
.hero { border-radius: 16px; padding: 3rem 2rem; margin-bottom: 2rem;
        background: linear-gradient(135deg, #1d1d2b 0%, #2b1d1d 100%);
        background-size: cover; background-position: center; }
.hero .badge { display: inline-block; background: #e8443c; color: #fff;
               font-weight: 700; padding: 0.3rem 0.8rem; border-radius: 6px;
               letter-spacing: 1px; font-size: 0.8rem; }
.grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(220px, 1fr)); gap: 1.2rem; }
.card { background: #16161f; border: 1px solid #26262f; border-radius: 12px;
        padding: 1.2rem; }
.card h3 { margin-bottom: 0.4rem; }
.card .sub { color: #999; font-size: 0.85rem; }
table { width: 100%; border-collapse: collapse; margin-top: 1rem; }
th, td { text-align: left; padding: 0.55rem 0.7rem; border-bottom: 1px solid #26262f; }
th { color: #999; font-size: 0.8rem; text-transform: uppercase; letter-spacing: 1px; }
footer { text-align: center; color: #666; padding: 2rem; font-size: 0.85rem; }
footer a { margin: 0 0.5rem; color: #888; }
img.thumb { width: 100%; border-radius: 8px; object-fit: cover; }
h1 { margin-bottom: 1rem; } h2 { margin: 1.6rem 0 0.8rem; }
"#;

const ADMIN_CSS: &str = r#"
* { box-sizing: border-box; margin: 0; padding: 0; }
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
       background: #101018; color: #eee; min-height: 100vh; }
a { color: #7aa2ff; text-decoration: none; }
a:hover { text-decoration: underline; }
header { display: flex; align-items: center; justify-content: space-between;
         padding: 0.8rem 1.6rem; background: #181826; border-bottom: 1px solid #2a2a3a; }
header .brand { font-weight: 700; color: #fff; }
nav a { margin-left: 1rem; color: #aab; font-weight: 600; }
main { max-width: 1100px; margin: 0 auto; padding: 1.6rem; }
.notice { background: #1d2d1d; border: 1px solid #3f6f3f; color: #bde5bd;
          padding: 0.6rem 1rem; border-radius: 8px; margin-bottom: 1.2rem; }
.tiles { display: grid; grid-template-columns: repeat(auto-fill, minmax(200px, 1fr)); gap: 1rem; }
.tile { background: #181826; border: 1px solid #2a2a3a; border-radius: 10px;
        padding: 1.2rem; display: block; color: #eee; }
.tile:hover { border-color: #7aa2ff; text-decoration: none; }
table { width: 100%; border-collapse: collapse; margin-top: 1rem; }
th, td { text-align: left; padding: 0.5rem 0.6rem; border-bottom: 1px solid #2a2a3a; }
th { color: #889; font-size: 0.8rem; text-transform: uppercase; }
form.panel { background: #181826; border: 1px solid #2a2a3a; border-radius: 10px;
             padding: 1.4rem; max-width: 640px; }
label { display: block; margin: 0.8rem 0 0.25rem; color: #aab; font-size: 0.9rem; }
input[type=text], input[type=password], input[type=datetime-local], input[type=date],
input[type=number], select, textarea {
  width: 100%; padding: 0.5rem 0.6rem; background: #101018; color: #eee;
  border: 1px solid #2a2a3a; border-radius: 6px; }
textarea { min-height: 110px; }
button { margin-top: 1rem; background: #4464c4; border: none; color: #fff;
         padding: 0.6rem 1.4rem; border-radius: 8px; font-weight: 700; cursor: pointer; }
button:hover { background: #5577dd; }
.danger { color: #ff7a7a; }
.pending { color: #f0c36d; }
pre.logs { background: #0a0a10; border: 1px solid #2a2a3a; border-radius: 8px;
           padding: 1rem; font-size: 0.8rem; overflow-x: auto; min-height: 300px; }
h1 { margin-bottom: 1rem; } h2 { margin: 1.4rem 0 0.6rem; }
"#;

/// Render a public page in the site layout
pub fn public_page(
    title: &str,
    config: &SiteConfig,
    next: Option<&NextChip>,
    notice: Option<&str>,
    body: &str,
) -> String {
    let nav: String = config
        .navigation
        .iter()
        .map(|n| format!(r#"<a href="{}">{}</a>"#, esc(&n.link), esc(&n.text)))
        .collect();

    let chip = match next {
        Some(n) if n.is_live => format!(
            r#"<a href="/event/{}"><span class="chip live">LIVE: {}</span></a>"#,
            esc(&n.id),
            esc(&n.title)
        ),
        Some(n) => format!(
            r#"<a href="/event/{}"><span class="chip">Next: {} &middot; {}</span></a>"#,
            esc(&n.id),
            esc(&n.title),
            esc(&n.date)
        ),
        None => String::new(),
    };

    let socials: String = [
        ("Twitch", config.socials.twitch.as_deref()),
        ("YouTube", config.socials.youtube.as_deref()),
        ("Instagram", config.socials.instagram.as_deref()),
        ("Discord", config.socials.discord.as_deref()),
    ]
    .into_iter()
    .filter_map(|(label, url)| {
        url.filter(|u| !u.is_empty())
            .map(|u| format!(r#"<a href="{}">{}</a>"#, esc(u), label))
    })
    .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
<style>{css}</style>
</head>
<body>
<header>
  <a href="/" class="brand">PITWALL</a>
  <div>{chip}</div>
  <nav>{nav}</nav>
</header>
<main>
{notice}
{body}
</main>
<footer>{socials}</footer>
</body>
</html>"#,
        title = esc(title),
        css = PUBLIC_CSS,
        chip = chip,
        nav = nav,
        notice = notice_banner(notice),
        body = body,
    )
}

/// Render a back-office page (admin or portal layout)
pub fn admin_page(title: &str, nav: &str, notice: Option<&str>, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
<style>{css}</style>
</head>
<body>
<header>
  <span class="brand">{title}</span>
  <nav>{nav}</nav>
</header>
<main>
{notice}
{body}
</main>
</body>
</html>"#,
        title = esc(title),
        css = ADMIN_CSS,
        nav = nav,
        notice = notice_banner(notice),
        body = body,
    )
}

/// Navigation links shown on every admin page
pub fn admin_nav() -> &'static str {
    concat!(
        r#"<a href="/admin">Dashboard</a>"#,
        r#"<a href="/admin/events">Events</a>"#,
        r#"<a href="/admin/team">Team</a>"#,
        r#"<a href="/admin/news">News</a>"#,
        r#"<a href="/admin/hero">Hero</a>"#,
        r#"<a href="/admin/nav">Navigation</a>"#,
        r#"<a href="/admin/logs">Logs</a>"#,
        r#"<a href="/">Site</a>"#,
        r#"<a href="/admin/logout">Logout</a>"#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escaping() {
        assert_eq!(esc("<b>&\"'"), "&lt;b&gt;&amp;&quot;&#39;");
        assert_eq!(esc_opt(None), "");
    }

    #[test]
    fn test_layout_renders_nav_and_notice() {
        let config = SiteConfig::default();
        let html = public_page("Team", &config, None, Some("Saved!"), "<p>x</p>");

        assert!(html.contains(r#"<a href="/team">Team</a>"#));
        assert!(html.contains("Saved!"));
        assert!(!html.contains("chip live"));
    }

    #[test]
    fn test_live_chip_rendered() {
        let config = SiteConfig::default();
        let next = NextChip {
            id: "9".to_string(),
            title: "Spa 6h".to_string(),
            date: "2024-06-01T19:00".to_string(),
            is_live: true,
        };
        let html = public_page("Home", &config, Some(&next), None, "");
        assert!(html.contains("LIVE: Spa 6h"));
        assert!(html.contains(r#"href="/event/9""#));
    }
}
