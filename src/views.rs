//! HTML pages
//!
//! Small inline templates; every interpolated value is escaped.

use crate::data::{Provider, User};

const STYLESHEET: &str = r#"<link rel="stylesheet" href="/style.css">"#;

fn logout_form(csrf_token: &str) -> String {
    format!(
        r#"<form method="post" action="/logout">
            <input type="hidden" name="_csrf" value="{}" />
            <button type="submit">Log out</button>
        </form>"#,
        html_escape::encode_double_quoted_attribute(csrf_token)
    )
}

/// Home page for a signed-in user
pub fn render_home(user: &User, csrf_token: &str) -> String {
    let avatar = user
        .avatar_url
        .as_deref()
        .map(|url| {
            format!(
                r#"<img class="avatar" src="{}" alt="avatar" width="96" height="96" />"#,
                html_escape::encode_double_quoted_attribute(url)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Socialgate</title>{stylesheet}</head>
<body>
    <h1>Welcome</h1>
    {avatar}
    <p>Signed in with {provider} as <code>{provider_user_id}</code></p>
    <p>Member since {created_at}</p>
    {logout}
</body>
</html>
"#,
        stylesheet = STYLESHEET,
        avatar = avatar,
        provider = user.provider.display_name(),
        provider_user_id = html_escape::encode_text(&user.provider_user_id),
        created_at = user.created_at.format("%Y-%m-%d"),
        logout = logout_form(csrf_token),
    )
}

/// Login page listing the configured providers
pub fn render_login(
    providers: &[Provider],
    flash: Option<&str>,
    user: Option<&User>,
    csrf_token: &str,
) -> String {
    let flash = flash
        .map(|message| {
            format!(
                r#"<p class="flash">{}</p>"#,
                html_escape::encode_text(message)
            )
        })
        .unwrap_or_default();

    let links = if providers.is_empty() {
        "<p>No sign-in providers are configured.</p>".to_string()
    } else {
        providers
            .iter()
            .map(|provider| {
                format!(
                    r#"<li><a href="/auth/{}">Sign in with {}</a></li>"#,
                    provider.as_str(),
                    provider.display_name()
                )
            })
            .collect::<Vec<_>>()
            .join("\n            ")
    };

    let signed_in = user
        .map(|user| {
            format!(
                r#"<p>Already signed in with {}. <a href="/">Continue</a></p>{}"#,
                user.provider.display_name(),
                logout_form(csrf_token)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Login - Socialgate</title>{stylesheet}</head>
<body>
    <h1>Socialgate</h1>
    {flash}
    {signed_in}
    <ul>
            {links}
    </ul>
</body>
</html>
"#,
        stylesheet = STYLESHEET,
        flash = flash,
        signed_in = signed_in,
        links = links,
    )
}
