// Built-in HTML views

use serde::Serialize;

use crate::api::ViewRenderer;
use crate::core::errors::AuthError;
use crate::core::models::SessionUser;

/// Views the application can render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Home,
    SignUp,
    SignIn,
    Private,
    Error,
}

impl View {
    /// Template name, as a file-based renderer would look it up
    pub fn name(&self) -> &'static str {
        match self {
            View::Home => "index",
            View::SignUp => "auth/signup",
            View::SignIn => "auth/signin",
            View::Private => "auth/private",
            View::Error => "error",
        }
    }
}

/// Data passed to every view
#[derive(Debug, Clone, Default, Serialize)]
pub struct ViewContext {
    /// Signed-in user, available to every page (navigation, greetings)
    pub user: Option<SessionUser>,
    /// Form-level error message
    pub message: Option<String>,
    /// Previously submitted identifier, echoed back into the form
    pub email: Option<String>,
    /// Internal error detail, only set outside production
    pub detail: Option<String>,
    pub status: Option<u16>,
}

impl ViewContext {
    pub fn for_user(user: Option<SessionUser>) -> Self {
        Self {
            user,
            ..Self::default()
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Minimal server-side HTML renderer
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl HtmlRenderer {
    fn nav(context: &ViewContext) -> String {
        match context.user {
            Some(ref user) => format!(
                r#"<nav><a href="/">Home</a> <a href="/auth/private">Private</a> <span>{}</span>
<form method="post" action="/auth/signout"><button type="submit">Sign out</button></form></nav>"#,
                escape_html(user.identifier.as_str())
            ),
            None => r#"<nav><a href="/">Home</a> <a href="/auth/signup">Sign up</a> <a href="/auth/signin">Sign in</a></nav>"#
                .to_string(),
        }
    }

    fn credentials_form(title: &str, action: &str, context: &ViewContext) -> String {
        let error = context
            .message
            .as_deref()
            .map(|m| format!(r#"<p class="error">{}</p>"#, escape_html(m)))
            .unwrap_or_default();
        let email = context.email.as_deref().map(escape_html).unwrap_or_default();

        format!(
            r#"<h1>{title}</h1>
{error}
<form method="post" action="{action}">
<label>Email <input type="email" name="email" value="{email}" required></label>
<label>Password <input type="password" name="password" required></label>
<button type="submit">{title}</button>
</form>"#
        )
    }

    fn layout(title: &str, context: &ViewContext, body: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{}</title></head>
<body>
{}
<main>
{}
</main>
</body>
</html>"#,
            escape_html(title),
            Self::nav(context),
            body
        )
    }
}

impl ViewRenderer for HtmlRenderer {
    fn render(&self, view: View, context: &ViewContext) -> Result<String, AuthError> {
        let (title, body) = match view {
            View::Home => ("Home", "<h1>Welcome</h1>".to_string()),
            View::SignUp => ("Sign up", Self::credentials_form("Sign up", "/auth/signup", context)),
            View::SignIn => ("Sign in", Self::credentials_form("Sign in", "/auth/signin", context)),
            View::Private => {
                let who = context
                    .user
                    .as_ref()
                    .map(|u| escape_html(u.identifier.as_str()))
                    .unwrap_or_default();
                ("Private", format!("<h1>Private</h1>\n<p>Signed in as {}</p>", who))
            }
            View::Error => {
                let message = context.message.as_deref().unwrap_or("Something went wrong");
                let status = context.status.map(|s| format!("<h2>{}</h2>", s)).unwrap_or_default();
                let detail = context
                    .detail
                    .as_deref()
                    .map(|d| format!("<pre>{}</pre>", escape_html(d)))
                    .unwrap_or_default();
                ("Error", format!("<h1>{}</h1>\n{}\n{}", escape_html(message), status, detail))
            }
        };

        Ok(Self::layout(title, context, &body))
    }
}

/// Escape text for inclusion in HTML bodies and attribute values
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
