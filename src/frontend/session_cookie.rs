use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

use crate::shared_types::SessionId;

use super::context::GatewayContext;

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

pub const SESSION_COOKIE: &str = "sid";

const SESSION_COOKIE_MAX_AGE: Duration = Duration::weeks(1);

// -----------------------------------------------------------------------------
// ----- Middleware ------------------------------------------------------------

/// Attach a `SessionId` to every request, issuing a fresh `sid` cookie when
/// the client has none.
pub async fn ensure_session(
    State(ctx): State<GatewayContext>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let existing = jar
        .get(SESSION_COOKIE)
        .map(Cookie::value)
        .filter(|v| !v.is_empty())
        .map(SessionId::new);

    let (sid, issued) = match existing {
        Some(sid) => (sid, false),
        None => (SessionId::generate(), true),
    };

    request.extensions_mut().insert(sid.clone());
    let response = next.run(request).await;

    if !issued {
        return response;
    }

    let jar = jar.add(session_cookie(&sid, ctx.secure_cookies));
    (jar, response).into_response()
}

fn session_cookie(sid: &SessionId, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, sid.as_str().to_owned()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(SESSION_COOKIE_MAX_AGE)
        .build()
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
