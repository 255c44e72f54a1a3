use warp::{reject::Rejection, Filter};

use crate::error::Error;

use super::jwt::{SessionData, SessionKeys};

/// `Authorization: Token <jwt>` (or `Bearer`), falling back to the `session` cookie.
fn with_token() -> impl Filter<Extract = (Option<String>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(warp::cookie::optional::<String>("session"))
        .map(|header: Option<String>, cookie: Option<String>| {
            header
                .as_deref()
                .and_then(parse_authorization)
                .or(cookie)
        })
}

pub fn parse_authorization(value: &str) -> Option<String> {
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();

    if token.is_empty() {
        return None;
    }
    if scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer") {
        Some(token.to_owned())
    } else {
        None
    }
}

pub fn with_session(
    keys: SessionKeys,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    with_token().and_then(move |token: Option<String>| {
        let keys = keys.clone();
        async move {
            let token = token.ok_or_else(|| {
                Error::Unauthorized("Authentication credentials were not provided".to_owned())
            })?;

            keys.verify(&token)
                .map(SessionData::from)
                .map_err(Rejection::from)
        }
    })
}

/// Anonymous callers, and callers with an unusable token, get `None`.
pub fn with_possible_session(
    keys: SessionKeys,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    with_token().map(move |token: Option<String>| {
        token
            .and_then(|token| keys.verify(&token).ok())
            .map(SessionData::from)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_schemes() {
        assert_eq!(parse_authorization("Token abc"), Some("abc".into()));
        assert_eq!(parse_authorization("bearer  abc "), Some("abc".into()));
        assert_eq!(parse_authorization("Basic abc"), None);
        assert_eq!(parse_authorization("Token"), None);
    }
}
