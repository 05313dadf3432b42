use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    error::{ErrorMessage, HttpError},
    models::jobmodel::{Actor, ActorRole},
};

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, HttpError> {
    let (id, role) = match (
        header_value(headers, ACTOR_ID_HEADER),
        header_value(headers, ACTOR_ROLE_HEADER),
    ) {
        (Some(id), Some(role)) => (id, role),
        _ => return Err(HttpError::unauthorized(ErrorMessage::ActorNotProvided.to_string())),
    };

    let id = Uuid::parse_str(id)
        .map_err(|_| HttpError::unauthorized(ErrorMessage::InvalidActorId.to_string()))?;
    let role = ActorRole::parse(role)
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::InvalidActorRole.to_string()))?;

    Ok(Actor { id, role })
}

/// Authentication happens upstream; this trusts the identity headers the
/// gateway forwards and exposes them as `Extension<Actor>`.
pub async fn actor_context(
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, HttpError> {
    let actor = actor_from_headers(req.headers())?;

    req.extensions_mut().insert(actor);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};

    fn headers(id: &str, role: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_ID_HEADER, HeaderValue::from_str(id).unwrap());
        headers.insert(ACTOR_ROLE_HEADER, HeaderValue::from_str(role).unwrap());
        headers
    }

    #[test]
    fn parses_actor_headers() {
        let id = Uuid::new_v4();
        let actor = actor_from_headers(&headers(&id.to_string(), "Professional")).unwrap();
        assert_eq!(actor, Actor::professional(id));
    }

    #[test]
    fn rejects_missing_or_bad_headers() {
        let missing = actor_from_headers(&HeaderMap::new()).unwrap_err();
        assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
        assert_eq!(missing.message, ErrorMessage::ActorNotProvided.to_string());

        let bad_id = actor_from_headers(&headers("nope", "customer")).unwrap_err();
        assert_eq!(bad_id.message, ErrorMessage::InvalidActorId.to_string());

        let bad_role = actor_from_headers(&headers(&Uuid::new_v4().to_string(), "admin")).unwrap_err();
        assert_eq!(bad_role.message, ErrorMessage::InvalidActorRole.to_string());
    }
}
