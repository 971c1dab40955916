use serde::{Serialize, Deserialize};
use uuid::Uuid;

/// Header carrying the authenticated user id, set by the auth proxy in front of the service.
pub const USER_ID_HEADER: &str = "X-User-Id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: Uuid,
}

impl Principal {
    pub fn from_header(value: Option<&str>) -> Option<Self> {
        value
            .map(str::trim)
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .map(|user_id| Principal { user_id })
    }
}

// Backend-specific Rocket implementation
#[cfg(feature = "backend")]
mod backend_impl {
    use super::*;
    use rocket::http::Status;
    use rocket::request::{FromRequest, Outcome};
    use rocket::Request;

    #[rocket::async_trait]
    impl<'r> FromRequest<'r> for Principal {
        type Error = ();

        async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
            match Principal::from_header(req.headers().get_one(USER_ID_HEADER)) {
                Some(principal) => Outcome::Success(principal),
                None => Outcome::Error((Status::Unauthorized, ())),
            }
        }
    }
}
