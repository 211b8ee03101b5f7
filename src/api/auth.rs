// Bearer authentication for mutating endpoints
use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use log::{debug, warn};

use crate::app_state::AppState;
use crate::auth::{AuthRejection, Grant};
use crate::error::AssetError;

/// Extractor that runs the token validator.
///
/// Listing it as a handler argument is what makes an endpoint authenticated:
/// the handler body never runs when extraction fails.
#[derive(Debug)]
pub struct Authorized(Grant);

impl Authorized {
    pub fn into_grant(self) -> Grant {
        self.0
    }
}

impl FromRequest for Authorized {
    type Error = AssetError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authorize_request(req))
    }
}

pub fn authorize_request(req: &HttpRequest) -> Result<Authorized, AssetError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AssetError::Internal("application state is not registered".to_string()))?;

    let header = match req.headers().get(AUTHORIZATION) {
        Some(value) => Some(value.to_str().map_err(|_| {
            warn!("Non-ASCII Authorization header on {}", req.path());
            AssetError::from(AuthRejection::MalformedHeader)
        })?),
        None => None,
    };

    match state.validator.authorize(header) {
        Ok(grant) => {
            debug!("Authorized {} for {:?}", req.path(), grant.subject());
            Ok(Authorized(grant))
        }
        Err(rejection) => {
            warn!("Rejected {} {}: {}", req.method(), req.path(), rejection);
            Err(rejection.into())
        }
    }
}
