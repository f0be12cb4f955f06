//! Access control for individual routes.
//!
//! The middleware authenticates the caller's access token and checks the claims against the roles the route requires.
//! A missing or invalid token is rejected with 401, and a valid token without the required roles with 403. Claims
//! that pass are left in the request extensions for the handler.
use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::LocalBoxFuture;
use log::*;

use crate::{
    auth::{authenticate, Role},
    errors::{AuthError, ServerError},
};

pub struct AclMiddlewareFactory {
    required_roles: Vec<Role>,
}

impl AclMiddlewareFactory {
    pub fn new(required_roles: &[Role]) -> Self {
        AclMiddlewareFactory { required_roles: required_roles.to_vec() }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AclMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AclMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AclMiddlewareService { required_roles: self.required_roles.clone(), service: Rc::new(service) }))
    }
}

pub struct AclMiddlewareService<S> {
    required_roles: Vec<Role>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AclMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let required_roles = self.required_roles.clone();
        Box::pin(async move {
            let claims = authenticate(req.request())?;
            if required_roles.iter().all(|role| claims.has_role(*role)) {
                service.call(req).await
            } else {
                warn!("🔐️ {} tried to access {} without the required roles", claims.sub, req.path());
                let err = AuthError::InsufficientPermissions(format!("{required_roles:?} required"));
                Err(ServerError::AuthenticationError(err).into())
            }
        })
    }
}
