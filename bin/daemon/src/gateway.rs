//! The authorization gateway.
//!
//! Every route is registered at one [`TrustLevel`]. Routes of a level share
//! a router, and the user and admin routers carry the matching enforcement
//! middleware, so request-time dispatch is plain axum routing with no
//! per-request table lookups or mutation.
//!
//! The gateway never assumes it owns the root path: the resulting router
//! can be nested under any prefix.

use axum::{
    Router, middleware,
    routing::{MethodRouter, post},
};
use inertia_access::TrustLevel;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::auth::{AppState, middleware::require_admin, middleware::require_user, routes};

/// Immutable mapping from path to required trust level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable(BTreeMap<String, TrustLevel>);

impl RouteTable {
    /// Returns the trust level a path was registered with.
    #[must_use]
    pub fn trust_level(&self, path: &str) -> Option<TrustLevel> {
        self.0.get(path).copied()
    }

    /// Iterates over registered paths in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, TrustLevel)> {
        self.0.iter().map(|(path, level)| (path.as_str(), *level))
    }

    /// Number of registered paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no path is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn insert(&mut self, path: &str, level: TrustLevel) {
        if let Some(existing) = self.0.insert(path.to_string(), level) {
            panic!("route `{path}` is already registered as {existing}");
        }
    }
}

/// Builder for the gateway router.
pub struct Gateway {
    state: Arc<AppState>,
    table: RouteTable,
    public: Router<Arc<AppState>>,
    user: Router<Arc<AppState>>,
    admin: Router<Arc<AppState>>,
}

impl Gateway {
    /// Creates a gateway with the built-in `/user/*` routes registered.
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            table: RouteTable::default(),
            public: Router::new(),
            user: Router::new(),
            admin: Router::new(),
        }
        .attach_public("/user/login", post(routes::login))
        .attach_user_restricted("/user/validate", post(routes::validate))
        .attach_user_restricted("/user/logout", post(routes::logout))
        .attach_admin_restricted("/user/adduser", post(routes::add_user))
        .attach_admin_restricted("/user/removeuser", post(routes::remove_user))
        .attach_admin_restricted("/user/listusers", post(routes::list_users))
        .attach_admin_restricted("/user/resetusers", post(routes::reset_users))
    }

    /// Registers a route reachable without authentication.
    ///
    /// # Panics
    ///
    /// Panics if `path` is already registered at any level.
    #[must_use]
    pub fn attach_public(mut self, path: &str, route: MethodRouter<Arc<AppState>>) -> Self {
        self.table.insert(path, TrustLevel::Public);
        self.public = self.public.route(path, route);
        self
    }

    /// Registers a route that requires a valid session cookie.
    ///
    /// # Panics
    ///
    /// Panics if `path` is already registered at any level.
    #[must_use]
    pub fn attach_user_restricted(
        mut self,
        path: &str,
        route: MethodRouter<Arc<AppState>>,
    ) -> Self {
        self.table.insert(path, TrustLevel::User);
        self.user = self.user.route(path, route);
        self
    }

    /// Registers a route that requires an admin session or a service token.
    ///
    /// # Panics
    ///
    /// Panics if `path` is already registered at any level.
    #[must_use]
    pub fn attach_admin_restricted(
        mut self,
        path: &str,
        route: MethodRouter<Arc<AppState>>,
    ) -> Self {
        self.table.insert(path, TrustLevel::Admin);
        self.admin = self.admin.route(path, route);
        self
    }

    /// Returns the route table built so far.
    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.table
    }

    /// Returns the shared application state.
    #[must_use]
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Builds the router, returning the final route table alongside it.
    pub fn into_parts(self) -> (Router, RouteTable) {
        // Both restricted routers always hold built-in routes, which
        // `route_layer` requires.
        let user = self.user.route_layer(middleware::from_fn_with_state(
            self.state.clone(),
            require_user,
        ));
        let admin = self.admin.route_layer(middleware::from_fn_with_state(
            self.state.clone(),
            require_admin,
        ));

        let router = self
            .public
            .merge(user)
            .merge(admin)
            .with_state(self.state);
        (router, self.table)
    }

    /// Builds the router.
    pub fn into_router(self) -> Router {
        self.into_parts().0
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("routes", &self.table)
            .finish_non_exhaustive()
    }
}
