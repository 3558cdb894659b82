// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod analytics;
pub mod password;
pub mod proxy;
pub mod routing;
pub mod session;

pub use analytics::MetricsClient;
pub use proxy::ProxyService;
pub use routing::{RouteMatch, RouteTable};
pub use session::SessionService;
