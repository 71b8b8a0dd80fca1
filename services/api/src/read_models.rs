//! Denormalized read models
//!
//! Each function builds a [`common::pipeline::Pipeline`] for one response
//! shape and runs it against the store. `viewer` is the requesting user,
//! used for per-viewer flags such as `isLiked` and `isSubscribed`.

use common::pipeline::{Join, Pipeline, Projection};

use crate::models::collections::USERS;

pub mod channels;
pub mod comments;
pub mod dashboard;
pub mod likes;
pub mod playlists;
pub mod subscriptions;
pub mod tweets;
pub mod videos;

/// Join the user in `local_field` into `as_field`, keeping only `fields`
pub(crate) fn join_user(local_field: &str, as_field: &str, fields: &[&str]) -> Join {
    Join::new(USERS, local_field, "_id", as_field)
        .pipeline(Pipeline::new().project(Projection::new(fields)))
}
