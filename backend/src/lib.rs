pub mod catchers;
pub mod config;
pub mod cors;
pub mod credentials;
pub mod error;
pub mod processor;
pub mod queries;
pub mod routes;
pub mod store;

pub use shared::{models::*, error::*, validation::*};

use rocket::{Build, Rocket, catchers, routes};

use crate::catchers::{bad_request, internal_error, not_found, unprocessable};
use crate::cors::CORS;
use crate::routes::*;

/// Assembles the server around an already-built state, so the same routes run
/// against PostgreSQL in production and the in-memory store in tests.
pub fn build_rocket(state: AppState) -> Rocket<Build> {
    let cors = CORS::new(state.config.allowed_origin.clone());

    rocket::build()
        .attach(cors)
        .manage(state)
        .mount(
            "/",
            routes![
                index,
                create_poll,
                list_polls,
                get_poll,
                delete_poll,
                list_choices,
                add_choice,
                cast_vote,
                get_choice,
                update_choice,
                create_vote,
                create_user,
                get_user,
                all_options
            ],
        )
        .register(
            "/",
            catchers![
                bad_request,
                not_found,
                unprocessable,
                internal_error
            ],
        )
}
