use crate::{api::leave_permit, auth::middleware::auth_middleware, config::Config};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::Context;
use std::sync::Arc;

pub type Limiter = Governor<PeerIpKeyExtractor, NoOpMiddleware>;

/// Requests per minute spread evenly, with a full minute's worth allowed as a burst.
pub fn build_limiter(requests_per_min: u32) -> anyhow::Result<Limiter> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        (60_000 / requests_per_min as u64).max(1)
    };
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .context("invalid rate limit configuration")?;
    Ok(Governor::new(&cfg))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config, protected_limiter: Arc<Limiter>) {
    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/leave-permits")
                    // /leave-permits
                    .service(
                        web::resource("")
                            .route(web::post().to(leave_permit::create_permit))
                            .route(web::get().to(leave_permit::list_permits)),
                    )
                    // fixed paths go before /{id}
                    .service(web::resource("/me").route(web::get().to(leave_permit::my_permits)))
                    .service(
                        web::resource("/my-approvals")
                            .route(web::get().to(leave_permit::my_approvals)),
                    )
                    // /leave-permits/{id}
                    .service(
                        web::resource("/{id}").route(web::get().to(leave_permit::get_permit)),
                    )
                    .service(
                        web::resource("/{id}/start-approval")
                            .route(web::post().to(leave_permit::start_approval)),
                    )
                    .service(
                        web::resource("/{id}/approval")
                            .route(web::post().to(leave_permit::decide)),
                    )
                    .service(
                        web::resource("/{id}/print")
                            .route(web::post().to(leave_permit::print_permit)),
                    ),
            ),
    );
}
