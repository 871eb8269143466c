use crate::{
    api::{attendance, broadcast},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let requests_per_min = requests_per_min.max(1);
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond((60_000 / requests_per_min as u64).max(1))
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .expect("limiter period and burst are non-zero");
        Governor::new(&cfg)
    }

    let attendance_limiter = Arc::new(build_limiter(config.rate_attendance_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Every route below authenticates through the AuthUser extractor
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/attendance")
                    // /attendance/check-in
                    .service(
                        web::resource("/check-in")
                            .wrap(attendance_limiter.clone())
                            .route(web::post().to(attendance::check_in)),
                    )
                    // /attendance/clock-out
                    .service(
                        web::resource("/clock-out")
                            .wrap(attendance_limiter.clone())
                            .route(web::post().to(attendance::clock_out)),
                    )
                    // /attendance/{event_id}/status
                    .service(
                        web::resource("/{event_id}/status")
                            .route(web::get().to(attendance::shift_status)),
                    ),
            )
            .service(
                web::scope("/events")
                    // /events/{event_id}/broadcast
                    .service(
                        web::resource("/{event_id}/broadcast")
                            .route(web::post().to(broadcast::broadcast)),
                    ),
            ),
    );
}
