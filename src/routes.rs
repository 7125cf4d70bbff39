use crate::{
    api::{absence, person, salary},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

const KIND: &str = "{kind:teachers|employees}";

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let requests_per_min = requests_per_min.max(1);
        let per_ms = (60_000 / u64::from(requests_per_min)).max(1);
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap_or_default();
        Governor::new(&cfg)
    }

    let protected_limiter = build_limiter(config.rate_protected_per_min);

    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            // /salaries (before /{kind} so it is never taken for a collection)
            .service(
                web::resource("/salaries")
                    .route(web::get().to(salary::salary_table))
                    .route(web::delete().to(salary::reset_salaries)),
            )
            // /salaries/{kind}/{id}/{month}
            .service(
                web::resource(format!("/salaries/{KIND}/{{id}}/{{month}}"))
                    .route(web::put().to(salary::put_salary_entry)),
            )
            // /{kind}
            .service(
                web::resource(format!("/{KIND}"))
                    .route(web::post().to(person::create_person))
                    .route(web::get().to(person::list_persons)),
            )
            // /{kind}/{id}
            .service(
                web::resource(format!("/{KIND}/{{id}}"))
                    .route(web::get().to(person::get_person))
                    .route(web::put().to(person::update_person))
                    .route(web::delete().to(person::delete_person)),
            )
            // /{kind}/{id}/{absences|leaves}/{date}
            .service(
                web::resource(format!("/{KIND}/{{id}}/{{book:absences|leaves}}/{{date}}"))
                    .route(web::put().to(absence::put_day))
                    .route(web::delete().to(absence::delete_day)),
            ),
    );
}
