use domain_messaging::{MessagingService, PgMessagingRepository};

/// One service, hence one hub, behind the REST routes, the gateway and the
/// storefront endpoint
pub fn service(state: &crate::state::AppState) -> MessagingService<PgMessagingRepository> {
    MessagingService::new(
        PgMessagingRepository::new(state.db.clone()),
        state.authority.clone(),
        state.config.messaging,
    )
    .with_shutdown(state.shutdown.clone())
}
